// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A small retry-with-backoff helper, in the shape used by the replica
//! connect loop: an unbounded number of attempts, exponential backoff
//! clamped to a maximum, with jitter so that a fleet of replicas
//! reconnecting after a primary restart does not thunder against it.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// The state handed to each retry attempt's closure.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    pub i: usize,
    pub next_backoff: Option<Duration>,
}

/// A retry policy builder. Mirrors the call shape of `Retry::default()
/// .clamp_backoff(..).retry_async(..)` used by the replica connect loop.
#[derive(Debug, Clone)]
pub struct Retry {
    initial_backoff: Duration,
    multiplier: u32,
    clamp_backoff: Duration,
    max_tries: Option<usize>,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            initial_backoff: Duration::from_millis(125),
            multiplier: 2,
            clamp_backoff: Duration::from_secs(60),
            max_tries: None,
        }
    }
}

impl Retry {
    pub fn initial_backoff(mut self, d: Duration) -> Self {
        self.initial_backoff = d;
        self
    }

    pub fn clamp_backoff(mut self, d: Duration) -> Self {
        self.clamp_backoff = d;
        self
    }

    pub fn max_tries(mut self, n: usize) -> Self {
        self.max_tries = Some(n);
        self
    }

    /// Calls `f` until it returns `Ok`, sleeping with jittered exponential
    /// backoff between attempts. If `max_tries` was set and is exhausted,
    /// returns the last error.
    pub async fn retry_async<F, Fut, T, E>(self, mut f: F) -> Result<T, E>
    where
        F: FnMut(RetryState) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut backoff = self.initial_backoff;
        let mut i = 0;
        loop {
            let next_backoff = Some(backoff.min(self.clamp_backoff));
            match f(RetryState { i, next_backoff }).await {
                Ok(t) => return Ok(t),
                Err(e) => {
                    i += 1;
                    if let Some(max) = self.max_tries {
                        if i >= max {
                            return Err(e);
                        }
                    }
                    let jittered = jitter(backoff.min(self.clamp_backoff));
                    tokio::time::sleep(jittered).await;
                    backoff = backoff.saturating_mul(self.multiplier);
                }
            }
        }
    }
}

fn jitter(d: Duration) -> Duration {
    let factor = rand::thread_rng().gen_range(0.5..1.0);
    d.mul_f64(factor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicUsize::new(0);
        let result: Result<(), &str> = Retry::default()
            .initial_backoff(Duration::from_millis(1))
            .retry_async(|_state| {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 3 {
                        Err("not yet")
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn gives_up_after_max_tries() {
        let result: Result<(), &str> = Retry::default()
            .initial_backoff(Duration::from_millis(1))
            .max_tries(2)
            .retry_async(|_state| async { Err("nope") })
            .await;
        assert_eq!(result, Err("nope"));
    }
}
