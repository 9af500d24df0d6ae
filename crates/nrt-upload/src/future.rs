// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A one-shot completion cell for "this refresh's output is now durable"
//! (§3's `RefreshUploadFuture`).

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use thiserror::Error;
use tokio::sync::oneshot;

/// The cause carried by a failed [`RefreshUploadFuture`]. Cheaply cloneable
/// so a single upload failure can complete many watchers (one refresh cycle
/// may have several callers waiting on `nextRefreshDurable`).
#[derive(Debug, Clone, Error)]
#[error("durable upload failed: {0}")]
pub struct UploadError(pub Arc<str>);

impl UploadError {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        UploadError(message.into())
    }
}

impl From<anyhow::Error> for UploadError {
    fn from(err: anyhow::Error) -> Self {
        UploadError::new(err.to_string())
    }
}

/// Returned by [`crate::DurableUploadQueue::next_refresh_durable`]. Resolves
/// exactly once, either because the upload queue completed the upload or
/// because the refresh driver failed it before the upload was ever enqueued.
pub struct RefreshUploadFuture {
    rx: oneshot::Receiver<Result<(), UploadError>>,
}

impl fmt::Debug for RefreshUploadFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshUploadFuture").finish_non_exhaustive()
    }
}

/// The producer side of a [`RefreshUploadFuture`]. Consumed by
/// [`RefreshUploadWatcher::complete`]; if dropped without completing, the
/// paired future resolves with [`UploadError`] rather than hanging forever.
pub struct RefreshUploadWatcher {
    tx: oneshot::Sender<Result<(), UploadError>>,
}

impl fmt::Debug for RefreshUploadWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshUploadWatcher").finish_non_exhaustive()
    }
}

impl RefreshUploadWatcher {
    /// Completes the paired future exactly once. A second call, or a call
    /// after the future was dropped, is a silent no-op.
    pub fn complete(self, result: Result<(), UploadError>) {
        let _ = self.tx.send(result);
    }
}

/// Creates a fresh, pending watcher/future pair.
pub fn refresh_upload_pair() -> (RefreshUploadWatcher, RefreshUploadFuture) {
    let (tx, rx) = oneshot::channel();
    (RefreshUploadWatcher { tx }, RefreshUploadFuture { rx })
}

impl Future for RefreshUploadFuture {
    type Output = Result<(), UploadError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_canceled)) => Poll::Ready(Err(UploadError::new(
                "upload watcher dropped before completion",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_with_the_completed_value() {
        let (watcher, future) = refresh_upload_pair();
        watcher.complete(Ok(()));
        assert!(future.await.is_ok());
    }

    #[tokio::test]
    async fn resolves_with_error_if_watcher_is_dropped() {
        let (watcher, future) = refresh_upload_pair();
        drop(watcher);
        assert!(future.await.is_err());
    }
}
