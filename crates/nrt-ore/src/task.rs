// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Task-spawning helpers: named tasks, and a handle that aborts its task
//! when dropped instead of leaking it to run forever.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::task::JoinHandle;
use tracing::Instrument;

/// Spawns `future` as a task named by `name`, attached as a `tracing` span
/// so the name shows up in every event the task logs and in its panic
/// message. `name` is a closure rather than a `&str` so that callers who
/// format a replica ID into the name don't pay for it unless the runtime
/// actually records task names.
pub fn spawn<Name, Fut, T>(name: impl FnOnce() -> Name, future: Fut) -> JoinHandle<T>
where
    Name: Into<String>,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let name = name().into();
    let span = tracing::info_span!("task", name = %name);
    tokio::spawn(future.instrument(span))
}

/// A [`JoinHandle`] that aborts the underlying task when dropped.
///
/// Used for background tasks (the upload-queue worker, the refresh ticker)
/// whose lifetime is tied to the struct that owns the handle: if the owner
/// is dropped, the task should stop rather than keep running headless.
#[derive(Debug)]
pub struct AbortOnDropHandle<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDropHandle<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl<T> Future for AbortOnDropHandle<T> {
    type Output = Result<T, tokio::task::JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

/// Extension trait adding [`AbortOnDropHandle`] conversion to [`JoinHandle`].
pub trait JoinHandleExt<T> {
    fn abort_on_drop(self) -> AbortOnDropHandle<T>;
}

impl<T> JoinHandleExt<T> for JoinHandle<T> {
    fn abort_on_drop(self) -> AbortOnDropHandle<T> {
        AbortOnDropHandle(self)
    }
}
