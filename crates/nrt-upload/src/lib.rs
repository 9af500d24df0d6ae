// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The durable-upload external contract (§4.5, §6): the coordinator
//! enqueues a copy state and its watchers; this crate is responsible for
//! eventually completing every watcher exactly once.

mod future;
#[cfg(any(test, feature = "testing"))]
pub mod mock;
mod queue;

pub use future::{refresh_upload_pair, RefreshUploadFuture, RefreshUploadWatcher, UploadError};
pub use queue::{
    BackgroundUploadQueue, DurableUploadQueue, QueueDepthTracker, RemoteUploadSink,
    UploadQueueClosed,
};
