// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The `DurableUploadQueue` external contract (§4.5) and a reference
//! background-task implementation, grounded on `mz-persist-client`'s split
//! between a client-facing cache and the `Blob`/`Consensus` backends it
//! drives from a worker task.

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use nrt_ore::task::{AbortOnDropHandle, JoinHandleExt};
use nrt_types::CopyState;

use crate::future::{RefreshUploadWatcher, UploadError};

/// The narrow interface the coordinator needs from the (out of scope)
/// remote-storage blob client.
#[async_trait]
pub trait RemoteUploadSink: Debug + Send + Sync {
    async fn upload(&self, copy_state: &CopyState) -> Result<(), UploadError>;
}

#[derive(Debug, Error)]
#[error("durable upload queue is closed")]
pub struct UploadQueueClosed;

/// Reports changes in queue depth, so a caller that exposes a gauge (e.g.
/// the coordinator's `upload_queue_depth`) can keep it reflecting uploads
/// that are enqueued but not yet resolved, rather than a monotonically
/// increasing counter. `()` is a no-op implementation for callers that
/// don't track depth.
pub trait QueueDepthTracker: Debug + Send + Sync {
    fn inc(&self);
    fn dec(&self);
}

impl QueueDepthTracker for () {
    fn inc(&self) {}
    fn dec(&self) {}
}

/// The operations the coordinator requires of the upload subsystem.
#[async_trait]
pub trait DurableUploadQueue: Debug + Send + Sync {
    /// Non-blocking. The implementation is responsible for eventually
    /// completing each watcher exactly once, with success or a cause.
    fn enqueue_upload(
        &self,
        copy_state: CopyState,
        watchers: Vec<RefreshUploadWatcher>,
    ) -> Result<(), UploadQueueClosed>;

    /// Signals the upload subsystem to drain and stop. After this returns,
    /// the queue rejects further enqueues.
    async fn close(&self) -> anyhow::Result<()>;
}

type UploadJob = (CopyState, Vec<RefreshUploadWatcher>);

/// A [`DurableUploadQueue`] backed by a single background task draining an
/// unbounded channel into a [`RemoteUploadSink`].
#[derive(Debug)]
pub struct BackgroundUploadQueue {
    tx: mpsc::UnboundedSender<UploadJob>,
    closed: Arc<AtomicBool>,
    worker: tokio::sync::Mutex<Option<AbortOnDropHandle<()>>>,
    depth: Arc<dyn QueueDepthTracker>,
}

impl BackgroundUploadQueue {
    pub fn new(sink: Arc<dyn RemoteUploadSink>, depth: Arc<dyn QueueDepthTracker>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = nrt_ore::task::spawn(
            || "durable-upload-queue",
            run_worker(sink, rx, Arc::clone(&depth)),
        );
        BackgroundUploadQueue {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            worker: tokio::sync::Mutex::new(Some(worker.abort_on_drop())),
            depth,
        }
    }
}

async fn run_worker(
    sink: Arc<dyn RemoteUploadSink>,
    mut rx: mpsc::UnboundedReceiver<UploadJob>,
    depth: Arc<dyn QueueDepthTracker>,
) {
    while let Some((copy_state, watchers)) = rx.recv().await {
        let version = copy_state.version;
        let result = sink.upload(&copy_state).await;
        depth.dec();
        match &result {
            Ok(()) => info!("durable upload of version {version} completed"),
            Err(e) => warn!("durable upload of version {version} failed: {e}"),
        }
        for watcher in watchers {
            watcher.complete(result.clone());
        }
    }
}

#[async_trait]
impl DurableUploadQueue for BackgroundUploadQueue {
    fn enqueue_upload(
        &self,
        copy_state: CopyState,
        watchers: Vec<RefreshUploadWatcher>,
    ) -> Result<(), UploadQueueClosed> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(UploadQueueClosed);
        }
        self.tx
            .send((copy_state, watchers))
            .map_err(|_| UploadQueueClosed)?;
        self.depth.inc();
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.lock().await.take() {
            worker.await.ok();
        }
        Ok(())
    }
}
