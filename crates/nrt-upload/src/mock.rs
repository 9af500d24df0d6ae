// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An in-memory [`DurableUploadQueue`] double for the coordinator's
//! scenario tests (§8 S6): records every enqueued copy state and resolves
//! its watchers with a configurable, scripted outcome.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use nrt_types::CopyState;

use crate::future::{RefreshUploadWatcher, UploadError};
use crate::queue::{DurableUploadQueue, UploadQueueClosed};

#[derive(Debug)]
pub struct MockUploadQueue {
    enqueued: Mutex<Vec<CopyState>>,
    outcome: Mutex<Result<(), UploadError>>,
    closed: AtomicBool,
}

impl Default for MockUploadQueue {
    fn default() -> Self {
        MockUploadQueue {
            enqueued: Mutex::new(Vec::new()),
            outcome: Mutex::new(Ok(())),
            closed: AtomicBool::new(false),
        }
    }
}

impl MockUploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent `enqueue_upload` resolves its watchers with `outcome`.
    pub fn set_outcome(&self, outcome: Result<(), UploadError>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn enqueued_versions(&self) -> Vec<u64> {
        self.enqueued
            .lock()
            .unwrap()
            .iter()
            .map(|cs| cs.version)
            .collect()
    }

    pub fn enqueue_count(&self) -> usize {
        self.enqueued.lock().unwrap().len()
    }
}

#[async_trait]
impl DurableUploadQueue for MockUploadQueue {
    fn enqueue_upload(
        &self,
        copy_state: CopyState,
        watchers: Vec<RefreshUploadWatcher>,
    ) -> Result<(), UploadQueueClosed> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(UploadQueueClosed);
        }
        let outcome = self.outcome.lock().unwrap().clone();
        self.enqueued.lock().unwrap().push(copy_state);
        for watcher in watchers {
            watcher.complete(outcome.clone());
        }
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
