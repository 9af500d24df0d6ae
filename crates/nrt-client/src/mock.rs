// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An in-memory [`ReplicaRpcClient`] double, for the mock-replica property
//! and scenario tests called for in §8.
//!
//! A [`MockReplicaClient`] is cheap to clone: clones share the same
//! recorded-call log and script, via an `Arc<Mutex<_>>`. Tests typically
//! keep one clone to configure and inspect, and hand another (as
//! `Arc<dyn ReplicaRpcClient>`) to the coordinator.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use nrt_types::{FileMetadataMap, IndexIdentity, TransferStatus};

use crate::client::{ReplicaRpcClient, TransferStatusStream};
use crate::error::ReplicaRpcError;

/// One scripted step of a `copyFiles` stream: wait `after`, then emit
/// `status`.
#[derive(Clone, Debug)]
pub struct ScriptedStatus {
    pub after: Duration,
    pub status: TransferStatus,
}

impl ScriptedStatus {
    pub fn new(after: Duration, status: TransferStatus) -> Self {
        ScriptedStatus { after, status }
    }
}

#[derive(Debug, Default)]
struct MockState {
    new_nrt_point_calls: Vec<(IndexIdentity, u64)>,
    new_nrt_point_errors: VecDeque<ReplicaRpcError>,
    copy_files_calls: Vec<(IndexIdentity, FileMetadataMap, Option<Duration>)>,
    copy_files_error: Option<ReplicaRpcError>,
    copy_script: Vec<ScriptedStatus>,
    close_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockReplicaClient {
    state: Arc<Mutex<MockState>>,
}

impl MockReplicaClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a single error to return from the next `new_nrt_point` call;
    /// subsequent calls succeed (or consume the next queued error, if any).
    pub async fn queue_new_nrt_point_error(&self, err: ReplicaRpcError) {
        self.state.lock().await.new_nrt_point_errors.push_back(err);
    }

    /// Every future `copy_files` call returns this error immediately,
    /// instead of starting a scripted stream.
    pub async fn fail_copy_files(&self, err: ReplicaRpcError) {
        self.state.lock().await.copy_files_error = Some(err);
    }

    /// Sets the sequence of delayed statuses `copy_files` will stream back.
    /// If the last status is not terminal, a [`TransferStatus::done`] is
    /// appended automatically.
    pub async fn set_copy_script(&self, mut script: Vec<ScriptedStatus>) {
        if script.last().map(|s| !s.status.is_terminal()).unwrap_or(true) {
            script.push(ScriptedStatus::new(Duration::ZERO, TransferStatus::done()));
        }
        self.state.lock().await.copy_script = script;
    }

    /// A script that never reaches a terminal status on its own — used to
    /// exercise deadline expiry (§8 S3) and primary-close abandonment.
    pub async fn set_copy_script_never_finishes(&self) {
        self.state.lock().await.copy_script = vec![ScriptedStatus::new(
            Duration::from_secs(3600),
            TransferStatus::ongoing("still going"),
        )];
    }

    pub async fn versions_received(&self) -> Vec<u64> {
        self.state
            .lock()
            .await
            .new_nrt_point_calls
            .iter()
            .map(|(_, v)| *v)
            .collect()
    }

    pub async fn new_nrt_point_call_count(&self) -> usize {
        self.state.lock().await.new_nrt_point_calls.len()
    }

    pub async fn copy_files_calls(&self) -> Vec<(IndexIdentity, FileMetadataMap, Option<Duration>)> {
        self.state.lock().await.copy_files_calls.clone()
    }

    pub async fn close_call_count(&self) -> usize {
        self.state.lock().await.close_calls
    }
}

#[async_trait]
impl ReplicaRpcClient for MockReplicaClient {
    async fn new_nrt_point(
        &self,
        identity: &IndexIdentity,
        version: u64,
    ) -> Result<(), ReplicaRpcError> {
        let mut state = self.state.lock().await;
        state
            .new_nrt_point_calls
            .push((identity.clone(), version));
        if let Some(err) = state.new_nrt_point_errors.pop_front() {
            return Err(err);
        }
        Ok(())
    }

    async fn copy_files(
        &self,
        identity: &IndexIdentity,
        files: FileMetadataMap,
        deadline: Option<Duration>,
    ) -> Result<TransferStatusStream, ReplicaRpcError> {
        let mut state = self.state.lock().await;
        state
            .copy_files_calls
            .push((identity.clone(), files, deadline));
        if let Some(err) = state.copy_files_error.clone() {
            return Err(err);
        }
        let script = state.copy_script.clone();
        drop(state);

        let items = scripted_stream(script, deadline);
        Ok(Box::pin(stream::unfold(items, |mut queue| async move {
            let (delay, item) = queue.pop_front()?;
            tokio::time::sleep(delay).await;
            Some((item, queue))
        })))
    }

    async fn close(&self) {
        self.state.lock().await.close_calls += 1;
    }
}

/// Converts a cumulative-delay script into a queue of (incremental delay,
/// item) pairs, truncating and injecting a `Failed` status once the
/// cumulative delay would exceed `deadline`, to emulate a server enforcing
/// an RPC deadline.
fn scripted_stream(
    script: Vec<ScriptedStatus>,
    deadline: Option<Duration>,
) -> VecDeque<(Duration, Result<TransferStatus, ReplicaRpcError>)> {
    let mut out = VecDeque::new();
    let mut elapsed = Duration::ZERO;
    for step in script {
        elapsed += step.after;
        if let Some(deadline) = deadline {
            if elapsed >= deadline {
                let wait = deadline.saturating_sub(elapsed - step.after);
                out.push_back((
                    wait,
                    Err(ReplicaRpcError::DeadlineExceeded(
                        "mock deadline exceeded".into(),
                    )),
                ));
                return out;
            }
        }
        out.push_back((step.after, Ok(step.status)));
    }
    out
}
