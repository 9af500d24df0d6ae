// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §3/§4.2: tracks the replicas currently ingesting one merge's newly
//! written files.

use std::collections::HashMap;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::Mutex;

use nrt_client::TransferStatusStream;
use nrt_types::{FileMetadataMap, IndexIdentity, ReplicaKey};

use crate::registry::ReplicaHandle;

struct Connection {
    stream: Option<TransferStatusStream>,
}

struct State {
    active: HashMap<ReplicaKey, Connection>,
    finished: bool,
}

/// A per-merge record of which replicas are still ingesting `files`, and
/// how far each has gotten.
///
/// Every state transition goes through `state`, a single `tokio::sync::Mutex`
/// held across the RPC in [`MergePreCopy::try_add_connection`] — admission
/// really is the single atomic decision §4.2 describes, not a check followed
/// by a racy insert. The multi-second drain in [`MergePreCopy::drain_one`]
/// takes the stream out of the map and releases the lock before awaiting it,
/// per §9's warning not to hold the monitor across the drain loop.
pub struct MergePreCopy {
    files: FileMetadataMap,
    identity: IndexIdentity,
    deadline: Option<Instant>,
    state: Mutex<State>,
}

impl MergePreCopy {
    /// `initial` is the set of replicas that accepted the initial fan-out
    /// `copyFiles` call; replicas whose initial call failed are simply
    /// absent (§4.3).
    pub fn new(
        files: FileMetadataMap,
        identity: IndexIdentity,
        initial: Vec<(ReplicaKey, TransferStatusStream)>,
        deadline: Option<Instant>,
    ) -> Self {
        let active = initial
            .into_iter()
            .map(|(key, stream)| {
                (
                    key,
                    Connection {
                        stream: Some(stream),
                    },
                )
            })
            .collect();
        MergePreCopy {
            files,
            identity,
            deadline,
            state: Mutex::new(State {
                active,
                finished: false,
            }),
        }
    }

    pub fn files(&self) -> &FileMetadataMap {
        &self.files
    }

    fn deadline_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    fn remaining(&self) -> Option<std::time::Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// I2/I3: admits `handle` iff not yet finished, the deadline has not
    /// expired, and `handle` is not already a participant (G4). Starts the
    /// transfer as part of the same atomic decision.
    pub async fn try_add_connection(&self, handle: &ReplicaHandle) -> bool {
        if self.deadline_expired() {
            return false;
        }
        let key = handle.key();
        let mut state = self.state.lock().await;
        if state.finished || state.active.contains_key(&key) {
            return false;
        }
        match handle
            .client
            .copy_files(&self.identity, self.files.clone(), self.remaining())
            .await
        {
            Ok(stream) => {
                state.active.insert(
                    key,
                    Connection {
                        stream: Some(stream),
                    },
                );
                true
            }
            Err(err) => {
                tracing::warn!(
                    replica_id = %handle.replica_id,
                    %err,
                    "late-joining replica failed copyFiles; it will catch up on the next NRT point"
                );
                false
            }
        }
    }

    /// I1: becomes `true` exactly once, only once the active set is empty.
    /// Once `true`, stays `true`.
    pub async fn finished(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.finished {
            return true;
        }
        if state.active.is_empty() {
            state.finished = true;
            true
        } else {
            false
        }
    }

    /// A safe-to-iterate copy of the currently active replica keys.
    pub async fn snapshot_active(&self) -> Vec<ReplicaKey> {
        self.state.lock().await.active.keys().cloned().collect()
    }

    /// Drains `key`'s transfer-status stream to completion (logging each
    /// status), then removes it from the active set — this is what drives
    /// the instance toward `finished()`. A transfer that errors mid-stream
    /// (including deadline expiry) is logged and removed the same way as
    /// one that completes normally (§4.3's `PerReplicaTransferFailure`
    /// policy: one bad replica never blocks the others).
    pub async fn drain_one(&self, key: &ReplicaKey) {
        let stream = {
            let mut state = self.state.lock().await;
            match state.active.get_mut(key).and_then(|conn| conn.stream.take()) {
                Some(stream) => stream,
                None => return,
            }
        };
        let mut stream = stream;
        while let Some(item) = stream.next().await {
            match item {
                Ok(status) => {
                    tracing::debug!(?key, ?status, "transfer status");
                }
                Err(err) => {
                    tracing::warn!(%err, ?key, "replica transfer failed or deadline exceeded");
                    break;
                }
            }
        }
        self.state.lock().await.active.remove(key);
    }
}
