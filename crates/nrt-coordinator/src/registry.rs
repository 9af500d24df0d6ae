// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §4.1: a concurrent collection of registered replicas, deduplicated by
//! `(replicaId, hostPort)`.

use std::fmt;
use std::sync::{Arc, RwLock};

use nrt_client::ReplicaRpcClient;
use nrt_types::{HostPort, ReplicaId, ReplicaKey};

/// A registered replica: its identity, and the client used to reach it.
///
/// Equality and hashing are over `(replica_id, host_port)` only — per §3,
/// the client handle is deliberately excluded, so a reconnect that swaps in
/// a fresh client for the same logical replica does not look like a new
/// entry.
#[derive(Clone)]
pub struct ReplicaHandle {
    pub replica_id: ReplicaId,
    pub host_port: HostPort,
    pub client: Arc<dyn ReplicaRpcClient>,
}

impl ReplicaHandle {
    pub fn key(&self) -> ReplicaKey {
        ReplicaKey {
            replica_id: self.replica_id,
            host_port: self.host_port.clone(),
        }
    }
}

impl fmt::Debug for ReplicaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicaHandle")
            .field("replica_id", &self.replica_id)
            .field("host_port", &self.host_port)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ReplicaHandle {
    fn eq(&self, other: &Self) -> bool {
        self.replica_id == other.replica_id && self.host_port == other.host_port
    }
}

impl Eq for ReplicaHandle {}

/// A concurrent registry of live replicas (§4.1).
///
/// No method here ever blocks on network I/O while holding the internal
/// lock: `snapshot` and `remove` take and release it immediately, and
/// callers that need to make RPCs (the broadcast path, the pre-copy
/// fan-out) always do so over a snapshot, outside the lock.
#[derive(Debug, Default)]
pub struct ReplicaRegistry {
    replicas: RwLock<Vec<ReplicaHandle>>,
}

impl ReplicaRegistry {
    pub fn new() -> Self {
        ReplicaRegistry::default()
    }

    /// Inserts `handle` unless an entry with the same key already exists
    /// (G1). Returns `true` iff the registry changed.
    pub fn add(&self, handle: ReplicaHandle) -> bool {
        let mut replicas = self.replicas.write().unwrap();
        if replicas.iter().any(|existing| *existing == handle) {
            return false;
        }
        replicas.push(handle);
        true
    }

    /// Removes the entry matching `key`, if any.
    pub fn remove(&self, key: &ReplicaKey) -> Option<ReplicaHandle> {
        let mut replicas = self.replicas.write().unwrap();
        let index = replicas
            .iter()
            .position(|r| r.replica_id == key.replica_id && r.host_port == key.host_port)?;
        Some(replicas.remove(index))
    }

    pub fn contains(&self, key: &ReplicaKey) -> bool {
        self.replicas
            .read()
            .unwrap()
            .iter()
            .any(|r| r.replica_id == key.replica_id && r.host_port == key.host_port)
    }

    /// A safe-to-iterate copy of the current membership.
    pub fn snapshot(&self) -> Vec<ReplicaHandle> {
        self.replicas.read().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.read().unwrap().is_empty()
    }

    pub fn len(&self) -> usize {
        self.replicas.read().unwrap().len()
    }
}
