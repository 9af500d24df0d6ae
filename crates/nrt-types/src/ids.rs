// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Identifiers for replicas and the index they serve.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The primary-assigned identifier of a registered replica.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplicaId(pub u64);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "replica-{}", self.0)
    }
}

/// A replica's network endpoint.
///
/// Equality and hashing are derived from both fields, since a `HostPort` is
/// never compared on its own — it is one half of a [`crate::ReplicaKey`],
/// which deliberately excludes the RPC client handle.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        HostPort {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The composite key under which replicas are deduplicated in the registry.
///
/// `(replicaId, hostPort)` — the client handle is deliberately not part of
/// this key, so that a reconnect that swaps in a new client for the same
/// logical replica does not produce a duplicate entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReplicaKey {
    pub replica_id: ReplicaId,
    pub host_port: HostPort,
}

/// Identifies the index and primary generation a replication operation
/// applies to. Sent alongside every RPC so a replica can detect that it is
/// talking to a primary generation it no longer recognizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexIdentity {
    pub index_name: String,
    pub index_id: Uuid,
    pub primary_gen: u64,
}
