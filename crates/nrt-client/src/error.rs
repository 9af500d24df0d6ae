// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The replica-RPC error taxonomy (§7): a [`tonic::Status`] is classified
//! once, here, so that every caller downstream works with the same two
//! buckets instead of re-deriving the status-code policy.

use thiserror::Error;
use tonic::Code;

#[derive(Debug, Error, Clone)]
pub enum ReplicaRpcError {
    /// `UNAVAILABLE` or `FAILED_PRECONDITION`: the replica is considered
    /// irrecoverably lost to this primary.
    #[error("replica unavailable: {0}")]
    Unavailable(String),
    /// The RPC's deadline (the pre-copy deadline, when one applies) expired.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),
    /// Any other RPC failure. Transient by policy: log, keep the replica,
    /// rely on the next cycle.
    #[error("transient replica error: {0}")]
    Transient(String),
}

impl ReplicaRpcError {
    /// True for the two codes that §7's `LostReplica` policy applies to.
    pub fn is_lost(&self) -> bool {
        matches!(self, ReplicaRpcError::Unavailable(_))
    }
}

impl From<tonic::Status> for ReplicaRpcError {
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            Code::Unavailable | Code::FailedPrecondition => {
                ReplicaRpcError::Unavailable(status.message().to_string())
            }
            Code::DeadlineExceeded => ReplicaRpcError::DeadlineExceeded(status.message().to_string()),
            _ => ReplicaRpcError::Transient(status.message().to_string()),
        }
    }
}

impl From<tonic::transport::Error> for ReplicaRpcError {
    fn from(err: tonic::transport::Error) -> Self {
        ReplicaRpcError::Transient(err.to_string())
    }
}
