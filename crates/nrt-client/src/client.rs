// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The replica RPC client contract (§6), consumed by the coordinator.
//!
//! This trait is the seam between the coordinator's logic and any concrete
//! transport. Production code talks to [`crate::grpc::GrpcReplicaClient`];
//! tests talk to [`crate::mock::MockReplicaClient`] (behind the `testing`
//! feature).

use std::fmt::Debug;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;

use nrt_types::{FileMetadataMap, IndexIdentity, TransferStatus};

use crate::error::ReplicaRpcError;

/// The stream of [`TransferStatus`] messages produced by a `copyFiles` call.
/// Terminates when the remote transfer finishes or errors — the coordinator
/// drains it to completion, it never needs to cancel it early.
pub type TransferStatusStream =
    Pin<Box<dyn Stream<Item = Result<TransferStatus, ReplicaRpcError>> + Send>>;

#[async_trait]
pub trait ReplicaRpcClient: Debug + Send + Sync {
    /// Unary. May fail with `Unavailable` (replica is lost) or `Transient`
    /// (leave the replica registered, retry next cycle).
    async fn new_nrt_point(
        &self,
        identity: &IndexIdentity,
        version: u64,
    ) -> Result<(), ReplicaRpcError>;

    /// Server-streaming. `deadline` becomes the RPC's deadline; exceeding it
    /// terminates the returned stream with `DeadlineExceeded` rather than
    /// failing the initial call.
    async fn copy_files(
        &self,
        identity: &IndexIdentity,
        files: FileMetadataMap,
        deadline: Option<Duration>,
    ) -> Result<TransferStatusStream, ReplicaRpcError>;

    /// Terminates the underlying channel. Best-effort: failures are logged
    /// by the caller, never propagated.
    async fn close(&self);
}
