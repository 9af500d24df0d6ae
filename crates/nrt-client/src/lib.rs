// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The replica RPC client contract (§6) and its transports.

mod client;
mod convert;
mod error;
mod grpc;

#[cfg(any(test, feature = "testing"))]
pub mod mock;

pub use client::{ReplicaRpcClient, TransferStatusStream};
pub use error::ReplicaRpcError;
pub use grpc::GrpcReplicaClient;
