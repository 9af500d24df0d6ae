// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Data types shared by every crate in the replication coordinator.

mod copy_state;
mod file_metadata;
mod ids;
mod transfer_status;

pub use copy_state::CopyState;
pub use file_metadata::{FileMetadata, FileMetadataMap};
pub use ids::{HostPort, IndexIdentity, ReplicaId, ReplicaKey};
pub use transfer_status::{TransferStatus, TransferStatusCode};
