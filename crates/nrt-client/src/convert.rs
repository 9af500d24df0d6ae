// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Conversions between the wire types in `nrt-proto` and the domain types in
//! `nrt-types`. Kept in one place so the two vocabularies never leak into
//! each other's crates.

use nrt_types::{FileMetadata, FileMetadataMap, IndexIdentity, TransferStatus, TransferStatusCode};

pub(crate) fn identity_to_proto(identity: &IndexIdentity) -> nrt_proto::IndexIdentityProto {
    nrt_proto::IndexIdentityProto {
        index_name: identity.index_name.clone(),
        index_id: identity.index_id.to_string(),
        primary_gen: identity.primary_gen,
    }
}

pub(crate) fn file_to_proto(file: &FileMetadata) -> nrt_proto::FileMetadataProto {
    nrt_proto::FileMetadataProto {
        name: file.name.clone(),
        length: file.length,
        checksum: file.checksum,
        header: file.header.clone(),
        footer: file.footer.clone(),
    }
}

pub(crate) fn files_to_proto(files: &FileMetadataMap) -> Vec<nrt_proto::FileMetadataProto> {
    files.values().map(file_to_proto).collect()
}

pub(crate) fn transfer_status_from_proto(proto: nrt_proto::TransferStatusProto) -> TransferStatus {
    let code = match nrt_proto::transfer_status_proto::Code::from_i32(proto.code)
        .unwrap_or(nrt_proto::transfer_status_proto::Code::Failed)
    {
        nrt_proto::transfer_status_proto::Code::Ongoing => TransferStatusCode::Ongoing,
        nrt_proto::transfer_status_proto::Code::Done => TransferStatusCode::Done,
        nrt_proto::transfer_status_proto::Code::Failed => TransferStatusCode::Failed,
    };
    TransferStatus {
        code,
        message: proto.message,
    }
}
