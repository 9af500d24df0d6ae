// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The file-level descriptors produced by the (out of scope) index writer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An immutable, per-file descriptor for a segment file.
///
/// Opaque to the coordinator beyond its name: the coordinator only ever
/// forwards these to replicas, keyed by file name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub length: u64,
    pub checksum: u64,
    pub header: Vec<u8>,
    pub footer: Vec<u8>,
}

impl FileMetadata {
    pub fn new(name: impl Into<String>, length: u64, checksum: u64) -> Self {
        FileMetadata {
            name: name.into(),
            length,
            checksum,
            header: Vec::new(),
            footer: Vec::new(),
        }
    }
}

/// A keyed map of `fileName -> descriptor`, the shape the writer hands the
/// coordinator both for a merge's new files and for a full copy state.
pub type FileMetadataMap = BTreeMap<String, FileMetadata>;
