// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The bundle a replica needs to materialize a given searcher snapshot.

use serde::{Deserialize, Serialize};

use crate::file_metadata::FileMetadataMap;

/// A version number, a primary generation, and the complete set of live
/// files needed to reconstruct the corresponding searcher snapshot.
///
/// Produced on demand by the primary core; immutable once returned, per the
/// data model's §3 invariant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyState {
    pub version: u64,
    pub primary_gen: u64,
    pub files: FileMetadataMap,
}

impl CopyState {
    pub fn new(version: u64, primary_gen: u64, files: FileMetadataMap) -> Self {
        CopyState {
            version,
            primary_gen,
            files,
        }
    }
}
