// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The two places §7 requires an error to propagate to a caller, rather than
//! being logged and swallowed: a refresh that fails before upload is
//! enqueued, and `close()`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("refresh failed: {0}")]
    Refresh(#[source] anyhow::Error),
    #[error("close failed: {0}")]
    Close(#[source] anyhow::Error),
}
