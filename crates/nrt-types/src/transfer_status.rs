// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The per-message shape of a `copyFiles` transfer stream.

use serde::{Deserialize, Serialize};

/// One message in a replica's file-transfer status stream.
///
/// The coordinator only drains and logs these; it never branches control
/// flow on `code` (§6).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferStatus {
    pub code: TransferStatusCode,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatusCode {
    /// The transfer is still in progress; more messages will follow.
    Ongoing,
    /// The transfer completed successfully. Terminal.
    Done,
    /// The transfer failed, including deadline expiry. Terminal.
    Failed,
}

impl TransferStatus {
    pub fn ongoing(message: impl Into<String>) -> Self {
        TransferStatus {
            code: TransferStatusCode::Ongoing,
            message: message.into(),
        }
    }

    pub fn done() -> Self {
        TransferStatus {
            code: TransferStatusCode::Done,
            message: String::new(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        TransferStatus {
            code: TransferStatusCode::Failed,
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.code, TransferStatusCode::Ongoing)
    }
}
