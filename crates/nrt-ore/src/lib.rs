// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Small internal utilities with no opinion about replication itself:
//! retry-with-backoff and abort-on-drop task handles.

pub mod retry;
pub mod task;

pub use retry::{Retry, RetryState};
pub use task::{spawn, AbortOnDropHandle, JoinHandleExt};
