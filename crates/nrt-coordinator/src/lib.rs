// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The primary-node replication coordinator (§2-§4): a `ReplicaRegistry`
//! feeding a `MergePreCopy` lifecycle and an NRT-point broadcast, all hung
//! off a `PrimaryCore` and driven by a `RefreshDriver`.

pub mod config;
pub mod error;
pub mod merge_precopy;
pub mod metrics;
pub mod primary_core;
pub mod refresh_driver;
pub mod registry;
pub mod searcher;
pub mod writer;

pub use config::CoordinatorConfig;
pub use error::CoordinatorError;
pub use merge_precopy::MergePreCopy;
pub use metrics::CoordinatorMetrics;
pub use primary_core::PrimaryCore;
pub use refresh_driver::RefreshDriver;
pub use registry::{ReplicaHandle, ReplicaRegistry};
pub use searcher::{Searcher, SearcherManager, SearcherRef};
pub use writer::IndexWriterHandle;
