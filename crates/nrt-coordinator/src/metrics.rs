// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §4.3(e)'s "record merge metrics" plus the ambient gauges §10.5 calls for.
//! The coordinator only ever updates these; binding an HTTP endpoint to
//! expose them is the daemon's job.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Registry};

#[derive(Debug)]
pub struct CoordinatorMetrics {
    pub registry: Registry,
    pub merges_completed: IntCounter,
    pub merge_precopy_duration_seconds: Histogram,
    pub registered_replicas: IntGauge,
    pub upload_queue_depth: IntGauge,
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let merges_completed =
            IntCounter::new("nrt_merges_precopied_total", "Merge pre-copies completed.")
                .expect("static metric options are valid");
        let merge_precopy_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "nrt_merge_precopy_duration_seconds",
            "Wall time spent pre-copying one merge's files to all replicas.",
        ))
        .expect("static metric options are valid");
        let registered_replicas = IntGauge::new(
            "nrt_registered_replicas",
            "Number of replicas currently in the registry.",
        )
        .expect("static metric options are valid");
        let upload_queue_depth = IntGauge::new(
            "nrt_upload_queue_depth",
            "Copy states enqueued for durable upload but not yet resolved.",
        )
        .expect("static metric options are valid");

        registry
            .register(Box::new(merges_completed.clone()))
            .expect("metric name is unique");
        registry
            .register(Box::new(merge_precopy_duration_seconds.clone()))
            .expect("metric name is unique");
        registry
            .register(Box::new(registered_replicas.clone()))
            .expect("metric name is unique");
        registry
            .register(Box::new(upload_queue_depth.clone()))
            .expect("metric name is unique");

        CoordinatorMetrics {
            registry,
            merges_completed,
            merge_precopy_duration_seconds,
            registered_replicas,
            upload_queue_depth,
        }
    }
}

impl Default for CoordinatorMetrics {
    fn default() -> Self {
        CoordinatorMetrics::new()
    }
}

/// Lets a [`nrt_upload::BackgroundUploadQueue`] keep `upload_queue_depth`
/// reflecting uploads enqueued but not yet resolved, rather than a
/// monotonically increasing counter.
impl nrt_upload::QueueDepthTracker for CoordinatorMetrics {
    fn inc(&self) {
        self.upload_queue_depth.inc();
    }

    fn dec(&self) {
        self.upload_queue_depth.dec();
    }
}
