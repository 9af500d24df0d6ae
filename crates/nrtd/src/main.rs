// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The primary-node replication coordinator daemon: loads configuration,
//! wires up a `PrimaryCore` and `RefreshDriver`, and drives the periodic
//! refresh tick (§5's "externally-driven refresh task") until shut down.

mod collaborators;
mod config;
mod metrics_server;

use std::sync::Arc;

use clap::Parser;
use nrt_coordinator::{
    CoordinatorMetrics, PrimaryCore, RefreshDriver, ReplicaRegistry,
};
use nrt_types::IndexIdentity;
use nrt_upload::BackgroundUploadQueue;
use tracing_subscriber::EnvFilter;

use collaborators::{LocalDirectoryUploadSink, NullIndexWriter};
use config::Args;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.resolve()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&args.log_filter))
        .init();

    tracing::info!(
        index_name = %config.index_name,
        primary_gen = config.primary_gen,
        "starting nrtd"
    );

    let identity = IndexIdentity {
        index_name: config.index_name.clone(),
        index_id: config.index_id,
        primary_gen: config.primary_gen,
    };

    let metrics = Arc::new(CoordinatorMetrics::new());
    let registry = Arc::new(ReplicaRegistry::new());
    let writer = Arc::new(NullIndexWriter::default());
    let upload_sink = Arc::new(LocalDirectoryUploadSink::new(config.upload_dir.clone()));
    let upload_queue = Arc::new(BackgroundUploadQueue::new(
        upload_sink,
        Arc::clone(&metrics) as Arc<dyn nrt_upload::QueueDepthTracker>,
    ));

    let primary = Arc::new(PrimaryCore::new(
        identity,
        writer,
        Arc::clone(&registry),
        upload_queue.clone(),
        config.coordinator.clone(),
        Arc::clone(&metrics),
    ));
    let driver = Arc::new(RefreshDriver::new(
        Arc::clone(&primary),
        upload_queue,
        Arc::clone(&metrics),
    ));

    let metrics_task = tokio::spawn(metrics_server::serve(
        config.metrics_addr,
        Arc::clone(&metrics),
    ));

    let refresh_interval = config.coordinator.refresh_interval();
    let refresh_driver = Arc::clone(&driver);
    let refresh_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = refresh_driver.refresh_if_needed().await {
                tracing::warn!("refresh cycle failed: {err:#}");
            }
        }
    });

    tokio::select! {
        result = metrics_task => {
            result??;
        }
        _ = refresh_task => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received shutdown signal");
        }
    }

    primary.close().await.map_err(anyhow::Error::from)
}
