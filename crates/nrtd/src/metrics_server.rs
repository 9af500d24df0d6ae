// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §10.5's Prometheus exposition surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use nrt_coordinator::CoordinatorMetrics;
use prometheus::Encoder;

async fn handle_metrics(Extension(metrics): Extension<Arc<CoordinatorMetrics>>) -> impl IntoResponse {
    let families = metrics.registry.gather();
    let mut buffer = Vec::new();
    let encoder = prometheus::TextEncoder::new();
    match encoder.encode(&families, &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            err.to_string().into_bytes(),
        ),
    }
}

pub async fn serve(addr: SocketAddr, metrics: Arc<CoordinatorMetrics>) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/metrics", get(handle_metrics))
        .layer(Extension(metrics));
    tracing::info!(%addr, "metrics endpoint listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
