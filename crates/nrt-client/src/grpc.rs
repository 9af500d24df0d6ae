// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A [`ReplicaRpcClient`] backed by a `tonic` gRPC channel.
//!
//! The generated client requires `&mut self` for RPC calls; this wraps it in
//! a `tokio::sync::Mutex` so a single `GrpcReplicaClient` can be shared as
//! `Arc<dyn ReplicaRpcClient>` across the registry, the broadcast path, and
//! the pre-copy path, the way `mz-service`'s `GrpcClient` is shared.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;
use tonic::transport::{Channel, Endpoint};
use tracing::{debug, info, warn};

use nrt_ore::retry::Retry;
use nrt_types::{FileMetadataMap, IndexIdentity};

use nrt_proto::replica_rpc_client::ReplicaRpcClient as GeneratedClient;
use nrt_proto::{CloseRequest, CopyFilesRequest, NewNrtPointRequest};

use crate::client::{ReplicaRpcClient, TransferStatusStream};
use crate::convert::{files_to_proto, identity_to_proto, transfer_status_from_proto};
use crate::error::ReplicaRpcError;

#[derive(Debug)]
pub struct GrpcReplicaClient {
    addr: String,
    inner: Mutex<GeneratedClient<Channel>>,
}

impl GrpcReplicaClient {
    /// Connects to a replica at `addr`, retrying with exponential backoff
    /// until the channel comes up. Mirrors the replica connect loop in the
    /// active-replication client: primaries start before every replica is
    /// necessarily reachable, so the first connect attempt is expected to
    /// fail occasionally.
    pub async fn connect(addr: String) -> Result<Self, ReplicaRpcError> {
        debug!("GrpcReplicaClient {}: attempting to connect", addr);
        let channel = Retry::default()
            .clamp_backoff(Duration::from_secs(32))
            .retry_async(|state| {
                let addr = addr.clone();
                async move {
                    Endpoint::from_shared(format!("http://{addr}"))
                        .map_err(ReplicaRpcError::from)?
                        .connect()
                        .await
                        .map_err(|e| {
                            if let Some(backoff) = state.next_backoff {
                                warn!("error connecting to replica {addr}, retrying in {backoff:?}: {e}");
                            }
                            ReplicaRpcError::from(e)
                        })
                }
            })
            .await?;
        info!("GrpcReplicaClient {}: connected", addr);
        Ok(GrpcReplicaClient {
            addr,
            inner: Mutex::new(GeneratedClient::new(channel)),
        })
    }
}

#[async_trait]
impl ReplicaRpcClient for GrpcReplicaClient {
    async fn new_nrt_point(
        &self,
        identity: &IndexIdentity,
        version: u64,
    ) -> Result<(), ReplicaRpcError> {
        let request = NewNrtPointRequest {
            identity: Some(identity_to_proto(identity)),
            version,
        };
        let mut client = self.inner.lock().await;
        client.new_nrt_point(request).await?;
        Ok(())
    }

    async fn copy_files(
        &self,
        identity: &IndexIdentity,
        files: FileMetadataMap,
        deadline: Option<Duration>,
    ) -> Result<TransferStatusStream, ReplicaRpcError> {
        let request = CopyFilesRequest {
            identity: Some(identity_to_proto(identity)),
            files: files_to_proto(&files),
            deadline_millis: deadline.map(|d| d.as_millis() as u64).unwrap_or(0),
        };
        let mut req = tonic::Request::new(request);
        if let Some(d) = deadline {
            req.set_timeout(d);
        }
        let mut client = self.inner.lock().await;
        let stream = client.copy_files(req).await?.into_inner();
        let addr = self.addr.clone();
        let mapped = stream.map(move |item| match item {
            Ok(proto) => Ok(transfer_status_from_proto(proto)),
            Err(status) => {
                let err = ReplicaRpcError::from(status);
                debug!("replica {addr}: transfer stream ended with {err}");
                Err(err)
            }
        });
        Ok(Box::pin(mapped))
    }

    async fn close(&self) {
        let mut client = self.inner.lock().await;
        if let Err(e) = client.close(CloseRequest {}).await {
            warn!("error closing replica {}: {e}", self.addr);
        }
    }
}
