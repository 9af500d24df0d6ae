// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §4.4: drives periodic refreshes, broadcasts the resulting NRT point, and
//! hands refresh output off for durable upload.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use nrt_client::ReplicaRpcError;
use nrt_types::ReplicaKey;
use nrt_upload::{refresh_upload_pair, DurableUploadQueue, RefreshUploadFuture, RefreshUploadWatcher};

use crate::error::CoordinatorError;
use crate::metrics::CoordinatorMetrics;
use crate::primary_core::PrimaryCore;
use crate::searcher::{Searcher, SearcherManager, SearcherRef};

pub struct RefreshDriver {
    primary: Arc<PrimaryCore>,
    upload_queue: Arc<dyn DurableUploadQueue>,
    searchers: SearcherManager,
    metrics: Arc<CoordinatorMetrics>,
    next_refresh_watchers: tokio::sync::Mutex<Vec<RefreshUploadWatcher>>,
}

impl RefreshDriver {
    pub fn new(
        primary: Arc<PrimaryCore>,
        upload_queue: Arc<dyn DurableUploadQueue>,
        metrics: Arc<CoordinatorMetrics>,
    ) -> Self {
        RefreshDriver {
            primary,
            upload_queue,
            searchers: SearcherManager::new(),
            metrics,
            next_refresh_watchers: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn acquire_searcher(&self) -> Option<SearcherRef> {
        self.searchers.acquire()
    }

    /// `nextRefreshDurable()`: registers interest in the next refresh's
    /// durability, returning a future resolved exactly once (§8 property 6).
    pub async fn next_refresh_durable(&self) -> RefreshUploadFuture {
        let (watcher, future) = refresh_upload_pair();
        self.next_refresh_watchers.lock().await.push(watcher);
        future
    }

    /// §4.4's `refreshIfNeeded` algorithm.
    pub async fn refresh_if_needed(&self) -> Result<Option<SearcherRef>, CoordinatorError> {
        // Step 1: atomically steal the pending watcher list. No watcher
        // registered after this point belongs to this cycle (§8 property 7).
        let watchers = std::mem::take(&mut *self.next_refresh_watchers.lock().await);

        // Step 2.
        let changed = match self.primary.flush_and_refresh().await {
            Ok(changed) => changed,
            Err(err) => {
                // Step 5: nothing was enqueued yet, so fail every captured
                // watcher with this cause before propagating.
                let cause = nrt_upload::UploadError::from(anyhow::anyhow!(err.to_string()));
                for watcher in watchers {
                    watcher.complete(Err(cause.clone()));
                }
                return Err(CoordinatorError::Refresh(err));
            }
        };

        if changed {
            if !watchers.is_empty() {
                let copy_state = self.primary.get_copy_state();
                self.enqueue(copy_state, watchers);
            }
            self.send_new_nrt_point_to_replicas().await;
            let searcher = Arc::new(Searcher {
                primary_gen: self.primary.identity().primary_gen,
                version: self.primary.current_version(),
            });
            self.searchers.publish(Arc::clone(&searcher));
            Ok(Some(searcher))
        } else {
            // Step 4: durability is ensured even for a no-op refresh.
            if !watchers.is_empty() {
                let copy_state = self.primary.get_copy_state();
                self.enqueue(copy_state, watchers);
            }
            Ok(None)
        }
    }

    fn enqueue(&self, copy_state: nrt_types::CopyState, watchers: Vec<RefreshUploadWatcher>) {
        // Queue depth itself is tracked by the concrete `DurableUploadQueue`
        // (see `BackgroundUploadQueue`'s `QueueDepthTracker`), not here: this
        // trait object doesn't expose depth, only enqueue/close.
        if let Err(_closed) = self.upload_queue.enqueue_upload(copy_state, watchers) {
            tracing::error!("durable upload queue closed; refresh watchers will never complete");
        }
    }

    /// §4.4 `sendNewNRTPointToReplicas`: broadcasts the current version,
    /// evicting replicas that report `UNAVAILABLE` or `FAILED_PRECONDITION`.
    pub async fn send_new_nrt_point_to_replicas(&self) {
        let version = self.primary.current_version();
        let identity = self.primary.identity().clone();
        for handle in self.primary.registry().snapshot() {
            match handle.client.new_nrt_point(&identity, version).await {
                Ok(()) => {}
                Err(err) if err.is_lost() => {
                    tracing::warn!(
                        replica_id = %handle.replica_id,
                        %err,
                        "replica lost during broadcast; evicting"
                    );
                    handle.client.close().await;
                    self.primary.registry().remove(&ReplicaKey {
                        replica_id: handle.replica_id,
                        host_port: handle.host_port.clone(),
                    });
                }
                Err(err) => {
                    tracing::warn!(
                        replica_id = %handle.replica_id,
                        %err,
                        "transient error broadcasting NRT point; will retry next cycle"
                    );
                }
            }
        }
        self.metrics
            .registered_replicas
            .set(self.primary.registry().len() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoordinatorConfig;
    use crate::registry::{ReplicaHandle, ReplicaRegistry};
    use crate::writer::testing::InMemoryIndexWriter;
    use nrt_client::mock::MockReplicaClient;
    use nrt_types::{HostPort, IndexIdentity, ReplicaId};
    use nrt_upload::mock::MockUploadQueue;
    use uuid::Uuid;

    fn identity() -> IndexIdentity {
        IndexIdentity {
            index_name: "idx".into(),
            index_id: Uuid::nil(),
            primary_gen: 7,
        }
    }

    fn driver_with(
        registry: Arc<ReplicaRegistry>,
        writer: Arc<InMemoryIndexWriter>,
        upload_queue: Arc<MockUploadQueue>,
    ) -> RefreshDriver {
        let metrics = Arc::new(CoordinatorMetrics::new());
        let primary = Arc::new(PrimaryCore::new(
            identity(),
            writer,
            registry,
            upload_queue.clone(),
            CoordinatorConfig::default(),
            Arc::clone(&metrics),
        ));
        RefreshDriver::new(primary, upload_queue, metrics)
    }

    async fn handle(id: u64, client: MockReplicaClient) -> ReplicaHandle {
        ReplicaHandle {
            replica_id: ReplicaId(id),
            host_port: HostPort::new("host", 7000 + id as u16),
            client: Arc::new(client),
        }
    }

    #[tokio::test]
    async fn broadcasts_to_all_replicas_on_successful_refresh() {
        let registry = Arc::new(ReplicaRegistry::new());
        let writer = Arc::new(InMemoryIndexWriter::new());
        writer.set_next_refresh(true);
        let client1 = MockReplicaClient::new();
        let client2 = MockReplicaClient::new();
        registry.add(handle(1, client1.clone()).await);
        registry.add(handle(2, client2.clone()).await);

        let driver = driver_with(registry, writer, Arc::new(MockUploadQueue::new()));
        let searcher = driver.refresh_if_needed().await.unwrap();
        assert!(searcher.is_some());

        assert_eq!(client1.versions_received().await, vec![1]);
        assert_eq!(client2.versions_received().await, vec![1]);
    }

    #[tokio::test]
    async fn lost_replica_is_evicted_after_broadcast() {
        let registry = Arc::new(ReplicaRegistry::new());
        let writer = Arc::new(InMemoryIndexWriter::new());
        writer.set_next_refresh(true);
        let healthy = MockReplicaClient::new();
        let lost = MockReplicaClient::new();
        lost.queue_new_nrt_point_error(ReplicaRpcError::Unavailable("down".into()))
            .await;
        registry.add(handle(1, healthy.clone()).await);
        registry.add(handle(2, lost.clone()).await);

        let driver = driver_with(registry.clone(), writer, Arc::new(MockUploadQueue::new()));
        driver.refresh_if_needed().await.unwrap();

        let remaining = registry.snapshot();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].replica_id, ReplicaId(1));
        assert_eq!(lost.close_call_count().await, 1);
    }

    #[tokio::test]
    async fn transient_error_leaves_replica_registered() {
        let registry = Arc::new(ReplicaRegistry::new());
        let writer = Arc::new(InMemoryIndexWriter::new());
        writer.set_next_refresh(true);
        let flaky = MockReplicaClient::new();
        flaky
            .queue_new_nrt_point_error(ReplicaRpcError::Transient("hiccup".into()))
            .await;
        registry.add(handle(1, flaky.clone()).await);

        let driver = driver_with(registry.clone(), writer, Arc::new(MockUploadQueue::new()));
        driver.refresh_if_needed().await.unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(flaky.close_call_count().await, 0);
    }

    #[tokio::test]
    async fn no_op_refresh_still_enqueues_for_pending_watchers() {
        let registry = Arc::new(ReplicaRegistry::new());
        let writer = Arc::new(InMemoryIndexWriter::new());
        writer.set_next_refresh(false);
        let upload_queue = Arc::new(MockUploadQueue::new());

        let driver = driver_with(registry, writer, upload_queue.clone());
        let future = driver.next_refresh_durable().await;
        let result = driver.refresh_if_needed().await.unwrap();

        assert!(result.is_none());
        assert_eq!(upload_queue.enqueue_count(), 1);
        assert!(future.await.is_ok());
    }

    #[tokio::test]
    async fn refresh_failure_fails_pending_watchers_before_propagating() {
        let registry = Arc::new(ReplicaRegistry::new());
        let writer = Arc::new(InMemoryIndexWriter::new());
        writer.fail_next_flush();
        let upload_queue = Arc::new(MockUploadQueue::new());

        let driver = driver_with(registry, writer, upload_queue.clone());
        let future = driver.next_refresh_durable().await;
        let result = driver.refresh_if_needed().await;

        assert!(result.is_err());
        assert_eq!(upload_queue.enqueue_count(), 0);
        assert!(future.await.is_err());
    }
}
