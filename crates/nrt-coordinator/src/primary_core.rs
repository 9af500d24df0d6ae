// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §4.3: owns the writer, exposes copy state and flush/refresh, and hosts
//! the merge pre-copy lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nrt_types::{CopyState, FileMetadataMap, IndexIdentity};
use nrt_upload::DurableUploadQueue;

use crate::config::CoordinatorConfig;
use crate::error::CoordinatorError;
use crate::merge_precopy::MergePreCopy;
use crate::metrics::CoordinatorMetrics;
use crate::registry::{ReplicaHandle, ReplicaRegistry};
use crate::writer::IndexWriterHandle;

const DRAIN_TICK: Duration = Duration::from_millis(10);
const WARN_INTERVAL: Duration = Duration::from_secs(1);

pub struct PrimaryCore {
    identity: IndexIdentity,
    writer: Arc<dyn IndexWriterHandle>,
    registry: Arc<ReplicaRegistry>,
    upload_queue: Arc<dyn DurableUploadQueue>,
    config: CoordinatorConfig,
    metrics: Arc<CoordinatorMetrics>,
    version: AtomicU64,
    closed: AtomicBool,
    warming_segments: tokio::sync::Mutex<Vec<Arc<MergePreCopy>>>,
}

impl PrimaryCore {
    pub fn new(
        identity: IndexIdentity,
        writer: Arc<dyn IndexWriterHandle>,
        registry: Arc<ReplicaRegistry>,
        upload_queue: Arc<dyn DurableUploadQueue>,
        config: CoordinatorConfig,
        metrics: Arc<CoordinatorMetrics>,
    ) -> Self {
        PrimaryCore {
            identity,
            writer,
            registry,
            upload_queue,
            config,
            metrics,
            version: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            warming_segments: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn identity(&self) -> &IndexIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<ReplicaRegistry> {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// The bundle a replica needs to materialize the current snapshot (§3).
    pub fn get_copy_state(&self) -> CopyState {
        CopyState::new(
            self.current_version(),
            self.identity.primary_gen,
            self.writer.current_files(),
        )
    }

    pub fn set_ram_buffer_size_mb(&self, mb: f64) {
        self.writer.set_ram_buffer_size_mb(mb);
    }

    /// Flushes and refreshes the underlying writer. On a visible change,
    /// advances the broadcast version (G3: non-decreasing within one
    /// primary generation).
    pub async fn flush_and_refresh(&self) -> anyhow::Result<bool> {
        let changed = self.writer.flush_and_refresh().await?;
        if changed {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(changed)
    }

    /// The merge-completion hook (§4.3). Pre-copies `files` to every
    /// currently registered replica, admitting late joiners opportunistically,
    /// and returns once every participant has finished, errored, or the
    /// configured deadline has passed.
    pub async fn pre_copy_merged_segment_files(&self, files: FileMetadataMap) {
        if self.registry.is_empty() {
            return;
        }
        let deadline = self
            .config
            .merge_precopy_duration()
            .map(|d| Instant::now() + d);

        let pre_copy = {
            let mut warming = self.warming_segments.lock().await;
            let mut initial = Vec::new();
            for handle in self.registry.snapshot() {
                let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
                match handle
                    .client
                    .copy_files(&self.identity, files.clone(), remaining)
                    .await
                {
                    Ok(stream) => initial.push((handle.key(), stream)),
                    Err(err) => {
                        tracing::warn!(
                            replica_id = %handle.replica_id,
                            %err,
                            "replica did not join merge pre-copy; it will catch up on the next NRT point"
                        );
                    }
                }
            }
            let pre_copy = Arc::new(MergePreCopy::new(
                files,
                self.identity.clone(),
                initial,
                deadline,
            ));
            warming.push(Arc::clone(&pre_copy));
            pre_copy
        };

        let start = Instant::now();
        let mut last_warn = start;
        loop {
            tokio::time::sleep(DRAIN_TICK).await;

            if self.is_closed() {
                tracing::warn!("primary closing; abandoning in-flight merge pre-copy");
                break;
            }

            if last_warn.elapsed() >= WARN_INTERVAL {
                let remaining = pre_copy.snapshot_active().await.len();
                tracing::warn!(remaining, elapsed = ?start.elapsed(), "merge pre-copy still in progress");
                last_warn = Instant::now();
            }

            let active = pre_copy.snapshot_active().await;
            futures::future::join_all(active.iter().map(|key| pre_copy.drain_one(key))).await;

            if pre_copy.finished().await {
                break;
            }
        }

        {
            let mut warming = self.warming_segments.lock().await;
            warming.retain(|w| !Arc::ptr_eq(w, &pre_copy));
        }
        self.metrics.merges_completed.inc();
        self.metrics
            .merge_precopy_duration_seconds
            .observe(start.elapsed().as_secs_f64());
    }

    /// Registers `handle`, then opportunistically admits it into every
    /// in-flight merge pre-copy it isn't already part of.
    pub async fn add_replica(&self, handle: ReplicaHandle) -> bool {
        let added = self.registry.add(handle.clone());
        self.metrics
            .registered_replicas
            .set(self.registry.len() as i64);

        let warming = self.warming_segments.lock().await;
        for pre_copy in warming.iter() {
            if pre_copy.try_add_connection(&handle).await {
                tracing::info!(
                    replica_id = %handle.replica_id,
                    "replica admitted into an in-flight merge pre-copy"
                );
            } else {
                tracing::debug!(
                    replica_id = %handle.replica_id,
                    "replica will receive this segment's files via the next NRT point"
                );
            }
        }
        added
    }

    /// Terminal. Closes every registered replica, the upload queue, and the
    /// underlying writer. Per-replica close failures are logged and
    /// swallowed; writer and upload-queue failures propagate to the caller.
    pub async fn close(&self) -> Result<(), CoordinatorError> {
        self.closed.store(true, Ordering::SeqCst);

        for handle in self.registry.snapshot() {
            handle.client.close().await;
            self.registry.remove(&handle.key());
        }
        self.metrics
            .registered_replicas
            .set(self.registry.len() as i64);

        self.upload_queue
            .close()
            .await
            .map_err(|err| CoordinatorError::Close(err.context("upload queue close failed")))?;

        self.writer
            .close()
            .await
            .map_err(|err| CoordinatorError::Close(err.context("writer close failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testing::InMemoryIndexWriter;
    use nrt_client::mock::MockReplicaClient;
    use nrt_client::ReplicaRpcClient;
    use nrt_types::{FileMetadata, HostPort, ReplicaId};
    use nrt_upload::mock::MockUploadQueue;
    use uuid::Uuid;

    fn identity() -> IndexIdentity {
        IndexIdentity {
            index_name: "idx".into(),
            index_id: Uuid::nil(),
            primary_gen: 1,
        }
    }

    fn core(config: CoordinatorConfig) -> PrimaryCore {
        PrimaryCore::new(
            identity(),
            Arc::new(InMemoryIndexWriter::new()),
            Arc::new(ReplicaRegistry::new()),
            Arc::new(MockUploadQueue::new()),
            config,
            Arc::new(CoordinatorMetrics::new()),
        )
    }

    async fn handle(id: u64, client: MockReplicaClient) -> ReplicaHandle {
        ReplicaHandle {
            replica_id: ReplicaId(id),
            host_port: HostPort::new("host", 7000 + id as u16),
            client: Arc::new(client),
        }
    }

    #[tokio::test]
    async fn empty_registry_short_circuits_pre_copy() {
        let core = core(CoordinatorConfig::default());
        let mut files = FileMetadataMap::new();
        files.insert("_0.cfs".into(), FileMetadata::new("_0.cfs", 1, 1));
        core.pre_copy_merged_segment_files(files).await;
        assert!(core.warming_segments.lock().await.is_empty());
    }

    #[tokio::test]
    async fn pre_copy_drains_fast_replicas_and_clears_warming_segments() {
        let core = core(CoordinatorConfig::default());
        let client1 = MockReplicaClient::new();
        let client2 = MockReplicaClient::new();
        core.add_replica(handle(1, client1).await).await;
        core.add_replica(handle(2, client2).await).await;

        let mut files = FileMetadataMap::new();
        files.insert("_0.cfs".into(), FileMetadata::new("_0.cfs", 1, 1));
        core.pre_copy_merged_segment_files(files).await;

        assert!(core.warming_segments.lock().await.is_empty());
        assert_eq!(core.metrics.merges_completed.get(), 1);
    }

    #[tokio::test]
    async fn late_join_is_admitted_into_an_in_flight_pre_copy() {
        let core = Arc::new(core(CoordinatorConfig::default()));
        let slow_client = MockReplicaClient::new();
        slow_client
            .set_copy_script(vec![nrt_client::mock::ScriptedStatus::new(
                Duration::from_millis(80),
                nrt_types::TransferStatus::ongoing("chunk"),
            )])
            .await;
        core.add_replica(handle(1, slow_client).await).await;

        let mut files = FileMetadataMap::new();
        files.insert("_0.cfs".into(), FileMetadata::new("_0.cfs", 1, 1));

        let core_for_precopy = Arc::clone(&core);
        let pre_copy_task =
            tokio::spawn(async move { core_for_precopy.pre_copy_merged_segment_files(files).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let late_client = MockReplicaClient::new();
        core.add_replica(handle(2, late_client.clone()).await)
            .await;

        pre_copy_task.await.unwrap();
        assert_eq!(late_client.copy_files_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn close_closes_replicas_writer_and_upload_queue() {
        let core = core(CoordinatorConfig::default());
        let client = MockReplicaClient::new();
        core.add_replica(handle(1, client.clone()).await).await;

        core.close().await.unwrap();

        assert_eq!(client.close_call_count().await, 1);
        assert!(core.registry.is_empty());
        assert!(core.is_closed());
    }
}
