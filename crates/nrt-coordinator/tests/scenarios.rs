// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! End-to-end scenarios against mock replicas and a mock upload queue (§8
//! S1-S6).

use std::sync::Arc;
use std::time::{Duration, Instant};

use nrt_client::mock::{MockReplicaClient, ScriptedStatus};
use nrt_client::{ReplicaRpcClient, ReplicaRpcError};
use nrt_coordinator::writer::testing::InMemoryIndexWriter;
use nrt_coordinator::{CoordinatorConfig, CoordinatorMetrics, PrimaryCore, RefreshDriver, ReplicaHandle, ReplicaRegistry};
use nrt_types::{FileMetadata, FileMetadataMap, HostPort, IndexIdentity, ReplicaId, TransferStatus};
use nrt_upload::mock::MockUploadQueue;

fn identity() -> IndexIdentity {
    IndexIdentity {
        index_name: "idx".into(),
        index_id: uuid::Uuid::nil(),
        primary_gen: 1,
    }
}

fn handle(id: u64, host: &str, port: u16, client: MockReplicaClient) -> ReplicaHandle {
    ReplicaHandle {
        replica_id: ReplicaId(id),
        host_port: HostPort::new(host, port),
        client: Arc::new(client),
    }
}

struct Fixture {
    primary: Arc<PrimaryCore>,
    driver: RefreshDriver,
    writer: Arc<InMemoryIndexWriter>,
    upload_queue: Arc<MockUploadQueue>,
}

fn fixture(config: CoordinatorConfig) -> Fixture {
    let writer = Arc::new(InMemoryIndexWriter::new());
    let registry = Arc::new(ReplicaRegistry::new());
    let upload_queue = Arc::new(MockUploadQueue::new());
    let metrics = Arc::new(CoordinatorMetrics::new());
    let primary = Arc::new(PrimaryCore::new(
        identity(),
        writer.clone(),
        registry,
        upload_queue.clone(),
        config,
        Arc::clone(&metrics),
    ));
    let driver = RefreshDriver::new(Arc::clone(&primary), upload_queue.clone(), metrics);
    Fixture {
        primary,
        driver,
        writer,
        upload_queue,
    }
}

#[tokio::test]
async fn s1_two_replicas_one_refresh() {
    let fx = fixture(CoordinatorConfig::default());
    let r1_client = MockReplicaClient::new();
    let r2_client = MockReplicaClient::new();
    fx.primary
        .add_replica(handle(1, "a", 7000, r1_client.clone()))
        .await;
    fx.primary
        .add_replica(handle(2, "b", 7000, r2_client.clone()))
        .await;

    fx.writer.set_next_refresh(true);
    let searcher = fx.driver.refresh_if_needed().await.unwrap();
    assert!(searcher.is_some());
    assert_eq!(searcher.unwrap().version, 1);

    assert_eq!(r1_client.versions_received().await, vec![1]);
    assert_eq!(r2_client.versions_received().await, vec![1]);
    assert_eq!(r1_client.new_nrt_point_call_count().await, 1);
    assert_eq!(r2_client.new_nrt_point_call_count().await, 1);
}

#[tokio::test]
async fn s2_merge_with_slow_replica() {
    let fx = fixture(CoordinatorConfig::default());
    let fast = MockReplicaClient::new();
    let slow = MockReplicaClient::new();
    slow.set_copy_script(vec![
        ScriptedStatus::new(Duration::from_millis(50), TransferStatus::ongoing("1")),
        ScriptedStatus::new(Duration::from_millis(50), TransferStatus::ongoing("2")),
        ScriptedStatus::new(Duration::from_millis(50), TransferStatus::ongoing("3")),
    ])
    .await;
    fx.primary.add_replica(handle(1, "a", 7000, fast)).await;
    fx.primary.add_replica(handle(2, "b", 7000, slow)).await;

    let mut files = FileMetadataMap::new();
    files.insert("_0.cfs".into(), FileMetadata::new("_0.cfs", 1, 1));

    let start = Instant::now();
    fx.primary.pre_copy_merged_segment_files(files).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(140), "elapsed was {elapsed:?}");
    assert!(elapsed < Duration::from_millis(500), "elapsed was {elapsed:?}");
}

#[tokio::test]
async fn s3_merge_deadline() {
    let mut config = CoordinatorConfig::default();
    config.max_merge_precopy_duration_secs = 1;
    let fx = fixture(config);

    let r1 = MockReplicaClient::new();
    r1.set_copy_script(vec![ScriptedStatus::new(
        Duration::from_millis(200),
        TransferStatus::ongoing("done soon"),
    )])
    .await;
    let r2 = MockReplicaClient::new();
    r2.set_copy_script_never_finishes().await;

    fx.primary.add_replica(handle(1, "a", 7000, r1)).await;
    fx.primary.add_replica(handle(2, "b", 7000, r2)).await;

    let mut files = FileMetadataMap::new();
    files.insert("_0.cfs".into(), FileMetadata::new("_0.cfs", 1, 1));

    let start = Instant::now();
    fx.primary.pre_copy_merged_segment_files(files).await;
    let elapsed = start.elapsed();
    assert!(elapsed < Duration::from_millis(1_200), "elapsed was {elapsed:?}");
}

#[tokio::test]
async fn s4_late_join() {
    let fx = Arc::new(fixture(CoordinatorConfig::default()));
    let r1 = MockReplicaClient::new();
    r1.set_copy_script(vec![ScriptedStatus::new(
        Duration::from_millis(300),
        TransferStatus::ongoing("slow"),
    )])
    .await;
    fx.primary.add_replica(handle(1, "a", 7000, r1)).await;

    let mut files = FileMetadataMap::new();
    files.insert("_0.cfs".into(), FileMetadata::new("_0.cfs", 1, 1));

    let fx_for_precopy = Arc::clone(&fx);
    let task = tokio::spawn(async move {
        fx_for_precopy
            .primary
            .pre_copy_merged_segment_files(files)
            .await
    });

    tokio::time::sleep(Duration::from_millis(80)).await;
    let r2 = MockReplicaClient::new();
    fx.primary.add_replica(handle(2, "b", 7000, r2.clone())).await;

    task.await.unwrap();
    assert_eq!(r2.copy_files_calls().await.len(), 1);
}

#[tokio::test]
async fn s5_lost_replica_during_broadcast() {
    let fx = fixture(CoordinatorConfig::default());
    fx.writer.set_next_refresh(true);
    let r1 = MockReplicaClient::new();
    let r2 = MockReplicaClient::new();
    r2.queue_new_nrt_point_error(ReplicaRpcError::Unavailable("down".into()))
        .await;
    fx.primary.add_replica(handle(1, "a", 7000, r1)).await;
    fx.primary.add_replica(handle(2, "b", 7000, r2.clone())).await;

    fx.driver.refresh_if_needed().await.unwrap();

    let remaining = fx.primary.registry().snapshot();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].replica_id, ReplicaId(1));
    assert_eq!(r2.close_call_count().await, 1);
}

#[tokio::test]
async fn s6_durable_upload_on_no_op_refresh() {
    let fx = fixture(CoordinatorConfig::default());
    fx.writer.set_next_refresh(false);

    let future = fx.driver.next_refresh_durable().await;
    let searcher = fx.driver.refresh_if_needed().await.unwrap();
    assert!(searcher.is_none());

    assert_eq!(fx.upload_queue.enqueue_count(), 1);
    assert!(future.await.is_ok());
}

