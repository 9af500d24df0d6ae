// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Minimal, standalone-runnable stand-ins for the collaborators §1 places
//! out of scope: the segment-based index writer and the remote-storage
//! blob client. A real deployment substitutes its own implementations of
//! [`IndexWriterHandle`] and [`RemoteUploadSink`] here.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use nrt_coordinator::IndexWriterHandle;
use nrt_types::{CopyState, FileMetadataMap};
use nrt_upload::{RemoteUploadSink, UploadError};

/// An [`IndexWriterHandle`] that never produces any files of its own. It
/// reports no changes on every refresh, so the daemon starts up and runs
/// its ticker loop without a real writer attached.
#[derive(Debug, Default)]
pub struct NullIndexWriter {
    ram_buffer_mb: std::sync::Mutex<f64>,
    closed: AtomicBool,
}

#[async_trait]
impl IndexWriterHandle for NullIndexWriter {
    async fn flush_and_refresh(&self) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn current_files(&self) -> FileMetadataMap {
        FileMetadataMap::new()
    }

    fn set_ram_buffer_size_mb(&self, mb: f64) {
        *self.ram_buffer_mb.lock().unwrap() = mb;
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// A [`RemoteUploadSink`] that writes each copy state as a JSON file under
/// a local directory, keyed by version. Stands in for a real object-store
/// client.
#[derive(Debug)]
pub struct LocalDirectoryUploadSink {
    dir: PathBuf,
    uploads: AtomicU64,
}

impl LocalDirectoryUploadSink {
    pub fn new(dir: PathBuf) -> Self {
        LocalDirectoryUploadSink {
            dir,
            uploads: AtomicU64::new(0),
        }
    }

    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteUploadSink for LocalDirectoryUploadSink {
    async fn upload(&self, copy_state: &CopyState) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| UploadError::new(err.to_string()))?;
        let path = self.dir.join(format!("version-{:020}.json", copy_state.version));
        let body = serde_json::to_vec_pretty(copy_state)
            .map_err(|err| UploadError::new(err.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|err| UploadError::new(err.to_string()))?;
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn upload_writes_a_json_file_per_version() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LocalDirectoryUploadSink::new(dir.path().to_path_buf());
        let copy_state = CopyState::new(7, 1, BTreeMap::new());
        sink.upload(&copy_state).await.unwrap();
        assert_eq!(sink.upload_count(), 1);
        let expected = dir.path().join(format!("version-{:020}.json", 7));
        assert!(expected.exists());
    }
}
