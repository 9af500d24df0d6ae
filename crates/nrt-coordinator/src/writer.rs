// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The underlying segment-based index writer: explicitly out of scope (§1),
//! consumed here only through the narrow interface [`IndexWriterHandle`].

use std::fmt::Debug;

use async_trait::async_trait;

use nrt_types::FileMetadataMap;

/// What [`crate::primary_core::PrimaryCore`] needs from the index writer: a
/// way to flush and refresh, read back the live file set, adjust RAM
/// buffering, and close. Everything else about indexing is out of scope.
#[async_trait]
pub trait IndexWriterHandle: Debug + Send + Sync {
    /// Flushes buffered writes and opens a new reader if anything changed.
    /// Returns `true` iff a new snapshot became visible.
    async fn flush_and_refresh(&self) -> anyhow::Result<bool>;

    /// The live-file descriptors for the most recently opened snapshot.
    fn current_files(&self) -> FileMetadataMap;

    /// Passthrough for `setRAMBufferSizeMB` (§6).
    fn set_ram_buffer_size_mb(&self, mb: f64);

    async fn close(&self) -> anyhow::Result<()>;
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use std::sync::Mutex;

    /// An in-memory [`IndexWriterHandle`] double: `flush_and_refresh`
    /// reports whatever was last configured with `set_next_refresh`, and
    /// `current_files` returns whatever was last set with `set_files`.
    #[derive(Debug, Default)]
    pub struct InMemoryIndexWriter {
        next_changed: AtomicBool,
        files: Mutex<FileMetadataMap>,
        ram_buffer_mb: Mutex<f64>,
        flush_calls: AtomicU64,
        closed: AtomicBool,
        fail_next_flush: AtomicBool,
    }

    impl InMemoryIndexWriter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_next_refresh(&self, changed: bool) {
            self.next_changed.store(changed, Ordering::SeqCst);
        }

        pub fn set_files(&self, files: FileMetadataMap) {
            *self.files.lock().unwrap() = files;
        }

        pub fn fail_next_flush(&self) {
            self.fail_next_flush.store(true, Ordering::SeqCst);
        }

        pub fn flush_call_count(&self) -> u64 {
            self.flush_calls.load(Ordering::SeqCst)
        }

        pub fn ram_buffer_size_mb(&self) -> f64 {
            *self.ram_buffer_mb.lock().unwrap()
        }

        pub fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl IndexWriterHandle for InMemoryIndexWriter {
        async fn flush_and_refresh(&self) -> anyhow::Result<bool> {
            self.flush_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_next_flush.swap(false, Ordering::SeqCst) {
                anyhow::bail!("simulated flush failure");
            }
            Ok(self.next_changed.load(Ordering::SeqCst))
        }

        fn current_files(&self) -> FileMetadataMap {
            self.files.lock().unwrap().clone()
        }

        fn set_ram_buffer_size_mb(&self, mb: f64) {
            *self.ram_buffer_mb.lock().unwrap() = mb;
        }

        async fn close(&self) -> anyhow::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }
}
