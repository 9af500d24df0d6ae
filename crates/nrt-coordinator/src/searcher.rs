// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §9 "polymorphic reference management": a ref-counted handle to the
//! index's current searcher snapshot.
//!
//! Query execution against a [`Searcher`] is out of scope (§1); the
//! coordinator only ever hands references out and tracks how many are live.
//! The original capability set — `acquire`, `tryIncRef`, `decRef`,
//! `refresh`, `getRefCount` — is manual bookkeeping that stands in for a
//! garbage collector. In Rust, `Arc`'s own strong count already *is* that
//! bookkeeping: acquiring a reference is `Arc::clone`, releasing one is
//! `Drop`, and `getRefCount` is `Arc::strong_count`.

use std::sync::{Arc, Mutex};

/// A read-only view of the index at a specific `(primaryGen, version)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Searcher {
    pub primary_gen: u64,
    pub version: u64,
}

pub type SearcherRef = Arc<Searcher>;

/// Holds the current searcher and hands out cloned `Arc` references to it.
#[derive(Debug, Default)]
pub struct SearcherManager {
    current: Mutex<Option<SearcherRef>>,
}

impl SearcherManager {
    pub fn new() -> Self {
        SearcherManager::default()
    }

    /// `acquire`: a cloned reference to the current searcher, if one has
    /// ever been published.
    pub fn acquire(&self) -> Option<SearcherRef> {
        self.current.lock().unwrap().clone()
    }

    /// `refresh`: publishes a new searcher, becoming the target of the next
    /// `acquire`. Does not affect references already handed out.
    pub fn publish(&self, searcher: SearcherRef) {
        *self.current.lock().unwrap() = Some(searcher);
    }

    /// `getRefCount`: how many live references exist to the current
    /// searcher, including the manager's own.
    pub fn ref_count(&self) -> usize {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map(Arc::strong_count)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_returns_the_most_recently_published_searcher() {
        let manager = SearcherManager::new();
        assert!(manager.acquire().is_none());

        manager.publish(Arc::new(Searcher {
            primary_gen: 1,
            version: 1,
        }));
        let first = manager.acquire().unwrap();
        assert_eq!(first.version, 1);

        manager.publish(Arc::new(Searcher {
            primary_gen: 1,
            version: 2,
        }));
        assert_eq!(manager.acquire().unwrap().version, 2);
        // The earlier reference is untouched by the republish.
        assert_eq!(first.version, 1);
    }

    #[test]
    fn ref_count_tracks_outstanding_clones() {
        let manager = SearcherManager::new();
        manager.publish(Arc::new(Searcher {
            primary_gen: 1,
            version: 1,
        }));
        assert_eq!(manager.ref_count(), 1);
        let held = manager.acquire().unwrap();
        assert_eq!(manager.ref_count(), 2);
        drop(held);
        assert_eq!(manager.ref_count(), 1);
    }
}
