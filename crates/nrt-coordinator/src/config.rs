// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! §6's "configuration read dynamically from the index's current settings",
//! plus the ambient daemon settings the distilled spec treats as externally
//! driven.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Coordinator-level configuration, reloadable independently of the
/// process: every field here can legitimately change between refresh
/// cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// §6: `maxMergePreCopyDurationSec`. Zero or negative means no deadline.
    pub max_merge_precopy_duration_secs: i64,

    /// How often the externally-driven refresh task should call
    /// `refreshIfNeeded` (§5).
    pub refresh_interval_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            max_merge_precopy_duration_secs: 60,
            refresh_interval_ms: 1_000,
        }
    }
}

impl CoordinatorConfig {
    /// `None` means "no deadline", matching §6's "0 or negative ⇒ no
    /// deadline".
    pub fn merge_precopy_duration(&self) -> Option<Duration> {
        if self.max_merge_precopy_duration_secs > 0 {
            Some(Duration::from_secs(self.max_merge_precopy_duration_secs as u64))
        } else {
            None
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_positive_duration_means_no_deadline() {
        let mut config = CoordinatorConfig::default();
        config.max_merge_precopy_duration_secs = 0;
        assert_eq!(config.merge_precopy_duration(), None);
        config.max_merge_precopy_duration_secs = -5;
        assert_eq!(config.merge_precopy_duration(), None);
    }

    #[test]
    fn positive_duration_is_honored() {
        let mut config = CoordinatorConfig::default();
        config.max_merge_precopy_duration_secs = 30;
        assert_eq!(config.merge_precopy_duration(), Some(Duration::from_secs(30)));
    }
}
