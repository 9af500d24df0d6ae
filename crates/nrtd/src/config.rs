// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Daemon-level configuration: a TOML file, overridable by CLI flags,
//! mirroring `materialized`'s `clap`-based argument parsing layered over a
//! config struct.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use nrt_coordinator::CoordinatorConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub index_name: String,
    pub index_id: Uuid,
    pub primary_gen: u64,
    pub metrics_addr: SocketAddr,
    pub upload_dir: PathBuf,
    #[serde(flatten)]
    pub coordinator: CoordinatorConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        DaemonConfig {
            index_name: "default".into(),
            index_id: Uuid::nil(),
            primary_gen: 1,
            metrics_addr: "0.0.0.0:9090".parse().unwrap(),
            upload_dir: PathBuf::from("/var/lib/nrtd/uploads"),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl DaemonConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|err| anyhow::anyhow!("reading config file {}: {err}", path.display()))?;
        toml::from_str(&contents)
            .map_err(|err| anyhow::anyhow!("parsing config file {}: {err}", path.display()))
    }
}

/// CLI overrides, applied on top of whatever `--config` loaded (or the
/// default, if `--config` was not given).
#[derive(Parser, Debug)]
#[command(name = "nrtd", about = "Primary-node NRT replication coordinator")]
pub struct Args {
    /// Path to a TOML config file. If omitted, built-in defaults are used.
    #[arg(long, env = "NRTD_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "NRTD_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    #[arg(long, env = "NRTD_REFRESH_INTERVAL_MS")]
    pub refresh_interval_ms: Option<u64>,

    /// Which log messages to emit, in `tracing-subscriber`'s `EnvFilter`
    /// syntax.
    #[arg(long, env = "NRTD_LOG_FILTER", default_value = "info")]
    pub log_filter: String,
}

impl Args {
    pub fn resolve(&self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::load(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(addr) = self.metrics_addr {
            config.metrics_addr = addr;
        }
        if let Some(ms) = self.refresh_interval_ms {
            config.coordinator.refresh_interval_ms = ms;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_the_loaded_config() {
        let args = Args {
            config: None,
            metrics_addr: Some("127.0.0.1:1234".parse().unwrap()),
            refresh_interval_ms: Some(500),
            log_filter: "info".into(),
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.metrics_addr, "127.0.0.1:1234".parse().unwrap());
        assert_eq!(config.coordinator.refresh_interval_ms, 500);
    }

    #[test]
    fn loads_toml_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nrtd.toml");
        std::fs::write(
            &path,
            r#"
            index_name = "orders"
            primary_gen = 3
            max_merge_precopy_duration_secs = 30
            "#,
        )
        .unwrap();
        let config = DaemonConfig::load(&path).unwrap();
        assert_eq!(config.index_name, "orders");
        assert_eq!(config.primary_gen, 3);
        assert_eq!(config.coordinator.max_merge_precopy_duration_secs, 30);
    }
}
