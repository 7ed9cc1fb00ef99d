//! Engine configuration.
//!
//! Reads from environment variables when built with [`EngineConfig::from_env`]:
//! - `ASSETGRAPH_PRUNE_POLICY`: `best-effort` (default) or `fail-fast`
//! - `ASSETGRAPH_REBUILD_TIMEOUT_SECS`: overall bound on a rebuild pass

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable selecting the [`PrunePolicy`].
pub const PRUNE_POLICY_ENV: &str = "ASSETGRAPH_PRUNE_POLICY";

/// Environment variable bounding each rebuild pass, in seconds.
pub const REBUILD_TIMEOUT_ENV: &str = "ASSETGRAPH_REBUILD_TIMEOUT_SECS";

/// Errors from parsing configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// What to do when deleting a stale file fails during directory pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrunePolicy {
    /// Log a warning and keep pruning.
    #[default]
    BestEffort,
    /// Abort the write on the first failure.
    FailFast,
}

impl FromStr for PrunePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best-effort" => Ok(PrunePolicy::BestEffort),
            "fail-fast" => Ok(PrunePolicy::FailFast),
            other => Err(format!(
                "unknown prune policy {other:?} (expected best-effort or fail-fast)"
            )),
        }
    }
}

impl fmt::Display for PrunePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrunePolicy::BestEffort => "best-effort",
            PrunePolicy::FailFast => "fail-fast",
        })
    }
}

/// Tunables for an [`AssetStore`](crate::store::AssetStore).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub prune_policy: PrunePolicy,
    /// Applied as a deadline on the context of every rebuild pass.
    pub rebuild_timeout: Option<Duration>,
}

impl EngineConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(value) = lookup(PRUNE_POLICY_ENV) {
            config.prune_policy = value.parse().map_err(|reason| ConfigError::InvalidValue {
                key: PRUNE_POLICY_ENV,
                value: value.clone(),
                reason,
            })?;
        }

        if let Some(value) = lookup(REBUILD_TIMEOUT_ENV) {
            let secs: u64 = value.parse().map_err(|err: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: REBUILD_TIMEOUT_ENV,
                    value: value.clone(),
                    reason: err.to_string(),
                }
            })?;
            config.rebuild_timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }
}
