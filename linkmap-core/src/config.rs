// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for linkmap
//!
//! Loaded once at start-up from a TOML file, then overridden by environment
//! variables. Every section has defaults, so an empty file is valid:
//!
//! ```toml
//! [logging]
//! level = "debug"
//! json = false
//!
//! [query]
//! target_slot_count = 200
//! minimum_slot_ms = 60000
//! max_concurrent_scans = 16
//!
//! [[distributors]]
//! table = "ApplicationTraceIndex"
//! mode = "whole_key"
//! max_buckets = 64
//! ```

use crate::error::{Error, Result};
use crate::time::{SlotCountSampler, ONE_MINUTE};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkmapConfig {
    pub logging: LoggingConfig,
    pub query: QueryConfig,
    /// Overrides and additions to the built-in distributor table
    pub distributors: Vec<DistributorSpec>,
}

impl LinkmapConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: LinkmapConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::from_toml_str(&source)?;
        config.apply_env();
        config.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "loaded configuration");
        Ok(config)
    }

    /// Defaults with environment overrides
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `LINKMAP_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|name| env::var(name).ok());
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    /// Unparsable values are logged and leave the current setting alone.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup("LINKMAP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LINKMAP_LOG_JSON") {
            self.logging.json = json == "true" || json == "1";
        }
        if let Some(raw) = lookup("LINKMAP_TARGET_SLOT_COUNT") {
            match raw.parse::<u32>() {
                Ok(target) => self.query.target_slot_count = target,
                Err(err) => tracing::warn!(
                    value = %raw,
                    error = %err,
                    "ignoring LINKMAP_TARGET_SLOT_COUNT"
                ),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.minimum_slot_ms <= 0 {
            return Err(Error::Config(format!(
                "query.minimum_slot_ms must be positive, got {}",
                self.query.minimum_slot_ms
            )));
        }
        if self.query.max_concurrent_scans == 0 {
            return Err(Error::Config(
                "query.max_concurrent_scans must be at least 1".to_string(),
            ));
        }
        for spec in &self.distributors {
            spec.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Slot budget used when a caller does not ask for one
    pub target_slot_count: u32,
    /// Raw write granularity; windows are never finer than this
    pub minimum_slot_ms: i64,
    /// Upper bound on concurrent bucket scans per query
    pub max_concurrent_scans: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            target_slot_count: SlotCountSampler::DEFAULT_TARGET_SLOT_COUNT,
            minimum_slot_ms: ONE_MINUTE,
            max_concurrent_scans: 16,
        }
    }
}

/// How the distribution byte is derived from a row key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashMode {
    /// Hash every byte of the key
    WholeKey,
    /// Hash only `key[start..end)`
    Range,
}

/// Distributor settings of one logical table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorSpec {
    pub table: String,
    pub mode: HashMode,
    #[serde(default)]
    pub start: Option<usize>,
    #[serde(default)]
    pub end: Option<usize>,
    pub max_buckets: u32,
}

impl DistributorSpec {
    pub fn whole_key(table: impl Into<String>, max_buckets: u32) -> Self {
        Self {
            table: table.into(),
            mode: HashMode::WholeKey,
            start: None,
            end: None,
            max_buckets,
        }
    }

    pub fn range(table: impl Into<String>, start: usize, end: usize, max_buckets: u32) -> Self {
        Self {
            table: table.into(),
            mode: HashMode::Range,
            start: Some(start),
            end: Some(end),
            max_buckets,
        }
    }

    /// Checks bucket count and, for range mode, `start < end`
    pub fn validate(&self) -> Result<()> {
        if self.max_buckets == 0 || self.max_buckets > 256 {
            return Err(Error::InvalidBucketCount(self.max_buckets));
        }
        if self.mode == HashMode::Range {
            match (self.start, self.end) {
                (Some(start), Some(end)) if start < end => {}
                (start, end) => {
                    return Err(Error::InvalidRange {
                        start: start.unwrap_or(0),
                        end: end.unwrap_or(0),
                        key_len: None,
                    })
                }
            }
        }
        Ok(())
    }
}
