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

//! Linkmap error types

use crate::link_key::LinkKey;
use thiserror::Error;

/// Result type for linkmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the distribution, storage and aggregation layers
#[derive(Debug, Error)]
pub enum Error {
    // Distribution errors
    /// Hash byte range does not fit the key (or is empty)
    #[error("Invalid hash range [{start}, {end}) for key of length {key_len:?}")]
    InvalidRange {
        start: usize,
        end: usize,
        key_len: Option<usize>,
    },

    #[error("Malformed distributed key: {0}")]
    MalformedKey(String),

    #[error("Bucket count {0} out of range (1..=256)")]
    InvalidBucketCount(u32),

    #[error("No distributor configured for table: {0}")]
    UnknownTable(String),

    // Aggregation errors
    #[error("Invalid call count: {0}")]
    InvalidCount(i64),

    #[error("Link key mismatch: expected {expected}, got {actual}")]
    LinkKeyMismatch {
        expected: Box<LinkKey>,
        actual: Box<LinkKey>,
    },

    #[error("Unknown histogram slot code: {0}")]
    UnknownHistogramSlot(i16),

    #[error("Invalid time range: from={from} to={to}")]
    InvalidTimeRange { from: i64, to: i64 },

    #[error("Invalid row key: {0}")]
    InvalidRowKey(String),

    // Scan errors
    #[error("Store error: {0}")]
    Store(String),

    /// One bucket of a fan-out scan failed; the aggregate would be an undercount
    #[error("Scan of bucket {bucket}/{total} on table {table} failed: {reason}")]
    PartialScanFailure {
        table: String,
        bucket: u8,
        total: usize,
        reason: String,
    },

    #[error("Query cancelled")]
    Cancelled,

    #[error("Scan task failed: {0}")]
    TaskFailed(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
