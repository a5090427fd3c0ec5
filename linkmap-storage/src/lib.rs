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


//! Row-key distribution and fan-out scanning for linkmap
//!
//! - `hash` / `distributor`: one-byte hash prefixes that spread sequential
//!   row keys over buckets, and the inverse mapping for reads
//! - `registry`: per-table distributor configuration
//! - `store`: the wide-column store seam plus an in-memory implementation
//! - `scanner`: concurrent per-bucket scans joined into one result
//! - `statistics`: caller-statistics row layout and writer

pub mod distributor;
pub mod hash;
pub mod merge;
pub mod registry;
pub mod scanner;
pub mod statistics;
pub mod store;

pub use distributor::{BucketScan, RowKeyDistributor};
pub use hash::{hasher_from_spec, OneByteSimpleHash, PrefixHasher, RangeOneByteSimpleHash, MAX_BUCKETS};
pub use merge::KWayMerge;
pub use registry::{default_specs, DistributorRegistry};
pub use scanner::{DistributedScanner, DEFAULT_MAX_CONCURRENT_SCANS};
pub use statistics::{
    raw_slot, CalleeColumn, CallerRowKey, StatisticsWriter, CALLER_ENTITY_LEN, CALLER_ROW_KEY_LEN,
    RAW_SLOT_MS,
};
pub use store::{Cells, MemoryStore, Row, WideColumnStore};
