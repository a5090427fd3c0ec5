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


//! Linkmap Query
//!
//! Time-windowed aggregation of caller -> callee call statistics: the
//! per-edge accumulator, edge maps, partial-result merging and the query
//! service that drives fan-out scans over the distributed statistics table.

pub mod engine;
pub mod link_call_data;
pub mod link_data_map;
pub mod merge;

pub use engine::LinkQueryService;
pub use link_call_data::LinkCallData;
pub use link_data_map::LinkCallDataMap;
pub use merge::{downsample_all, merge_partial_maps, merge_partials};
