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

//! Linkmap Core
//!
//! Shared vocabulary of the application-map pipeline: edges ([`LinkKey`]),
//! service types, response-time histograms, time windows and configuration.

pub mod config;
pub mod error;
pub mod histogram;
pub mod link_key;
pub mod service_type;
pub mod time;

pub use config::{DistributorSpec, HashMode, LinkmapConfig, LoggingConfig, QueryConfig};
pub use error::{Error, Result};
pub use histogram::{Histogram, HistogramSchema, ResponseTimeSlot, SLOT_COUNT};
pub use link_key::{Application, LinkKey};
pub use service_type::ServiceType;
pub use time::{
    DownSampler, FixedSampler, Range, SlotCountSampler, TimeWindow, TimeWindowSampler,
};
