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

//! Window size selection
//!
//! A sampler decides how coarse the slots of a [`TimeWindow`](super::TimeWindow)
//! are for a requested range. Wider ranges get larger slots so that the number
//! of points returned to the caller stays bounded.

use super::range::Range;
use crate::error::{Error, Result};

pub const ONE_SECOND: i64 = 1_000;
pub const ONE_MINUTE: i64 = 60 * ONE_SECOND;
pub const ONE_HOUR: i64 = 60 * ONE_MINUTE;
pub const ONE_DAY: i64 = 24 * ONE_HOUR;

/// Slot sizes considered by [`SlotCountSampler`], ascending
pub const SLOT_SIZE_CANDIDATES: [i64; 10] = [
    5 * ONE_SECOND,
    20 * ONE_SECOND,
    ONE_MINUTE,
    5 * ONE_MINUTE,
    20 * ONE_MINUTE,
    ONE_HOUR,
    3 * ONE_HOUR,
    6 * ONE_HOUR,
    12 * ONE_HOUR,
    ONE_DAY,
];

pub trait TimeWindowSampler {
    /// Slot size in milliseconds, always positive
    fn window_size(&self, range: &Range) -> i64;
}

/// Number of `size`-wide slots needed to cover `width` milliseconds
#[inline]
pub fn slots_needed(width: i64, size: i64) -> i64 {
    width / size + i64::from(width % size != 0)
}

/// Picks the finest candidate that keeps the slot count within a budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCountSampler {
    target_slot_count: u32,
    minimum_slot_ms: i64,
}

impl SlotCountSampler {
    pub const DEFAULT_TARGET_SLOT_COUNT: u32 = 200;

    pub fn new(target_slot_count: u32) -> Self {
        Self {
            target_slot_count,
            minimum_slot_ms: SLOT_SIZE_CANDIDATES[0],
        }
    }

    /// Never return a slot finer than `minimum_slot_ms` (the raw write granularity)
    pub fn with_minimum_slot(mut self, minimum_slot_ms: i64) -> Self {
        self.minimum_slot_ms = minimum_slot_ms.max(1);
        self
    }

    pub fn target_slot_count(&self) -> u32 {
        self.target_slot_count
    }
}

impl Default for SlotCountSampler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TARGET_SLOT_COUNT)
    }
}

impl TimeWindowSampler for SlotCountSampler {
    fn window_size(&self, range: &Range) -> i64 {
        let width = range.duration_ms();
        let target = i64::from(self.target_slot_count);

        let mut coarsest = None;
        for size in SLOT_SIZE_CANDIDATES
            .into_iter()
            .filter(|size| *size >= self.minimum_slot_ms)
        {
            if slots_needed(width, size) <= target {
                return size;
            }
            coarsest = Some(size);
        }
        // Slot count may exceed the target here; tiny targets are not an error.
        coarsest.unwrap_or(self.minimum_slot_ms)
    }
}

/// Fixed table keyed by range width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownSampler;

impl TimeWindowSampler for DownSampler {
    fn window_size(&self, range: &Range) -> i64 {
        let width = range.duration_ms();
        if width <= ONE_HOUR {
            ONE_MINUTE
        } else if width <= 6 * ONE_HOUR {
            5 * ONE_MINUTE
        } else if width <= 12 * ONE_HOUR {
            10 * ONE_MINUTE
        } else if width <= ONE_DAY {
            20 * ONE_MINUTE
        } else if width <= 2 * ONE_DAY {
            30 * ONE_MINUTE
        } else {
            ONE_HOUR
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSampler {
    size_ms: i64,
}

impl FixedSampler {
    pub fn new(size_ms: i64) -> Result<Self> {
        if size_ms <= 0 {
            return Err(Error::Config(format!(
                "slot size must be positive, got {size_ms}"
            )));
        }
        Ok(Self { size_ms })
    }
}

impl TimeWindowSampler for FixedSampler {
    fn window_size(&self, _range: &Range) -> i64 {
        self.size_ms
    }
}
