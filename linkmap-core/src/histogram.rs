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

//! Response-time histograms
//!
//! Calls are not stored with their raw duration. Each call is classified into
//! one of five response-time slots and only the per-slot counts are kept:
//!
//! ```text
//!            FAST schema     NORMAL schema
//! Fast       <= 100ms        <= 1000ms
//! Normal     <= 300ms        <= 3000ms
//! Slow       <= 500ms        <= 5000ms
//! VerySlow   >  500ms        >  5000ms
//! Error      failed call     failed call
//! ```
//!
//! The persisted code of a slot is its upper bound in milliseconds, with
//! `0` for very slow calls and `-1` for errors.

use crate::error::{Error, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;

/// Number of response-time slots
pub const SLOT_COUNT: usize = 5;

/// Response-time classification of a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseTimeSlot {
    Fast,
    Normal,
    Slow,
    VerySlow,
    Error,
}

impl ResponseTimeSlot {
    /// All slots in histogram order
    pub const ALL: [ResponseTimeSlot; SLOT_COUNT] = [
        ResponseTimeSlot::Fast,
        ResponseTimeSlot::Normal,
        ResponseTimeSlot::Slow,
        ResponseTimeSlot::VerySlow,
        ResponseTimeSlot::Error,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ResponseTimeSlot::Fast => "fast",
            ResponseTimeSlot::Normal => "normal",
            ResponseTimeSlot::Slow => "slow",
            ResponseTimeSlot::VerySlow => "very_slow",
            ResponseTimeSlot::Error => "error",
        }
    }
}

impl fmt::Display for ResponseTimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Slot boundaries used to classify elapsed times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistogramSchema {
    name: &'static str,
    fast_ms: i16,
    normal_ms: i16,
    slow_ms: i16,
}

impl HistogramSchema {
    /// Code stored for calls slower than the slow bound
    pub const VERY_SLOW_CODE: i16 = 0;
    /// Code stored for failed calls
    pub const ERROR_CODE: i16 = -1;

    /// Schema for fast backends (caches, key-value stores)
    pub const FAST: HistogramSchema = HistogramSchema {
        name: "fast",
        fast_ms: 100,
        normal_ms: 300,
        slow_ms: 500,
    };

    /// Default schema
    pub const NORMAL: HistogramSchema = HistogramSchema {
        name: "normal",
        fast_ms: 1000,
        normal_ms: 3000,
        slow_ms: 5000,
    };

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Persisted code of a slot
    pub fn code(&self, slot: ResponseTimeSlot) -> i16 {
        match slot {
            ResponseTimeSlot::Fast => self.fast_ms,
            ResponseTimeSlot::Normal => self.normal_ms,
            ResponseTimeSlot::Slow => self.slow_ms,
            ResponseTimeSlot::VerySlow => Self::VERY_SLOW_CODE,
            ResponseTimeSlot::Error => Self::ERROR_CODE,
        }
    }

    /// Slot of a persisted code. Positive codes are upper bounds: a code
    /// lands in the first slot whose bound is at least the code, and codes
    /// above the slow bound are rejected.
    pub fn slot_for_code(&self, code: i16) -> Result<ResponseTimeSlot> {
        match code {
            Self::VERY_SLOW_CODE => Ok(ResponseTimeSlot::VerySlow),
            Self::ERROR_CODE => Ok(ResponseTimeSlot::Error),
            c if c < 0 => Err(Error::UnknownHistogramSlot(code)),
            c if c <= self.fast_ms => Ok(ResponseTimeSlot::Fast),
            c if c <= self.normal_ms => Ok(ResponseTimeSlot::Normal),
            c if c <= self.slow_ms => Ok(ResponseTimeSlot::Slow),
            _ => Err(Error::UnknownHistogramSlot(code)),
        }
    }

    /// Classify a call by its elapsed time
    pub fn slot_for_elapsed(&self, elapsed_ms: i32, is_error: bool) -> ResponseTimeSlot {
        if is_error {
            return ResponseTimeSlot::Error;
        }
        if elapsed_ms <= i32::from(self.fast_ms) {
            ResponseTimeSlot::Fast
        } else if elapsed_ms <= i32::from(self.normal_ms) {
            ResponseTimeSlot::Normal
        } else if elapsed_ms <= i32::from(self.slow_ms) {
            ResponseTimeSlot::Slow
        } else {
            ResponseTimeSlot::VerySlow
        }
    }
}

/// Call counts per response-time slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Histogram {
    counts: [u64; SLOT_COUNT],
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, slot: ResponseTimeSlot, count: u64) {
        let entry = &mut self.counts[slot.index()];
        *entry = entry.saturating_add(count);
    }

    #[inline]
    pub fn get(&self, slot: ResponseTimeSlot) -> u64 {
        self.counts[slot.index()]
    }

    /// Add every slot of `other` into this histogram
    pub fn merge(&mut self, other: &Histogram) {
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts.iter()) {
            *mine = mine.saturating_add(*theirs);
        }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Total excluding failed calls
    pub fn success_count(&self) -> u64 {
        self.total() - self.get(ResponseTimeSlot::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|c| *c == 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResponseTimeSlot, u64)> + '_ {
        ResponseTimeSlot::ALL
            .into_iter()
            .map(move |slot| (slot, self.get(slot)))
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SLOT_COUNT))?;
        for (slot, count) in self.iter() {
            map.serialize_entry(slot.name(), &count)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_for_elapsed_normal_schema() {
        let schema = HistogramSchema::NORMAL;
        assert_eq!(schema.slot_for_elapsed(0, false), ResponseTimeSlot::Fast);
        assert_eq!(schema.slot_for_elapsed(1000, false), ResponseTimeSlot::Fast);
        assert_eq!(schema.slot_for_elapsed(1001, false), ResponseTimeSlot::Normal);
        assert_eq!(schema.slot_for_elapsed(5000, false), ResponseTimeSlot::Slow);
        assert_eq!(schema.slot_for_elapsed(5001, false), ResponseTimeSlot::VerySlow);
        assert_eq!(schema.slot_for_elapsed(10, true), ResponseTimeSlot::Error);
    }

    #[test]
    fn test_code_roundtrip_all_slots() {
        for schema in [HistogramSchema::FAST, HistogramSchema::NORMAL] {
            for slot in ResponseTimeSlot::ALL {
                assert_eq!(schema.slot_for_code(schema.code(slot)).unwrap(), slot);
            }
        }
    }

    #[test]
    fn test_code_is_an_upper_bound() {
        let schema = HistogramSchema::NORMAL;
        assert_eq!(schema.slot_for_code(100).unwrap(), ResponseTimeSlot::Fast);
        assert_eq!(schema.slot_for_code(1000).unwrap(), ResponseTimeSlot::Fast);
        assert_eq!(schema.slot_for_code(1001).unwrap(), ResponseTimeSlot::Normal);
        assert_eq!(schema.slot_for_code(4000).unwrap(), ResponseTimeSlot::Slow);

        let fast = HistogramSchema::FAST;
        assert_eq!(fast.slot_for_code(1).unwrap(), ResponseTimeSlot::Fast);
        assert_eq!(fast.slot_for_code(250).unwrap(), ResponseTimeSlot::Normal);
        assert_eq!(fast.slot_for_code(500).unwrap(), ResponseTimeSlot::Slow);
    }

    #[test]
    fn test_code_above_slow_bound_rejected() {
        let err = HistogramSchema::FAST.slot_for_code(1000).unwrap_err();
        assert!(matches!(err, Error::UnknownHistogramSlot(1000)));
        assert!(matches!(
            HistogramSchema::NORMAL.slot_for_code(5001),
            Err(Error::UnknownHistogramSlot(5001))
        ));
        assert!(matches!(
            HistogramSchema::NORMAL.slot_for_code(-2),
            Err(Error::UnknownHistogramSlot(-2))
        ));
    }

    #[test]
    fn test_histogram_merge_and_total() {
        let mut a = Histogram::new();
        a.add(ResponseTimeSlot::Fast, 3);
        a.add(ResponseTimeSlot::Error, 1);

        let mut b = Histogram::new();
        b.add(ResponseTimeSlot::Fast, 2);
        b.add(ResponseTimeSlot::Slow, 4);

        a.merge(&b);
        assert_eq!(a.get(ResponseTimeSlot::Fast), 5);
        assert_eq!(a.get(ResponseTimeSlot::Slow), 4);
        assert_eq!(a.total(), 10);
        assert_eq!(a.success_count(), 9);
    }

    #[test]
    fn test_histogram_serializes_slot_names() {
        let mut h = Histogram::new();
        h.add(ResponseTimeSlot::VerySlow, 7);
        let json = serde_json::to_value(h).unwrap();
        assert_eq!(json["very_slow"], 7);
        assert_eq!(json["fast"], 0);
    }
}
