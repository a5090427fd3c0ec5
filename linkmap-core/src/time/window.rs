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

//! Time windows
//!
//! A window discretises a range into slots of `window_size` milliseconds.
//! Slot boundaries are multiples of the size counted from epoch 0, so two
//! windows with the same size always agree on where slots start, whatever
//! their ranges are. Partial results can only be merged because of this.

use super::range::Range;
use super::sampler::TimeWindowSampler;
use crate::error::{Error, Result};
use std::iter::FusedIterator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    original_range: Range,
    window_range: Range,
    window_size: i64,
}

impl TimeWindow {
    pub fn new<S: TimeWindowSampler + ?Sized>(range: Range, sampler: &S) -> Self {
        let window_size = sampler.window_size(&range).max(1);
        Self::build(range, window_size)
    }

    pub fn with_slot_size(range: Range, window_size: i64) -> Result<Self> {
        if window_size <= 0 {
            return Err(Error::Config(format!(
                "window size must be positive, got {window_size}"
            )));
        }
        Ok(Self::build(range, window_size))
    }

    fn build(range: Range, window_size: i64) -> Self {
        let from = align(range.from(), window_size);
        let to = align(range.to(), window_size);
        Self {
            original_range: range,
            // from >= 0 and from <= to hold after aligning a valid range
            window_range: Range::between(from, to).unwrap_or(range),
            window_size,
        }
    }

    pub fn window_size(&self) -> i64 {
        self.window_size
    }

    pub fn original_range(&self) -> Range {
        self.original_range
    }

    /// Range from the first slot start to the last slot start
    pub fn window_range(&self) -> Range {
        self.window_range
    }

    /// Start of the slot containing `timestamp`
    #[inline]
    pub fn refine_timestamp(&self, timestamp: i64) -> i64 {
        align(timestamp, self.window_size)
    }

    /// Position of the slot containing `timestamp`, relative to the first slot
    pub fn window_index(&self, timestamp: i64) -> i64 {
        (self.refine_timestamp(timestamp) - self.window_range.from()) / self.window_size
    }

    pub fn slot_count(&self) -> usize {
        ((self.window_range.to() - self.window_range.from()) / self.window_size) as usize + 1
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.window_range.contains(self.refine_timestamp(timestamp))
    }

    /// Slot starts in ascending order. Each call starts over.
    pub fn slots(&self) -> Slots {
        Slots {
            next: self.window_range.from(),
            last: self.window_range.to(),
            step: self.window_size,
            done: false,
        }
    }
}

impl<'a> IntoIterator for &'a TimeWindow {
    type Item = i64;
    type IntoIter = Slots;

    fn into_iter(self) -> Slots {
        self.slots()
    }
}

#[inline]
fn align(timestamp: i64, size: i64) -> i64 {
    timestamp.saturating_sub(timestamp.rem_euclid(size))
}

/// Iterator over the slot starts of a window
#[derive(Debug, Clone)]
pub struct Slots {
    next: i64,
    last: i64,
    step: i64,
    done: bool,
}

impl Iterator for Slots {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        if self.done || self.next > self.last {
            return None;
        }
        let current = self.next;
        match current.checked_add(self.step) {
            Some(n) => self.next = n,
            None => self.done = true,
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done || self.next > self.last {
            return (0, Some(0));
        }
        let remaining = ((self.last - self.next) / self.step) as usize + 1;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots {}
impl FusedIterator for Slots {}
