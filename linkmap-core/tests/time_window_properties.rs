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

//! Property tests for time windows and samplers

use linkmap_core::time::{ONE_DAY, SLOT_SIZE_CANDIDATES};
use linkmap_core::{Range, SlotCountSampler, TimeWindow, TimeWindowSampler};
use proptest::prelude::*;

const MAX_TS: i64 = 4_102_444_800_000; // 2100-01-01

fn window_for(from: i64, width: i64, target: u32) -> TimeWindow {
    let range = Range::between(from, from + width).unwrap();
    TimeWindow::new(range, &SlotCountSampler::new(target))
}

proptest! {
    #[test]
    fn refine_is_idempotent(ts in -MAX_TS..MAX_TS, size_idx in 0usize..SLOT_SIZE_CANDIDATES.len()) {
        let range = Range::between(0, 0).unwrap();
        let window = TimeWindow::with_slot_size(range, SLOT_SIZE_CANDIDATES[size_idx]).unwrap();
        let once = window.refine_timestamp(ts);
        prop_assert_eq!(window.refine_timestamp(once), once);
        prop_assert_eq!(once % window.window_size(), 0);
    }

    #[test]
    fn same_slot_means_same_interval(
        t1 in 0..MAX_TS,
        t2 in 0..MAX_TS,
        size_idx in 0usize..SLOT_SIZE_CANDIDATES.len(),
    ) {
        let size = SLOT_SIZE_CANDIDATES[size_idx];
        let window = TimeWindow::with_slot_size(Range::between(0, 0).unwrap(), size).unwrap();
        let s1 = window.refine_timestamp(t1);
        let s2 = window.refine_timestamp(t2);
        prop_assert!(s1 <= t1 && t1 < s1 + size);
        prop_assert!(s2 <= t2 && t2 < s2 + size);
        if s1 == s2 {
            prop_assert!((t1 - t2).abs() < size);
        }
    }

    #[test]
    fn refine_is_monotonic(a in 0..MAX_TS, b in 0..MAX_TS) {
        let window = window_for(0, ONE_DAY, 100);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(window.refine_timestamp(lo) <= window.refine_timestamp(hi));
    }

    #[test]
    fn window_size_non_decreasing_in_width(
        from in 0..MAX_TS / 2,
        w1 in 0..30 * ONE_DAY,
        w2 in 0..30 * ONE_DAY,
        target in 0u32..500,
    ) {
        let sampler = SlotCountSampler::new(target);
        let (narrow, wide) = if w1 <= w2 { (w1, w2) } else { (w2, w1) };
        let narrow = Range::between(from, from + narrow).unwrap();
        let wide = Range::between(from, from + wide).unwrap();
        prop_assert!(sampler.window_size(&narrow) <= sampler.window_size(&wide));
    }

    #[test]
    fn slots_are_aligned_and_cover_range(
        from in 0..MAX_TS / 2,
        width in 0..7 * ONE_DAY,
        target in 1u32..400,
    ) {
        let window = window_for(from, width, target);
        let size = window.window_size();
        let slots: Vec<i64> = window.slots().collect();

        prop_assert_eq!(slots.len(), window.slot_count());
        prop_assert!(slots.iter().all(|s| s % size == 0));
        prop_assert!(slots.windows(2).all(|w| w[1] - w[0] == size));
        prop_assert_eq!(slots[0], window.refine_timestamp(from));
        prop_assert_eq!(*slots.last().unwrap(), window.refine_timestamp(from + width));
    }

    #[test]
    fn overlapping_windows_share_boundaries(
        a in 0..MAX_TS / 2,
        b in 0..MAX_TS / 2,
        ts in 0..MAX_TS / 2,
        size_idx in 0usize..SLOT_SIZE_CANDIDATES.len(),
    ) {
        let size = SLOT_SIZE_CANDIDATES[size_idx];
        let w1 = TimeWindow::with_slot_size(Range::between(a, a + ONE_DAY).unwrap(), size).unwrap();
        let w2 = TimeWindow::with_slot_size(Range::between(b, b + ONE_DAY).unwrap(), size).unwrap();
        prop_assert_eq!(w1.refine_timestamp(ts), w2.refine_timestamp(ts));
    }
}
