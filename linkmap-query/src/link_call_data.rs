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


//! Per-edge call accumulation.
//!
//! A `LinkCallData` maps slot start times to response-time histograms for
//! one caller -> callee edge. With a window, timestamps are floored to the
//! window's slots; without one, each raw timestamp is its own slot.
//!
//! Instances belong to a single query. Fan-out scans build one per bucket
//! and merge them after the join; merging is plain summation, so the order
//! partials arrive in does not matter.

use linkmap_core::{
    Error, Histogram, HistogramSchema, LinkKey, ResponseTimeSlot, Result, TimeWindow,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkCallData {
    link_key: LinkKey,
    #[serde(skip)]
    window: Option<TimeWindow>,
    time_histogram: BTreeMap<i64, Histogram>,
}

impl LinkCallData {
    /// Full-resolution accumulator
    pub fn new(link_key: LinkKey) -> Self {
        Self {
            link_key,
            window: None,
            time_histogram: BTreeMap::new(),
        }
    }

    pub fn with_window(link_key: LinkKey, window: TimeWindow) -> Self {
        Self {
            link_key,
            window: Some(window),
            time_histogram: BTreeMap::new(),
        }
    }

    pub(crate) fn with_optional_window(link_key: LinkKey, window: Option<TimeWindow>) -> Self {
        Self {
            link_key,
            window,
            time_histogram: BTreeMap::new(),
        }
    }

    pub fn link_key(&self) -> &LinkKey {
        &self.link_key
    }

    pub fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    pub fn histogram_schema(&self) -> HistogramSchema {
        self.link_key.histogram_schema()
    }

    /// Slot a timestamp lands in
    #[inline]
    pub fn slot_of(&self, timestamp: i64) -> i64 {
        match &self.window {
            Some(window) => window.refine_timestamp(timestamp),
            None => timestamp,
        }
    }

    /// Add `count` calls with persisted histogram `code` at `timestamp`.
    ///
    /// The code is classified against the edge's schema as an upper bound.
    /// Rejects negative counts and codes above the slow bound without
    /// touching existing data. Repeated calls add up.
    pub fn add_call_data(&mut self, timestamp: i64, code: i16, count: i64) -> Result<()> {
        let count = u64::try_from(count).map_err(|_| Error::InvalidCount(count))?;
        let slot = self.histogram_schema().slot_for_code(code)?;
        self.add_call_data_slot(timestamp, slot, count);
        Ok(())
    }

    pub fn add_call_data_slot(&mut self, timestamp: i64, slot: ResponseTimeSlot, count: u64) {
        let slot_time = self.slot_of(timestamp);
        self.time_histogram
            .entry(slot_time)
            .or_default()
            .add(slot, count);
    }

    /// Add a whole histogram at `timestamp`
    pub fn add_histogram(&mut self, timestamp: i64, histogram: &Histogram) {
        let slot_time = self.slot_of(timestamp);
        self.time_histogram
            .entry(slot_time)
            .or_default()
            .merge(histogram);
    }

    pub fn time_histogram(&self) -> &BTreeMap<i64, Histogram> {
        &self.time_histogram
    }

    pub fn into_time_histogram(self) -> BTreeMap<i64, Histogram> {
        self.time_histogram
    }

    pub fn histogram_at(&self, slot_time: i64) -> Option<&Histogram> {
        self.time_histogram.get(&slot_time)
    }

    /// Fold `other` into this instance, re-slotting its data through this
    /// instance's window.
    ///
    /// Fails with `LinkKeyMismatch`, leaving both sides untouched, when the
    /// edges differ.
    pub fn merge(&mut self, other: &LinkCallData) -> Result<()> {
        if self.link_key != other.link_key {
            return Err(Error::LinkKeyMismatch {
                expected: Box::new(self.link_key.clone()),
                actual: Box::new(other.link_key.clone()),
            });
        }
        for (timestamp, histogram) in &other.time_histogram {
            self.add_histogram(*timestamp, histogram);
        }
        Ok(())
    }

    /// `a + b` as a new instance carrying `a`'s window
    pub fn merged(a: &LinkCallData, b: &LinkCallData) -> Result<LinkCallData> {
        let mut out = a.clone();
        out.merge(b)?;
        Ok(out)
    }

    /// Same data re-slotted into a coarser `window`
    pub fn downsample(&self, window: &TimeWindow) -> LinkCallData {
        let mut out = LinkCallData::with_window(self.link_key.clone(), *window);
        for (timestamp, histogram) in &self.time_histogram {
            out.add_histogram(*timestamp, histogram);
        }
        out
    }

    pub fn total_count(&self) -> u64 {
        self.time_histogram
            .values()
            .fold(0u64, |acc, h| acc.saturating_add(h.total()))
    }

    pub fn slot_count(&self) -> usize {
        self.time_histogram.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_histogram.values().all(Histogram::is_empty)
    }

    /// One entry per window slot, zero-filled where nothing was recorded.
    /// Without a window this is just the touched slots.
    pub fn dense_series(&self) -> Vec<(i64, Histogram)> {
        match &self.window {
            Some(window) => window
                .slots()
                .map(|slot| {
                    let histogram = self.time_histogram.get(&slot).copied().unwrap_or_default();
                    (slot, histogram)
                })
                .collect(),
            None => self
                .time_histogram
                .iter()
                .map(|(slot, histogram)| (*slot, *histogram))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmap_core::time::{FixedSampler, ONE_HOUR, ONE_MINUTE};
    use linkmap_core::{Range, ServiceType};

    const T0: i64 = 1_700_000_000_000;

    fn key() -> LinkKey {
        LinkKey::of("api", ServiceType::TOMCAT, "cache", ServiceType::REDIS)
    }

    fn five_minute_window() -> TimeWindow {
        let range = Range::between(T0, T0 + ONE_HOUR).unwrap();
        TimeWindow::new(range, &FixedSampler::new(5 * ONE_MINUTE).unwrap())
    }

    #[test]
    fn test_without_window_each_timestamp_is_a_slot() {
        let mut data = LinkCallData::new(key());
        data.add_call_data(T0, 100, 1).unwrap();
        data.add_call_data(T0 + 1, 100, 1).unwrap();
        assert_eq!(data.slot_count(), 2);
        assert_eq!(data.total_count(), 2);
    }

    #[test]
    fn test_add_is_additive() {
        let mut data = LinkCallData::with_window(key(), five_minute_window());
        data.add_call_data(T0, 300, 2).unwrap();
        data.add_call_data(T0, 300, 2).unwrap();

        let slot = data.slot_of(T0);
        assert_eq!(data.histogram_at(slot).unwrap().get(ResponseTimeSlot::Normal), 4);
    }

    #[test]
    fn test_negative_count_leaves_data_untouched() {
        let mut data = LinkCallData::new(key());
        data.add_call_data(T0, 100, 3).unwrap();
        let before = data.clone();

        assert!(matches!(
            data.add_call_data(T0, 100, -1),
            Err(Error::InvalidCount(-1))
        ));
        assert_eq!(data, before);
    }

    #[test]
    fn test_code_above_slow_bound_rejected() {
        let mut data = LinkCallData::new(key());
        // the callee is a FAST backend, slow bound 500ms
        assert!(matches!(
            data.add_call_data(T0, 1000, 1),
            Err(Error::UnknownHistogramSlot(1000))
        ));
        assert!(data.is_empty());
    }

    #[test]
    fn test_code_classified_by_callee_schema() {
        let mut data = LinkCallData::new(LinkKey::of(
            "api",
            ServiceType::TOMCAT,
            "orders",
            ServiceType::MYSQL,
        ));
        data.add_call_data(T0, 100, 1).unwrap();
        data.add_call_data(T0, 2500, 2).unwrap();

        let histogram = data.histogram_at(T0).unwrap();
        assert_eq!(histogram.get(ResponseTimeSlot::Fast), 1);
        assert_eq!(histogram.get(ResponseTimeSlot::Normal), 2);
    }

    #[test]
    fn test_zero_count_creates_slot() {
        let mut data = LinkCallData::new(key());
        data.add_call_data(T0, -1, 0).unwrap();
        assert_eq!(data.slot_count(), 1);
        assert!(data.is_empty());
    }

    #[test]
    fn test_merge_reslots_through_own_window() {
        let mut raw = LinkCallData::new(key());
        for minute in 0..5 {
            raw.add_call_data(T0 + minute * ONE_MINUTE, 100, 1).unwrap();
        }

        let mut coarse = LinkCallData::with_window(key(), five_minute_window());
        coarse.merge(&raw).unwrap();

        assert!(coarse.slot_count() <= 2);
        assert_eq!(coarse.total_count(), 5);
        assert_eq!(coarse.downsample(&five_minute_window()), coarse);
    }

    #[test]
    fn test_merge_mismatch_leaves_both_untouched() {
        let mut a = LinkCallData::new(key());
        a.add_call_data(T0, 100, 1).unwrap();
        let mut b = LinkCallData::new(LinkKey::of(
            "api",
            ServiceType::TOMCAT,
            "db",
            ServiceType::MYSQL,
        ));
        b.add_call_data(T0, 1000, 1).unwrap();
        let (a_before, b_before) = (a.clone(), b.clone());

        let err = a.merge(&b).unwrap_err();
        assert!(matches!(err, Error::LinkKeyMismatch { .. }));
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
        assert!(LinkCallData::merged(&b, &a).is_err());
    }

    #[test]
    fn test_dense_series_zero_fills() {
        let window = five_minute_window();
        let mut data = LinkCallData::with_window(key(), window);
        data.add_call_data(T0 + 10 * ONE_MINUTE, 100, 7).unwrap();

        let series = data.dense_series();
        assert_eq!(series.len(), window.slot_count());
        assert_eq!(series.iter().map(|(_, h)| h.total()).sum::<u64>(), 7);
        assert!(series.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
