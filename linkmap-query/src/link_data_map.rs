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


//! All edges seen by one query, keyed by `LinkKey`

use crate::link_call_data::LinkCallData;
use linkmap_core::{LinkKey, Result, TimeWindow};
use serde::{Serialize, Serializer};
use std::collections::btree_map::{self, BTreeMap};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCallDataMap {
    window: Option<TimeWindow>,
    links: BTreeMap<LinkKey, LinkCallData>,
}

impl LinkCallDataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map whose entries all slot through `window`
    pub fn with_window(window: TimeWindow) -> Self {
        Self {
            window: Some(window),
            links: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> Option<&TimeWindow> {
        self.window.as_ref()
    }

    fn entry(&mut self, link_key: &LinkKey) -> &mut LinkCallData {
        let window = self.window;
        self.links
            .entry(link_key.clone())
            .or_insert_with(|| LinkCallData::with_optional_window(link_key.clone(), window))
    }

    /// Record calls on `link_key`, creating the edge on first use.
    /// A rejected call does not create the edge.
    pub fn add_call_data(
        &mut self,
        link_key: &LinkKey,
        timestamp: i64,
        code: i16,
        count: i64,
    ) -> Result<()> {
        if let Some(data) = self.links.get_mut(link_key) {
            return data.add_call_data(timestamp, code, count);
        }
        let mut data = LinkCallData::with_optional_window(link_key.clone(), self.window);
        data.add_call_data(timestamp, code, count)?;
        self.links.insert(link_key.clone(), data);
        Ok(())
    }

    /// Merge one edge's data in, re-slotted through this map's window
    pub fn add_link_call_data(&mut self, data: &LinkCallData) -> Result<()> {
        self.entry(data.link_key()).merge(data)
    }

    pub fn merge(&mut self, other: &LinkCallDataMap) -> Result<()> {
        for data in other.links.values() {
            self.add_link_call_data(data)?;
        }
        Ok(())
    }

    /// Every edge re-slotted into `window`
    pub fn downsample(&self, window: &TimeWindow) -> LinkCallDataMap {
        let links = self
            .links
            .iter()
            .map(|(key, data)| (key.clone(), data.downsample(window)))
            .collect();
        LinkCallDataMap {
            window: Some(*window),
            links,
        }
    }

    pub fn get(&self, link_key: &LinkKey) -> Option<&LinkCallData> {
        self.links.get(link_key)
    }

    pub fn remove(&mut self, link_key: &LinkKey) -> Option<LinkCallData> {
        self.links.remove(link_key)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn link_keys(&self) -> impl Iterator<Item = &LinkKey> {
        self.links.keys()
    }

    pub fn iter(&self) -> btree_map::Values<'_, LinkKey, LinkCallData> {
        self.links.values()
    }

    pub fn total_count(&self) -> u64 {
        self.links
            .values()
            .fold(0u64, |acc, data| acc.saturating_add(data.total_count()))
    }
}

impl IntoIterator for LinkCallDataMap {
    type Item = LinkCallData;
    type IntoIter = btree_map::IntoValues<LinkKey, LinkCallData>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_values()
    }
}

impl<'a> IntoIterator for &'a LinkCallDataMap {
    type Item = &'a LinkCallData;
    type IntoIter = btree_map::Values<'a, LinkKey, LinkCallData>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Struct keys cannot be JSON object keys; emit the edges as a list
impl Serialize for LinkCallDataMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.links.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkmap_core::time::{FixedSampler, ONE_HOUR, ONE_MINUTE};
    use linkmap_core::{Error, Range, ServiceType};

    const T0: i64 = 1_700_000_000_000;

    fn cache_edge() -> LinkKey {
        LinkKey::of("api", ServiceType::TOMCAT, "cache", ServiceType::REDIS)
    }

    fn db_edge() -> LinkKey {
        LinkKey::of("api", ServiceType::TOMCAT, "db", ServiceType::MYSQL)
    }

    #[test]
    fn test_add_creates_edges_on_first_use() {
        let mut map = LinkCallDataMap::new();
        map.add_call_data(&cache_edge(), T0, 100, 2).unwrap();
        map.add_call_data(&db_edge(), T0, 1000, 3).unwrap();
        map.add_call_data(&cache_edge(), T0, 100, 1).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&cache_edge()).unwrap().total_count(), 3);
        assert_eq!(map.total_count(), 6);
    }

    #[test]
    fn test_rejected_call_does_not_create_edge() {
        let mut map = LinkCallDataMap::new();
        assert!(matches!(
            map.add_call_data(&cache_edge(), T0, 100, -5),
            Err(Error::InvalidCount(-5))
        ));
        assert!(map.is_empty());
    }

    #[test]
    fn test_merge_maps_sums_shared_edges() {
        let window = TimeWindow::new(
            Range::between(T0, T0 + ONE_HOUR).unwrap(),
            &FixedSampler::new(5 * ONE_MINUTE).unwrap(),
        );
        let mut left = LinkCallDataMap::with_window(window);
        left.add_call_data(&cache_edge(), T0, 100, 1).unwrap();

        let mut right = LinkCallDataMap::new();
        right.add_call_data(&cache_edge(), T0 + ONE_MINUTE, 100, 1).unwrap();
        right.add_call_data(&db_edge(), T0, -1, 4).unwrap();

        left.merge(&right).unwrap();
        assert_eq!(left.len(), 2);
        assert_eq!(left.total_count(), 6);
        for data in &left {
            assert_eq!(data.window(), Some(&window));
        }
    }

    #[test]
    fn test_serializes_as_list() {
        let mut map = LinkCallDataMap::new();
        map.add_call_data(&cache_edge(), T0, 100, 1).unwrap();
        let json = serde_json::to_value(&map).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["link_key"]["to_application"], "cache");
    }
}
