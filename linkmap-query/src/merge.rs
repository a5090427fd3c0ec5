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


//! Joining partial results after a fan-out.

use crate::link_call_data::LinkCallData;
use crate::link_data_map::LinkCallDataMap;
use linkmap_core::{LinkKey, Result, TimeWindow};
use tracing::debug;

/// Fold partial results for one edge into a single instance slotted by
/// `window`. Partials may arrive in any order.
pub fn merge_partials<I>(
    link_key: &LinkKey,
    window: Option<TimeWindow>,
    partials: I,
) -> Result<LinkCallData>
where
    I: IntoIterator<Item = LinkCallData>,
{
    let mut merged = LinkCallData::with_optional_window(link_key.clone(), window);
    let mut count = 0usize;
    for partial in partials {
        merged.merge(&partial)?;
        count += 1;
    }
    debug!(%link_key, partials = count, slots = merged.slot_count(), "merged partials");
    Ok(merged)
}

/// Fold partial edge maps into one map slotted by `window`
pub fn merge_partial_maps<I>(window: Option<TimeWindow>, partials: I) -> Result<LinkCallDataMap>
where
    I: IntoIterator<Item = LinkCallDataMap>,
{
    let mut merged = match window {
        Some(window) => LinkCallDataMap::with_window(window),
        None => LinkCallDataMap::new(),
    };
    for partial in partials {
        merged.merge(&partial)?;
    }
    debug!(links = merged.len(), "merged partial maps");
    Ok(merged)
}

/// Re-slot every edge into a coarser window
pub fn downsample_all(map: &LinkCallDataMap, window: &TimeWindow) -> LinkCallDataMap {
    map.downsample(window)
}
