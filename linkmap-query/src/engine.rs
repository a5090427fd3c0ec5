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


//! Application-map edge queries over the caller-statistics table.
//!
//! A query picks a window for the requested range, scans the caller's raw
//! rows (one bucket when the caller pins it, otherwise every bucket), folds
//! each bucket into a partial result inside its scan task and merges the
//! partials once every bucket has answered.

use crate::link_call_data::LinkCallData;
use crate::link_data_map::LinkCallDataMap;
use crate::merge::{merge_partial_maps, merge_partials};
use linkmap_core::{
    Application, Histogram, LinkKey, QueryConfig, Range, Result, SlotCountSampler, TimeWindow,
};
use linkmap_storage::registry::STATISTICS_CALLER;
use linkmap_storage::{
    CalleeColumn, CallerRowKey, DistributedScanner, DistributorRegistry, Row, RowKeyDistributor,
    WideColumnStore,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct LinkQueryService<S: WideColumnStore + ?Sized> {
    scanner: DistributedScanner<S>,
    distributor: Arc<RowKeyDistributor>,
    config: QueryConfig,
}

impl<S: WideColumnStore + ?Sized> LinkQueryService<S> {
    pub fn new(store: Arc<S>, registry: &DistributorRegistry, config: QueryConfig) -> Result<Self> {
        let distributor = registry.get(STATISTICS_CALLER)?;
        info!(
            buckets = distributor.max_buckets(),
            max_concurrent_scans = config.max_concurrent_scans,
            "link query service ready"
        );
        Ok(Self {
            scanner: DistributedScanner::with_max_concurrency(store, config.max_concurrent_scans),
            distributor,
            config,
        })
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Window for `range`: at most `target_slot_count` slots, never finer
    /// than the raw write granularity
    pub fn window_for(&self, range: Range, target_slot_count: u32) -> TimeWindow {
        let sampler =
            SlotCountSampler::new(target_slot_count).with_minimum_slot(self.config.minimum_slot_ms);
        TimeWindow::new(range, &sampler)
    }

    /// Slot start -> histogram for one edge over `range`
    pub async fn compute_link_call_data(
        &self,
        link_key: &LinkKey,
        range: Range,
        target_slot_count: u32,
    ) -> Result<BTreeMap<i64, Histogram>> {
        let data = self
            .query_link(link_key, range, target_slot_count, &CancellationToken::new())
            .await?;
        Ok(data.into_time_histogram())
    }

    /// Cancellable form of [`compute_link_call_data`](Self::compute_link_call_data)
    pub async fn compute_link_call_data_with_cancel(
        &self,
        link_key: &LinkKey,
        range: Range,
        target_slot_count: u32,
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<i64, Histogram>> {
        let data = self
            .query_link(link_key, range, target_slot_count, cancel)
            .await?;
        Ok(data.into_time_histogram())
    }

    /// One edge over `range`, with its window
    pub async fn query_link(
        &self,
        link_key: &LinkKey,
        range: Range,
        target_slot_count: u32,
        cancel: &CancellationToken,
    ) -> Result<LinkCallData> {
        let window = self.window_for(range, target_slot_count);
        let (start, stop) = scan_bounds(&link_key.caller(), &window)?;
        debug!(
            %link_key,
            %range,
            window_size = window.window_size(),
            slots = window.slot_count(),
            "querying link"
        );

        let callee = link_key.callee();
        let fold_key = link_key.clone();
        let partials = self
            .scanner
            .fan_out(
                STATISTICS_CALLER,
                &self.distributor,
                &start,
                &stop,
                cancel,
                move |_, rows| {
                    let mut partial = LinkCallData::with_window(fold_key.clone(), window);
                    for_each_cell(&rows, |slot_time, column, count| {
                        if column.application == callee.name
                            && column.service_type == callee.service_type
                        {
                            partial.add_call_data(slot_time, column.slot_code, count)?;
                        }
                        Ok(())
                    })?;
                    Ok(partial)
                },
            )
            .await?;

        merge_partials(
            link_key,
            Some(window),
            partials.into_iter().map(|(_, partial)| partial),
        )
    }

    /// Every edge leaving `caller` over `range`
    pub async fn compute_outbound_links(
        &self,
        caller: &Application,
        range: Range,
        target_slot_count: u32,
        cancel: &CancellationToken,
    ) -> Result<LinkCallDataMap> {
        let window = self.window_for(range, target_slot_count);
        let (start, stop) = scan_bounds(caller, &window)?;
        debug!(%caller, %range, slots = window.slot_count(), "querying outbound links");

        let fold_caller = caller.clone();
        let partials = self
            .scanner
            .fan_out(
                STATISTICS_CALLER,
                &self.distributor,
                &start,
                &stop,
                cancel,
                move |_, rows| {
                    let mut partial = LinkCallDataMap::with_window(window);
                    for_each_cell(&rows, |slot_time, column, count| {
                        let link_key = LinkKey::between(&fold_caller, &column.callee());
                        partial.add_call_data(&link_key, slot_time, column.slot_code, count)
                    })?;
                    Ok(partial)
                },
            )
            .await?;

        merge_partial_maps(
            Some(window),
            partials.into_iter().map(|(_, partial)| partial),
        )
    }
}

/// Raw-row bounds covering every raw slot that refines into the window
fn scan_bounds(caller: &Application, window: &TimeWindow) -> Result<(Vec<u8>, Vec<u8>)> {
    let window_range = window.window_range();
    let last = window_range
        .to()
        .saturating_add(window.window_size())
        .saturating_sub(1);
    CallerRowKey::scan_bounds(caller, window_range.from(), last)
}

fn for_each_cell<F>(rows: &[Row], mut visit: F) -> Result<()>
where
    F: FnMut(i64, &CalleeColumn, i64) -> Result<()>,
{
    for row in rows {
        let key = CallerRowKey::decode(&row.key)?;
        for (qualifier, count) in &row.cells {
            let column = CalleeColumn::decode(qualifier)?;
            visit(key.slot_time, &column, *count)?;
        }
    }
    Ok(())
}
