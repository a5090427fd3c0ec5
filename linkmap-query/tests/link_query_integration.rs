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


use async_trait::async_trait;
use linkmap_core::time::{ONE_HOUR, ONE_MINUTE};
use linkmap_core::{
    Application, Error, LinkKey, QueryConfig, Range, ResponseTimeSlot, Result, ServiceType,
};
use linkmap_query::LinkQueryService;
use linkmap_storage::{DistributorRegistry, MemoryStore, Row, StatisticsWriter, WideColumnStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const T0: i64 = 1_700_000_000_000;

fn frontend() -> Application {
    Application::new("frontend", ServiceType::SPRING_BOOT)
}

fn cache() -> Application {
    Application::new("session-cache", ServiceType::REDIS)
}

fn orders() -> Application {
    Application::new("orders-db", ServiceType::MYSQL)
}

async fn seeded_store(registry: &DistributorRegistry) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let writer = StatisticsWriter::new(Arc::clone(&store), registry).unwrap();

    // one cache call per minute for an hour, every tenth one failing
    for minute in 0..60 {
        let is_error = minute % 10 == 0;
        writer
            .record_call(&frontend(), &cache(), T0 + minute * ONE_MINUTE, 40, is_error, 1)
            .await
            .unwrap();
    }
    // a slow database call every five minutes
    for minute in (0..60).step_by(5) {
        writer
            .record_call(&frontend(), &orders(), T0 + minute * ONE_MINUTE, 4200, false, 2)
            .await
            .unwrap();
    }
    // unrelated caller sharing the callee
    writer
        .record_call(
            &Application::new("backoffice", ServiceType::TOMCAT),
            &cache(),
            T0,
            10,
            false,
            100,
        )
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn test_compute_link_call_data_totals() {
    let registry = DistributorRegistry::with_defaults().unwrap();
    let store = seeded_store(&registry).await;
    let service = LinkQueryService::new(store, &registry, QueryConfig::default()).unwrap();

    let range = Range::between(T0, T0 + ONE_HOUR).unwrap();
    let link = LinkKey::between(&frontend(), &cache());
    let histograms = service.compute_link_call_data(&link, range, 12).await.unwrap();

    let total: u64 = histograms.values().map(|h| h.total()).sum();
    let errors: u64 = histograms.values().map(|h| h.get(ResponseTimeSlot::Error)).sum();
    assert_eq!(total, 60);
    assert_eq!(errors, 6);
    assert!(histograms.len() <= service.window_for(range, 12).slot_count());
    assert!(histograms.keys().all(|slot| slot % (5 * ONE_MINUTE) == 0));
}

#[tokio::test]
async fn test_window_never_finer_than_raw_slots() {
    let registry = DistributorRegistry::with_defaults().unwrap();
    let store = seeded_store(&registry).await;
    let service = LinkQueryService::new(store, &registry, QueryConfig::default()).unwrap();

    // 10 minutes at 200 slots would pick 5s slots without the floor
    let range = Range::between(T0, T0 + 10 * ONE_MINUTE).unwrap();
    let data = service
        .query_link(
            &LinkKey::between(&frontend(), &cache()),
            range,
            200,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(data.window().unwrap().window_size(), ONE_MINUTE);
    assert_eq!(data.dense_series().len(), data.window().unwrap().slot_count());
}

#[tokio::test]
async fn test_outbound_links() {
    let registry = DistributorRegistry::with_defaults().unwrap();
    let store = seeded_store(&registry).await;
    let service = LinkQueryService::new(store, &registry, QueryConfig::default()).unwrap();

    let range = Range::between(T0, T0 + ONE_HOUR).unwrap();
    let links = service
        .compute_outbound_links(&frontend(), range, 60, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(links.len(), 2);
    let db = links.get(&LinkKey::between(&frontend(), &orders())).unwrap();
    assert_eq!(db.total_count(), 24);
    let very_slow: u64 = db
        .time_histogram()
        .values()
        .map(|h| h.get(ResponseTimeSlot::VerySlow))
        .sum();
    assert_eq!(very_slow, 0);
    let slow: u64 = db
        .time_histogram()
        .values()
        .map(|h| h.get(ResponseTimeSlot::Slow))
        .sum();
    assert_eq!(slow, 24);
    assert_eq!(links.total_count(), 84);
}

struct UnavailableStore;

#[async_trait]
impl WideColumnStore for UnavailableStore {
    async fn increment(&self, _: &str, _: &[u8], _: &[u8], _: i64) -> Result<()> {
        Ok(())
    }

    async fn scan(&self, _: &str, _: &[u8], _: &[u8]) -> Result<Vec<Row>> {
        Err(Error::Store("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_scan_failure_surfaces_instead_of_undercounting() {
    let registry = DistributorRegistry::with_defaults().unwrap();
    let service =
        LinkQueryService::new(Arc::new(UnavailableStore), &registry, QueryConfig::default())
            .unwrap();

    let range = Range::between(T0, T0 + ONE_HOUR).unwrap();
    let result = service
        .compute_link_call_data(&LinkKey::between(&frontend(), &cache()), range, 12)
        .await;
    assert!(matches!(result, Err(Error::PartialScanFailure { .. })));
}

#[tokio::test]
async fn test_cancelled_query() {
    let registry = DistributorRegistry::with_defaults().unwrap();
    let store = seeded_store(&registry).await;
    let service = LinkQueryService::new(store, &registry, QueryConfig::default()).unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let range = Range::between(T0, T0 + ONE_HOUR).unwrap();
    let result = service
        .compute_link_call_data_with_cancel(
            &LinkKey::between(&frontend(), &cache()),
            range,
            12,
            &cancel,
        )
        .await;
    assert!(matches!(result, Err(Error::Cancelled)));
}
