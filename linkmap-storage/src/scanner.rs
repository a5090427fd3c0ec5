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


//! Fork-join scans over distributed tables.
//!
//! A logical scan becomes one physical scan per bucket (or a single scan
//! when the bounds pin the bucket). Bucket scans run as tokio tasks bounded
//! by a semaphore; each task optionally folds its rows into a partial result
//! so the caller only merges partials after the join. Any bucket failure
//! aborts the rest: a missing bucket would silently undercount.

use crate::distributor::{BucketScan, RowKeyDistributor};
use crate::merge::KWayMerge;
use crate::store::{Row, WideColumnStore};
use linkmap_core::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default bound on concurrent bucket scans
pub const DEFAULT_MAX_CONCURRENT_SCANS: usize = 16;

pub struct DistributedScanner<S: WideColumnStore + ?Sized> {
    store: Arc<S>,
    permits: Arc<Semaphore>,
    max_concurrency: usize,
}

impl<S: WideColumnStore + ?Sized> Clone for DistributedScanner<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            permits: Arc::clone(&self.permits),
            max_concurrency: self.max_concurrency,
        }
    }
}

impl<S: WideColumnStore + ?Sized> DistributedScanner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_max_concurrency(store, DEFAULT_MAX_CONCURRENT_SCANS)
    }

    /// Scanner running at most `max_concurrency` bucket scans at once;
    /// clones share the limit
    pub fn with_max_concurrency(store: Arc<S>, max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            store,
            permits: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Scan the logical range `[start, stop)` of `table` and fold every
    /// bucket's rows (original keys, store order) into a partial result.
    ///
    /// Partials come back ordered by bucket. The known-bucket case issues a
    /// single scan.
    pub async fn fan_out<T, F>(
        &self,
        table: &str,
        distributor: &Arc<RowKeyDistributor>,
        start: &[u8],
        stop: &[u8],
        cancel: &CancellationToken,
        fold: F,
    ) -> Result<Vec<(u8, T)>>
    where
        T: Send + 'static,
        F: Fn(u8, Vec<Row>) -> Result<T> + Send + Sync + 'static,
    {
        let scans = distributor.scan_ranges(start, stop);
        self.scan_buckets(table, distributor, scans, cancel, fold)
            .await
    }

    /// Run the given bucket scans concurrently and join their partials
    pub async fn scan_buckets<T, F>(
        &self,
        table: &str,
        distributor: &Arc<RowKeyDistributor>,
        scans: Vec<BucketScan>,
        cancel: &CancellationToken,
        fold: F,
    ) -> Result<Vec<(u8, T)>>
    where
        T: Send + 'static,
        F: Fn(u8, Vec<Row>) -> Result<T> + Send + Sync + 'static,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let total = scans.len();
        debug!(table, buckets = total, "starting bucket scans");

        let fold = Arc::new(fold);
        let mut tasks = JoinSet::new();
        for scan in scans {
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&self.permits);
            let distributor = Arc::clone(distributor);
            let fold = Arc::clone(&fold);
            let table = table.to_string();

            tasks.spawn(async move {
                let bucket = scan.bucket;
                let result = async {
                    let _permit = permits
                        .acquire_owned()
                        .await
                        .map_err(|_| Error::TaskFailed("scan semaphore closed".to_string()))?;
                    let rows = store.scan(&table, &scan.start, &scan.stop).await?;
                    let rows = rows
                        .into_iter()
                        .map(|row| {
                            Ok(Row {
                                key: distributor.undistribute(&row.key)?,
                                cells: row.cells,
                            })
                        })
                        .collect::<Result<Vec<_>>>()?;
                    fold(bucket, rows)
                }
                .await;
                (bucket, result)
            });
        }

        let mut partials = Vec::with_capacity(total);
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    debug!(table, completed = partials.len(), total, "bucket scans cancelled");
                    return Err(Error::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            match joined {
                Ok((bucket, Ok(partial))) => partials.push((bucket, partial)),
                Ok((bucket, Err(err))) => {
                    tasks.abort_all();
                    warn!(table, bucket, total, error = %err, "bucket scan failed");
                    return Err(Error::PartialScanFailure {
                        table: table.to_string(),
                        bucket,
                        total,
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    tasks.abort_all();
                    warn!(table, total, error = %err, "bucket scan task failed");
                    return Err(Error::TaskFailed(err.to_string()));
                }
            }
        }

        partials.sort_unstable_by_key(|(bucket, _)| *bucket);
        debug!(table, buckets = total, "bucket scans complete");
        Ok(partials)
    }

    /// Rows of `[start, stop)` with original keys, in original-key order
    pub async fn scan_merged(
        &self,
        table: &str,
        distributor: &Arc<RowKeyDistributor>,
        start: &[u8],
        stop: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>> {
        let partials = self
            .fan_out(table, distributor, start, stop, cancel, |_, rows| Ok(rows))
            .await?;
        Ok(merge_partials(partials))
    }

    /// Like [`scan_merged`](Self::scan_merged) but always scans every
    /// bucket, even when the bounds pin one
    pub async fn scan_merged_all_buckets(
        &self,
        table: &str,
        distributor: &Arc<RowKeyDistributor>,
        start: &[u8],
        stop: &[u8],
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>> {
        let scans = distributor.distributed_scan_ranges(start, stop);
        let partials = self
            .scan_buckets(table, distributor, scans, cancel, |_, rows| Ok(rows))
            .await?;
        Ok(merge_partials(partials))
    }
}

fn merge_partials(partials: Vec<(u8, Vec<Row>)>) -> Vec<Row> {
    let streams = partials
        .into_iter()
        .map(|(_, rows)| rows.into_iter())
        .collect();
    KWayMerge::new(streams).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::OneByteSimpleHash;
    use crate::store::MemoryStore;

    async fn seeded(distributor: &RowKeyDistributor, keys: &[&[u8]]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for key in keys {
            let row = distributor.distribute(key).unwrap();
            store.increment("t", &row, b"q", 1).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_scan_merged_restores_original_order() {
        let distributor = Arc::new(RowKeyDistributor::new(Box::new(
            OneByteSimpleHash::new(8).unwrap(),
        )));
        let keys: Vec<&[u8]> = vec![b"k01", b"k02", b"k03", b"k04", b"k05", b"k06"];
        let store = seeded(&distributor, &keys).await;

        let scanner = DistributedScanner::with_max_concurrency(store, 2);
        let rows = scanner
            .scan_merged("t", &distributor, b"k02", b"k05", &CancellationToken::new())
            .await
            .unwrap();

        let found: Vec<_> = rows.into_iter().map(|r| r.key).collect();
        assert_eq!(found, vec![b"k02".to_vec(), b"k03".to_vec(), b"k04".to_vec()]);
    }

    #[tokio::test]
    async fn test_fan_out_folds_per_bucket() {
        let distributor = Arc::new(RowKeyDistributor::new(Box::new(
            OneByteSimpleHash::new(4).unwrap(),
        )));
        let keys: Vec<&[u8]> = vec![b"a", b"b", b"c", b"d", b"e"];
        let store = seeded(&distributor, &keys).await;

        let scanner = DistributedScanner::new(store);
        let partials = scanner
            .fan_out("t", &distributor, b"", b"", &CancellationToken::new(), |_, rows| {
                Ok(rows.len())
            })
            .await
            .unwrap();

        assert_eq!(partials.len(), 4);
        assert!(partials.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(partials.iter().map(|(_, n)| n).sum::<usize>(), keys.len());
    }

    #[tokio::test]
    async fn test_already_cancelled() {
        let distributor = Arc::new(RowKeyDistributor::new(Box::new(
            OneByteSimpleHash::new(4).unwrap(),
        )));
        let scanner = DistributedScanner::new(Arc::new(MemoryStore::new()));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = scanner
            .scan_merged("t", &distributor, b"", b"", &cancel)
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
