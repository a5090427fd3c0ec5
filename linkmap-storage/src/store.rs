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

//! Wide-column store seam
//!
//! The real store is an external collaborator; this module only fixes the
//! two operations the distribution and aggregation layers need, plus an
//! in-memory implementation used by tests and the CLI.

use async_trait::async_trait;
use linkmap_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

/// Counter cells of one row, by column qualifier
pub type Cells = BTreeMap<Vec<u8>, i64>;

/// A row returned by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub key: Vec<u8>,
    pub cells: Cells,
}

#[async_trait]
pub trait WideColumnStore: Send + Sync + 'static {
    /// Atomically add `delta` to a counter cell, creating it at zero
    async fn increment(&self, table: &str, row: &[u8], qualifier: &[u8], delta: i64)
        -> Result<()>;

    /// Rows with `start <= key < stop` in key order; empty `stop` is unbounded
    async fn scan(&self, table: &str, start: &[u8], stop: &[u8]) -> Result<Vec<Row>>;
}

type Table = BTreeMap<Vec<u8>, Cells>;

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, |t| t.len())
    }

    /// Physical row keys of a table, in order
    pub fn row_keys(&self, table: &str) -> Vec<Vec<u8>> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl WideColumnStore for MemoryStore {
    async fn increment(
        &self,
        table: &str,
        row: &[u8],
        qualifier: &[u8],
        delta: i64,
    ) -> Result<()> {
        if row.is_empty() {
            return Err(Error::Store("empty row key".to_string()));
        }
        let mut tables = self.tables.write();
        let cell = tables
            .entry(table.to_string())
            .or_default()
            .entry(row.to_vec())
            .or_default()
            .entry(qualifier.to_vec())
            .or_insert(0);
        *cell = cell.saturating_add(delta);
        Ok(())
    }

    async fn scan(&self, table: &str, start: &[u8], stop: &[u8]) -> Result<Vec<Row>> {
        let tables = self.tables.read();
        let Some(rows) = tables.get(table) else {
            return Ok(Vec::new());
        };
        if !stop.is_empty() && stop <= start {
            return Ok(Vec::new());
        }

        let rows = rows
            .range(start.to_vec()..)
            .take_while(|(key, _)| stop.is_empty() || key.as_slice() < stop)
            .map(|(key, cells)| Row {
                key: key.clone(),
                cells: cells.clone(),
            })
            .collect();
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_increment_accumulates() {
        let store = MemoryStore::new();
        store.increment("t", b"row", b"q", 2).await.unwrap();
        store.increment("t", b"row", b"q", 3).await.unwrap();

        let rows = store.scan("t", b"", b"").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cells.get(b"q".as_slice()), Some(&5));
    }

    #[tokio::test]
    async fn test_scan_is_half_open_and_ordered() {
        let store = MemoryStore::new();
        for key in [b"a", b"b", b"c", b"d"] {
            store.increment("t", key, b"q", 1).await.unwrap();
        }

        let rows = store.scan("t", b"b", b"d").await.unwrap();
        let keys: Vec<_> = rows.into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);

        assert!(store.scan("t", b"d", b"b").await.unwrap().is_empty());
        assert!(store.scan("missing", b"", b"").await.unwrap().is_empty());
    }
}
