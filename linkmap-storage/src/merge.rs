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


//! Streaming K-way merge of per-bucket scan results.
//!
//! Each bucket returns rows sorted by distributed key, which within one
//! bucket is the same order as the original key. Merging the bucket streams
//! restores the global original-key order a non-distributed table would give.

use crate::store::Row;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

pub struct KWayMerge<I: Iterator<Item = Row>> {
    heap: BinaryHeap<Reverse<HeapEntry<I>>>,
}

struct HeapEntry<I: Iterator<Item = Row>> {
    current: Row,
    /// Position of the source stream; breaks ties between equal keys
    source: usize,
    iterator: I,
}

impl<I: Iterator<Item = Row>> Ord for HeapEntry<I> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.current
            .key
            .cmp(&other.current.key)
            .then(self.source.cmp(&other.source))
    }
}

impl<I: Iterator<Item = Row>> PartialOrd for HeapEntry<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I: Iterator<Item = Row>> PartialEq for HeapEntry<I> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<I: Iterator<Item = Row>> Eq for HeapEntry<I> {}

impl<I: Iterator<Item = Row>> KWayMerge<I> {
    pub fn new(iterators: Vec<I>) -> Self {
        let mut heap = BinaryHeap::with_capacity(iterators.len());

        for (source, mut iter) in iterators.into_iter().enumerate() {
            if let Some(current) = iter.next() {
                heap.push(Reverse(HeapEntry {
                    current,
                    source,
                    iterator: iter,
                }));
            }
        }

        Self { heap }
    }
}

impl<I: Iterator<Item = Row>> Iterator for KWayMerge<I> {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse(mut entry) = self.heap.pop()?;
        let result = entry.current;

        if let Some(next) = entry.iterator.next() {
            entry.current = next;
            self.heap.push(Reverse(entry));
        }

        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), None)
    }
}
