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

//! One-byte prefix hashers
//!
//! Both hashers use the same polynomial rolling hash
//! (`h = 1; h = 31 * h + b` over signed bytes, wrapping in 64 bits), reduced
//! modulo the bucket count. No seed is involved, so a key maps to the same bucket in
//! every process, which the read path relies on to re-derive prefixes.
//!
//! The range variant only looks at `key[start..end)`. Leaving the timestamp
//! bytes out of that window keeps every row of one entity in one bucket.

use linkmap_core::{DistributorSpec, Error, HashMode, Result};
use std::fmt;

/// Maximum number of buckets addressable by a one-byte prefix
pub const MAX_BUCKETS: u32 = 256;

/// Maps a row key to a distribution prefix
pub trait PrefixHasher: Send + Sync + fmt::Debug {
    /// Bucket in `[0, max_buckets)` for `key`
    fn hash_prefix(&self, key: &[u8]) -> Result<u8>;

    fn max_buckets(&self) -> u32;

    /// Byte window that participates in hashing, `None` for the whole key
    fn hashed_range(&self) -> Option<(usize, usize)>;

    /// Every prefix this hasher can produce, ascending
    fn all_possible_prefixes(&self) -> Vec<u8> {
        (0..self.max_buckets()).map(|b| b as u8).collect()
    }
}

#[inline]
fn rolling_hash(bytes: &[u8]) -> i64 {
    bytes.iter().fold(1i64, |hash, b| {
        hash.wrapping_mul(31).wrapping_add(i64::from(*b as i8))
    })
}

#[inline]
fn reduce(hash: i64, max_buckets: u32) -> u8 {
    (hash.unsigned_abs() % u64::from(max_buckets)) as u8
}

fn check_buckets(max_buckets: u32) -> Result<()> {
    if max_buckets == 0 || max_buckets > MAX_BUCKETS {
        return Err(Error::InvalidBucketCount(max_buckets));
    }
    Ok(())
}

/// Hashes the entire key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneByteSimpleHash {
    max_buckets: u32,
}

impl OneByteSimpleHash {
    pub fn new(max_buckets: u32) -> Result<Self> {
        check_buckets(max_buckets)?;
        Ok(Self { max_buckets })
    }
}

impl PrefixHasher for OneByteSimpleHash {
    fn hash_prefix(&self, key: &[u8]) -> Result<u8> {
        Ok(reduce(rolling_hash(key), self.max_buckets))
    }

    fn max_buckets(&self) -> u32 {
        self.max_buckets
    }

    fn hashed_range(&self) -> Option<(usize, usize)> {
        None
    }
}

/// Hashes `key[start..end)` only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeOneByteSimpleHash {
    start: usize,
    end: usize,
    max_buckets: u32,
}

impl RangeOneByteSimpleHash {
    /// Fails with `InvalidRange` unless `start < end`
    pub fn new(start: usize, end: usize, max_buckets: u32) -> Result<Self> {
        check_buckets(max_buckets)?;
        if start >= end {
            return Err(Error::InvalidRange {
                start,
                end,
                key_len: None,
            });
        }
        Ok(Self {
            start,
            end,
            max_buckets,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }
}

impl PrefixHasher for RangeOneByteSimpleHash {
    fn hash_prefix(&self, key: &[u8]) -> Result<u8> {
        let window = key.get(self.start..self.end).ok_or(Error::InvalidRange {
            start: self.start,
            end: self.end,
            key_len: Some(key.len()),
        })?;
        Ok(reduce(rolling_hash(window), self.max_buckets))
    }

    fn max_buckets(&self) -> u32 {
        self.max_buckets
    }

    fn hashed_range(&self) -> Option<(usize, usize)> {
        Some((self.start, self.end))
    }
}

/// Build the hasher described by a distributor spec
pub fn hasher_from_spec(spec: &DistributorSpec) -> Result<Box<dyn PrefixHasher>> {
    spec.validate()?;
    match spec.mode {
        HashMode::WholeKey => Ok(Box::new(OneByteSimpleHash::new(spec.max_buckets)?)),
        HashMode::Range => {
            let start = spec.start.unwrap_or(0);
            let end = spec.end.unwrap_or(0);
            Ok(Box::new(RangeOneByteSimpleHash::new(
                start,
                end,
                spec.max_buckets,
            )?))
        }
    }
}
