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

//! Row key distribution by hash prefix
//!
//! Sequential row keys (reversed timestamps, monotonically allocated ids)
//! would all land on the same storage region. The distributor prepends one
//! byte derived from the key so writes spread over `max_buckets` regions.
//!
//! ```text
//! original:    [entity bytes ............][reversed ts]
//! distributed: [b][entity bytes ............][reversed ts]    b = hash(key) % max_buckets
//! ```
//!
//! Reads reverse the mapping. When the bucket of a scan cannot be derived
//! from its bounds, the scan is split into one range per bucket.

use crate::hash::{hasher_from_spec, PrefixHasher};
use linkmap_core::{DistributorSpec, Error, Result};
use std::fmt;

/// One physical scan produced by splitting a logical scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketScan {
    pub bucket: u8,
    /// Inclusive start, distributed
    pub start: Vec<u8>,
    /// Exclusive stop, distributed; empty means unbounded
    pub stop: Vec<u8>,
}

pub struct RowKeyDistributor {
    hasher: Box<dyn PrefixHasher>,
}

impl RowKeyDistributor {
    pub fn new(hasher: Box<dyn PrefixHasher>) -> Self {
        Self { hasher }
    }

    pub fn from_spec(spec: &DistributorSpec) -> Result<Self> {
        Ok(Self::new(hasher_from_spec(spec)?))
    }

    pub fn max_buckets(&self) -> u32 {
        self.hasher.max_buckets()
    }

    pub fn hasher(&self) -> &dyn PrefixHasher {
        self.hasher.as_ref()
    }

    /// Bucket the original key hashes to
    pub fn bucket(&self, original_key: &[u8]) -> Result<u8> {
        self.hasher.hash_prefix(original_key)
    }

    /// Prepend the distribution byte
    pub fn distribute(&self, original_key: &[u8]) -> Result<Vec<u8>> {
        let prefix = self.hasher.hash_prefix(original_key)?;
        Ok(prefixed(prefix, original_key))
    }

    /// Strip the distribution byte
    pub fn undistribute(&self, distributed_key: &[u8]) -> Result<Vec<u8>> {
        self.original_key(distributed_key).map(<[u8]>::to_vec)
    }

    /// Borrowing variant of [`undistribute`](Self::undistribute)
    pub fn original_key<'a>(&self, distributed_key: &'a [u8]) -> Result<&'a [u8]> {
        match distributed_key.split_first() {
            Some((_, original)) => Ok(original),
            None => Err(Error::MalformedKey(
                "distributed key is empty, expected a prefix byte".to_string(),
            )),
        }
    }

    /// Prefix byte of a distributed key
    pub fn bucket_of(&self, distributed_key: &[u8]) -> Result<u8> {
        let prefix = *distributed_key.first().ok_or_else(|| {
            Error::MalformedKey("distributed key is empty, expected a prefix byte".to_string())
        })?;
        if u32::from(prefix) >= self.max_buckets() {
            return Err(Error::MalformedKey(format!(
                "prefix {prefix} outside [0, {})",
                self.max_buckets()
            )));
        }
        Ok(prefix)
    }

    /// The original key under every possible prefix, one per bucket
    pub fn all_distributed_keys(&self, original_key: &[u8]) -> Vec<Vec<u8>> {
        self.hasher
            .all_possible_prefixes()
            .into_iter()
            .map(|prefix| prefixed(prefix, original_key))
            .collect()
    }

    /// Bucket of a scan over `[start, stop)` when every key in it shares the
    /// hashed byte window, `None` when the scan must fan out
    pub fn bucket_for_scan(&self, start: &[u8], stop: &[u8]) -> Option<u8> {
        let (_, end) = self.hasher.hashed_range()?;
        if start.len() < end || stop.len() < end || start[..end] != stop[..end] {
            return None;
        }
        self.hasher.hash_prefix(start).ok()
    }

    /// Physical ranges covering the logical scan `[start, stop)`. A single
    /// range when the bucket is known, otherwise one range per bucket.
    pub fn scan_ranges(&self, start: &[u8], stop: &[u8]) -> Vec<BucketScan> {
        match self.bucket_for_scan(start, stop) {
            Some(bucket) => vec![self.bucket_scan(bucket, start, stop)],
            None => self.distributed_scan_ranges(start, stop),
        }
    }

    /// One range per bucket, regardless of whether the bucket is derivable
    pub fn distributed_scan_ranges(&self, start: &[u8], stop: &[u8]) -> Vec<BucketScan> {
        self.hasher
            .all_possible_prefixes()
            .into_iter()
            .map(|bucket| self.bucket_scan(bucket, start, stop))
            .collect()
    }

    fn bucket_scan(&self, bucket: u8, start: &[u8], stop: &[u8]) -> BucketScan {
        let stop = if stop.is_empty() {
            // end of this bucket's keyspace
            match bucket.checked_add(1) {
                Some(next) => vec![next],
                None => Vec::new(),
            }
        } else {
            prefixed(bucket, stop)
        };
        BucketScan {
            bucket,
            start: prefixed(bucket, start),
            stop,
        }
    }
}

impl fmt::Debug for RowKeyDistributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowKeyDistributor")
            .field("hasher", &self.hasher)
            .finish()
    }
}

#[inline]
fn prefixed(prefix: u8, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.push(prefix);
    out.extend_from_slice(key);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{OneByteSimpleHash, RangeOneByteSimpleHash};

    fn whole(buckets: u32) -> RowKeyDistributor {
        RowKeyDistributor::new(Box::new(OneByteSimpleHash::new(buckets).unwrap()))
    }

    fn ranged(start: usize, end: usize, buckets: u32) -> RowKeyDistributor {
        RowKeyDistributor::new(Box::new(
            RangeOneByteSimpleHash::new(start, end, buckets).unwrap(),
        ))
    }

    #[test]
    fn test_distribute_prepends_hash_byte() {
        let distributor = whole(32);
        let key = b"trace-index-row";
        let distributed = distributor.distribute(key).unwrap();

        assert_eq!(distributed.len(), key.len() + 1);
        assert_eq!(&distributed[1..], key);
        assert_eq!(distributed[0], distributor.bucket(key).unwrap());
        assert_eq!(distributor.undistribute(&distributed).unwrap(), key.to_vec());
    }

    #[test]
    fn test_undistribute_empty_is_malformed() {
        let distributor = whole(8);
        assert!(matches!(
            distributor.undistribute(&[]),
            Err(Error::MalformedKey(_))
        ));
        // a bare prefix is a valid distributed empty key
        assert_eq!(distributor.undistribute(&[3]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_bucket_of_validates_prefix() {
        let distributor = whole(4);
        assert_eq!(distributor.bucket_of(&[3, 9, 9]).unwrap(), 3);
        assert!(distributor.bucket_of(&[4, 9]).is_err());
        assert!(distributor.bucket_of(&[]).is_err());
    }

    #[test]
    fn test_all_distributed_keys() {
        let distributor = whole(32);
        let key = b"k";
        let all = distributor.all_distributed_keys(key);
        assert_eq!(all.len(), 32);
        assert!(all.contains(&distributor.distribute(key).unwrap()));
        for (i, k) in all.iter().enumerate() {
            assert_eq!(k[0] as usize, i);
            assert_eq!(&k[1..], key);
        }
    }

    #[test]
    fn test_bucket_for_scan_known_with_shared_entity() {
        let distributor = ranged(0, 4, 16);
        let start = b"appA\x00\x00";
        let stop = b"appA\xff\xff";
        assert_eq!(
            distributor.bucket_for_scan(start, stop),
            Some(distributor.bucket(start).unwrap())
        );
        assert_eq!(distributor.scan_ranges(start, stop).len(), 1);
    }

    #[test]
    fn test_scan_fans_out_when_bucket_unknown() {
        let distributor = ranged(0, 4, 16);
        // entity bytes differ between bounds
        let ranges = distributor.scan_ranges(b"appA", b"appB");
        assert_eq!(ranges.len(), 16);

        let whole_key = whole(8);
        let ranges = whole_key.scan_ranges(b"a", b"a\xff");
        assert_eq!(ranges.len(), 8);
        assert_eq!(ranges[2].start, b"\x02a".to_vec());
        assert_eq!(ranges[2].stop, b"\x02a\xff".to_vec());
    }

    #[test]
    fn test_unbounded_stop_ends_at_bucket_boundary() {
        let distributor = whole(256);
        let ranges = distributor.distributed_scan_ranges(b"", b"");
        assert_eq!(ranges[0].stop, vec![1]);
        assert_eq!(ranges[255].stop, Vec::<u8>::new());
    }
}
