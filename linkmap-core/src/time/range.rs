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

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Closed time range `[from, to]` in milliseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Range {
    from: i64,
    to: i64,
}

impl Range {
    /// Requires `0 <= from <= to`
    pub fn between(from: i64, to: i64) -> Result<Self> {
        if from < 0 || from > to {
            return Err(Error::InvalidTimeRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// Range ending at `to` and spanning `duration_ms`, clamped at epoch
    pub fn ending_at(to: i64, duration_ms: i64) -> Result<Self> {
        Self::between(to.saturating_sub(duration_ms).max(0), to)
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn duration_ms(&self) -> i64 {
        self.to - self.from
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        self.from <= timestamp && timestamp <= self.to
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_between_validates_order() {
        assert!(Range::between(10, 10).is_ok());
        assert!(matches!(
            Range::between(20, 10),
            Err(Error::InvalidTimeRange { from: 20, to: 10 })
        ));
        assert!(Range::between(-1, 10).is_err());
    }

    #[test]
    fn test_ending_at_clamps_to_epoch() {
        let range = Range::ending_at(1_000, 5_000).unwrap();
        assert_eq!(range.from(), 0);
        assert_eq!(range.duration_ms(), 1_000);
    }
}
