//! Core value types for rangelock.

use crate::error::{RangeLockError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A half-open interval `[begin, end)` over the locked resource's index space.
///
/// Intervals are the unit of locking. Two acquisitions with the identical
/// `(begin, end)` pair refer to the same lock entry; acquisitions with
/// overlapping but non-identical bounds are distinct entries that still
/// respect mutual-exclusion rules against each other.
///
/// The derived ordering is lexicographic on `(begin, end)`, which is what the
/// index relies on for its overlap scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    begin: u64,
    end: u64,
}

impl Interval {
    /// Create a new interval. Fails if `begin > end`.
    pub fn new(begin: u64, end: u64) -> Result<Self> {
        if begin > end {
            return Err(RangeLockError::InvalidInterval { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Start of the interval (inclusive).
    pub fn begin(&self) -> u64 {
        self.begin
    }

    /// End of the interval (exclusive).
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of indices covered.
    pub fn len(&self) -> u64 {
        self.end - self.begin
    }

    /// Whether the interval covers nothing.
    ///
    /// An empty interval overlaps no other interval, itself included.
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Whether two intervals have a non-empty intersection.
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.begin < other.end && other.begin < self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

impl TryFrom<Range<u64>> for Interval {
    type Error = RangeLockError;

    fn try_from(range: Range<u64>) -> Result<Self> {
        Interval::new(range.start, range.end)
    }
}
