//! Interval-keyed index used by the lock manager for admission control.
//!
//! The index maps exact `(begin, end)` keys to per-entry lock state and
//! answers two kinds of questions that are deliberately kept distinct:
//! exact-key lookup (for refcount and entry mutation) and overlap queries
//! (for deciding whether an acquisition may proceed). The backing structure
//! is an implementation detail; callers must not hold entry references
//! across anything that could mutate the index.

use crate::types::Interval;
use std::collections::BTreeMap;

/// State stored per exact interval key.
///
/// Invariants maintained by the lock manager:
/// - `exclusive` implies `refcount == 1`.
/// - `refcount` equals the number of live shared handles on this exact key
///   for a shared entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    /// Number of live handles referring to this exact interval.
    pub refcount: usize,
    /// Whether the entry currently represents an exclusive lock.
    pub exclusive: bool,
}

/// Exact-key interval index with overlap queries.
///
/// Keys are ordered by `(begin, end)`, which lets overlap scans stop at the
/// first key whose `begin` is at or past the query's `end`.
#[derive(Debug, Default)]
pub struct IntervalIndex {
    entries: BTreeMap<Interval, LockState>,
}

impl IntervalIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact-key lookup.
    pub fn find(&self, key: Interval) -> Option<&LockState> {
        self.entries.get(&key)
    }

    /// Exact-key lookup, mutable.
    pub fn find_mut(&mut self, key: Interval) -> Option<&mut LockState> {
        self.entries.get_mut(&key)
    }

    /// Insert an entry for `key`. Callers only insert when the key is
    /// absent; a pre-existing identical key is replaced.
    pub fn insert(&mut self, key: Interval, state: LockState) {
        self.entries.insert(key, state);
    }

    /// Remove the entry for an exact key. No-op if absent.
    pub fn erase(&mut self, key: Interval) {
        self.entries.remove(&key);
    }

    /// First entry whose interval overlaps `key`, if any.
    ///
    /// With `exclude_self`, an entry keyed exactly `key` is not eligible
    /// even though it trivially overlaps itself.
    pub fn overlap_first(&self, key: Interval, exclude_self: bool) -> Option<(Interval, &LockState)> {
        self.overlaps(key, exclude_self).next()
    }

    /// All entries whose intervals overlap `key`.
    pub fn overlap_all(&self, key: Interval, exclude_self: bool) -> Vec<(Interval, &LockState)> {
        self.overlaps(key, exclude_self).collect()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn overlaps(
        &self,
        key: Interval,
        exclude_self: bool,
    ) -> impl Iterator<Item = (Interval, &LockState)> + '_ {
        // Keys sorted by begin: nothing at or past `key.end` can overlap.
        self.entries
            .iter()
            .take_while(move |(k, _)| k.begin() < key.end())
            .filter(move |(k, _)| k.overlaps(&key) && !(exclude_self && **k == key))
            .map(|(k, s)| (*k, s))
    }
}
