//! Range-partitioned lock manager.
//!
//! One mutex and one condition variable coordinate every acquisition over
//! the [`IntervalIndex`]. Blocking operations wait on a predicate that is
//! re-evaluated after every wakeup (the standard monitor idiom, tolerant of
//! spurious wakeups), and every release or lock transition broadcasts to all
//! waiters. Waiters whose predicate is still false simply re-block; this
//! trades wakeup precision for correctness under arbitrary overlap
//! topologies.

use crate::error::{RangeLockError, Result};
use crate::handle::{ExclusiveLockHandle, SharedLockHandle};
use crate::index::{IntervalIndex, LockState};
use crate::types::Interval;
use parking_lot::{Condvar, Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Lock manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Label attached to tracing events, useful when several managers
    /// coexist in one process.
    pub name: String,
    /// Emit a warning when a blocking acquisition waits longer than this
    /// many milliseconds. Zero disables the warning.
    pub contention_warn_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            name: "rangelock".to_string(),
            contention_warn_ms: 0,
        }
    }
}

impl LockConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RangeLockError::InvalidConfig {
                field: "name".to_string(),
                reason: "manager name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Internal lock counters.
#[derive(Default)]
struct Counters {
    shared_acquired: AtomicU64,
    exclusive_acquired: AtomicU64,
    released: AtomicU64,
    upgraded: AtomicU64,
    downgraded: AtomicU64,
    contended: AtomicU64,
    denied: AtomicU64,
}

/// Public lock statistics snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStats {
    /// Shared locks acquired. Downgrades count under `downgraded`, not here.
    pub shared_acquired: u64,
    /// Exclusive locks acquired.
    pub exclusive_acquired: u64,
    /// Locks released, shared and exclusive combined.
    pub released: u64,
    /// Completed shared-to-exclusive upgrades.
    pub upgraded: u64,
    /// Completed exclusive-to-shared downgrades.
    pub downgraded: u64,
    /// Acquisitions or transitions that had to wait at least once.
    pub contended: u64,
    /// Non-blocking try-acquisitions that were refused.
    pub denied: u64,
    /// Interval entries currently in the index.
    pub active_entries: usize,
}

/// No overlapping entry is exclusive. With `exclude_self`, the entry keyed
/// exactly `interval` does not count against itself.
fn no_exclusive_overlap(index: &IntervalIndex, interval: Interval, exclude_self: bool) -> bool {
    index
        .overlap_all(interval, exclude_self)
        .iter()
        .all(|(_, state)| !state.exclusive)
}

/// Nothing overlaps `interval` and the exact key is vacant. For non-empty
/// intervals overlap emptiness already implies vacancy (a non-empty key
/// overlaps itself); the explicit `find` matters for empty intervals, which
/// overlap nothing — without it an exclusive insert would replace a live
/// entry at the identical key.
fn vacant_for_exclusive(index: &IntervalIndex, interval: Interval) -> bool {
    index.find(interval).is_none() && index.overlap_first(interval, false).is_none()
}

/// Shared core behind the manager and every handle it issues.
///
/// Handles keep this alive through an `Arc`, so a handle never dangles even
/// if it outlives the [`RangeLockManager`] value; the manager's drop blocks
/// until the index drains instead.
pub(crate) struct LockCore {
    index: Mutex<IntervalIndex>,
    available: Condvar,
    counters: Counters,
    config: LockConfig,
}

impl LockCore {
    fn new(config: LockConfig) -> Self {
        Self {
            index: Mutex::new(IntervalIndex::new()),
            available: Condvar::new(),
            counters: Counters::default(),
            config,
        }
    }

    /// Block until `ready` holds, re-checking after every wakeup.
    fn wait_until<F>(
        &self,
        guard: &mut MutexGuard<'_, IntervalIndex>,
        mut ready: F,
        op: &'static str,
        interval: Interval,
    ) where
        F: FnMut(&IntervalIndex) -> bool,
    {
        if ready(&**guard) {
            return;
        }

        self.counters.contended.fetch_add(1, Ordering::Relaxed);
        trace!(
            manager = %self.config.name,
            interval = %interval,
            op,
            "waiting for conflicting locks"
        );

        let start = Instant::now();
        self.available.wait_while(guard, |index| !ready(index));

        let waited = start.elapsed();
        if self.config.contention_warn_ms > 0
            && waited >= Duration::from_millis(self.config.contention_warn_ms)
        {
            warn!(
                manager = %self.config.name,
                interval = %interval,
                op,
                waited_ms = u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
                "slow lock acquisition"
            );
        }
    }

    pub(crate) fn acquire_shared(&self, interval: Interval) {
        let mut index = self.index.lock();
        self.wait_until(
            &mut index,
            |index| no_exclusive_overlap(index, interval, false),
            "acquire_shared",
            interval,
        );

        // Coincident shared locks on the identical key share one entry.
        match index.find_mut(interval) {
            Some(state) => state.refcount += 1,
            None => index.insert(
                interval,
                LockState {
                    refcount: 1,
                    exclusive: false,
                },
            ),
        }

        self.counters.shared_acquired.fetch_add(1, Ordering::Relaxed);
        trace!(manager = %self.config.name, interval = %interval, "shared lock acquired");
    }

    pub(crate) fn acquire_exclusive(&self, interval: Interval) {
        let mut index = self.index.lock();
        self.wait_until(
            &mut index,
            |index| vacant_for_exclusive(index, interval),
            "acquire_exclusive",
            interval,
        );

        // The predicate guarantees the exact key is vacant and nothing
        // overlaps, so this is a fresh entry.
        index.insert(
            interval,
            LockState {
                refcount: 1,
                exclusive: true,
            },
        );

        self.counters
            .exclusive_acquired
            .fetch_add(1, Ordering::Relaxed);
        trace!(manager = %self.config.name, interval = %interval, "exclusive lock acquired");
    }

    pub(crate) fn try_acquire_shared(&self, interval: Interval) -> bool {
        let mut index = self.index.lock();
        if !no_exclusive_overlap(&index, interval, false) {
            self.counters.denied.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        match index.find_mut(interval) {
            Some(state) => state.refcount += 1,
            None => index.insert(
                interval,
                LockState {
                    refcount: 1,
                    exclusive: false,
                },
            ),
        }

        self.counters.shared_acquired.fetch_add(1, Ordering::Relaxed);
        true
    }

    pub(crate) fn try_acquire_exclusive(&self, interval: Interval) -> bool {
        let mut index = self.index.lock();
        if !vacant_for_exclusive(&index, interval) {
            self.counters.denied.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        index.insert(
            interval,
            LockState {
                refcount: 1,
                exclusive: true,
            },
        );

        self.counters
            .exclusive_acquired
            .fetch_add(1, Ordering::Relaxed);
        true
    }

    pub(crate) fn release_shared(&self, interval: Interval) {
        let mut index = self.index.lock();
        if let Some(state) = index.find_mut(interval) {
            state.refcount -= 1;
            if state.refcount == 0 {
                index.erase(interval);
            }
        }
        drop(index);

        self.counters.released.fetch_add(1, Ordering::Relaxed);
        self.available.notify_all();
        trace!(manager = %self.config.name, interval = %interval, "shared lock released");
    }

    pub(crate) fn release_exclusive(&self, interval: Interval) {
        let mut index = self.index.lock();
        index.erase(interval);
        drop(index);

        self.counters.released.fetch_add(1, Ordering::Relaxed);
        self.available.notify_all();
        trace!(manager = %self.config.name, interval = %interval, "exclusive lock released");
    }

    /// Flip the caller's exclusive entry to shared in place. Waits until no
    /// *other* overlapping entry is exclusive; the caller's own entry is
    /// still exclusive here and must not count against itself.
    pub(crate) fn downgrade(&self, interval: Interval) {
        let mut index = self.index.lock();
        self.wait_until(
            &mut index,
            |index| no_exclusive_overlap(index, interval, true),
            "downgrade",
            interval,
        );

        if let Some(state) = index.find_mut(interval) {
            state.exclusive = false;
        }
        drop(index);

        self.counters.downgraded.fetch_add(1, Ordering::Relaxed);
        self.available.notify_all();
        trace!(manager = %self.config.name, interval = %interval, "lock downgraded to shared");
    }

    /// Flip the caller's shared entry to exclusive in place. Waits until the
    /// caller is the sole holder of the exact key and nothing else overlaps.
    pub(crate) fn upgrade(&self, interval: Interval) {
        let mut index = self.index.lock();
        self.wait_until(
            &mut index,
            |index| {
                index
                    .find(interval)
                    .is_some_and(|state| state.refcount == 1)
                    && index.overlap_first(interval, true).is_none()
            },
            "upgrade",
            interval,
        );

        // The index gives no reference stability across a wait; resolve the
        // entry again before mutating it.
        if let Some(state) = index.find_mut(interval) {
            state.exclusive = true;
        }
        drop(index);

        self.counters.upgraded.fetch_add(1, Ordering::Relaxed);
        self.available.notify_all();
        trace!(manager = %self.config.name, interval = %interval, "lock upgraded to exclusive");
    }

    fn stats(&self) -> LockStats {
        let active_entries = self.index.lock().len();
        LockStats {
            shared_acquired: self.counters.shared_acquired.load(Ordering::Relaxed),
            exclusive_acquired: self.counters.exclusive_acquired.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
            upgraded: self.counters.upgraded.load(Ordering::Relaxed),
            downgraded: self.counters.downgraded.load(Ordering::Relaxed),
            contended: self.counters.contended.load(Ordering::Relaxed),
            denied: self.counters.denied.load(Ordering::Relaxed),
            active_entries,
        }
    }
}

/// The range-partitioned reader/writer lock manager.
///
/// Operations whose intervals overlap serialize against each other; disjoint
/// intervals proceed fully in parallel. Acquisitions return move-only
/// handles that release on drop and can be upgraded or downgraded without
/// giving up coverage of the interval in between.
///
/// Dropping the manager blocks until every outstanding lock has been
/// released, so the coordination state strictly outlives all locks it
/// issued. A leaked handle therefore hangs teardown; treat that as a
/// programming error, not a recoverable condition.
///
/// # Example
///
/// ```rust
/// use rangelock::{Interval, RangeLockManager};
///
/// # fn main() -> rangelock::Result<()> {
/// let manager = RangeLockManager::new();
///
/// let readers = manager.acquire_shared(Interval::new(0, 4096)?);
/// // Disjoint range, does not block.
/// let writer = manager.acquire_exclusive(Interval::new(4096, 8192)?);
///
/// drop(writer);
/// let sole_writer = readers.upgrade();
/// sole_writer.unlock();
/// # Ok(())
/// # }
/// ```
pub struct RangeLockManager {
    core: Arc<LockCore>,
}

impl RangeLockManager {
    /// Create a manager with the default configuration.
    pub fn new() -> Self {
        Self {
            core: Arc::new(LockCore::new(LockConfig::default())),
        }
    }

    /// Create a manager with an explicit configuration.
    ///
    /// Fails if the configuration is invalid.
    pub fn with_config(config: LockConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: Arc::new(LockCore::new(config)),
        })
    }

    /// Acquire a shared lock on `interval`.
    ///
    /// Blocks until no overlapping entry is exclusive. Multiple shared
    /// holders of the identical interval share one reference-counted entry;
    /// shared holders of merely overlapping intervals coexist as distinct
    /// entries.
    pub fn acquire_shared(&self, interval: Interval) -> SharedLockHandle {
        self.core.acquire_shared(interval);
        SharedLockHandle::new(Arc::clone(&self.core), interval)
    }

    /// Acquire an exclusive lock on `interval`.
    ///
    /// Blocks until nothing overlaps `interval`, shared entries included.
    pub fn acquire_exclusive(&self, interval: Interval) -> ExclusiveLockHandle {
        self.core.acquire_exclusive(interval);
        ExclusiveLockHandle::new(Arc::clone(&self.core), interval)
    }

    /// Non-blocking variant of [`acquire_shared`](Self::acquire_shared).
    /// Returns `None` if the lock is not immediately available.
    pub fn try_acquire_shared(&self, interval: Interval) -> Option<SharedLockHandle> {
        self.core
            .try_acquire_shared(interval)
            .then(|| SharedLockHandle::new(Arc::clone(&self.core), interval))
    }

    /// Non-blocking variant of [`acquire_exclusive`](Self::acquire_exclusive).
    /// Returns `None` if the lock is not immediately available.
    pub fn try_acquire_exclusive(&self, interval: Interval) -> Option<ExclusiveLockHandle> {
        self.core
            .try_acquire_exclusive(interval)
            .then(|| ExclusiveLockHandle::new(Arc::clone(&self.core), interval))
    }

    /// Whether no locks are currently outstanding.
    pub fn is_idle(&self) -> bool {
        self.core.index.lock().is_empty()
    }

    /// Snapshot of lock statistics.
    pub fn stats(&self) -> LockStats {
        self.core.stats()
    }
}

impl Default for RangeLockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RangeLockManager {
    fn drop(&mut self) {
        let mut index = self.core.index.lock();
        if !index.is_empty() {
            debug!(
                manager = %self.core.config.name,
                outstanding = index.len(),
                "manager teardown waiting for outstanding locks"
            );
        }
        self.core.available.wait_while(&mut index, |index| !index.is_empty());
    }
}
