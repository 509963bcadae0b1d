//! Move-only lock handles.
//!
//! A handle is the capability to release (or transition) exactly one
//! acquisition. Handles are not `Clone`: release authority has exactly one
//! owner at a time, which is what makes the reference-counting and
//! invalidation rules sound. An invalidated handle — the default-constructed
//! state, or what a consuming operation leaves behind conceptually — is a
//! no-op for every operation. Rust's move semantics make actual use of a
//! moved-from handle a compile error, so the runtime sentinel only backs
//! `Default` and the transition paths.

use crate::manager::LockCore;
use crate::types::Interval;
use std::sync::Arc;

/// Handle for a held shared lock.
///
/// Releases the lock on drop or [`unlock`](Self::unlock), and can be
/// atomically upgraded to an exclusive lock without releasing coverage of
/// the interval in between.
#[derive(Default)]
pub struct SharedLockHandle {
    inner: Option<(Arc<LockCore>, Interval)>,
}

impl SharedLockHandle {
    pub(crate) fn new(core: Arc<LockCore>, interval: Interval) -> Self {
        Self {
            inner: Some((core, interval)),
        }
    }

    /// Whether this handle still holds a lock.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// The locked interval, if the handle is active.
    pub fn interval(&self) -> Option<Interval> {
        self.inner.as_ref().map(|(_, interval)| *interval)
    }

    /// Release the lock. No-op on an invalidated handle.
    pub fn unlock(mut self) {
        self.release();
    }

    /// Upgrade to an exclusive lock on the same interval.
    ///
    /// Blocks until this handle is the sole holder of the exact interval and
    /// no other entry overlaps it. An invalidated handle yields an
    /// invalidated result.
    pub fn upgrade(mut self) -> ExclusiveLockHandle {
        match self.inner.take() {
            Some((core, interval)) => {
                core.upgrade(interval);
                ExclusiveLockHandle {
                    inner: Some((core, interval)),
                }
            }
            None => ExclusiveLockHandle::default(),
        }
    }

    fn release(&mut self) {
        if let Some((core, interval)) = self.inner.take() {
            core.release_shared(interval);
        }
    }
}

impl Drop for SharedLockHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SharedLockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.interval() {
            Some(interval) => write!(f, "SharedLockHandle({})", interval),
            None => write!(f, "SharedLockHandle(invalidated)"),
        }
    }
}

/// Handle for a held exclusive lock.
///
/// Releases the lock on drop or [`unlock`](Self::unlock), and can be
/// atomically downgraded to a shared lock without releasing coverage of the
/// interval in between.
#[derive(Default)]
pub struct ExclusiveLockHandle {
    inner: Option<(Arc<LockCore>, Interval)>,
}

impl ExclusiveLockHandle {
    pub(crate) fn new(core: Arc<LockCore>, interval: Interval) -> Self {
        Self {
            inner: Some((core, interval)),
        }
    }

    /// Whether this handle still holds a lock.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// The locked interval, if the handle is active.
    pub fn interval(&self) -> Option<Interval> {
        self.inner.as_ref().map(|(_, interval)| *interval)
    }

    /// Release the lock. No-op on an invalidated handle.
    pub fn unlock(mut self) {
        self.release();
    }

    /// Downgrade to a shared lock on the same interval.
    ///
    /// Waits until no other overlapping entry is exclusive, then flips this
    /// entry to shared in place. Other shared waiters on overlapping ranges
    /// may proceed once the transition completes. An invalidated handle
    /// yields an invalidated result.
    pub fn downgrade(mut self) -> SharedLockHandle {
        match self.inner.take() {
            Some((core, interval)) => {
                core.downgrade(interval);
                SharedLockHandle {
                    inner: Some((core, interval)),
                }
            }
            None => SharedLockHandle::default(),
        }
    }

    fn release(&mut self) {
        if let Some((core, interval)) = self.inner.take() {
            core.release_exclusive(interval);
        }
    }
}

impl Drop for ExclusiveLockHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for ExclusiveLockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.interval() {
            Some(interval) => write!(f, "ExclusiveLockHandle({})", interval),
            None => write!(f, "ExclusiveLockHandle(invalidated)"),
        }
    }
}
