//! rangelock - A range-partitioned reader/writer lock manager.
//!
//! Callers request shared or exclusive access to a half-open interval
//! `[begin, end)` of a linear resource — byte ranges of a file, key ranges
//! of a store, regions of a buffer. Only operations whose intervals overlap
//! serialize against each other; disjoint ranges proceed fully in parallel.
//! A held shared lock can be atomically upgraded to exclusive, and an
//! exclusive lock downgraded to shared, without releasing coverage of the
//! interval in between.
//!
//! # Features
//!
//! - **Range granularity**: disjoint intervals never contend.
//! - **Reader/writer semantics**: any number of shared holders, or one
//!   exclusive holder, per overlapping region.
//! - **Upgrade/downgrade**: in-place lock transitions that never give up
//!   the interval.
//! - **RAII handles**: move-only handles release on drop; a moved-from
//!   handle cannot be misused.
//! - **Drain on teardown**: dropping the manager waits for all outstanding
//!   locks, so a lock can never outlive its coordination state.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       rangelock                         │
//! ├─────────────────────────────────────────────────────────┤
//! │  Handles: SharedLockHandle | ExclusiveLockHandle        │
//! ├─────────────────────────────────────────────────────────┤
//! │  RangeLockManager: mutex + condvar admission control    │
//! ├─────────────────────────────────────────────────────────┤
//! │  IntervalIndex: exact-key lookup | overlap queries      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use rangelock::{Interval, RangeLockManager};
//!
//! fn main() -> rangelock::Result<()> {
//!     let manager = RangeLockManager::new();
//!
//!     // Shared locks on overlapping ranges coexist.
//!     let a = manager.acquire_shared(Interval::new(0, 100)?);
//!     let b = manager.acquire_shared(Interval::new(50, 150)?);
//!
//!     // An exclusive lock on a disjoint range does not block.
//!     let c = manager.acquire_exclusive(Interval::new(200, 300)?);
//!
//!     drop(b);
//!     // Sole holder with no other overlap: upgrade succeeds immediately.
//!     let a = a.upgrade();
//!
//!     a.unlock();
//!     c.unlock();
//!     Ok(())
//! }
//! ```
//!
//! # Blocking semantics
//!
//! `acquire_shared`, `acquire_exclusive`, `upgrade`, and `downgrade` block
//! the calling thread until their admission predicate holds; there are no
//! timeouts and no cancellation. The `try_acquire_*` variants check the
//! same predicate once and return `None` instead of waiting. No fairness is
//! guaranteed: waiters are woken by broadcast and race to re-check their
//! predicates. A caller holding one interval's lock while blocking on an
//! overlapping interval held by a thread that blocks on the first can
//! deadlock; the manager does not detect this.

pub mod error;
pub mod handle;
pub mod index;
pub mod manager;
pub mod types;

pub use error::{RangeLockError, Result};
pub use handle::{ExclusiveLockHandle, SharedLockHandle};
pub use manager::{LockConfig, LockStats, RangeLockManager};
pub use types::Interval;
