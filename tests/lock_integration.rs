//! Integration tests driving the lock manager from multiple OS threads.

use rangelock::{Interval, RangeLockManager};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

fn iv(b: u64, e: u64) -> Interval {
    Interval::new(b, e).unwrap()
}

/// Long enough that a predicate which should block is observably blocked,
/// short enough to keep the suite fast.
const BLOCK_CHECK: Duration = Duration::from_millis(100);
const COMPLETION: Duration = Duration::from_secs(5);

#[test]
fn test_shared_waits_for_exclusive_release() {
    let manager = Arc::new(RangeLockManager::new());
    let writer = manager.acquire_exclusive(iv(0, 10));

    let (tx, rx) = mpsc::channel();
    let m = Arc::clone(&manager);
    let waiter = thread::spawn(move || {
        let reader = m.acquire_shared(iv(5, 15));
        tx.send(()).unwrap();
        reader.unlock();
    });

    // The overlapping shared acquisition must not complete yet.
    assert!(rx.recv_timeout(BLOCK_CHECK).is_err());

    writer.unlock();
    rx.recv_timeout(COMPLETION)
        .expect("reader should proceed once the writer releases");
    waiter.join().unwrap();
}

#[test]
fn test_concurrent_shared_on_identical_interval() {
    let manager = Arc::new(RangeLockManager::new());
    let (tx, rx) = mpsc::channel();

    let mut workers = Vec::new();
    for _ in 0..4 {
        let m = Arc::clone(&manager);
        let tx = tx.clone();
        workers.push(thread::spawn(move || {
            let reader = m.acquire_shared(iv(0, 10));
            tx.send(()).unwrap();
            // Hold until every thread has acquired.
            thread::sleep(Duration::from_millis(50));
            reader.unlock();
        }));
    }

    // All four must acquire without waiting on each other.
    for _ in 0..4 {
        rx.recv_timeout(COMPLETION).expect("shared lock should not block");
    }

    // Identical intervals share one reference-counted entry.
    assert_eq!(manager.stats().active_entries, 1);

    for worker in workers {
        worker.join().unwrap();
    }
    assert!(manager.is_idle());
}

#[test]
fn test_upgrade_blocks_until_sole_holder() {
    let manager = Arc::new(RangeLockManager::new());

    let a = manager.acquire_shared(iv(0, 10));
    let b = manager.acquire_shared(iv(0, 10));

    let (tx, rx) = mpsc::channel();
    let upgrader = thread::spawn(move || {
        let writer = a.upgrade();
        tx.send(()).unwrap();
        writer.unlock();
    });

    // refcount is 2: the upgrade must wait.
    assert!(rx.recv_timeout(BLOCK_CHECK).is_err());

    b.unlock();
    rx.recv_timeout(COMPLETION)
        .expect("upgrade should complete once the other holder releases");
    upgrader.join().unwrap();
    assert!(manager.is_idle());
}

#[test]
fn test_upgrade_blocks_on_overlapping_entry() {
    let manager = Arc::new(RangeLockManager::new());

    let a = manager.acquire_shared(iv(0, 10));
    // Sole holder of its exact key, but an overlapping entry exists.
    let other = manager.acquire_shared(iv(5, 15));

    let (tx, rx) = mpsc::channel();
    let upgrader = thread::spawn(move || {
        let writer = a.upgrade();
        tx.send(()).unwrap();
        writer.unlock();
    });

    assert!(rx.recv_timeout(BLOCK_CHECK).is_err());

    other.unlock();
    rx.recv_timeout(COMPLETION)
        .expect("upgrade should complete once the overlap clears");
    upgrader.join().unwrap();
}

#[test]
fn test_downgrade_admits_shared_but_not_exclusive() {
    let manager = Arc::new(RangeLockManager::new());

    let writer = manager.acquire_exclusive(iv(0, 10));
    let reader = writer.downgrade();

    // Overlapping shared acquisition proceeds against the downgraded entry.
    let other = manager.acquire_shared(iv(5, 15));

    let (tx, rx) = mpsc::channel();
    let m = Arc::clone(&manager);
    let excl_waiter = thread::spawn(move || {
        let w = m.acquire_exclusive(iv(5, 15));
        tx.send(()).unwrap();
        w.unlock();
    });

    assert!(rx.recv_timeout(BLOCK_CHECK).is_err());

    other.unlock();
    // Still blocked: the downgraded handle holds [0, 10) shared.
    assert!(rx.recv_timeout(BLOCK_CHECK).is_err());

    reader.unlock();
    rx.recv_timeout(COMPLETION)
        .expect("exclusive should proceed once all shared holders release");
    excl_waiter.join().unwrap();
}

#[test]
fn test_disjoint_exclusive_locks_run_in_parallel() {
    let manager = Arc::new(RangeLockManager::new());
    // Both workers must hold their lock at the same time to pass the
    // barrier; if disjoint ranges serialized, this would deadlock.
    let barrier = Arc::new(std::sync::Barrier::new(2));

    let mut workers = Vec::new();
    for (b, e) in [(0, 5), (10, 15)] {
        let m = Arc::clone(&manager);
        let barrier = Arc::clone(&barrier);
        workers.push(thread::spawn(move || {
            let writer = m.acquire_exclusive(iv(b, e));
            barrier.wait();
            writer.unlock();
        }));
    }

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(manager.stats().contended, 0);
}

#[test]
fn test_manager_drop_waits_for_outstanding_locks() {
    let manager = RangeLockManager::new();
    let handle = manager.acquire_exclusive(iv(0, 10));

    let holder = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        handle.unlock();
    });

    let start = Instant::now();
    drop(manager);
    assert!(
        start.elapsed() >= Duration::from_millis(150),
        "teardown returned before the outstanding lock was released"
    );
    holder.join().unwrap();
}

#[test]
fn test_handle_outlives_manager_value_safely() {
    let manager = RangeLockManager::new();
    let reader = manager.acquire_shared(iv(0, 10));

    let dropper = thread::spawn(move || drop(manager));
    thread::sleep(Duration::from_millis(100));

    // Teardown is parked on the drain wait; releasing unblocks it.
    reader.unlock();
    dropper.join().unwrap();
}

/// Mutual-exclusion stress: every locked cell carries a counter that readers
/// bump by 1 and writers by 1000. Any overlap violation shows up as an
/// impossible counter value at acquisition time.
#[test]
fn test_mutual_exclusion_under_contention() {
    const CELLS: u64 = 32;
    const THREADS: usize = 8;
    const ROUNDS: usize = 40;

    let manager = Arc::new(RangeLockManager::new());
    let cells: Arc<Vec<AtomicI64>> =
        Arc::new((0..CELLS).map(|_| AtomicI64::new(0)).collect());

    let mut workers = Vec::new();
    for t in 0..THREADS {
        let m = Arc::clone(&manager);
        let cells = Arc::clone(&cells);
        workers.push(thread::spawn(move || {
            // Cheap deterministic per-thread sequence; no fairness needed.
            let mut seed = (t as u64).wrapping_mul(0x9e3779b97f4a7c15) + 1;
            for _ in 0..ROUNDS {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let b = (seed >> 33) % CELLS;
                let len = 1 + (seed >> 17) % 8;
                let e = (b + len).min(CELLS);
                let exclusive = seed & 1 == 0;

                if exclusive {
                    let writer = m.acquire_exclusive(iv(b, e));
                    for cell in &cells[b as usize..e as usize] {
                        assert_eq!(cell.fetch_add(1000, Ordering::SeqCst), 0);
                    }
                    for cell in &cells[b as usize..e as usize] {
                        cell.fetch_sub(1000, Ordering::SeqCst);
                    }
                    writer.unlock();
                } else {
                    let reader = m.acquire_shared(iv(b, e));
                    for cell in &cells[b as usize..e as usize] {
                        assert!(cell.fetch_add(1, Ordering::SeqCst) < 1000);
                    }
                    for cell in &cells[b as usize..e as usize] {
                        cell.fetch_sub(1, Ordering::SeqCst);
                    }
                    reader.unlock();
                }
            }
        }));
    }

    for worker in workers {
        worker.join().unwrap();
    }

    assert!(manager.is_idle());
    for cell in cells.iter() {
        assert_eq!(cell.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_stats_after_mixed_workload() {
    let manager = RangeLockManager::new();

    let reader = manager.acquire_shared(iv(0, 10));
    let writer = reader.upgrade();
    let reader = writer.downgrade();
    reader.unlock();

    let writer = manager.acquire_exclusive(iv(0, 10));
    writer.unlock();

    let stats = manager.stats();
    assert_eq!(stats.shared_acquired, 1);
    assert_eq!(stats.exclusive_acquired, 1);
    assert_eq!(stats.upgraded, 1);
    assert_eq!(stats.downgraded, 1);
    assert_eq!(stats.released, 2);
    assert_eq!(stats.active_entries, 0);
}
