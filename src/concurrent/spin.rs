//! Test-and-test-and-set spin lock.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};
use parking_lot::lock_api::{GuardSend, RawMutex};

/// A raw spin lock for use with [`lock_api::Mutex`](parking_lot::lock_api::Mutex).
///
/// Waiters spin on a relaxed load and only attempt the compare-exchange once
/// the flag reads clear. There is no back-off, no timeout and no fairness.
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

impl RawSpinLock {
    /// Creates an unlocked lock.
    pub const fn new() -> Self {
        RawSpinLock {
            locked: AtomicBool::new(false),
        }
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: `lock` and `try_lock` only return once this thread flipped the flag
// from false to true with acquire ordering, and `unlock` clears it with
// release ordering, so at most one holder exists at a time.
unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: RawSpinLock = RawSpinLock::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        loop {
            while self.locked.load(Ordering::Relaxed) {
                spin_loop();
            }
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                return;
            }
        }
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}
