//! A countdown completion barrier.
//!
//! A [`CompletionLatch`] is created with the number of participants it waits for. Each
//! participant counts down once when it finishes; waiters are released when the count
//! reaches zero. The latch is single-use: once released it stays released.

use std::{
    sync::{Arc, Condvar, Mutex},
    time::{Duration, Instant},
};

pub struct CompletionLatch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl CompletionLatch {
    /// Creates a latch waiting for `count` participants. A latch created with a count of
    /// zero is released from the start.
    pub fn new(count: usize) -> CompletionLatch {
        CompletionLatch {
            remaining: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    /// Records that one participant has finished.
    ///
    /// Counting down an already released latch has no effect.
    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        if *remaining == 0 {
            return;
        }
        *remaining -= 1;
        if *remaining == 0 {
            drop(remaining);
            self.released.notify_all();
        }
    }

    /// Returns a guard that counts the latch down when dropped, whether or not the
    /// owning participant ever ran.
    pub fn guard(self: &Arc<Self>) -> LatchGuard {
        LatchGuard(self.clone())
    }

    /// Number of participants that have not finished yet.
    pub fn remaining(&self) -> usize {
        *self.remaining.lock().unwrap()
    }

    pub fn is_released(&self) -> bool {
        self.remaining() == 0
    }

    /// Blocks until every participant has counted down.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining != 0 {
            remaining = self.released.wait(remaining).unwrap();
        }
    }

    /// Blocks until every participant has counted down or the timeout elapses.
    ///
    /// Returns `true` if the latch was released.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut remaining = self.remaining.lock().unwrap();
        while *remaining != 0 {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            remaining = self
                .released
                .wait_timeout(remaining, deadline - now)
                .unwrap()
                .0;
        }
        true
    }
}

/// Counts its latch down exactly once, on drop.
pub struct LatchGuard(Arc<CompletionLatch>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.count_down();
    }
}
