//! Counting semaphore
//!
//! Unlike a mutex guard, a permit taken with [`Semaphore::wait`] may be
//! returned with [`Semaphore::signal`] from a different thread. The
//! reader/writer gate relies on this: the first reader in takes the write
//! token and whichever reader leaves last gives it back.

use spin::Mutex;

/// A counting semaphore.
pub struct Semaphore {
    permits: Mutex<usize>,
}

impl Semaphore {
    /// Create a semaphore holding `permits` permits.
    pub const fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
        }
    }

    /// Take a permit, waiting until one is available.
    pub fn wait(&self) {
        // TODO: block on the scheduler's wait queue instead of spinning once
        // the thread layer exposes one.
        while !self.try_wait() {
            core::hint::spin_loop();
        }
    }

    /// Take a permit if one is available right now.
    pub fn try_wait(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Return a permit.
    pub fn signal(&self) {
        *self.permits.lock() += 1;
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}
