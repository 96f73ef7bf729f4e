//! Reader/writer gate for a process's file operations
//!
//! Any number of read-side operations may run at once; a write-side
//! operation runs alone. State:
//! - `readers`: count of admitted read-side operations, guarded by its own
//!   spinlock (the short-lived count token)
//! - `writer`: binary semaphore (the write token)
//!
//! The first reader in takes the write token while still holding the count
//! lock, so later readers queue behind it rather than slipping past a
//! writer. The last reader out returns the token.
//!
//! Each process owns its own gate; unrelated processes never contend.

use spin::Mutex;

use super::semaphore::Semaphore;

/// Readers-preferred exclusion over one process's file operations.
pub struct RwGate {
    readers: Mutex<usize>,
    writer: Semaphore,
}

impl RwGate {
    /// Create an open gate.
    pub const fn new() -> Self {
        Self {
            readers: Mutex::new(0),
            writer: Semaphore::new(1),
        }
    }

    /// Enter as a reader. The admission is released on drop.
    pub fn admit_reader(&self) -> ReadAdmission<'_> {
        let mut readers = self.readers.lock();
        *readers += 1;
        if *readers == 1 {
            self.writer.wait();
        }
        ReadAdmission { gate: self }
    }

    /// Enter as the sole writer. The admission is released on drop.
    pub fn admit_writer(&self) -> WriteAdmission<'_> {
        self.writer.wait();
        WriteAdmission { gate: self }
    }

    /// Run `f` with read-side admission.
    pub fn read<R>(&self, f: impl FnOnce() -> R) -> R {
        let _admission = self.admit_reader();
        f()
    }

    /// Run `f` with exclusive write-side admission.
    pub fn write<R>(&self, f: impl FnOnce() -> R) -> R {
        let _admission = self.admit_writer();
        f()
    }

    /// Number of read-side operations currently admitted.
    pub fn active_readers(&self) -> usize {
        *self.readers.lock()
    }

    /// Whether the write token is currently taken (by a writer or by the
    /// reader group).
    pub fn is_locked(&self) -> bool {
        self.writer.available() == 0
    }

    fn leave_reader(&self) {
        let mut readers = self.readers.lock();
        *readers -= 1;
        if *readers == 0 {
            self.writer.signal();
        }
    }
}

impl Default for RwGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-side admission to an [`RwGate`].
#[must_use = "the admission ends as soon as it is dropped"]
pub struct ReadAdmission<'a> {
    gate: &'a RwGate,
}

impl Drop for ReadAdmission<'_> {
    fn drop(&mut self) {
        self.gate.leave_reader();
    }
}

/// Write-side admission to an [`RwGate`].
#[must_use = "the admission ends as soon as it is dropped"]
pub struct WriteAdmission<'a> {
    gate: &'a RwGate,
}

impl Drop for WriteAdmission<'_> {
    fn drop(&mut self) {
        self.gate.writer.signal();
    }
}
