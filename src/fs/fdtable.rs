//! File Descriptor Table
//!
//! A per-process table mapping small integers to open file handles.
//!
//! # Design
//! - Fixed-size array of `FD_CAPACITY` slots
//! - Slots 0 and 1 are stdin/stdout; they are never handed to `open`
//! - Descriptors are allocated from a monotonically increasing counter;
//!   closed descriptors are not reused
//! - Exhaustion is reported, never overflowed

use alloc::sync::Arc;
use alloc::vec::Vec;

use super::OpenFile;

/// Number of descriptor slots per process.
pub const FD_CAPACITY: usize = 128;

/// A descriptor index.
///
/// This is a newtype to keep arbitrary user integers away from the table.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[repr(transparent)]
pub struct Fd(u32);

impl Fd {
    /// Standard input (console keyboard).
    pub const STDIN: Self = Self(0);

    /// Standard output (console).
    pub const STDOUT: Self = Self(1);

    /// First descriptor handed out by `open`.
    pub const FIRST_FILE: Self = Self(2);

    /// Interpret a raw user value as a descriptor.
    ///
    /// Returns None if the value is negative or past the table.
    #[inline]
    pub const fn new(raw: i32) -> Option<Self> {
        if raw >= 0 && (raw as usize) < FD_CAPACITY {
            Some(Self(raw as u32))
        } else {
            None
        }
    }

    /// Get the index value.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Value returned to user space.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0 as i32
    }
}

/// Error type for descriptor table operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdError {
    /// The slot is empty (never opened, closed, or reserved).
    SlotEmpty,
    /// Every slot has been handed out.
    Exhausted,
}

impl core::fmt::Display for FdError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SlotEmpty => write!(f, "descriptor is not open"),
            Self::Exhausted => write!(f, "descriptor table exhausted"),
        }
    }
}

type Slot = Option<Arc<dyn OpenFile>>;

/// Descriptor table of one process.
pub struct FdTable {
    /// Array of descriptor slots.
    slots: [Slot; FD_CAPACITY],
    /// Next descriptor `insert` will hand out.
    next_free: usize,
}

impl FdTable {
    /// Create an empty table; the first descriptor handed out is 2.
    pub const fn new() -> Self {
        const EMPTY: Slot = None;
        Self {
            slots: [EMPTY; FD_CAPACITY],
            next_free: Fd::FIRST_FILE.index(),
        }
    }

    /// Store `file` in the next free slot.
    pub fn insert(&mut self, file: Arc<dyn OpenFile>) -> Result<Fd, FdError> {
        let index = self.next_free;
        let slot = self.slots.get_mut(index).ok_or(FdError::Exhausted)?;
        *slot = Some(file);
        self.next_free += 1;
        Ok(Fd(index as u32))
    }

    /// Look up an open descriptor.
    #[inline]
    pub fn lookup(&self, fd: Fd) -> Result<&Arc<dyn OpenFile>, FdError> {
        self.slots[fd.index()].as_ref().ok_or(FdError::SlotEmpty)
    }

    /// Empty a slot, returning the handle it held.
    pub fn remove(&mut self, fd: Fd) -> Result<Arc<dyn OpenFile>, FdError> {
        self.slots[fd.index()].take().ok_or(FdError::SlotEmpty)
    }

    /// Empty every slot in `2..next_free`, returning the handles in
    /// descriptor order.
    pub fn drain(&mut self) -> Vec<Arc<dyn OpenFile>> {
        self.slots[Fd::FIRST_FILE.index()..self.next_free]
            .iter_mut()
            .filter_map(Option::take)
            .collect()
    }

    /// Descriptor the next successful `insert` will return.
    #[inline]
    pub fn next_free(&self) -> usize {
        self.next_free
    }

    /// Number of descriptors currently open.
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}
