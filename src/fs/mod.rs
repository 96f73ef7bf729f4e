//! File service interface and per-process descriptor table
//!
//! The file system itself lives elsewhere; the syscall layer only sees it
//! through [`FileSystem`] (path operations) and [`OpenFile`] (operations on
//! an open handle). Byte counts follow the file system's own contract and
//! are passed back to user programs unchanged.

pub mod fdtable;

use alloc::sync::Arc;

pub use fdtable::{Fd, FdError, FdTable, FD_CAPACITY};

/// Path-level file system operations.
pub trait FileSystem: Send + Sync {
    /// Open the file at `path`. `None` if it does not exist or cannot be
    /// opened.
    fn open(&self, path: &str) -> Option<Arc<dyn OpenFile>>;

    /// Create a file of `initial_size` bytes.
    fn create(&self, path: &str, initial_size: u32) -> bool;

    /// Remove the file at `path`.
    fn remove(&self, path: &str) -> bool;
}

/// An open file handle.
///
/// Handles carry their own position; implementations synchronize their
/// internal state so that methods take `&self`.
pub trait OpenFile: Send + Sync {
    /// Read into `buf` from the current position.
    fn read(&self, buf: &mut [u8]) -> i32;

    /// Write `buf` at the current position.
    fn write(&self, buf: &[u8]) -> i32;

    /// File length in bytes.
    fn length(&self) -> i32;

    /// Move the position to `pos`.
    fn seek(&self, pos: u32);

    /// Current position.
    fn tell(&self) -> u32;

    /// Refuse writes through any handle while this one stays open.
    fn deny_write(&self);

    /// Release the handle back to the file system.
    fn close(&self);
}
