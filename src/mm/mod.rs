//! Memory management interfaces for the syscall layer
//!
//! Provides:
//! - Address types for the 32-bit user ABI
//! - The `AddressSpace` seam through which user memory is reached
//! - A software page directory implementing it
//!
//! # Security Principles
//! - User memory is only touched through a translated physical address
//! - Every access stays within a single frame

pub mod address;
pub mod paging;

pub use address::{PhysAddr, VirtAddr, PAGE_SIZE, PHYS_BASE};
pub use paging::{Mapping, MappingError, PageDirectory, PageFlags};

/// A process address space, as seen by the kernel.
///
/// Implemented by the virtual memory subsystem. `translate` answers whether
/// a user address is currently mapped; `load` and `store` move bytes through
/// the physical address it returned. Callers never pass a range that
/// crosses a page boundary to `load`/`store`.
pub trait AddressSpace: Send + Sync {
    /// Translate `va` through the page table.
    ///
    /// Returns `None` if the page is not present.
    fn translate(&self, va: VirtAddr) -> Option<Mapping>;

    /// Copy `dst.len()` bytes starting at `pa` into `dst`.
    fn load(&self, pa: PhysAddr, dst: &mut [u8]);

    /// Copy `src` into memory starting at `pa`.
    fn store(&self, pa: PhysAddr, src: &[u8]);
}
