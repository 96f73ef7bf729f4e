//! Physical and Virtual Address Types
//!
//! Type-safe wrappers for the 32-bit addresses user programs hand to the
//! kernel, kept apart from the physical addresses they translate to.
//!
//! # Address Space Layout
//! - `[0, PHYS_BASE)`: user space, one private mapping per process
//! - `[PHYS_BASE, 4 GiB)`: kernel space, never reachable from user mode
//!
//! # Security Properties
//! - Physical addresses cannot be dereferenced directly
//! - The null page is never a valid user address
//! - Range arithmetic is checked, never wrapping

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// Base of the kernel half of every address space.
///
/// Everything at or above this address belongs to the kernel.
pub const PHYS_BASE: u32 = 0xC000_0000;

/// A physical memory address.
///
/// Physical addresses are only meaningful to the address space that
/// produced them; they must be handed back to it for loads and stores.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(usize);

impl PhysAddr {
    /// Create a new physical address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page frame number.
    #[inline]
    pub const fn page_frame_number(self) -> usize {
        self.0 >> PAGE_SHIFT
    }

    /// Create from a page frame number.
    #[inline]
    pub const fn from_page_frame_number(pfn: usize) -> Self {
        Self(pfn << PAGE_SHIFT)
    }

    /// Get the offset within the frame.
    #[inline]
    pub const fn frame_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// Add an offset to this address.
    #[inline]
    pub const fn add(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#010x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A virtual address as seen by a user program.
///
/// User programs run with a 32-bit ABI, so every pointer they pass in a
/// system call is a 4-byte word.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct VirtAddr(u32);

impl VirtAddr {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Create a new virtual address.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Get the raw address as usize.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Check for the null address.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.as_usize() & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !(PAGE_MASK as u32))
    }

    /// Virtual page number.
    #[inline]
    pub const fn page_number(self) -> usize {
        self.as_usize() >> PAGE_SHIFT
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.as_usize() & PAGE_MASK
    }

    /// Add an offset, failing instead of wrapping past 4 GiB.
    #[inline]
    pub const fn checked_add(self, offset: u32) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Check if this is a kernel address.
    #[inline]
    pub const fn is_kernel(self) -> bool {
        self.0 >= PHYS_BASE
    }

    /// Check if this is an address a user program may name.
    ///
    /// The null page is excluded along with the kernel half.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 != 0 && self.0 < PHYS_BASE
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
