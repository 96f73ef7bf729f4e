//! User Page Directory
//!
//! A software page directory mapping user virtual pages to frames it owns.
//! Hosted kernels use it as the per-process address space; it is also what
//! the syscall layer is exercised against.
//!
//! # Entry Format
//! Each entry is a 32-bit descriptor in the classic x86 layout:
//! - bits [31:12]: frame address
//! - bits [11:0]: flags (`PageFlags`)
//!
//! # Security Properties
//! - Only page-aligned user addresses can be mapped
//! - The null page and the kernel half are never mapped
//! - Loads and stores never cross the frame they were translated to

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use bitflags::bitflags;
use spin::Mutex;

use super::address::{PhysAddr, VirtAddr, PAGE_SIZE};
use super::AddressSpace;

bitflags! {
    /// Page table entry flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PageFlags: u32 {
        /// Entry maps a frame.
        const PRESENT = 1 << 0;
        /// Frame may be written.
        const WRITABLE = 1 << 1;
        /// Frame is reachable from user mode.
        const USER = 1 << 2;
        /// Set on first access.
        const ACCESSED = 1 << 5;
        /// Set on first write.
        const DIRTY = 1 << 6;

        /// User code and read-only data.
        const USER_RO = Self::PRESENT.bits() | Self::USER.bits();
        /// User data, stack and heap.
        const USER_RW = Self::PRESENT.bits() | Self::USER.bits() | Self::WRITABLE.bits();
    }
}

/// A single page table entry.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    /// Address mask for page table entries (bits [31:12]).
    const ADDR_MASK: u32 = 0xFFFF_F000;

    /// Create an invalid (empty) entry.
    #[inline]
    pub const fn invalid() -> Self {
        Self(0)
    }

    /// Create a page entry mapping a physical frame.
    #[inline]
    pub const fn page(phys: PhysAddr, flags: PageFlags) -> Self {
        debug_assert!(phys.is_aligned());
        Self((phys.as_usize() as u32 & Self::ADDR_MASK) | flags.bits())
    }

    /// Check if the entry is valid (present).
    #[inline]
    pub const fn is_present(self) -> bool {
        self.0 & PageFlags::PRESENT.bits() != 0
    }

    /// Get the frame address from this entry.
    #[inline]
    pub const fn addr(self) -> PhysAddr {
        PhysAddr::new((self.0 & Self::ADDR_MASK) as usize)
    }

    /// Get the flags from this entry.
    #[inline]
    pub const fn flags(self) -> PageFlags {
        PageFlags::from_bits_truncate(self.0 & !Self::ADDR_MASK)
    }
}

impl core::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_present() {
            write!(f, "PTE(addr={}, flags={:?})", self.addr(), self.flags())
        } else {
            write!(f, "PTE(invalid)")
        }
    }
}

/// Result of a successful translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// Physical address of the translated byte (frame + page offset).
    pub phys: PhysAddr,
    /// Flags of the entry that maps it.
    pub flags: PageFlags,
}

impl Mapping {
    /// Whether user-visible stores through this mapping are allowed.
    #[inline]
    pub const fn is_writable(&self) -> bool {
        self.flags.contains(PageFlags::WRITABLE)
    }
}

/// Error type for page mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// The virtual address is already mapped.
    AlreadyMapped,
    /// The virtual address is not mapped.
    NotMapped,
    /// The address is not properly aligned.
    MisalignedAddress,
    /// Attempted to map the null page or a kernel address.
    InvalidPermissions,
}

impl core::fmt::Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AlreadyMapped => write!(f, "virtual address already mapped"),
            Self::NotMapped => write!(f, "virtual address not mapped"),
            Self::MisalignedAddress => write!(f, "address not properly aligned"),
            Self::InvalidPermissions => write!(f, "address outside user space"),
        }
    }
}

type Frame = Box<[u8; PAGE_SIZE]>;

struct Tables {
    /// Virtual page number -> entry.
    entries: BTreeMap<usize, PageTableEntry>,
    /// Frame pool; a frame's physical address is its index shifted by a page.
    frames: Vec<Frame>,
}

/// Per-process page directory.
pub struct PageDirectory {
    tables: Mutex<Tables>,
}

impl PageDirectory {
    /// Create an empty directory (nothing mapped).
    pub const fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                entries: BTreeMap::new(),
                frames: Vec::new(),
            }),
        }
    }

    /// Map a fresh zeroed frame at `page`.
    ///
    /// Returns the physical address of the new frame.
    pub fn map(&self, page: VirtAddr, flags: PageFlags) -> Result<PhysAddr, MappingError> {
        if !page.is_aligned() {
            return Err(MappingError::MisalignedAddress);
        }
        if !page.is_user() {
            return Err(MappingError::InvalidPermissions);
        }

        let mut tables = self.tables.lock();
        if tables.entries.contains_key(&page.page_number()) {
            return Err(MappingError::AlreadyMapped);
        }

        // Frame 0 would encode as a null frame address; start the pool at 1.
        if tables.frames.is_empty() {
            tables.frames.push(Box::new([0; PAGE_SIZE]));
        }
        let phys = PhysAddr::from_page_frame_number(tables.frames.len());
        tables.frames.push(Box::new([0; PAGE_SIZE]));
        tables
            .entries
            .insert(page.page_number(), PageTableEntry::page(phys, flags | PageFlags::PRESENT));
        Ok(phys)
    }

    /// Map every page overlapping `[start, start + len)`.
    pub fn map_range(&self, start: VirtAddr, len: u32, flags: PageFlags) -> Result<(), MappingError> {
        let end = start.checked_add(len).ok_or(MappingError::InvalidPermissions)?;
        let mut page = start.align_down();
        while page < end {
            self.map(page, flags)?;
            page = page
                .checked_add(PAGE_SIZE as u32)
                .ok_or(MappingError::InvalidPermissions)?;
        }
        Ok(())
    }

    /// Remove the mapping at `page`. The frame is kept in the pool.
    pub fn unmap(&self, page: VirtAddr) -> Result<(), MappingError> {
        if !page.is_aligned() {
            return Err(MappingError::MisalignedAddress);
        }
        self.tables
            .lock()
            .entries
            .remove(&page.page_number())
            .map(|_| ())
            .ok_or(MappingError::NotMapped)
    }

    /// Look up the raw entry for the page containing `va`.
    pub fn entry(&self, va: VirtAddr) -> Option<PageTableEntry> {
        self.tables.lock().entries.get(&va.page_number()).copied()
    }
}

impl Default for PageDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl AddressSpace for PageDirectory {
    fn translate(&self, va: VirtAddr) -> Option<Mapping> {
        let pte = self.entry(va).filter(|pte| pte.is_present())?;
        Some(Mapping {
            phys: pte.addr().add(va.page_offset()),
            flags: pte.flags(),
        })
    }

    fn load(&self, pa: PhysAddr, dst: &mut [u8]) {
        let tables = self.tables.lock();
        let offset = pa.frame_offset();
        if let Some(frame) = tables.frames.get(pa.page_frame_number()) {
            if let Some(src) = frame.get(offset..offset + dst.len()) {
                dst.copy_from_slice(src);
            }
        }
    }

    fn store(&self, pa: PhysAddr, src: &[u8]) {
        let mut tables = self.tables.lock();
        let offset = pa.frame_offset();
        if let Some(frame) = tables.frames.get_mut(pa.page_frame_number()) {
            if let Some(dst) = frame.get_mut(offset..offset + src.len()) {
                dst.copy_from_slice(src);
            }
        }
    }
}
