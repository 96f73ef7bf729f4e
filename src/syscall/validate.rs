//! System Call Input Validation
//!
//! Every pointer a user program passes to the kernel goes through
//! [`UserMemory`] before it is dereferenced.
//!
//! # Security Principles
//! - Validate ALL inputs before use
//! - Fail-secure: a bad pointer is a fault, never a best-effort access
//! - Prevent common vulnerabilities:
//!   - Kernel memory disclosure (user range check)
//!   - Faults inside the kernel (page-by-page presence check)
//!   - TOCTOU races (copy to kernel space)
//!   - Null pointer dereference (explicit checks)
//!
//! Checks never terminate anything themselves. They hand a [`Fault`] back
//! to the dispatcher, which decides what happens to the process.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use super::handler::Fault;
use crate::mm::{AddressSpace, Mapping, PhysAddr, VirtAddr, PAGE_SIZE};

/// Longest string (without its terminator) accepted from user space.
pub const MAX_PATH_LEN: usize = PAGE_SIZE;

/// How the kernel intends to touch a user range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The kernel reads user memory.
    Read,
    /// The kernel writes user memory; pages must be writable.
    Write,
}

/// Checked access to the current process's user memory.
#[derive(Clone, Copy)]
pub struct UserMemory<'a> {
    space: &'a dyn AddressSpace,
}

impl<'a> UserMemory<'a> {
    /// Bind to an address space.
    pub fn new(space: &'a dyn AddressSpace) -> Self {
        Self { space }
    }

    /// Validate a single user address.
    ///
    /// # Security Checks
    /// 1. Address is not null and lies below `PHYS_BASE`
    /// 2. Address is mapped in the process page table
    pub fn check(&self, addr: VirtAddr) -> Result<Mapping, Fault> {
        if addr.is_null() {
            return Err(Fault::NullPointer);
        }
        if !addr.is_user() {
            return Err(Fault::BadAddress(addr));
        }
        self.space.translate(addr).ok_or(Fault::Unmapped(addr))
    }

    /// Validate every byte of `[addr, addr + len)`.
    ///
    /// The first byte is checked even when `len` is zero.
    pub fn check_range(&self, addr: VirtAddr, len: u32, access: Access) -> Result<(), Fault> {
        self.walk(addr, len, access, |_, _| {})
    }

    /// Read a little-endian word.
    pub fn read_u32(&self, addr: VirtAddr) -> Result<u32, Fault> {
        let mut word = [0u8; 4];
        self.read_into(addr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Copy `len` bytes from user space into a kernel buffer.
    pub fn copy_in(&self, addr: VirtAddr, len: u32) -> Result<Vec<u8>, Fault> {
        self.check_range(addr, len, Access::Read)?;
        let mut buf = vec![0u8; len as usize];
        self.read_into(addr, &mut buf)?;
        Ok(buf)
    }

    /// Copy a kernel buffer out to user space.
    ///
    /// The whole destination is validated before the first byte is stored.
    pub fn copy_out(&self, addr: VirtAddr, data: &[u8]) -> Result<(), Fault> {
        let len = u32::try_from(data.len()).map_err(|_| Fault::BadAddress(addr))?;
        self.check_range(addr, len, Access::Write)?;
        self.walk(addr, len, Access::Write, |phys, range| {
            self.space.store(phys, &data[range]);
        })
    }

    /// Read a NUL-terminated string.
    ///
    /// Each byte is validated before it is loaded, so a string running
    /// off the end of a mapped region faults at the first unmapped byte.
    pub fn read_cstr(&self, addr: VirtAddr) -> Result<String, Fault> {
        let mut bytes = Vec::new();
        let mut cursor = addr;
        loop {
            let mapping = self.check(cursor)?;
            let mut byte = [0u8; 1];
            self.space.load(mapping.phys, &mut byte);
            if byte[0] == 0 {
                break;
            }
            if bytes.len() == MAX_PATH_LEN {
                return Err(Fault::StringTooLong(addr));
            }
            bytes.push(byte[0]);
            cursor = cursor.checked_add(1).ok_or(Fault::BadAddress(cursor))?;
        }
        String::from_utf8(bytes).map_err(|_| Fault::InvalidString(addr))
    }

    fn read_into(&self, addr: VirtAddr, buf: &mut [u8]) -> Result<(), Fault> {
        let len = u32::try_from(buf.len()).map_err(|_| Fault::BadAddress(addr))?;
        self.walk(addr, len, Access::Read, |phys, range| {
            self.space.load(phys, &mut buf[range]);
        })
    }

    /// Split `[addr, addr + len)` at page boundaries, validating each piece.
    ///
    /// `f` receives the physical address of each piece and the matching
    /// range into a buffer of length `len`.
    fn walk<F>(&self, addr: VirtAddr, len: u32, access: Access, mut f: F) -> Result<(), Fault>
    where
        F: FnMut(PhysAddr, Range<usize>),
    {
        addr.checked_add(len).ok_or(Fault::BadAddress(addr))?;

        let total = len as usize;
        let mut done = 0usize;
        let mut cursor = addr;
        loop {
            let mapping = self.check(cursor)?;
            if access == Access::Write && !mapping.is_writable() {
                return Err(Fault::ReadOnly(cursor));
            }
            let chunk = (total - done).min(PAGE_SIZE - cursor.page_offset());
            f(mapping.phys, done..done + chunk);
            done += chunk;
            if done == total {
                return Ok(());
            }
            cursor = cursor
                .checked_add(chunk as u32)
                .ok_or(Fault::BadAddress(cursor))?;
        }
    }
}
