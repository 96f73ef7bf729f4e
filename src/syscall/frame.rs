//! Trap frame and typed argument decoding
//!
//! User programs push the call number and its arguments on their own stack
//! as 4-byte words and trap into the kernel:
//!
//! ```text
//!   esp + 12   third argument
//!   esp + 8    second argument
//!   esp + 4    first argument
//!   esp + 0    call number
//! ```
//!
//! The result goes back in `eax`. Nothing on the user stack is trusted:
//! every word is validated by [`UserMemory`] before it is read.

use super::handler::Fault;
use super::validate::UserMemory;
use crate::mm::VirtAddr;
use crate::process::Pid;

/// Size of one argument slot.
pub const WORD_SIZE: u32 = 4;

/// The part of the saved user context the syscall layer touches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    /// User stack pointer at the time of the trap.
    pub esp: u32,
    /// Accumulator; carries the return value back to user mode.
    pub eax: u32,
}

impl TrapFrame {
    /// Frame for a trap taken with user stack pointer `esp`.
    pub const fn new(esp: u32) -> Self {
        Self { esp, eax: 0 }
    }
}

/// Types that can be decoded from a single argument word.
pub trait FromWord: Sized {
    /// Decode `word`.
    fn from_word(word: u32) -> Self;
}

impl FromWord for u32 {
    #[inline]
    fn from_word(word: u32) -> Self {
        word
    }
}

impl FromWord for i32 {
    #[inline]
    fn from_word(word: u32) -> Self {
        word as i32
    }
}

impl FromWord for VirtAddr {
    #[inline]
    fn from_word(word: u32) -> Self {
        VirtAddr::new(word)
    }
}

impl FromWord for Pid {
    #[inline]
    fn from_word(word: u32) -> Self {
        Pid::new(word as i32)
    }
}

/// Reads call number and arguments off the user stack of one trap.
pub struct ArgReader<'a> {
    esp: VirtAddr,
    mem: UserMemory<'a>,
}

impl<'a> ArgReader<'a> {
    /// Bind to the stack described by `frame`.
    pub fn new(frame: &TrapFrame, mem: UserMemory<'a>) -> Self {
        Self {
            esp: VirtAddr::new(frame.esp),
            mem,
        }
    }

    /// The call number at `esp + 0`.
    pub fn number(&self) -> Result<u32, Fault> {
        self.word(0)
    }

    /// Argument `index` (1-based) at `esp + 4 * index`, validated and
    /// decoded as `T`.
    pub fn arg<T: FromWord>(&self, index: u32) -> Result<T, Fault> {
        self.word(index).map(T::from_word)
    }

    /// Memory the arguments point into.
    #[inline]
    pub fn memory(&self) -> UserMemory<'a> {
        self.mem
    }

    fn word(&self, index: u32) -> Result<u32, Fault> {
        let slot = index
            .checked_mul(WORD_SIZE)
            .and_then(|offset| self.esp.checked_add(offset))
            .ok_or(Fault::BadAddress(self.esp))?;
        self.mem.read_u32(slot)
    }
}
