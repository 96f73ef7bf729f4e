//! PantherOS user-program system call layer
//!
//! Everything between the trap into the kernel and the kernel services a
//! user program may reach:
//! - Validation of user pointers, buffers and strings
//! - Per-process file descriptor tables
//! - A reader/writer gate serializing file operations
//! - Process lifecycle: exec, wait, exit, halt
//! - The system call dispatcher
//!
//! # Security Features
//! - No user pointer is dereferenced before it is validated
//! - User errors terminate the offending process, never the kernel
//! - A running program's executable cannot be written through its own
//!   descriptors
//!
//! # Architecture
//! - User ABI: 32-bit words, little-endian, arguments on the user stack
//! - Kernel services (file system, scheduler, console) sit behind traits

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

pub mod console;
pub mod fs;
pub mod mm;
pub mod process;
pub mod sync;
pub mod syscall;

#[cfg(test)]
mod testing;

pub use console::Console;
pub use fs::{FileSystem, OpenFile};
pub use mm::AddressSpace;
pub use process::{Pid, Process, ProcessService};
pub use syscall::{Fault, Outcome, Syscalls, TrapFrame};

/// Crate version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
