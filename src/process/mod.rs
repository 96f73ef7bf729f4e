//! Process descriptor
//!
//! The scheduler owns thread control; this module owns what the syscall
//! layer needs to know about a user process:
//! - Its name (exit message, write protection of its own executable)
//! - Its descriptor table and the gate serializing file operations
//! - The children it created with `exec`
//! - Its exit status, recorded once
//!
//! # Design
//! - Per-process state only; nothing here is shared between processes
//! - The descriptor table lock is never held across a file system call

mod files;
mod lifecycle;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering;
use spin::{Mutex, Once};

use crate::fs::FdTable;
use crate::sync::RwGate;

pub use files::{Stream, Transfer};
pub use lifecycle::halt;

/// A process identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(transparent)]
pub struct Pid(i32);

impl Pid {
    /// Value returned to user space when a process could not be created.
    pub const ERROR: i32 = -1;

    /// Wrap a raw identifier.
    #[inline]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Get the raw identifier.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process creation and teardown, provided by the scheduler.
pub trait ProcessService: Send + Sync {
    /// Load and start `cmdline` as a new process.
    ///
    /// Returns `None` if the program could not be loaded. May block until
    /// loading has finished.
    fn execute(&self, cmdline: &str) -> Option<Pid>;

    /// Block until `pid` terminates and return its exit status.
    fn join(&self, pid: Pid) -> i32;

    /// Power the machine off. Does not return on real hardware.
    fn power_off(&self);
}

/// Syscall-visible state of one user process.
pub struct Process {
    pid: Pid,
    name: String,
    files: Mutex<FdTable>,
    gate: RwGate,
    children: Mutex<Vec<Pid>>,
    exit_status: Once<i32>,
    exiting: AtomicBool,
}

impl Process {
    /// Create the descriptor for a freshly started process.
    ///
    /// `name` is the program name (first word of the command line).
    pub fn new(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            files: Mutex::new(FdTable::new()),
            gate: RwGate::new(),
            children: Mutex::new(Vec::new()),
            exit_status: Once::new(),
            exiting: AtomicBool::new(false),
        }
    }

    /// Process identifier.
    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Program name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The gate serializing this process's file operations.
    #[inline]
    pub fn gate(&self) -> &RwGate {
        &self.gate
    }

    /// Children created with `exec`, in creation order.
    pub fn children(&self) -> Vec<Pid> {
        self.children.lock().clone()
    }

    /// Number of descriptors currently open.
    pub fn open_files(&self) -> usize {
        self.files.lock().open_count()
    }

    /// Exit status, once `exit` has started.
    pub fn exit_status(&self) -> Option<i32> {
        self.exit_status.get().copied()
    }

    /// Whether exit processing has started.
    pub fn has_exited(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("exit_status", &self.exit_status())
            .finish_non_exhaustive()
    }
}
