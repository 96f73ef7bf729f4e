//! System Call Handler
//!
//! Dispatches system calls and implements individual syscall handlers.
//!
//! # Security Considerations
//! - Every argument slot is validated before it is read
//! - Every pointer argument is validated before it is dereferenced
//! - User errors terminate the offending process with status -1; they
//!   never reach the file system or the process service
//! - Unknown call numbers are ignored and leave `eax` as it was

use alloc::string::String;
use alloc::vec;
use core::fmt;
use log::{debug, warn};

use super::frame::{ArgReader, TrapFrame};
use super::validate::{Access, UserMemory};
use crate::console::Console;
use crate::fs::{Fd, FdError, FileSystem};
use crate::mm::{AddressSpace, VirtAddr};
use crate::process::{self, Pid, Process, ProcessService};

/// System call numbers
pub mod numbers {
    pub const SYS_HALT: u32 = 0;
    pub const SYS_EXIT: u32 = 1;
    pub const SYS_EXEC: u32 = 2;
    pub const SYS_WAIT: u32 = 3;
    pub const SYS_CREATE: u32 = 4;
    pub const SYS_REMOVE: u32 = 5;
    pub const SYS_OPEN: u32 = 6;
    pub const SYS_FILESIZE: u32 = 7;
    pub const SYS_READ: u32 = 8;
    pub const SYS_WRITE: u32 = 9;
    pub const SYS_SEEK: u32 = 10;
    pub const SYS_TELL: u32 = 11;
    pub const SYS_CLOSE: u32 = 12;
    pub const SYS_FIBONACCI: u32 = 20;
    pub const SYS_MAX_OF_FOUR_INT: u32 = 21;
}

/// The calls this kernel serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    /// Power the machine off.
    Halt,
    /// Terminate the calling process.
    Exit,
    /// Start a child process.
    Exec,
    /// Wait for a child process.
    Wait,
    /// Create a file.
    Create,
    /// Remove a file.
    Remove,
    /// Open a file.
    Open,
    /// Length of an open file.
    Filesize,
    /// Read from a descriptor.
    Read,
    /// Write to a descriptor.
    Write,
    /// Move a file position.
    Seek,
    /// Report a file position.
    Tell,
    /// Close a descriptor.
    Close,
    /// n-th Fibonacci number.
    Fibonacci,
    /// Largest of four integers.
    MaxOfFourInt,
}

impl TryFrom<u32> for Syscall {
    type Error = u32;

    fn try_from(no: u32) -> Result<Self, Self::Error> {
        use numbers::*;
        Ok(match no {
            SYS_HALT => Self::Halt,
            SYS_EXIT => Self::Exit,
            SYS_EXEC => Self::Exec,
            SYS_WAIT => Self::Wait,
            SYS_CREATE => Self::Create,
            SYS_REMOVE => Self::Remove,
            SYS_OPEN => Self::Open,
            SYS_FILESIZE => Self::Filesize,
            SYS_READ => Self::Read,
            SYS_WRITE => Self::Write,
            SYS_SEEK => Self::Seek,
            SYS_TELL => Self::Tell,
            SYS_CLOSE => Self::Close,
            SYS_FIBONACCI => Self::Fibonacci,
            SYS_MAX_OF_FOUR_INT => Self::MaxOfFourInt,
            _ => return Err(no),
        })
    }
}

/// A user error that costs the calling process its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Null pointer where an object was required.
    NullPointer,
    /// Address outside user space, or a range that wraps.
    BadAddress(VirtAddr),
    /// User address with no page behind it.
    Unmapped(VirtAddr),
    /// Kernel asked to store into a read-only page.
    ReadOnly(VirtAddr),
    /// String with no terminator within `MAX_PATH_LEN` bytes.
    StringTooLong(VirtAddr),
    /// String that is not valid UTF-8.
    InvalidString(VirtAddr),
    /// Descriptor that is not open.
    BadDescriptor(i32),
    /// Descriptor table failure.
    Files(FdError),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NullPointer => write!(f, "null pointer"),
            Self::BadAddress(addr) => write!(f, "bad address {}", addr),
            Self::Unmapped(addr) => write!(f, "unmapped address {}", addr),
            Self::ReadOnly(addr) => write!(f, "read-only address {}", addr),
            Self::StringTooLong(addr) => write!(f, "unterminated string at {}", addr),
            Self::InvalidString(addr) => write!(f, "malformed string at {}", addr),
            Self::BadDescriptor(fd) => write!(f, "bad file descriptor {}", fd),
            Self::Files(err) => write!(f, "{}", err),
        }
    }
}

impl From<FdError> for Fault {
    fn from(err: FdError) -> Self {
        Self::Files(err)
    }
}

/// What became of the calling thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Call completed; the value was stored in `eax`.
    Returned(u32),
    /// Call completed without a result; `eax` untouched.
    Done,
    /// Unknown call number; `eax` untouched.
    Ignored(u32),
    /// Exit cascade finished with this status; the thread must not return
    /// to user mode.
    Exited(i32),
    /// The machine is powering off.
    Halted,
}

/// The system call entry point.
///
/// Holds the kernel services every call may reach; the calling process and
/// its address space are supplied per trap.
pub struct Syscalls<'k> {
    fs: &'k dyn FileSystem,
    processes: &'k dyn ProcessService,
    console: &'k dyn Console,
}

impl<'k> Syscalls<'k> {
    /// Wire the dispatcher to its services.
    pub fn new(
        fs: &'k dyn FileSystem,
        processes: &'k dyn ProcessService,
        console: &'k dyn Console,
    ) -> Self {
        Self {
            fs,
            processes,
            console,
        }
    }

    /// Handle one trap from `current`.
    ///
    /// # Returns
    /// What the trap glue must do with the thread next. On any fault the
    /// process has already run its exit cascade with status -1.
    pub fn handle(
        &self,
        frame: &mut TrapFrame,
        current: &Process,
        space: &dyn AddressSpace,
    ) -> Outcome {
        let args = ArgReader::new(frame, UserMemory::new(space));
        match self.dispatch(&args, current) {
            Ok(Outcome::Returned(value)) => {
                frame.eax = value;
                Outcome::Returned(value)
            }
            Ok(outcome) => outcome,
            Err(fault) => {
                debug!("[SYSCALL] {}: {}", current.name(), fault);
                Outcome::Exited(current.exit(-1, self.processes, self.console))
            }
        }
    }

    fn dispatch(&self, args: &ArgReader<'_>, current: &Process) -> Result<Outcome, Fault> {
        let number = args.number()?;
        let call = match Syscall::try_from(number) {
            Ok(call) => call,
            Err(no) => {
                warn!("[SYSCALL] {}: unknown syscall {}", current.name(), no);
                return Ok(Outcome::Ignored(no));
            }
        };
        let mem = args.memory();
        debug!("[SYSCALL] {}: {:?}", current.name(), call);

        match call {
            Syscall::Halt => {
                process::halt(self.processes);
                Ok(Outcome::Halted)
            }
            Syscall::Exit => {
                let status: i32 = args.arg(1)?;
                Ok(Outcome::Exited(current.exit(status, self.processes, self.console)))
            }
            Syscall::Exec => {
                let cmdline = mem.read_cstr(args.arg(1)?)?;
                Ok(int(current.exec(self.processes, &cmdline)))
            }
            Syscall::Wait => {
                let pid: Pid = args.arg(1)?;
                Ok(int(current.wait(self.processes, pid)))
            }
            Syscall::Create => {
                let path = path_arg(mem, args.arg(1)?)?;
                let initial_size: u32 = args.arg(2)?;
                Ok(boolean(self.fs.create(&path, initial_size)))
            }
            Syscall::Remove => {
                let path = path_arg(mem, args.arg(1)?)?;
                Ok(boolean(self.fs.remove(&path)))
            }
            Syscall::Open => {
                let path = path_arg(mem, args.arg(1)?)?;
                Ok(int(current.open(self.fs, &path)?))
            }
            Syscall::Filesize => {
                let fd: i32 = args.arg(1)?;
                Ok(int(current.file_size(fd)?))
            }
            Syscall::Read => {
                let fd: i32 = args.arg(1)?;
                let buffer: VirtAddr = args.arg(2)?;
                let size: u32 = args.arg(3)?;
                mem.check_range(buffer, size, Access::Write)?;
                let stream = current.stream(fd, Fd::STDIN)?;

                let mut buf = vec![0u8; size as usize];
                let transfer = current.read(stream, &mut buf, self.console);
                mem.copy_out(buffer, &buf[..transfer.filled])?;
                Ok(int(transfer.result))
            }
            Syscall::Write => {
                let fd: i32 = args.arg(1)?;
                let buffer: VirtAddr = args.arg(2)?;
                let size: u32 = args.arg(3)?;
                let data = mem.copy_in(buffer, size)?;
                let stream = current.stream(fd, Fd::STDOUT)?;
                Ok(int(current.write(stream, &data, self.console)))
            }
            Syscall::Seek => {
                let fd: i32 = args.arg(1)?;
                let position: u32 = args.arg(2)?;
                current.seek(fd, position)?;
                Ok(Outcome::Done)
            }
            Syscall::Tell => {
                let fd: i32 = args.arg(1)?;
                Ok(Outcome::Returned(current.tell(fd)?))
            }
            Syscall::Close => {
                let fd: i32 = args.arg(1)?;
                current.close(fd)?;
                Ok(Outcome::Done)
            }
            Syscall::Fibonacci => {
                let n: i32 = args.arg(1)?;
                Ok(int(fibonacci(n)))
            }
            Syscall::MaxOfFourInt => {
                let a: i32 = args.arg(1)?;
                let b: i32 = args.arg(2)?;
                let c: i32 = args.arg(3)?;
                let d: i32 = args.arg(4)?;
                Ok(int(max_of_four_int(a, b, c, d)))
            }
        }
    }
}

/// Paths for create, remove and open: null is refused outright.
fn path_arg(mem: UserMemory<'_>, ptr: VirtAddr) -> Result<String, Fault> {
    if ptr.is_null() {
        return Err(Fault::NullPointer);
    }
    mem.read_cstr(ptr)
}

#[inline]
fn int(value: i32) -> Outcome {
    Outcome::Returned(value as u32)
}

#[inline]
fn boolean(value: bool) -> Outcome {
    Outcome::Returned(value as u32)
}

/// The n-th Fibonacci number, with fibonacci(1) = fibonacci(2) = 1.
///
/// For n < 1 the loop never runs and the seed value 2 is returned.
pub fn fibonacci(n: i32) -> i32 {
    if n == 1 || n == 2 {
        return 1;
    }
    let (mut fn_, mut f1, mut f2) = (2i32, 1i32, 1i32);
    for _ in 3..=n {
        fn_ = f1.wrapping_add(f2);
        f2 = f1;
        f1 = fn_;
    }
    fn_
}

/// The largest of four integers.
pub fn max_of_four_int(a: i32, b: i32, c: i32, d: i32) -> i32 {
    let w1 = if a > b { a } else { b };
    let w2 = if c > d { c } else { d };
    if w1 > w2 {
        w1
    } else {
        w2
    }
}
