//! System Call Interface
//!
//! The boundary between user programs and the kernel services.
//!
//! # Security Model
//! - Whitelist approach: only the calls listed below are served
//! - Every argument word and every user pointer is validated before use
//! - A bad argument terminates the caller with status -1; it never panics
//!   the kernel and never reaches a kernel service
//!
//! # Current Syscalls
//! - 0: halt()
//! - 1: exit(status)
//! - 2: exec(cmdline) -> pid
//! - 3: wait(pid) -> status
//! - 4: create(path, initial_size) -> bool
//! - 5: remove(path) -> bool
//! - 6: open(path) -> fd
//! - 7: filesize(fd) -> length
//! - 8: read(fd, buf, len) -> count
//! - 9: write(fd, buf, len) -> count
//! - 10: seek(fd, position)
//! - 11: tell(fd) -> position
//! - 12: close(fd)
//! - 20: fibonacci(n)
//! - 21: max_of_four_int(a, b, c, d)

mod frame;
mod handler;
mod validate;

pub use frame::{ArgReader, FromWord, TrapFrame, WORD_SIZE};
pub use handler::{fibonacci, max_of_four_int, numbers, Fault, Outcome, Syscall, Syscalls};
pub use validate::{Access, UserMemory, MAX_PATH_LEN};
