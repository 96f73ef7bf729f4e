//! File operations of a process
//!
//! `read` and `open` are read-side operations on the process gate; `write`
//! is write-side. Descriptor checks happen before any of them run.

use alloc::sync::Arc;
use log::{debug, warn};

use super::Process;
use crate::console::Console;
use crate::fs::{Fd, FileSystem, OpenFile};
use crate::syscall::Fault;

/// Where a read or write goes.
pub enum Stream {
    /// Console keyboard (reads) or screen (writes).
    Console,
    /// An open file.
    File(Arc<dyn OpenFile>),
}

/// Result of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    /// Value returned to the user program.
    pub result: i32,
    /// Bytes of the kernel buffer that were filled and must be copied out.
    pub filled: usize,
}

impl Process {
    /// Resolve a raw descriptor to its open file.
    ///
    /// Fails for anything but an open slot, including the reserved
    /// stdin/stdout slots.
    pub fn check_fd(&self, raw: i32) -> Result<Arc<dyn OpenFile>, Fault> {
        let fd = Fd::new(raw).ok_or(Fault::BadDescriptor(raw))?;
        self.files
            .lock()
            .lookup(fd)
            .map(Arc::clone)
            .map_err(|_| Fault::BadDescriptor(raw))
    }

    /// Resolve the target of a read or write. `console` names the one
    /// descriptor that reaches the console in this direction.
    pub fn stream(&self, raw: i32, console: Fd) -> Result<Stream, Fault> {
        if raw == console.as_i32() {
            Ok(Stream::Console)
        } else {
            self.check_fd(raw).map(Stream::File)
        }
    }

    /// Open `path`, returning the new descriptor or -1.
    ///
    /// A process opening its own executable gets a write-protected handle.
    pub fn open(&self, fs: &dyn FileSystem, path: &str) -> Result<i32, Fault> {
        self.gate.read(|| {
            let Some(file) = fs.open(path) else {
                debug!("[FILE] {}: open({:?}) failed", self.name, path);
                return Ok(-1);
            };
            if path == self.name {
                file.deny_write();
            }

            let inserted = self.files.lock().insert(Arc::clone(&file));
            match inserted {
                Ok(fd) => {
                    debug!("[FILE] {}: open({:?}) -> {}", self.name, path, fd.as_i32());
                    Ok(fd.as_i32())
                }
                Err(err) => {
                    warn!("[FILE] {}: open({:?}): {}", self.name, path, err);
                    file.close();
                    Err(err.into())
                }
            }
        })
    }

    /// Close an open descriptor.
    pub fn close(&self, raw: i32) -> Result<(), Fault> {
        let fd = Fd::new(raw).ok_or(Fault::BadDescriptor(raw))?;
        let file = self
            .files
            .lock()
            .remove(fd)
            .map_err(|_| Fault::BadDescriptor(raw))?;
        file.close();
        Ok(())
    }

    /// Fill `buf` from `stream`.
    ///
    /// Console reads are all-or-nothing: one character at a time until
    /// `buf` is full, stopping at NUL. Stopping early yields -1.
    pub fn read(&self, stream: Stream, buf: &mut [u8], console: &dyn Console) -> Transfer {
        self.gate.read(|| match stream {
            Stream::Console => read_console(buf, console),
            Stream::File(file) => {
                let result = file.read(buf);
                Transfer {
                    result,
                    filled: usize::try_from(result).unwrap_or(0).min(buf.len()),
                }
            }
        })
    }

    /// Write `buf` to `stream`.
    ///
    /// Console writes always report the full length.
    pub fn write(&self, stream: Stream, buf: &[u8], console: &dyn Console) -> i32 {
        self.gate.write(|| match stream {
            Stream::Console => {
                console.putbuf(buf);
                buf.len() as i32
            }
            Stream::File(file) => file.write(buf),
        })
    }

    /// Length of an open file.
    pub fn file_size(&self, raw: i32) -> Result<i32, Fault> {
        Ok(self.check_fd(raw)?.length())
    }

    /// Move the position of an open file.
    pub fn seek(&self, raw: i32, pos: u32) -> Result<(), Fault> {
        self.check_fd(raw)?.seek(pos);
        Ok(())
    }

    /// Position of an open file.
    pub fn tell(&self, raw: i32) -> Result<u32, Fault> {
        Ok(self.check_fd(raw)?.tell())
    }
}

fn read_console(buf: &mut [u8], console: &dyn Console) -> Transfer {
    let mut filled = 0;
    let mut complete = true;
    for slot in buf.iter_mut() {
        let c = console.getc();
        *slot = c;
        filled += 1;
        if c == 0 {
            complete = false;
            break;
        }
    }
    Transfer {
        result: if complete { buf.len() as i32 } else { -1 },
        filled,
    }
}
