//! Process lifecycle: exec, wait, exit, halt
//!
//! Exit runs a fixed cascade before the process is allowed to finish:
//! 1. Record the status and mark the process as exiting (once)
//! 2. Close every open descriptor, lowest first
//! 3. Join every child, in creation order
//! 4. Print `<name>: exit(<status>)` on the console
//!
//! No file handle or child outlives its parent's exit.

use alloc::format;
use core::sync::atomic::Ordering;
use log::{debug, info};

use super::{Pid, Process, ProcessService};
use crate::console::Console;

impl Process {
    /// Start `cmdline` as a child of this process.
    ///
    /// Returns the child's pid, or -1 if it could not be loaded.
    pub fn exec(&self, processes: &dyn ProcessService, cmdline: &str) -> i32 {
        match processes.execute(cmdline) {
            Some(child) => {
                self.children.lock().push(child);
                debug!("[PROCESS] {}: exec({:?}) -> {}", self.name, cmdline, child);
                child.as_i32()
            }
            None => {
                debug!("[PROCESS] {}: exec({:?}) failed", self.name, cmdline);
                Pid::ERROR
            }
        }
    }

    /// Wait for `pid` and return its exit status.
    pub fn wait(&self, processes: &dyn ProcessService, pid: Pid) -> i32 {
        processes.join(pid)
    }

    /// Run the exit cascade and return the recorded status.
    ///
    /// Only the first call has any effect; later calls return the status
    /// recorded by the first.
    pub fn exit(&self, status: i32, processes: &dyn ProcessService, console: &dyn Console) -> i32 {
        if self.exiting.swap(true, Ordering::AcqRel) {
            return self.exit_status().unwrap_or(status);
        }
        let status = *self.exit_status.call_once(|| status);

        let files = self.files.lock().drain();
        for file in files {
            file.close();
        }

        let children = self.children();
        for child in children {
            processes.join(child);
        }

        console.putbuf(format!("{}: exit({})\n", self.name, status).as_bytes());
        info!("[PROCESS] {} (pid {}) exited with status {}", self.name, self.pid, status);
        status
    }
}

/// Power the machine off.
pub fn halt(processes: &dyn ProcessService) {
    info!("[PROCESS] halt requested");
    processes.power_off();
}
