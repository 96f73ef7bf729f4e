//! In-memory kernel services for unit tests
//!
//! Every mock can share a [`Journal`] so tests can check the order in
//! which the syscall layer touched the file system, the process service
//! and the console.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use spin::Mutex;

use crate::console::Console;
use crate::fs::{FileSystem, OpenFile};
use crate::mm::{PageDirectory, PageFlags, VirtAddr};
use crate::process::{Pid, Process, ProcessService};
use crate::syscall::{Outcome, Syscalls, TrapFrame, UserMemory};

/// Something a service observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A file handle was closed.
    Closed(String),
    /// A child was joined.
    Joined(Pid),
    /// Bytes were written to the console.
    Output(String),
}

/// Shared, ordered event log.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }
}

struct Inode {
    name: String,
    data: Mutex<Vec<u8>>,
    deny_write: AtomicUsize,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl Inode {
    fn new(name: &str, bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            data: Mutex::new(bytes.to_vec()),
            deny_write: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
        })
    }
}

/// One open handle on an in-memory file.
pub struct MockFile {
    inode: Arc<Inode>,
    pos: Mutex<u32>,
    denied: AtomicBool,
    journal: Option<Journal>,
}

impl MockFile {
    /// A handle on an anonymous file holding `bytes`.
    pub fn new(bytes: &[u8]) -> Arc<Self> {
        Self::open(Inode::new("", bytes), None)
    }

    fn open(inode: Arc<Inode>, journal: Option<Journal>) -> Arc<Self> {
        inode.opens.fetch_add(1, Ordering::SeqCst);
        Arc::new(Self {
            inode,
            pos: Mutex::new(0),
            denied: AtomicBool::new(false),
            journal,
        })
    }
}

impl OpenFile for MockFile {
    fn read(&self, buf: &mut [u8]) -> i32 {
        let data = self.inode.data.lock();
        let mut pos = self.pos.lock();
        let start = (*pos as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        *pos += n as u32;
        n as i32
    }

    fn write(&self, buf: &[u8]) -> i32 {
        if self.inode.deny_write.load(Ordering::SeqCst) > 0 {
            return 0;
        }
        let mut data = self.inode.data.lock();
        let mut pos = self.pos.lock();
        let start = *pos as usize;
        if data.len() < start + buf.len() {
            data.resize(start + buf.len(), 0);
        }
        data[start..start + buf.len()].copy_from_slice(buf);
        *pos += buf.len() as u32;
        buf.len() as i32
    }

    fn length(&self) -> i32 {
        self.inode.data.lock().len() as i32
    }

    fn seek(&self, pos: u32) {
        *self.pos.lock() = pos;
    }

    fn tell(&self) -> u32 {
        *self.pos.lock()
    }

    fn deny_write(&self) {
        if !self.denied.swap(true, Ordering::SeqCst) {
            self.inode.deny_write.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn close(&self) {
        if self.denied.swap(false, Ordering::SeqCst) {
            self.inode.deny_write.fetch_sub(1, Ordering::SeqCst);
        }
        self.inode.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.record(Event::Closed(self.inode.name.clone()));
        }
    }
}

/// Flat in-memory file system.
#[derive(Default)]
pub struct MockFs {
    files: Mutex<BTreeMap<String, Arc<Inode>>>,
    calls: AtomicUsize,
    journal: Option<Journal>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Add (or replace) a file.
    pub fn add(&self, name: &str, bytes: &[u8]) {
        self.files.lock().insert(name.to_string(), Inode::new(name, bytes));
    }

    /// Current contents of `name`; empty if it does not exist.
    pub fn contents(&self, name: &str) -> Vec<u8> {
        self.files
            .lock()
            .get(name)
            .map(|inode| inode.data.lock().clone())
            .unwrap_or_default()
    }

    /// Handles opened on `name`.
    pub fn opens(&self, name: &str) -> usize {
        self.counter(name, |inode| &inode.opens)
    }

    /// Handles on `name` that have been closed.
    pub fn closes(&self, name: &str) -> usize {
        self.counter(name, |inode| &inode.closes)
    }

    /// Number of open, create and remove requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn counter(&self, name: &str, field: fn(&Inode) -> &AtomicUsize) -> usize {
        self.files
            .lock()
            .get(name)
            .map_or(0, |inode| field(inode).load(Ordering::SeqCst))
    }
}

impl FileSystem for MockFs {
    fn open(&self, path: &str) -> Option<Arc<dyn OpenFile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let inode = self.files.lock().get(path).cloned()?;
        Some(MockFile::open(inode, self.journal.clone()))
    }

    fn create(&self, path: &str, initial_size: u32) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut files = self.files.lock();
        if files.contains_key(path) {
            return false;
        }
        let zeroes = std::vec![0u8; initial_size as usize];
        files.insert(path.to_string(), Inode::new(path, &zeroes));
        true
    }

    fn remove(&self, path: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files.lock().remove(path).is_some()
    }
}

/// Console fed from a fixed input buffer.
pub struct MockConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
    journal: Option<Journal>,
}

impl MockConsole {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: Mutex::new(input.iter().copied().collect()),
            output: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    pub fn with_journal(input: &[u8], journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new(input)
        }
    }

    /// Everything written so far.
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock()).into_owned()
    }

    /// Keystrokes not yet consumed.
    pub fn remaining_input(&self) -> usize {
        self.input.lock().len()
    }
}

impl Console for MockConsole {
    /// Returns NUL once the input runs dry.
    fn getc(&self) -> u8 {
        self.input.lock().pop_front().unwrap_or(0)
    }

    fn putbuf(&self, buf: &[u8]) {
        self.output.lock().extend_from_slice(buf);
        if let Some(journal) = &self.journal {
            journal.record(Event::Output(String::from_utf8_lossy(buf).into_owned()));
        }
    }
}

/// Process service with a table of runnable programs.
pub struct MockProcesses {
    programs: Mutex<BTreeMap<String, i32>>,
    running: Mutex<BTreeMap<Pid, i32>>,
    executed: Mutex<Vec<String>>,
    next_pid: AtomicI32,
    powered_off: AtomicBool,
    journal: Option<Journal>,
}

impl MockProcesses {
    pub fn new() -> Self {
        Self {
            programs: Mutex::new(BTreeMap::new()),
            running: Mutex::new(BTreeMap::new()),
            executed: Mutex::new(Vec::new()),
            next_pid: AtomicI32::new(2),
            powered_off: AtomicBool::new(false),
            journal: None,
        }
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::new()
        }
    }

    /// Make `name` loadable; its processes exit with `status`.
    pub fn add_program(&self, name: &str, status: i32) {
        self.programs.lock().insert(name.to_string(), status);
    }

    /// Every command line passed to `execute`.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn powered_off(&self) -> bool {
        self.powered_off.load(Ordering::SeqCst)
    }
}

impl ProcessService for MockProcesses {
    fn execute(&self, cmdline: &str) -> Option<Pid> {
        self.executed.lock().push(cmdline.to_string());
        let program = cmdline.split_whitespace().next()?;
        let status = *self.programs.lock().get(program)?;
        let pid = Pid::new(self.next_pid.fetch_add(1, Ordering::SeqCst));
        self.running.lock().insert(pid, status);
        Some(pid)
    }

    /// A child can be joined once; later joins report -1.
    fn join(&self, pid: Pid) -> i32 {
        if let Some(journal) = &self.journal {
            journal.record(Event::Joined(pid));
        }
        self.running.lock().remove(&pid).unwrap_or(-1)
    }

    fn power_off(&self) {
        self.powered_off.store(true, Ordering::SeqCst);
    }
}

/// A user process with a small address space, wired to mock services.
///
/// ```text
///   0x0804_8000  code page (read-only)
///   0x0804_9000  string page, filled by `put_str`
///   0x0804_B000  buffer page; the pages on either side are unmapped
///   0xBFFF_F000  stack page; default esp is 0xBFFF_FF00
/// ```
pub struct Harness {
    pub fs: MockFs,
    pub processes: MockProcesses,
    pub console: MockConsole,
    pub process: Process,
    pub space: PageDirectory,
    strings: Mutex<u32>,
}

impl Harness {
    pub const CODE: u32 = 0x0804_8000;
    pub const STRINGS: u32 = 0x0804_9000;
    pub const BUFFER: u32 = 0x0804_B000;
    pub const STACK: u32 = 0xBFFF_F000;
    pub const ESP: u32 = 0xBFFF_FF00;

    pub fn new(name: &str) -> Self {
        Self::with_input(name, b"")
    }

    pub fn with_input(name: &str, input: &[u8]) -> Self {
        let space = PageDirectory::new();
        for (page, flags) in [
            (Self::CODE, PageFlags::USER_RO),
            (Self::STRINGS, PageFlags::USER_RW),
            (Self::BUFFER, PageFlags::USER_RW),
            (Self::STACK, PageFlags::USER_RW),
        ] {
            space.map(VirtAddr::new(page), flags).unwrap();
        }
        Self {
            fs: MockFs::new(),
            processes: MockProcesses::new(),
            console: MockConsole::new(input),
            process: Process::new(Pid::new(1), name),
            space,
            strings: Mutex::new(Self::STRINGS),
        }
    }

    fn memory(&self) -> UserMemory<'_> {
        UserMemory::new(&self.space)
    }

    /// Store a NUL-terminated copy of `s` in the string page.
    pub fn put_str(&self, s: &str) -> u32 {
        let mut cursor = self.strings.lock();
        let addr = *cursor;
        let mut bytes = s.as_bytes().to_vec();
        bytes.push(0);
        self.memory().copy_out(VirtAddr::new(addr), &bytes).unwrap();
        *cursor += bytes.len() as u32;
        addr
    }

    /// Start of the buffer page.
    pub fn buffer(&self) -> u32 {
        Self::BUFFER
    }

    /// Read back `len` bytes of user memory.
    pub fn peek(&self, addr: u32, len: usize) -> Vec<u8> {
        self.memory().copy_in(VirtAddr::new(addr), len as u32).unwrap()
    }

    /// Push `number` and `args` at `esp` and return the matching frame.
    pub fn frame_at(&self, esp: u32, number: u32, args: &[u32]) -> TrapFrame {
        let words: Vec<u8> = core::iter::once(number)
            .chain(args.iter().copied())
            .flat_map(u32::to_le_bytes)
            .collect();
        self.memory().copy_out(VirtAddr::new(esp), &words).unwrap();
        TrapFrame::new(esp)
    }

    pub fn frame(&self, number: u32, args: &[u32]) -> TrapFrame {
        self.frame_at(Self::ESP, number, args)
    }

    pub fn handle(&self, frame: &mut TrapFrame) -> Outcome {
        Syscalls::new(&self.fs, &self.processes, &self.console).handle(
            frame,
            &self.process,
            &self.space,
        )
    }

    /// Push a call on the default stack and trap.
    pub fn call(&self, number: u32, args: &[u32]) -> Outcome {
        let mut frame = self.frame(number, args);
        self.handle(&mut frame)
    }
}
