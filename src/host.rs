//! Collaborators the interpreter talks to: the console, the file store and
//! the raw memory bus.
//!
//! Each one is a small trait with a std-backed implementation for the
//! binary and an in-memory one for tests and embedding.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::rc::Rc;

// ───────────────────────────────────────────────────────────────────────
// Console
// ───────────────────────────────────────────────────────────────────────

pub trait Console {
    fn print(&mut self, text: &str);

    /// Next full input line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> Option<String>;

    fn clear(&mut self) {
        self.print("\x1b[2J\x1b[H");
    }

    fn move_cursor(&mut self, row: i64, col: i64) {
        self.print(&format!("\x1b[{row};{col}H"));
    }

    /// Polled between statements of a running program.
    fn terminate_requested(&mut self) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn print(&mut self, text: &str) {
        let mut out = io::stdout().lock();
        // a closed stdout leaves nobody to report to
        let _ = out.write_all(text.as_bytes()).and_then(|_| out.flush());
    }

    fn read_line(&mut self) -> Option<String> {
        let mut buf = String::new();
        match io::stdin().lock().read_line(&mut buf) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(buf.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    input: VecDeque<String>,
    output: String,
    polls_left: Option<usize>,
}

/// Console fed from a queue of lines that records everything printed.
/// Clones share the same buffers, so a test can keep one handle and give
/// the other to the interpreter.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    inner: Rc<RefCell<Script>>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let console = Self::new();
        for line in lines {
            console.push_input(line);
        }
        console
    }

    pub fn push_input(&self, line: impl Into<String>) {
        self.inner.borrow_mut().input.push_back(line.into());
    }

    pub fn output(&self) -> String {
        self.inner.borrow().output.clone()
    }

    pub fn take_output(&self) -> String {
        std::mem::take(&mut self.inner.borrow_mut().output)
    }

    /// Reports a terminate request once `polls` polls have gone by.
    pub fn terminate_after(&self, polls: usize) {
        self.inner.borrow_mut().polls_left = Some(polls);
    }
}

impl Console for ScriptedConsole {
    fn print(&mut self, text: &str) {
        self.inner.borrow_mut().output.push_str(text);
    }

    fn read_line(&mut self) -> Option<String> {
        self.inner.borrow_mut().input.pop_front()
    }

    fn terminate_requested(&mut self) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.polls_left {
            Some(0) => true,
            Some(n) => {
                inner.polls_left = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

// ───────────────────────────────────────────────────────────────────────
// File store
// ───────────────────────────────────────────────────────────────────────

pub trait FileStore {
    /// Whole file content; `Ok(None)` when the file does not exist.
    fn read(&mut self, path: &str) -> io::Result<Option<String>>;

    fn write(&mut self, path: &str, content: &str) -> io::Result<()>;

    /// Entry names under `path`; `Ok(None)` when it is not a directory.
    fn list(&mut self, path: &str) -> io::Result<Option<Vec<String>>>;
}

/// Files in a directory on disk.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileStore for DirStore {
    fn read(&mut self, path: &str) -> io::Result<Option<String>> {
        let full = self.root.join(path);
        if !full.is_file() {
            return Ok(None);
        }
        fs::read_to_string(full).map(Some)
    }

    fn write(&mut self, path: &str, content: &str) -> io::Result<()> {
        fs::write(self.root.join(path), content)
    }

    fn list(&mut self, path: &str) -> io::Result<Option<Vec<String>>> {
        let dir = self.root.join(path);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type()?.is_dir() {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        Ok(Some(names))
    }
}

/// Flat in-memory file namespace; clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    files: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: &str, content: &str) {
        self.files.borrow_mut().insert(path.to_string(), content.to_string());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files.borrow().get(path).cloned()
    }
}

impl FileStore for MemStore {
    fn read(&mut self, path: &str) -> io::Result<Option<String>> {
        Ok(self.get(path))
    }

    fn write(&mut self, path: &str, content: &str) -> io::Result<()> {
        self.insert(path, content);
        Ok(())
    }

    fn list(&mut self, path: &str) -> io::Result<Option<Vec<String>>> {
        let prefix = path.trim_end_matches('/');
        let files = self.files.borrow();
        let names: Vec<String> = files
            .keys()
            .filter_map(|k| match prefix {
                "" => Some(k.clone()),
                p => k.strip_prefix(p)?.strip_prefix('/').map(str::to_string),
            })
            .collect();
        Ok((prefix.is_empty() || !names.is_empty()).then_some(names))
    }
}

// ───────────────────────────────────────────────────────────────────────
// Memory bus
// ───────────────────────────────────────────────────────────────────────

pub trait MemoryBus {
    fn peek(&mut self, addr: i64) -> Result<u8, String>;

    fn poke(&mut self, addr: i64, value: u8) -> Result<(), String>;

    fn plot(&mut self, x: i64, y: i64, color: u8) -> Result<(), String> {
        let _ = (x, y, color);
        Err("no graphics adapter attached".into())
    }
}

/// Bus with nothing behind it.
#[derive(Debug, Default)]
pub struct NoBus;

impl MemoryBus for NoBus {
    fn peek(&mut self, addr: i64) -> Result<u8, String> {
        Err(format!("no memory bus attached (peek {addr})"))
    }

    fn poke(&mut self, addr: i64, _value: u8) -> Result<(), String> {
        Err(format!("no memory bus attached (poke {addr})"))
    }
}

/// Plain byte array mapped from address 0.
#[derive(Debug, Clone)]
pub struct RamBus {
    bytes: Vec<u8>,
}

impl RamBus {
    pub fn new(size: usize) -> Self {
        Self { bytes: vec![0; size] }
    }

    fn slot(&self, addr: i64) -> Result<usize, String> {
        usize::try_from(addr)
            .ok()
            .filter(|&a| a < self.bytes.len())
            .ok_or_else(|| format!("address {addr} is not mapped"))
    }
}

impl MemoryBus for RamBus {
    fn peek(&mut self, addr: i64) -> Result<u8, String> {
        let at = self.slot(addr)?;
        Ok(self.bytes[at])
    }

    fn poke(&mut self, addr: i64, value: u8) -> Result<(), String> {
        let at = self.slot(addr)?;
        self.bytes[at] = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_console_shares_buffers() {
        let console = ScriptedConsole::with_input(["one", "two"]);
        let mut handle: Box<dyn Console> = Box::new(console.clone());

        handle.print("hello ");
        assert_eq!(handle.read_line().as_deref(), Some("one"));
        assert_eq!(handle.read_line().as_deref(), Some("two"));
        assert_eq!(handle.read_line(), None);
        assert_eq!(console.output(), "hello ");
    }

    #[test]
    fn terminate_fires_after_polls() {
        let mut console = ScriptedConsole::new();
        console.terminate_after(2);
        let polls: Vec<bool> = (0..4).map(|_| console.terminate_requested()).collect();
        assert_eq!(polls, vec![false, false, true, true]);
    }

    #[test]
    fn mem_store_lists_by_prefix() {
        let mut store = MemStore::new();
        store.write("a.bas", "10 END\n").unwrap();
        store.write("games/b.bas", "").unwrap();

        let test_cases = vec![
            ("", Some(vec!["a.bas".to_string(), "games/b.bas".to_string()])),
            ("games", Some(vec!["b.bas".to_string()])),
            ("nope", None),
        ];
        for (path, expected) in test_cases {
            assert_eq!(store.list(path).unwrap(), expected, "{path}");
        }
        assert_eq!(store.read("missing").unwrap(), None);
    }

    #[test]
    fn ram_bus_bounds() {
        let mut bus = RamBus::new(4);
        bus.poke(3, 42).unwrap();
        assert_eq!(bus.peek(3), Ok(42));
        assert!(bus.peek(4).is_err());
        assert!(bus.poke(-1, 0).is_err());
        assert!(NoBus.peek(0).is_err());
    }
}
