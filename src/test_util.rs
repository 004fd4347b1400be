//! Test support: a synthetic story-file builder and a scripted I/O
//! implementation
//!
//! `TestStory` lays out a minimal but fully valid version-3 image with the
//! header, abbreviation table, object table, globals and dictionary at
//! fixed offsets, a free data area for test fixtures, and a code area at
//! the initial PC. Kept in `src/` so both unit and integration tests can
//! use it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use crate::text;
use crate::vm::VM;
use crate::zio::{FilePurpose, StatusKind, ZMachineIo};

pub const ABBREV_TABLE: usize = 0x0040;
pub const OBJECT_TABLE: usize = 0x0100;
pub const GLOBAL_TABLE: usize = 0x0300;
pub const DICTIONARY: usize = 0x0500;
pub const DATA_AREA: usize = 0x0600;
pub const DYNAMIC_END: usize = 0x0700;
pub const CODE_BASE: usize = 0x0800;
pub const IMAGE_SIZE: usize = 0x1000;

#[derive(Clone)]
pub struct TestStory {
    bytes: Vec<u8>,
    cursor: usize,
}

impl TestStory {
    pub fn new() -> TestStory {
        let mut bytes = vec![0u8; IMAGE_SIZE];
        bytes[0x00] = 3; // version
        bytes[0x02..0x04].copy_from_slice(&42u16.to_be_bytes()); // release
        bytes[0x04..0x06].copy_from_slice(&(CODE_BASE as u16).to_be_bytes());
        bytes[0x06..0x08].copy_from_slice(&(CODE_BASE as u16).to_be_bytes());
        bytes[0x08..0x0A].copy_from_slice(&(DICTIONARY as u16).to_be_bytes());
        bytes[0x0A..0x0C].copy_from_slice(&(OBJECT_TABLE as u16).to_be_bytes());
        bytes[0x0C..0x0E].copy_from_slice(&(GLOBAL_TABLE as u16).to_be_bytes());
        bytes[0x0E..0x10].copy_from_slice(&(DYNAMIC_END as u16).to_be_bytes());
        bytes[0x12..0x18].copy_from_slice(b"850101");
        bytes[0x18..0x1A].copy_from_slice(&(ABBREV_TABLE as u16).to_be_bytes());
        bytes[0x1A..0x1C].copy_from_slice(&((IMAGE_SIZE / 2) as u16).to_be_bytes());
        bytes[0x1C..0x1E].copy_from_slice(&0xBEEFu16.to_be_bytes());
        // empty dictionary: no separators, entry length 7, zero entries
        bytes[DICTIONARY] = 0;
        bytes[DICTIONARY + 1] = 7;
        TestStory {
            bytes,
            cursor: DATA_AREA,
        }
    }

    pub fn poke(&mut self, addr: usize, data: &[u8]) {
        self.bytes[addr..addr + data.len()].copy_from_slice(data);
    }

    /// Place fixture bytes in the free data area; returns their address.
    /// Placement stays word-aligned so packed addresses work.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let addr = self.cursor;
        self.poke(addr, data);
        self.cursor = addr + data.len() + (data.len() % 2);
        addr
    }

    pub fn set_code(&mut self, code: &[u8]) {
        self.poke(CODE_BASE, code);
    }

    pub fn set_release(&mut self, release: u16) {
        self.bytes[0x02..0x04].copy_from_slice(&release.to_be_bytes());
    }

    /// Fill an object's link fields (9-byte records after the 62 default
    /// bytes).
    pub fn set_object(&mut self, id: u16, parent: u8, sibling: u8, child: u8) {
        let addr = OBJECT_TABLE + 62 + (id as usize - 1) * 9;
        self.bytes[addr + 4] = parent;
        self.bytes[addr + 5] = sibling;
        self.bytes[addr + 6] = child;
    }

    pub fn set_prop_table(&mut self, id: u16, table: u16) {
        let addr = OBJECT_TABLE + 62 + (id as usize - 1) * 9 + 7;
        self.bytes[addr..addr + 2].copy_from_slice(&table.to_be_bytes());
    }

    pub fn set_prop_default(&mut self, prop: u16, value: u16) {
        let addr = OBJECT_TABLE + (prop as usize - 1) * 2;
        self.bytes[addr..addr + 2].copy_from_slice(&value.to_be_bytes());
    }

    /// Point abbreviation `index` at a word address.
    pub fn set_abbrev_entry(&mut self, index: usize, word_addr: u16) {
        let addr = ABBREV_TABLE + index * 2;
        self.bytes[addr..addr + 2].copy_from_slice(&word_addr.to_be_bytes());
    }

    /// Build a dictionary with the given separators and words. Entries are
    /// 7 bytes (4-byte key + 3 data bytes) and sorted by key, as the
    /// binary search requires.
    pub fn set_dictionary(&mut self, separators: &[u8], words: &[&str]) {
        let mut keys: Vec<[u8; 4]> = words
            .iter()
            .map(|w| text::encode_dictionary_word(&text::string_to_zscii(w)))
            .collect();
        keys.sort_unstable();

        let mut addr = DICTIONARY;
        self.bytes[addr] = separators.len() as u8;
        addr += 1;
        for &sep in separators {
            self.bytes[addr] = sep;
            addr += 1;
        }
        self.bytes[addr] = 7; // entry length
        addr += 1;
        self.bytes[addr..addr + 2].copy_from_slice(&(keys.len() as u16).to_be_bytes());
        addr += 2;
        for key in keys {
            self.bytes[addr..addr + 4].copy_from_slice(&key);
            addr += 7;
        }
    }

    pub fn image(self) -> Vec<u8> {
        self.bytes
    }

    pub fn build_vm(&self) -> VM {
        VM::new(self.bytes.clone()).expect("test story must be loadable")
    }
}

impl Default for TestStory {
    fn default() -> Self {
        TestStory::new()
    }
}

/// I/O collaborator for tests: records everything, replays scripted input
/// and file choices. Clones share the same buffers, so a test can keep a
/// handle while the interpreter owns the other.
#[derive(Clone, Default)]
pub struct ScriptedIo {
    transcript: Rc<RefCell<String>>,
    comments: Rc<RefCell<Vec<String>>>,
    inputs: Rc<RefCell<VecDeque<String>>>,
    files: Rc<RefCell<VecDeque<Option<PathBuf>>>>,
    statuses: Rc<RefCell<Vec<(String, i16, i16, StatusKind)>>>,
    windows: Rc<RefCell<Vec<(bool, u16)>>>,
    resets: Rc<RefCell<u32>>,
}

impl ScriptedIo {
    pub fn new() -> ScriptedIo {
        ScriptedIo::default()
    }

    pub fn handle(&self) -> ScriptedIo {
        self.clone()
    }

    pub fn push_input(&self, line: &str) {
        self.inputs.borrow_mut().push_back(line.to_string());
    }

    pub fn push_file(&self, path: Option<PathBuf>) {
        self.files.borrow_mut().push_back(path);
    }

    pub fn output(&self) -> String {
        self.transcript.borrow().clone()
    }

    pub fn comments(&self) -> Vec<String> {
        self.comments.borrow().clone()
    }

    pub fn statuses(&self) -> Vec<(String, i16, i16, StatusKind)> {
        self.statuses.borrow().clone()
    }

    /// Window requests seen so far, `(true, n)` for splits and
    /// `(false, n)` for selections.
    pub fn windows(&self) -> Vec<(bool, u16)> {
        self.windows.borrow().clone()
    }

    pub fn reset_count(&self) -> u32 {
        *self.resets.borrow()
    }
}

impl ZMachineIo for ScriptedIo {
    fn output_string(&mut self, text: &str) {
        self.transcript.borrow_mut().push_str(text);
    }

    fn output_line(&mut self, line: &str) {
        let mut t = self.transcript.borrow_mut();
        t.push_str(line);
        t.push('\n');
    }

    fn output_comment(&mut self, comment: &str) {
        self.comments.borrow_mut().push(comment.to_string());
    }

    fn read_line(&mut self) -> Option<String> {
        self.inputs.borrow_mut().pop_front()
    }

    fn choose_file(&mut self, _prompt: &str, _purpose: FilePurpose) -> Option<PathBuf> {
        self.files.borrow_mut().pop_front().flatten()
    }

    fn confirm(&mut self, _question: &str) -> bool {
        true
    }

    fn set_status(&mut self, location: &str, a: i16, b: i16, kind: StatusKind) {
        self.statuses
            .borrow_mut()
            .push((location.to_string(), a, b, kind));
    }

    fn split_window(&mut self, lines: u16) {
        self.windows.borrow_mut().push((true, lines));
    }

    fn set_window(&mut self, window: u16) {
        self.windows.borrow_mut().push((false, window));
    }

    fn reset(&mut self) {
        *self.resets.borrow_mut() += 1;
    }
}
