//! Dictionary table and lexical tokenization
//!
//! The dictionary is a sorted table of fixed-length entries embedded in the
//! story file: a 4-byte encoded word key followed by per-entry data bytes.
//! Lookup is a binary search comparing the key bytes; tokenization splits
//! player input at spaces and at the table's word separators and writes the
//! parse table the `read` opcode hands us.

use crate::error::ZResult;
use crate::header::Header;
use crate::memory::Memory;
use crate::text;
use log::trace;

#[derive(Debug, Clone)]
pub struct Dictionary {
    /// Word-separator bytes, kept sorted for the membership test.
    pub separators: Vec<u8>,
    pub entry_length: u8,
    pub entry_count: usize,
    /// Address of the first entry.
    pub entries_base: usize,
}

impl Dictionary {
    /// Read the dictionary geometry from the header-referenced table.
    pub fn new(mem: &Memory, header: &Header) -> ZResult<Dictionary> {
        let base = header.dictionary as usize;
        let n = mem.read_byte(base)? as usize;
        let mut separators = Vec::with_capacity(n);
        for i in 0..n {
            separators.push(mem.read_byte(base + 1 + i)?);
        }
        separators.sort_unstable();
        let entry_length = mem.read_byte(base + n + 1)?;
        let entry_count = mem.read_word(base + n + 2)? as usize;
        let entries_base = base + n + 4;
        trace!(
            "dictionary: {} entries of {} bytes at {entries_base:#06x}, {} separators",
            entry_count,
            entry_length,
            separators.len()
        );
        Ok(Dictionary {
            separators,
            entry_length,
            entry_count,
            entries_base,
        })
    }

    fn is_separator(&self, c: u16) -> bool {
        c <= 255 && self.separators.binary_search(&(c as u8)).is_ok()
    }

    /// Binary-search the table for an encoded key. Entries are sorted
    /// ascending by key bytes: a stored byte greater than the query's sends
    /// the search to the lower half. Returns the entry address, or 0 on a
    /// miss.
    pub fn lookup(&self, mem: &Memory, key: &[u8; 4]) -> ZResult<usize> {
        if self.entry_count == 0 {
            return Ok(0);
        }
        let k = self.entry_length as usize;
        let mut lower = 0usize;
        let mut upper = self.entry_count;
        let mut index = self.entry_count / 2;
        loop {
            if index >= self.entry_count {
                return Ok(0);
            }
            let mut direction = 0i8;
            for (j, &query) in key.iter().enumerate() {
                let stored = mem.read_byte(self.entries_base + index * k + j)?;
                if stored == query {
                    continue;
                }
                direction = if stored > query { -1 } else { 1 };
                break;
            }
            if direction == 0 {
                return Ok(self.entries_base + index * k);
            }
            if upper == lower {
                return Ok(0);
            }
            if direction < 0 {
                upper = index;
            } else {
                lower = index + 1;
            }
            index = (lower + upper) / 2;
        }
    }
}

/// Split ZSCII input into words and fill the parse table at `table_addr`:
/// capacity byte (already there), word count, then per word the dictionary
/// address (0 when unmatched), length, and 1-based start offset.
pub fn tokenize(
    dict: &Dictionary,
    mem: &mut Memory,
    table_addr: usize,
    input: &[u16],
) -> ZResult<()> {
    let mut words: Vec<(usize, Vec<u16>)> = Vec::new();
    let mut current: Vec<u16> = Vec::new();
    let mut word_start = 0usize;
    for (i, &c) in input.iter().enumerate() {
        if c == 32 || dict.is_separator(c) {
            if !current.is_empty() {
                words.push((word_start, std::mem::take(&mut current)));
            }
            // A separator other than space is itself a word.
            if c != 32 {
                words.push((i, vec![c]));
            }
            word_start = i + 1;
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push((word_start, current));
    }

    let capacity = mem.read_byte(table_addr)? as usize;
    mem.write_byte(table_addr + 1, words.len() as u8)?;
    for (i, (start, word)) in words.iter().enumerate() {
        if i >= capacity {
            trace!("parse table full, dropping {} words", words.len() - i);
            break;
        }
        let key = text::encode_dictionary_word(word);
        let addr = dict.lookup(mem, &key)?;
        let entry = table_addr + i * 4 + 2;
        mem.write_word(entry, addr as u16)?;
        mem.write_byte(entry + 2, word.len() as u8)?;
        mem.write_byte(entry + 3, (start + 1) as u8)?;
    }
    Ok(())
}
