//! Story-file header fields, read from their fixed offsets

use std::fmt::Display;
use std::fmt::Error;
use std::fmt::Formatter;

use crate::error::{ZError, ZResult};
use crate::memory::Memory;

pub struct Header {
    pub version: u8,
    pub flags1: u8,
    pub release: u16,
    pub serial: [u8; 6],
    pub high_base: u16,
    pub initial_pc: u16,
    pub dictionary: u16,
    pub object_table: u16,
    pub global_variables: u16,
    pub dynamic_end: u16,
    pub abbrev_table: u16,
    pub len_file: usize,
    pub checksum: u16,
}

impl Header {
    pub fn parse(mem: &Memory) -> ZResult<Header> {
        let version = mem.read_byte(0x00)?;
        if !(1..=3).contains(&version) {
            return Err(ZError::story(format!(
                "unsupported story version {version} (only 1-3)"
            )));
        }

        let mut serial = [0u8; 6];
        for (i, b) in serial.iter_mut().enumerate() {
            *b = mem.read_byte(0x12 + i)?;
        }

        let header = Header {
            version,
            flags1: mem.read_byte(0x01)?,
            release: mem.read_word(0x02)?,
            serial,
            high_base: mem.read_word(0x04)?,
            initial_pc: mem.read_word(0x06)?,
            dictionary: mem.read_word(0x08)?,
            object_table: mem.read_word(0x0A)?,
            global_variables: mem.read_word(0x0C)?,
            dynamic_end: mem.read_word(0x0E)?,
            abbrev_table: mem.read_word(0x18)?,
            len_file: mem.read_word(0x1A)? as usize * 2,
            checksum: mem.read_word(0x1C)?,
        };

        if header.initial_pc == 0 {
            return Err(ZError::story("header has a zero initial program counter"));
        }
        Ok(header)
    }

    /// Serial number as printable text.
    pub fn serial_string(&self) -> String {
        self.serial.iter().map(|b| *b as char).collect()
    }

    /// Status-line kind: true when the game keeps hours/minutes in the
    /// status globals rather than score/moves.
    pub fn status_is_time(&self) -> bool {
        self.version == 3 && self.flags1 & 0x80 != 0
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        write!(
            f,
            "
Z-code version:           {}
Release number:           {}
Serial number:            {}
Start PC:                 {:#06x}
High memory base:         {:#06x}
Dictionary address:       {:#06x}
Object table address:     {:#06x}
Global variables address: {:#06x}
Size of dynamic memory:   {:#06x}
Abbreviations address:    {:#06x}
File size:                {:#06x}
Checksum:                 {:#06x}
",
            self.version,
            self.release,
            self.serial_string(),
            self.initial_pc,
            self.high_base,
            self.dictionary,
            self.object_table,
            self.global_variables,
            self.dynamic_end,
            self.abbrev_table,
            self.len_file,
            self.checksum,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_image() -> Vec<u8> {
        let mut bytes = vec![0u8; 0x200];
        bytes[0x00] = 3;
        bytes[0x02] = 0x00;
        bytes[0x03] = 42; // release
        bytes[0x06] = 0x01; // initial pc = 0x100
        bytes[0x0F] = 0x80; // dynamic end
        bytes[0x12..0x18].copy_from_slice(b"850101");
        bytes
    }

    #[test]
    fn parses_fixed_offsets() {
        let mem = Memory::new(base_image()).unwrap();
        let h = Header::parse(&mem).unwrap();
        assert_eq!(h.version, 3);
        assert_eq!(h.release, 42);
        assert_eq!(h.initial_pc, 0x100);
        assert_eq!(h.serial_string(), "850101");
    }

    #[test]
    fn rejects_unsupported_versions() {
        for v in [0u8, 4, 5, 8] {
            let mut bytes = base_image();
            bytes[0x00] = v;
            let mem = Memory::new(bytes).unwrap();
            assert!(Header::parse(&mem).is_err(), "version {v} must fail");
        }
    }

    #[test]
    fn rejects_zero_initial_pc() {
        let mut bytes = base_image();
        bytes[0x06] = 0;
        let mem = Memory::new(bytes).unwrap();
        assert!(Header::parse(&mem).is_err());
    }

    #[test]
    fn time_flag_only_in_v3() {
        let mut bytes = base_image();
        bytes[0x01] = 0x80;
        let mem = Memory::new(bytes).unwrap();
        assert!(Header::parse(&mem).unwrap().status_is_time());
    }
}
