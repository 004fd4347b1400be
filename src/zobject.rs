//! Z-Machine object tree for versions 1-3
//!
//! Objects are nine-byte records: 32 attribute bits, parent/sibling/child
//! links (one byte each) and a pointer to the property table. The 62 bytes
//! before the first record hold the 31 two-byte property defaults. There are
//! no previous-sibling back-links; detaching a node scans forward from its
//! parent's child pointer. Object 0 is the permanent null object: its parent
//! and child read as 0, its attributes read as false, and writing to it is
//! an error.

use crate::error::{ZError, ZResult};
use crate::text;
use crate::vm::VM;
use log::trace;

pub const MAX_OBJECTS: u16 = 255;
pub const MAX_ATTRIBUTES: u16 = 31;
pub const MAX_PROPERTIES: u16 = 31;
pub const OBJECT_ENTRY_SIZE: usize = 9;
/// 31 two-byte property defaults precede the object records.
pub const PROPERTY_DEFAULTS_SIZE: usize = MAX_PROPERTIES as usize * 2;

pub trait ObjectTree {
    fn object_addr(&self, obj: u16) -> ZResult<usize>;
    fn object_parent(&self, obj: u16) -> ZResult<u16>;
    fn object_sibling(&self, obj: u16) -> ZResult<u16>;
    fn object_child(&self, obj: u16) -> ZResult<u16>;
    fn set_object_parent(&mut self, obj: u16, parent: u16) -> ZResult<()>;
    fn set_object_sibling(&mut self, obj: u16, sibling: u16) -> ZResult<()>;
    fn set_object_child(&mut self, obj: u16, child: u16) -> ZResult<()>;
    fn test_attribute(&self, obj: u16, attribute: u16) -> ZResult<bool>;
    fn set_attribute(&mut self, obj: u16, attribute: u16, value: bool) -> ZResult<()>;
    fn property_table_addr(&self, obj: u16) -> ZResult<usize>;
    fn object_name(&self, obj: u16) -> ZResult<String>;
    fn property_addr(&self, obj: u16, prop: u16) -> ZResult<usize>;
    fn property_length_at(&self, data_addr: u16) -> ZResult<u16>;
    fn get_property(&self, obj: u16, prop: u16) -> ZResult<u16>;
    fn put_property(&mut self, obj: u16, prop: u16, value: u16) -> ZResult<()>;
    fn next_property(&self, obj: u16, prop: u16) -> ZResult<u16>;
    fn previous_sibling(&self, obj: u16) -> ZResult<u16>;
    fn remove_object(&mut self, obj: u16) -> ZResult<()>;
    fn insert_object(&mut self, obj: u16, destination: u16) -> ZResult<()>;
}

impl VM {
    /// Unlink `obj` from its parent and siblings, leaving the rest of the
    /// tree intact. Shared by remove and insert.
    fn detach_object(&mut self, obj: u16) -> ZResult<()> {
        let previous = self.previous_sibling(obj)?;
        let sibling = self.object_sibling(obj)?;
        if previous == 0 {
            let parent = self.object_parent(obj)?;
            if parent > 0 {
                self.set_object_child(parent, sibling)?;
            }
        } else {
            self.set_object_sibling(previous, sibling)?;
        }
        self.set_object_sibling(obj, 0)?;
        self.set_object_parent(obj, 0)?;
        Ok(())
    }

    fn link_field_addr(&self, obj: u16, offset: usize) -> ZResult<usize> {
        Ok(self.object_addr(obj)? + offset)
    }

    fn set_link(&mut self, obj: u16, offset: usize, value: u16) -> ZResult<()> {
        if obj == 0 {
            return Err(ZError::story("attempted to relink the null object"));
        }
        if value > MAX_OBJECTS {
            return Err(ZError::story(format!(
                "object link {value} out of range (max {MAX_OBJECTS})"
            )));
        }
        let addr = self.link_field_addr(obj, offset)?;
        self.memory.write_byte(addr, value as u8)
    }
}

impl ObjectTree for VM {
    fn object_addr(&self, obj: u16) -> ZResult<usize> {
        if obj > MAX_OBJECTS {
            return Err(ZError::story(format!(
                "illegal object number {obj} (max {MAX_OBJECTS})"
            )));
        }
        if obj == 0 {
            return Ok(0);
        }
        Ok(self.header.object_table as usize
            + PROPERTY_DEFAULTS_SIZE
            + (obj as usize - 1) * OBJECT_ENTRY_SIZE)
    }

    fn object_parent(&self, obj: u16) -> ZResult<u16> {
        if obj == 0 {
            // The null object has a null parent.
            return Ok(0);
        }
        Ok(self.memory.read_byte(self.link_field_addr(obj, 4)?)? as u16)
    }

    fn object_sibling(&self, obj: u16) -> ZResult<u16> {
        if obj == 0 {
            return Err(ZError::story("attempted to find sibling of null object"));
        }
        Ok(self.memory.read_byte(self.link_field_addr(obj, 5)?)? as u16)
    }

    fn object_child(&self, obj: u16) -> ZResult<u16> {
        if obj == 0 {
            return Ok(0);
        }
        Ok(self.memory.read_byte(self.link_field_addr(obj, 6)?)? as u16)
    }

    fn set_object_parent(&mut self, obj: u16, parent: u16) -> ZResult<()> {
        self.set_link(obj, 4, parent)
    }

    fn set_object_sibling(&mut self, obj: u16, sibling: u16) -> ZResult<()> {
        self.set_link(obj, 5, sibling)
    }

    fn set_object_child(&mut self, obj: u16, child: u16) -> ZResult<()> {
        self.set_link(obj, 6, child)
    }

    fn test_attribute(&self, obj: u16, attribute: u16) -> ZResult<bool> {
        if attribute > MAX_ATTRIBUTES {
            return Err(ZError::story(format!(
                "attempted to test invalid attribute {attribute}"
            )));
        }
        if obj == 0 {
            return Ok(false);
        }
        let addr = self.object_addr(obj)? + attribute as usize / 8;
        let bit = 0x80u8 >> (attribute % 8);
        Ok(self.memory.read_byte(addr)? & bit != 0)
    }

    fn set_attribute(&mut self, obj: u16, attribute: u16, value: bool) -> ZResult<()> {
        if attribute > MAX_ATTRIBUTES {
            return Err(ZError::story(format!(
                "attempted to set invalid attribute {attribute}"
            )));
        }
        if obj == 0 {
            return Err(ZError::story("attempted to set attribute on null object"));
        }
        let addr = self.object_addr(obj)? + attribute as usize / 8;
        let bit = 0x80u8 >> (attribute % 8);
        let byte = self.memory.read_byte(addr)?;
        let byte = if value { byte | bit } else { byte & !bit };
        self.memory.write_byte(addr, byte)
    }

    fn property_table_addr(&self, obj: u16) -> ZResult<usize> {
        if obj == 0 {
            return Ok(0);
        }
        Ok(self.memory.read_word(self.object_addr(obj)? + 7)? as usize)
    }

    fn object_name(&self, obj: u16) -> ZResult<String> {
        if obj == 0 {
            return Err(ZError::story("attempted to get name of null object"));
        }
        let table = self.property_table_addr(obj)?;
        let (name, _) = text::decode_string(
            &self.memory,
            self.header.version,
            self.header.abbrev_table as usize,
            table + 1,
        )?;
        Ok(name)
    }

    /// Address of the property's data, or 0 when the object lacks it.
    /// Properties are stored in strictly descending number order, so the
    /// scan stops as soon as it passes the target.
    fn property_addr(&self, obj: u16, prop: u16) -> ZResult<usize> {
        let table = self.property_table_addr(obj)?;
        // Skip the name: its first byte is the length in words.
        let mut addr = table + self.memory.read_byte(table)? as usize * 2 + 1;
        loop {
            let size_byte = self.memory.read_byte(addr)?;
            if size_byte == 0 {
                return Ok(0);
            }
            let number = (size_byte % 32) as u16;
            let size = (size_byte / 32 + 1) as usize;
            if number == prop {
                return Ok(addr + 1);
            }
            if number < prop {
                return Ok(0);
            }
            addr += size + 1;
        }
    }

    /// Length of the property whose data starts at `data_addr`; 0 for the
    /// null address (get_prop_len 0 must yield 0).
    fn property_length_at(&self, data_addr: u16) -> ZResult<u16> {
        if data_addr == 0 {
            return Ok(0);
        }
        let size_byte = self.memory.read_byte(data_addr as usize - 1)?;
        Ok((size_byte / 32 + 1) as u16)
    }

    fn get_property(&self, obj: u16, prop: u16) -> ZResult<u16> {
        if prop == 0 || prop > MAX_PROPERTIES {
            return Err(ZError::story(format!("illegal property number {prop}")));
        }
        let addr = self.property_addr(obj, prop)?;
        if addr == 0 {
            // Fall back to the global default table.
            let default_addr =
                self.header.object_table as usize + (prop as usize - 1) * 2;
            return self.memory.read_word(default_addr);
        }
        let size = self.memory.read_byte(addr - 1)? / 32 + 1;
        match size {
            1 => Ok(self.memory.read_byte(addr)? as u16),
            2 => self.memory.read_word(addr),
            _ => Err(ZError::story("get_prop on property of size > 2")),
        }
    }

    fn put_property(&mut self, obj: u16, prop: u16, value: u16) -> ZResult<()> {
        if prop == 0 || prop > MAX_PROPERTIES {
            return Err(ZError::story(format!("illegal property number {prop}")));
        }
        let addr = self.property_addr(obj, prop)?;
        if addr == 0 {
            return Err(ZError::story(format!(
                "put_prop on property {prop} absent from object {obj}"
            )));
        }
        let size = self.memory.read_byte(addr - 1)? / 32 + 1;
        match size {
            1 => self.memory.write_byte(addr, value as u8),
            2 => self.memory.write_word(addr, value),
            _ => Err(ZError::story("put_prop on property of size > 2")),
        }
    }

    /// Number of the property after `prop`; `prop` 0 names the first, and
    /// stepping past the last yields 0.
    fn next_property(&self, obj: u16, prop: u16) -> ZResult<u16> {
        let addr = if prop == 0 {
            let table = self.property_table_addr(obj)?;
            table + self.memory.read_byte(table)? as usize * 2 + 1
        } else {
            let data = self.property_addr(obj, prop)?;
            if data == 0 {
                return Err(ZError::story(format!(
                    "get_next_prop on property {prop} absent from object {obj}"
                )));
            }
            data + (self.memory.read_byte(data - 1)? / 32 + 1) as usize
        };
        let size_byte = self.memory.read_byte(addr)?;
        Ok((size_byte % 32) as u16)
    }

    /// Scan from the parent's child pointer for the node whose sibling is
    /// `obj`. Reaching 0 first means the tree is broken, which is fatal.
    fn previous_sibling(&self, obj: u16) -> ZResult<u16> {
        let parent = self.object_parent(obj)?;
        if parent == 0 {
            return Ok(0);
        }
        let first = self.object_child(parent)?;
        if first == obj {
            return Ok(0);
        }
        let mut current = first;
        loop {
            let next = self.object_sibling(current)?;
            if next == obj {
                return Ok(current);
            }
            current = next;
            if current == 0 {
                return Err(ZError::story("the object tree is not well-founded"));
            }
        }
    }

    fn remove_object(&mut self, obj: u16) -> ZResult<()> {
        if obj == 0 {
            return Err(ZError::story("attempted to remove the null object"));
        }
        trace!("remove_object {obj}");
        self.detach_object(obj)
    }

    /// Make `obj` the first child of `destination`; its old first child
    /// becomes `obj`'s sibling.
    fn insert_object(&mut self, obj: u16, destination: u16) -> ZResult<()> {
        if obj == 0 || destination == 0 {
            return Err(ZError::story("attempted to insert involving the null object"));
        }
        trace!("insert_object {obj} into {destination}");
        self.detach_object(obj)?;
        let old_child = self.object_child(destination)?;
        self.set_object_sibling(obj, old_child)?;
        self.set_object_child(destination, obj)?;
        self.set_object_parent(obj, destination)
    }
}
