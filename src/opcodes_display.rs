//! Output and window opcodes
//!
//! Everything here flows through the I/O collaborator; the engine never
//! touches a terminal itself. Window split/select requests are passed
//! through verbatim for the front end to honor or ignore.

use crate::error::ZResult;
use crate::interpreter::Interpreter;
use crate::memory::{sign16, unpack_addr};
use crate::text;
use crate::zobject::ObjectTree;

impl Interpreter {
    /// Print the Z-string embedded after the opcode and step the PC past
    /// it.
    pub(crate) fn op_print(&mut self) -> ZResult<()> {
        let (string, len) = self.decode_string_at(self.vm.pc + 1)?;
        self.vm.pc += len;
        self.io.output_string(&string);
        Ok(())
    }

    /// Print the embedded string, a newline, then return true.
    pub(crate) fn op_print_ret(&mut self) -> ZResult<()> {
        self.op_print()?;
        self.op_new_line()?;
        self.return_from_routine(1)
    }

    pub(crate) fn op_print_char(&mut self, chr: u16) -> ZResult<()> {
        let text = text::zscii_to_string(&[chr]);
        self.io.output_string(&text);
        Ok(())
    }

    pub(crate) fn op_print_num(&mut self, num: u16) -> ZResult<()> {
        self.io.output_string(&sign16(num).to_string());
        Ok(())
    }

    pub(crate) fn op_print_addr(&mut self, addr: u16) -> ZResult<()> {
        let (string, _) = self.decode_string_at(addr as usize)?;
        self.io.output_string(&string);
        Ok(())
    }

    pub(crate) fn op_print_paddr(&mut self, paddr: u16) -> ZResult<()> {
        let (string, _) = self.decode_string_at(unpack_addr(paddr))?;
        self.io.output_string(&string);
        Ok(())
    }

    pub(crate) fn op_print_obj(&mut self, obj: u16) -> ZResult<()> {
        let name = self.vm.object_name(obj)?;
        self.io.output_string(&name);
        Ok(())
    }

    pub(crate) fn op_new_line(&mut self) -> ZResult<()> {
        self.io.output_line("");
        Ok(())
    }

    pub(crate) fn op_split_window(&mut self, lines: u16) -> ZResult<()> {
        self.io.split_window(lines);
        Ok(())
    }

    pub(crate) fn op_set_window(&mut self, window: u16) -> ZResult<()> {
        self.io.set_window(window);
        Ok(())
    }
}
