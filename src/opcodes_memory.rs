//! Memory and variable transfer opcodes
//!
//! Table accesses address dynamic memory byte- or word-wise; load, store,
//! push and pull move values through the variable-access rule, where
//! variable 0 is the top of the value stack.

use crate::error::ZResult;
use crate::interpreter::Interpreter;

impl Interpreter {
    pub(crate) fn op_loadw(&mut self, array: u16, word_index: u16) -> ZResult<()> {
        let value = self
            .vm
            .memory
            .read_word(array as usize + word_index as usize * 2)?;
        self.store(value)
    }

    pub(crate) fn op_loadb(&mut self, array: u16, byte_index: u16) -> ZResult<()> {
        let value = self
            .vm
            .memory
            .read_byte(array as usize + byte_index as usize)?;
        self.store(value as u16)
    }

    pub(crate) fn op_storew(&mut self, array: u16, word_index: u16, value: u16) -> ZResult<()> {
        self.vm
            .memory
            .write_word(array as usize + word_index as usize * 2, value)
    }

    pub(crate) fn op_storeb(&mut self, array: u16, byte_index: u16, value: u16) -> ZResult<()> {
        self.vm
            .memory
            .write_byte(array as usize + byte_index as usize, value as u8)
    }

    /// Indirect variable read: the operand names the variable to read.
    pub(crate) fn op_load(&mut self, variable: u16) -> ZResult<()> {
        let value = self.vm.read_variable(variable as u8)?;
        self.store(value)
    }

    /// Indirect variable write.
    pub(crate) fn op_store(&mut self, variable: u16, value: u16) -> ZResult<()> {
        self.vm.write_variable(variable as u8, value)
    }

    pub(crate) fn op_push(&mut self, value: u16) -> ZResult<()> {
        self.vm.push(value)
    }

    pub(crate) fn op_pull(&mut self, variable: u16) -> ZResult<()> {
        let value = self.vm.pop()?;
        self.vm.write_variable(variable as u8, value)
    }

    pub(crate) fn op_pop(&mut self) -> ZResult<()> {
        self.vm.pop()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::Interpreter;
    use crate::test_util::{ScriptedIo, TestStory};

    fn interp(story: TestStory) -> Interpreter {
        Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()))
    }

    #[test]
    fn storew_then_loadw_round_trips() {
        let mut story = TestStory::new();
        let table = story.append(&[0; 8]) as u16;
        // storew table, 1, 0x0299; loadw table, 1 -> sp; quit
        story.set_code(&[
            0xE1, 0x17, (table >> 8) as u8, table as u8, 0x01, 0x99,
            0xCF, 0x1F, (table >> 8) as u8, table as u8, 0x01, 0x00,
            0xBA,
        ]);
        let mut i = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![0x99]);
        assert_eq!(i.vm.memory.read_word(table as usize + 2).unwrap(), 0x99);
    }

    #[test]
    fn storeb_addresses_bytes() {
        let mut story = TestStory::new();
        let table = story.append(&[0; 4]) as u16;
        story.set_code(&[0xBA]);
        let mut i = interp(story);
        i.dispatch(true, 0x02, &[table, 3, 0x1AB]).unwrap();
        // Only the low byte lands.
        assert_eq!(i.vm.memory.read_byte(table as usize + 3).unwrap(), 0xAB);
        i.dispatch(true, 0x02, &[table, 0, 0x41]).unwrap();
        assert_eq!(i.vm.memory.read_byte(table as usize).unwrap(), 0x41);
    }

    #[test]
    fn push_pull_move_through_the_stack() {
        let mut story = TestStory::new();
        // push #42; pull g16; quit
        story.set_code(&[0xE8, 0x7F, 0x2A, 0xE9, 0x7F, 0x10, 0xBA]);
        let mut i = interp(story);
        i.run().unwrap();
        assert!(i.vm.stack.is_empty());
        assert_eq!(i.vm.read_global(0x10).unwrap(), 42);
    }

    #[test]
    fn load_reads_a_named_variable() {
        let mut story = TestStory::new();
        // load #0x10 -> sp (the small constant names g16); quit
        story.set_code(&[0x9E, 0x10, 0x00, 0xBA]);
        let mut i = interp(story);
        i.vm.write_global(0x10, 0x1234).unwrap();
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![0x1234]);
    }
}
