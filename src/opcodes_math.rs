//! Arithmetic, logic and comparison opcodes
//!
//! Arithmetic operates on sign-extended 16-bit operands and stores the
//! truncated result; comparisons are signed except for jz, which tests the
//! literal unsigned value. Division or modulo by zero aborts the run.

use crate::error::{ZError, ZResult};
use crate::interpreter::Interpreter;
use crate::memory::sign16;
use log::trace;

impl Interpreter {
    /// je branches when the first operand equals any of the others (up to
    /// three comparands in variable form).
    pub(crate) fn op_je(&mut self, operands: &[u16]) -> ZResult<()> {
        let value = operands
            .first()
            .copied()
            .ok_or_else(|| ZError::story("je with no operands"))?;
        let equal = operands[1..].iter().any(|&other| other == value);
        self.branch(equal)
    }

    pub(crate) fn op_jl(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.branch(sign16(a) < sign16(b))
    }

    pub(crate) fn op_jg(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.branch(sign16(a) > sign16(b))
    }

    pub(crate) fn op_jz(&mut self, a: u16) -> ZResult<()> {
        self.branch(a == 0)
    }

    /// Decrement the named variable, then branch if it went below `value`
    /// (signed).
    pub(crate) fn op_dec_chk(&mut self, variable: u16, value: u16) -> ZResult<()> {
        let var = variable as u8;
        let new = self.vm.read_variable(var)?.wrapping_sub(1);
        self.vm.write_variable(var, new)?;
        self.branch(sign16(new) < sign16(value))
    }

    /// Increment the named variable, then branch if it exceeds `value`
    /// (signed).
    pub(crate) fn op_inc_chk(&mut self, variable: u16, value: u16) -> ZResult<()> {
        let var = variable as u8;
        let new = self.vm.read_variable(var)?.wrapping_add(1);
        self.vm.write_variable(var, new)?;
        self.branch(sign16(new) > sign16(value))
    }

    /// Branch when every flag bit is set in the bitmap.
    pub(crate) fn op_test(&mut self, bitmap: u16, flags: u16) -> ZResult<()> {
        self.branch(bitmap & flags == flags)
    }

    pub(crate) fn op_or(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.store(a | b)
    }

    pub(crate) fn op_and(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.store(a & b)
    }

    pub(crate) fn op_not(&mut self, value: u16) -> ZResult<()> {
        self.store(!value)
    }

    pub(crate) fn op_inc(&mut self, variable: u16) -> ZResult<()> {
        let var = variable as u8;
        let new = self.vm.read_variable(var)?.wrapping_add(1);
        self.vm.write_variable(var, new)
    }

    pub(crate) fn op_dec(&mut self, variable: u16) -> ZResult<()> {
        let var = variable as u8;
        let new = self.vm.read_variable(var)?.wrapping_sub(1);
        self.vm.write_variable(var, new)
    }

    pub(crate) fn op_add(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.store((sign16(a) as i32 + sign16(b) as i32) as u16)
    }

    pub(crate) fn op_sub(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.store((sign16(a) as i32 - sign16(b) as i32) as u16)
    }

    pub(crate) fn op_mul(&mut self, a: u16, b: u16) -> ZResult<()> {
        self.store((sign16(a) as i32 * sign16(b) as i32) as u16)
    }

    pub(crate) fn op_div(&mut self, a: u16, b: u16) -> ZResult<()> {
        if b == 0 {
            return Err(ZError::story("division by zero"));
        }
        self.store((sign16(a) as i32 / sign16(b) as i32) as u16)
    }

    pub(crate) fn op_mod(&mut self, a: u16, b: u16) -> ZResult<()> {
        if b == 0 {
            return Err(ZError::story("modulo by zero"));
        }
        self.store((sign16(a) as i32 % sign16(b) as i32) as u16)
    }

    /// Unconditional jump; the offset shares the branch convention's
    /// `- 2` adjustment but has no branch byte.
    pub(crate) fn op_jump(&mut self, label: u16) -> ZResult<()> {
        let offset = sign16(label) as i32;
        trace!("jump {offset}");
        self.relocate_pc(offset - 2)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ZError;
    use crate::interpreter::Interpreter;
    use crate::test_util::{ScriptedIo, TestStory};

    /// Run a long-form 2OP with small constants and a store to the stack.
    fn run_binary(opcode: u8, a: u8, b: u8) -> Result<u16, ZError> {
        let mut story = TestStory::new();
        story.set_code(&[opcode, a, b, 0x00, 0xBA]);
        let mut i = Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()));
        i.run()?;
        Ok(i.vm.stack[0])
    }

    #[test]
    fn signed_arithmetic() {
        assert_eq!(run_binary(0x14, 3, 4).unwrap(), 7); // add
        assert_eq!(run_binary(0x15, 3, 4).unwrap(), 0xFFFF); // 3 - 4 = -1
        assert_eq!(run_binary(0x16, 250, 250).unwrap(), (250u32 * 250) as u16); // mul
        assert_eq!(run_binary(0x17, 7, 2).unwrap(), 3); // div truncates
        assert_eq!(run_binary(0x18, 7, 2).unwrap(), 1); // mod
    }

    #[test]
    fn division_by_zero_is_fatal() {
        assert!(matches!(run_binary(0x17, 1, 0), Err(ZError::Story(_))));
        assert!(matches!(run_binary(0x18, 1, 0), Err(ZError::Story(_))));
    }

    #[test]
    fn bitwise_ops() {
        assert_eq!(run_binary(0x08, 0xF0, 0x0F).unwrap(), 0xFF); // or
        assert_eq!(run_binary(0x09, 0xF0, 0x3C).unwrap(), 0x30); // and
    }

    #[test]
    fn not_inverts_all_bits() {
        let mut story = TestStory::new();
        story.set_code(&[0x9F, 0x0F, 0x00, 0xBA]); // not #0x0F -> sp
        let mut i = Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()));
        i.run().unwrap();
        assert_eq!(i.vm.stack[0], 0xFFF0);
    }

    #[test]
    fn comparisons_are_signed() {
        // jl with g16 holding -1: signed comparison branches on -1 < 1.
        let mut story = TestStory::new();
        story.set_code(&[
            0x42, 0x10, 0x01, 0xC3, // jl v16, #1 [true +3]
            0xBB, // skipped when -1 < 1
            0xBA,
        ]);
        let mut i = Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()));
        i.vm.write_global(0x10, 0xFFFF).unwrap();
        i.run().unwrap();
        assert_eq!(i.vm.opcodes_executed, 2);
    }

    #[test]
    fn inc_chk_and_dec_chk_move_the_variable() {
        let mut story = TestStory::new();
        // inc_chk g16 > 0 [true +3] over new_line; then quit.
        story.set_code(&[0x05, 0x10, 0x00, 0xC3, 0xBB, 0xBA]);
        let mut i = Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()));
        i.run().unwrap();
        assert_eq!(i.vm.read_global(0x10).unwrap(), 1);
        assert_eq!(i.vm.opcodes_executed, 2);
    }

    #[test]
    fn dec_chk_wraps_below_zero() {
        let mut story = TestStory::new();
        // dec_chk g16 < 5: 0 -> -1, and -1 < 5 branches.
        story.set_code(&[0x04, 0x10, 0x05, 0xC3, 0xBB, 0xBA]);
        let mut i = Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()));
        i.run().unwrap();
        assert_eq!(i.vm.read_global(0x10).unwrap(), 0xFFFF);
        assert_eq!(i.vm.opcodes_executed, 2);
    }

    #[test]
    fn test_opcode_requires_all_flags() {
        let mut story = TestStory::new();
        // test #0xF0, #0x30 [true +3] over new_line: all flags present.
        story.set_code(&[0x07, 0xF0, 0x30, 0xC3, 0xBB, 0xBA]);
        let mut i = Interpreter::new(story.build_vm(), Box::new(ScriptedIo::new()));
        i.run().unwrap();
        assert_eq!(i.vm.opcodes_executed, 2);
    }
}
