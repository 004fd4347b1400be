//! The fetch-decode-execute cycle and control-flow opcodes
//!
//! The program counter rests on the opcode byte while operands are
//! collected; store and branch opcodes consume their trailing bytes inside
//! the store/branch helpers, and every cycle ends with a single increment.
//! That convention is load-bearing: the Quetzal header records `pc + 1` and
//! restore/restart compensate with a `- 1`, which is what makes a restored
//! game resume at the instruction after the original save.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, trace};

use crate::dictionary;
use crate::error::{ZError, ZResult};
use crate::instruction::{classify, types_from_byte, InstructionForm, OperandType};
use crate::memory::{sign, sign16, unpack_addr};
use crate::quetzal::{RestoreGame, SaveGame};
use crate::text;
use crate::vm::{CallFrame, VM, MAX_LOCALS};
use crate::zio::{FilePurpose, StatusKind, ZMachineIo};
use crate::zobject::ObjectTree;

pub struct Interpreter {
    pub vm: VM,
    pub io: Box<dyn ZMachineIo>,
    /// Cleared by `quit`; ends the run loop after the current cycle.
    running: bool,
    /// Cooperative cancellation, observed between cycles. Hosts hold a
    /// clone of this flag and may set it from any thread.
    stop_requested: Arc<AtomicBool>,
}

impl Interpreter {
    pub fn new(vm: VM, io: Box<dyn ZMachineIo>) -> Interpreter {
        Interpreter {
            vm,
            io,
            running: false,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle a host can use to stop the loop from another thread.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_requested)
    }

    /// Run until `quit`, a stop request, or a fatal error.
    pub fn run(&mut self) -> ZResult<()> {
        self.run_with_limit(None)
    }

    /// Run with an optional opcode budget.
    pub fn run_with_limit(&mut self, limit: Option<u64>) -> ZResult<()> {
        self.running = true;
        while self.running && !self.stop_requested.load(Ordering::Relaxed) {
            if let Some(max) = limit {
                if self.vm.opcodes_executed >= max {
                    debug!("instruction limit {max} reached");
                    break;
                }
            }
            self.execute_cycle()?;
        }
        self.io.output_comment(&format!(
            "VM terminated. Executed {} opcodes.",
            self.vm.opcodes_executed
        ));
        Ok(())
    }

    /// One full instruction: fetch, operand collection, dispatch, advance.
    fn execute_cycle(&mut self) -> ZResult<()> {
        let opcode_byte = self.vm.memory.read_byte(self.vm.pc)?;
        let opcode = classify(opcode_byte);
        trace!(
            "pc {:#06x}: byte {opcode_byte:#04x} -> {:?} {:#04x}",
            self.vm.pc,
            opcode.form,
            opcode.number
        );

        let mut operands: Vec<u16> = Vec::with_capacity(4);
        if opcode.form == InstructionForm::Variable {
            self.vm.pc += 1;
            let type_byte = self.vm.memory.read_byte(self.vm.pc)?;
            for t in types_from_byte(type_byte) {
                if !self.collect_operand(t, &mut operands)? {
                    break;
                }
            }
        } else {
            for &t in &opcode.fixed_types {
                self.collect_operand(t, &mut operands)?;
            }
        }

        self.dispatch(opcode.really_variable, opcode.number, &operands)?;
        self.vm.opcodes_executed += 1;
        self.vm.pc += 1;
        Ok(())
    }

    /// Pull one operand out of the instruction stream per its type,
    /// resolving variables as we go. Returns false on OMITTED, which ends
    /// collection.
    fn collect_operand(&mut self, t: OperandType, operands: &mut Vec<u16>) -> ZResult<bool> {
        match t {
            OperandType::LargeConstant => {
                operands.push(self.vm.memory.read_word(self.vm.pc + 1)?);
                self.vm.pc += 2;
            }
            OperandType::SmallConstant => {
                self.vm.pc += 1;
                let value = self.vm.memory.read_byte(self.vm.pc)?;
                operands.push(value as u16);
            }
            OperandType::Variable => {
                self.vm.pc += 1;
                let variable = self.vm.memory.read_byte(self.vm.pc)?;
                operands.push(self.vm.read_variable(variable)?);
            }
            OperandType::Omitted => return Ok(false),
        }
        Ok(true)
    }

    /// Route to a handler. Opcode numbering spaces are disjoint per
    /// operand-count class; `je` alone accepts 3 or 4 operands in variable
    /// form.
    pub(crate) fn dispatch(&mut self, really_variable: bool, opcode: u8, operands: &[u16]) -> ZResult<()> {
        let op = |i: usize| -> ZResult<u16> {
            operands.get(i).copied().ok_or_else(|| {
                ZError::story(format!("opcode {opcode:#04x} is missing operand {i}"))
            })
        };

        if really_variable {
            return match opcode {
                0x00 => self.op_call(operands),
                0x01 => self.op_storew(op(0)?, op(1)?, op(2)?),
                0x02 => self.op_storeb(op(0)?, op(1)?, op(2)?),
                0x03 => self.op_put_prop(op(0)?, op(1)?, op(2)?),
                0x04 => self.op_read(op(0)?, op(1)?),
                0x05 => self.op_print_char(op(0)?),
                0x06 => self.op_print_num(op(0)?),
                0x07 => self.op_random(op(0)?),
                0x08 => self.op_push(op(0)?),
                0x09 => self.op_pull(op(0)?),
                0x0A => self.op_split_window(op(0)?),
                0x0B => self.op_set_window(op(0)?),
                _ => Err(ZError::story(format!("unknown VAR opcode {opcode:#04x}"))),
            };
        }

        match (operands.len(), opcode) {
            (0, 0x00) => self.op_rtrue(),
            (0, 0x01) => self.op_rfalse(),
            (0, 0x02) => self.op_print(),
            (0, 0x03) => self.op_print_ret(),
            (0, 0x04) => Ok(()), // nop
            (0, 0x05) => self.op_save(),
            (0, 0x06) => self.op_restore(),
            (0, 0x07) => self.op_restart(),
            (0, 0x08) => self.op_ret_popped(),
            (0, 0x09) => self.op_pop(),
            (0, 0x0A) => self.op_quit(),
            (0, 0x0B) => self.op_new_line(),
            (0, 0x0C) => self.op_show_status(),
            (0, 0x0D) => self.op_verify(),

            (1, 0x00) => self.op_jz(op(0)?),
            (1, 0x01) => self.op_get_sibling(op(0)?),
            (1, 0x02) => self.op_get_child(op(0)?),
            (1, 0x03) => self.op_get_parent(op(0)?),
            (1, 0x04) => self.op_get_prop_len(op(0)?),
            (1, 0x05) => self.op_inc(op(0)?),
            (1, 0x06) => self.op_dec(op(0)?),
            (1, 0x07) => self.op_print_addr(op(0)?),
            (1, 0x09) => self.op_remove_obj(op(0)?),
            (1, 0x0A) => self.op_print_obj(op(0)?),
            (1, 0x0B) => self.op_ret(op(0)?),
            (1, 0x0C) => self.op_jump(op(0)?),
            (1, 0x0D) => self.op_print_paddr(op(0)?),
            (1, 0x0E) => self.op_load(op(0)?),
            (1, 0x0F) => self.op_not(op(0)?),

            (2, 0x01) | (3, 0x01) | (4, 0x01) => self.op_je(operands),
            (2, 0x02) => self.op_jl(op(0)?, op(1)?),
            (2, 0x03) => self.op_jg(op(0)?, op(1)?),
            (2, 0x04) => self.op_dec_chk(op(0)?, op(1)?),
            (2, 0x05) => self.op_inc_chk(op(0)?, op(1)?),
            (2, 0x06) => self.op_jin(op(0)?, op(1)?),
            (2, 0x07) => self.op_test(op(0)?, op(1)?),
            (2, 0x08) => self.op_or(op(0)?, op(1)?),
            (2, 0x09) => self.op_and(op(0)?, op(1)?),
            (2, 0x0A) => self.op_test_attr(op(0)?, op(1)?),
            (2, 0x0B) => self.op_set_attr(op(0)?, op(1)?),
            (2, 0x0C) => self.op_clear_attr(op(0)?, op(1)?),
            (2, 0x0D) => self.op_store(op(0)?, op(1)?),
            (2, 0x0E) => self.op_insert_obj(op(0)?, op(1)?),
            (2, 0x0F) => self.op_loadw(op(0)?, op(1)?),
            (2, 0x10) => self.op_loadb(op(0)?, op(1)?),
            (2, 0x11) => self.op_get_prop(op(0)?, op(1)?),
            (2, 0x12) => self.op_get_prop_addr(op(0)?, op(1)?),
            (2, 0x13) => self.op_get_next_prop(op(0)?, op(1)?),
            (2, 0x14) => self.op_add(op(0)?, op(1)?),
            (2, 0x15) => self.op_sub(op(0)?, op(1)?),
            (2, 0x16) => self.op_mul(op(0)?, op(1)?),
            (2, 0x17) => self.op_div(op(0)?, op(1)?),
            (2, 0x18) => self.op_mod(op(0)?, op(1)?),

            (n, _) => Err(ZError::story(format!(
                "unknown opcode {opcode:#04x} with {n} operands"
            ))),
        }
    }

    // ---- store / branch / call protocols ----

    /// Consume the trailing store-variable byte and write the result.
    pub(crate) fn store(&mut self, value: u16) -> ZResult<()> {
        self.vm.pc += 1;
        let variable = self.vm.memory.read_byte(self.vm.pc)?;
        self.vm.write_variable(variable, value)
    }

    /// Consume the trailing branch byte(s) and take the branch if `result`
    /// matches the required outcome. Offsets 0 and 1 return false/true
    /// from the current routine; anything else moves the PC by
    /// `offset - 2`.
    pub(crate) fn branch(&mut self, result: bool) -> ZResult<()> {
        self.vm.pc += 1;
        let first = self.vm.memory.read_byte(self.vm.pc)?;
        let required = first & 0x80 != 0;
        let mut target = (first & 0x3F) as u32;
        if first & 0x40 == 0 {
            self.vm.pc += 1;
            target = (target << 8) | self.vm.memory.read_byte(self.vm.pc)? as u32;
        }
        let offset = sign(target, 14);

        if result == required {
            match offset {
                0 => self.return_from_routine(0)?,
                1 => self.return_from_routine(1)?,
                _ => self.relocate_pc(offset - 2)?,
            }
        }
        Ok(())
    }

    pub(crate) fn relocate_pc(&mut self, delta: i32) -> ZResult<()> {
        let next = self.vm.pc as i64 + delta as i64;
        if next < 0 {
            return Err(ZError::story("jump target before start of memory"));
        }
        self.vm.pc = next as usize;
        Ok(())
    }

    /// The call protocol. Routine address 0 is a built-in no-op that
    /// stores 0. Otherwise push a frame, seed the locals from the routine
    /// header and the supplied arguments, and jump into the body.
    fn op_call(&mut self, operands: &[u16]) -> ZResult<()> {
        let packed = operands
            .first()
            .copied()
            .ok_or_else(|| ZError::story("call with no routine address"))?;
        let routine = unpack_addr(packed);
        if routine == 0 {
            return self.store(0);
        }

        let num_locals = self.vm.memory.read_byte(routine)?;
        if num_locals > MAX_LOCALS {
            return Err(ZError::story(format!(
                "calling address {routine:#06x} without a routine"
            )));
        }

        self.vm.pc += 1; // rest on the caller's store-variable byte
        let return_var = self.vm.memory.read_byte(self.vm.pc)?;
        let supplied = operands.len() - 1;
        // Packed the way the save format records it.
        let arg_mask = 0x7Fu8 >> supplied;

        let frame = CallFrame {
            return_pc: self.vm.pc,
            return_var,
            num_locals,
            arg_mask,
            stack_base: self.vm.stack.len(),
        };
        trace!("call {routine:#06x} with {supplied} args, {num_locals} locals");
        self.vm.call_stack.push(frame);

        for i in 0..num_locals as usize {
            let value = if i + 1 < operands.len() {
                operands[i + 1]
            } else {
                self.vm.memory.read_word(routine + i * 2 + 1)?
            };
            self.vm.push(value)?;
        }

        // The cycle's trailing increment lands on the first instruction.
        self.vm.pc = routine + num_locals as usize * 2;
        Ok(())
    }

    /// The return protocol: pop the frame, restore PC and value-stack
    /// height in lock-step, then store the result for the caller.
    pub(crate) fn return_from_routine(&mut self, value: u16) -> ZResult<()> {
        let frame = self
            .vm
            .call_stack
            .pop()
            .ok_or_else(|| ZError::story("return with no routine call active"))?;
        self.vm.stack.truncate(frame.stack_base);
        self.vm.pc = frame.return_pc;
        self.vm.write_variable(frame.return_var, value)
    }

    /// Refresh the status line from the status globals.
    pub(crate) fn update_status(&mut self) -> ZResult<()> {
        let location_obj = self.vm.read_variable(0x10)?;
        let location = match self.vm.object_name(location_obj) {
            Ok(name) => name,
            Err(ZError::Story(_)) => "Nowhere".to_string(),
            Err(e) => return Err(e),
        };
        let a = sign16(self.vm.read_variable(0x11)?);
        let b = sign16(self.vm.read_variable(0x12)?);
        let kind = if self.vm.header.status_is_time() {
            StatusKind::Time
        } else {
            StatusKind::Score
        };
        self.io.set_status(&location, a, b, kind);
        Ok(())
    }

    pub(crate) fn decode_string_at(&self, addr: usize) -> ZResult<(String, usize)> {
        text::decode_string(
            &self.vm.memory,
            self.vm.header.version,
            self.vm.header.abbrev_table as usize,
            addr,
        )
    }

    // ---- control and state opcodes ----

    fn op_rtrue(&mut self) -> ZResult<()> {
        self.return_from_routine(1)
    }

    fn op_rfalse(&mut self) -> ZResult<()> {
        self.return_from_routine(0)
    }

    fn op_ret(&mut self, value: u16) -> ZResult<()> {
        self.return_from_routine(value)
    }

    fn op_ret_popped(&mut self) -> ZResult<()> {
        let value = self.vm.pop()?;
        self.return_from_routine(value)
    }

    fn op_quit(&mut self) -> ZResult<()> {
        debug!("quit after {} opcodes", self.vm.opcodes_executed);
        self.running = false;
        Ok(())
    }

    /// No checksum verification is performed; verify always succeeds.
    fn op_verify(&mut self) -> ZResult<()> {
        self.branch(true)
    }

    fn op_restart(&mut self) -> ZResult<()> {
        self.vm.reset()?;
        self.io.reset();
        // Compensate for the cycle's trailing increment.
        self.vm.pc -= 1;
        Ok(())
    }

    fn op_show_status(&mut self) -> ZResult<()> {
        self.update_status()
    }

    /// `random`: positive draws uniformly in 1..=n, zero reseeds from
    /// entropy, negative seeds deterministically. All three store (the
    /// seeding modes store 0) so the store byte is always consumed.
    fn op_random(&mut self, r: u16) -> ZResult<()> {
        let r = sign16(r);
        if r > 0 {
            let value = self.vm.rng.next_in(r as u16);
            self.store(value)
        } else {
            if r == 0 {
                self.vm.rng.reseed();
            } else {
                self.vm.rng.seed(-(r as i32) as u64);
            }
            self.store(0)
        }
    }

    /// `read`: refresh the status line, block for a line of input, copy it
    /// lowercased into the text buffer and tokenize it into the parse
    /// table. No input available skips the whole operation.
    fn op_read(&mut self, text_addr: u16, parse_addr: u16) -> ZResult<()> {
        self.update_status()?;
        let Some(input) = self.io.read_line() else {
            return Ok(());
        };
        let text_addr = text_addr as usize;
        let max_len = self.vm.memory.read_byte(text_addr)? as usize;
        let lowered: String = input.to_lowercase().chars().take(max_len).collect();
        let zscii = text::string_to_zscii(&lowered);
        for (i, &c) in zscii.iter().enumerate() {
            self.vm.memory.write_byte(text_addr + 1 + i, c as u8)?;
        }
        self.vm.memory.write_byte(text_addr + 1 + zscii.len(), 0)?;
        dictionary::tokenize(
            &self.vm.dictionary,
            &mut self.vm.memory,
            parse_addr as usize,
            &zscii,
        )
    }

    fn op_save(&mut self) -> ZResult<()> {
        match self.io.choose_file("Choose a save file", FilePurpose::Save) {
            None => {
                self.io.output_comment("No file selected.");
                self.branch(false)
            }
            Some(path) => {
                let saved = self.save_game(&path);
                self.branch(saved)
            }
        }
    }

    fn op_restore(&mut self) -> ZResult<()> {
        match self.io.choose_file("Choose a save file", FilePurpose::Load) {
            None => {
                self.io.output_comment("No file selected.");
                self.branch(false)
            }
            Some(path) => {
                if self.load_save(&path) {
                    // The PC now sits on the original save instruction, so
                    // this consumes the save's branch operands: the
                    // restored game sees its save succeed.
                    self.branch(true)
                } else {
                    self.branch(false)
                }
            }
        }
    }

    /// Write a save file; failures are recoverable (comment + false).
    fn save_game(&mut self, path: &Path) -> bool {
        match SaveGame::from_vm(&self.vm).write_to_file(path) {
            Ok(()) => true,
            Err(e) => {
                self.io.output_comment(&format!("Error saving: {e}"));
                false
            }
        }
    }

    /// Load a save file; failures are recoverable and leave the current
    /// session untouched.
    fn load_save(&mut self, path: &Path) -> bool {
        let result = RestoreGame::from_file(path).and_then(|r| r.restore_to_vm(&mut self.vm));
        match result {
            Ok(()) => true,
            Err(e) => {
                self.io
                    .output_comment(&format!("Error loading save file: {e}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{ScriptedIo, TestStory};
    use test_log::test;

    fn interp(story: TestStory) -> (Interpreter, ScriptedIo) {
        let io = ScriptedIo::new();
        let handle = io.handle();
        (Interpreter::new(story.build_vm(), Box::new(io)), handle)
    }

    #[test]
    fn call_and_return_round_trip() {
        let mut story = TestStory::new();
        // call 0x0480 -> sp; quit
        story.set_code(&[0xE0, 0x3F, 0x04, 0x80, 0x00, 0xBA]);
        // routine at 0x900: one local defaulting to 5; ret local1
        story.poke(0x900, &[0x01, 0x00, 0x05, 0xAB, 0x01]);
        let (mut i, _io) = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![5]);
        assert!(i.vm.call_stack.is_empty());
    }

    #[test]
    fn call_arguments_override_defaults() {
        let mut story = TestStory::new();
        // call 0x0480 with argument 9 -> sp; quit
        story.set_code(&[0xE0, 0x1F, 0x04, 0x80, 0x09, 0x00, 0xBA]);
        story.poke(0x900, &[0x01, 0x00, 0x05, 0xAB, 0x01]);
        let (mut i, _io) = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![9]);
    }

    #[test]
    fn call_to_address_zero_stores_zero() {
        let mut story = TestStory::new();
        story.set_code(&[0xE0, 0x3F, 0x00, 0x00, 0x00, 0xBA]);
        let (mut i, _io) = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![0]);
    }

    #[test]
    fn call_restores_stack_height_on_return() {
        let mut story = TestStory::new();
        // push #7; call routine -> sp; quit. The routine pushes twice and
        // returns its second local; the temporaries must vanish.
        story.set_code(&[
            0xE8, 0x7F, 0x07, // push #7
            0xE0, 0x1F, 0x04, 0x80, 0x09, 0x00, // call 0x900 with arg 9 -> sp
            0xBA,
        ]);
        story.poke(
            0x900,
            &[
                0x02, 0x00, 0x05, 0x00, 0x06, // two locals, defaults 5 and 6
                0xE8, 0x7F, 0x51, // push #0x51
                0xE8, 0x7F, 0x52, // push #0x52
                0xAB, 0x02, // ret local2
            ],
        );
        let (mut i, _io) = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![7, 6]);
        assert!(i.vm.call_stack.is_empty());
    }

    #[test]
    fn branch_offsets_zero_and_one_return() {
        // Branch offset 1 means "return true" from the routine.
        let mut story = TestStory::new();
        story.set_code(&[0xE0, 0x3F, 0x04, 0x80, 0x00, 0xBA]);
        story.poke(0x900, &[0x00, 0x90, 0x00, 0xC1]); // jz #0 [true -> rtrue]
        let (mut i, _io) = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![1]);
    }

    #[test]
    fn branch_offset_zero_returns_false() {
        let mut story = TestStory::new();
        story.set_code(&[0xE0, 0x3F, 0x04, 0x80, 0x00, 0xBA]);
        story.poke(0x900, &[0x00, 0x90, 0x00, 0xC0]); // jz #0 [true -> rfalse]
        let (mut i, _io) = interp(story);
        i.run().unwrap();
        assert_eq!(i.vm.stack, vec![0]);
    }

    #[test]
    fn branch_adjusts_pc_by_offset_minus_two() {
        let mut story = TestStory::new();
        // jz #0 with single-byte branch-on-true offset 5: skips three
        // new_lines and lands on quit.
        story.set_code(&[0x90, 0x00, 0xC5, 0xBB, 0xBB, 0xBB, 0xBA]);
        let (mut i, io) = interp(story);
        i.run().unwrap();
        assert_eq!(io.output(), "");
        assert_eq!(i.vm.opcodes_executed, 2);
    }

    #[test]
    fn branch_not_taken_leaves_pc_alone() {
        let mut story = TestStory::new();
        // jz #7 branch-on-true: condition is false, fall through to the
        // single new_line, then quit.
        story.set_code(&[0x90, 0x07, 0xC4, 0xBB, 0xBA]);
        let (mut i, io) = interp(story);
        i.run().unwrap();
        assert_eq!(io.output(), "\n");
    }

    #[test]
    fn branch_on_false_when_condition_false() {
        let mut story = TestStory::new();
        // jz #7 branch-on-false (bit 7 clear) offset 5: 7 != 0, so the
        // branch fires and skips the new_lines.
        story.set_code(&[0x90, 0x07, 0x45, 0xBB, 0xBB, 0xBB, 0xBA]);
        let (mut i, io) = interp(story);
        i.run().unwrap();
        assert_eq!(io.output(), "");
    }

    #[test]
    fn two_byte_branch_offsets_are_signed() {
        let mut story = TestStory::new();
        // quit sits at 0x800; the jz at 0x801 takes a 14-bit offset of -3,
        // landing exactly on the quit.
        story.set_code(&[0xBA, 0x90, 0x00, 0xBF, 0xFD]);
        let (mut i, _io) = interp(story);
        i.vm.pc = 0x801;
        i.run().unwrap();
        assert_eq!(i.vm.opcodes_executed, 2);
    }

    #[test]
    fn je_matches_any_of_three_operands() {
        let mut story = TestStory::new();
        // variable-form je #5, #9, #5 [true +3]: skips the new_line.
        story.set_code(&[0xC1, 0x57, 0x05, 0x09, 0x05, 0xC3, 0xBB, 0xBA]);
        let (mut i, io) = interp(story);
        i.run().unwrap();
        assert_eq!(io.output(), "");
    }

    #[test]
    fn print_decodes_inline_string() {
        let mut story = TestStory::new();
        story.set_code(&[0xB2, 0xB5, 0xC5, 0xBA]); // print "hi"; quit
        let (mut i, io) = interp(story);
        i.run().unwrap();
        assert_eq!(io.output(), "hi");
    }

    #[test]
    fn unknown_opcode_is_fatal() {
        let mut story = TestStory::new();
        story.set_code(&[0x98, 0x00]); // 1OP number 8 does not exist
        let (mut i, _io) = interp(story);
        assert!(matches!(i.run(), Err(ZError::Story(_))));
    }

    #[test]
    fn stop_flag_halts_between_cycles() {
        let mut story = TestStory::new();
        story.set_code(&[0x8C, 0xFF, 0xFF]); // jump to self
        let (mut i, _io) = interp(story);
        i.stop_handle().store(true, Ordering::Relaxed);
        i.run().unwrap();
        assert_eq!(i.vm.opcodes_executed, 0);
    }

    #[test]
    fn instruction_limit_stops_the_loop() {
        let mut story = TestStory::new();
        story.set_code(&[0x8C, 0xFF, 0xFF]); // jump to self
        let (mut i, _io) = interp(story);
        i.run_with_limit(Some(10)).unwrap();
        assert_eq!(i.vm.opcodes_executed, 10);
    }

    #[test]
    fn restart_reinitializes_from_the_pristine_image() {
        let mut story = TestStory::new();
        story.set_code(&[0xB7]); // restart
        let (mut i, _io) = interp(story);
        i.vm.memory.write_byte(0x640, 7).unwrap();
        i.vm.push(3).unwrap();
        i.vm.pc = 0x800;
        i.dispatch(false, 0x07, &[]).unwrap();
        assert_eq!(i.vm.memory.read_byte(0x640).unwrap(), 0);
        assert!(i.vm.stack.is_empty());
        // One short of the initial pc; the cycle's increment finishes it.
        assert_eq!(i.vm.pc, i.vm.header.initial_pc as usize - 1);
    }

    #[test]
    fn read_fills_text_buffer_and_parse_table() {
        let mut story = TestStory::new();
        story.set_dictionary(&[], &["take"]);
        let text_buf = story.append(&[10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        let parse = story.append(&[4, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        story.set_code(&[0xBA]);
        let (mut i, io) = interp(story);
        io.push_input("TAKE lamp");
        i.dispatch(true, 0x04, &[text_buf as u16, parse as u16])
            .unwrap();
        let mem = &i.vm.memory;
        // Lowercased text, zero-terminated.
        assert_eq!(mem.read_byte(text_buf + 1).unwrap(), b't');
        assert_eq!(mem.read_byte(text_buf + 9).unwrap(), b'p');
        assert_eq!(mem.read_byte(text_buf + 10).unwrap(), 0);
        assert_eq!(mem.read_byte(parse + 1).unwrap(), 2);
        assert_ne!(mem.read_word(parse + 2).unwrap(), 0); // take found
        assert_eq!(mem.read_word(parse + 6).unwrap(), 0); // lamp not
    }

    #[test]
    fn read_truncates_to_buffer_capacity() {
        let mut story = TestStory::new();
        let text_buf = story.append(&[3, 0, 0, 0, 0, 0, 0, 0]);
        let parse = story.append(&[4, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        story.set_code(&[0xBA]);
        let (mut i, io) = interp(story);
        io.push_input("abcdef");
        i.dispatch(true, 0x04, &[text_buf as u16, parse as u16])
            .unwrap();
        assert_eq!(i.vm.memory.read_byte(text_buf + 3).unwrap(), b'c');
        assert_eq!(i.vm.memory.read_byte(text_buf + 4).unwrap(), 0);
    }

    #[test]
    fn random_seeding_is_deterministic_and_stores() {
        let mut story = TestStory::new();
        story.set_code(&[0xBA]);
        let (mut i, _io) = interp(story);

        // random -7 reseeds deterministically and stores 0; every call
        // consumes a store byte, here variable 0 (the stack).
        let seed = (-7i16) as u16;
        i.vm.pc = 0x800;
        i.dispatch(true, 0x07, &[seed]).unwrap();
        assert_eq!(i.vm.pop().unwrap(), 0);

        i.vm.pc = 0x800;
        i.dispatch(true, 0x07, &[20]).unwrap();
        let first = i.vm.pop().unwrap();

        i.vm.pc = 0x800;
        i.dispatch(true, 0x07, &[seed]).unwrap();
        i.vm.pop().unwrap();
        i.vm.pc = 0x800;
        i.dispatch(true, 0x07, &[20]).unwrap();
        assert_eq!(i.vm.pop().unwrap(), first);
        assert!((1..=20).contains(&first));
    }

    #[test]
    fn verify_branches_true_unconditionally() {
        let mut story = TestStory::new();
        story.set_code(&[0xBD, 0xC4, 0xBB, 0xBA]); // verify [true +4] over new_line
        let (mut i, io) = interp(story);
        i.run().unwrap();
        assert_eq!(io.output(), "");
    }
}
