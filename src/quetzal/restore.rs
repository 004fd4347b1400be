//! Loading Quetzal save files
//!
//! The whole file is parsed and validated before the engine is touched:
//! the IFhd fingerprint must match the running story and precede every
//! data chunk, and the memory image and stacks are materialized in
//! temporaries. Only then is the engine re-initialized and overwritten, so
//! a failed restore leaves the current session runnable.

use std::path::Path;

use crate::error::{ZError, ZResult};
use crate::quetzal::chunks::{IfhdChunk, StackFrame, StksChunk};
use crate::quetzal::compressed_memory::decompress;
use crate::quetzal::iff::IffFile;
use crate::vm::{CallFrame, VM, STACK_SIZE};
use log::{info, warn};

pub struct RestoreGame {
    iff: IffFile,
}

impl RestoreGame {
    pub fn from_file(path: &Path) -> ZResult<RestoreGame> {
        Self::from_iff(IffFile::read_from_file(path)?)
    }

    pub fn from_bytes(data: &[u8]) -> ZResult<RestoreGame> {
        Self::from_iff(IffFile::from_bytes(data)?)
    }

    fn from_iff(iff: IffFile) -> ZResult<RestoreGame> {
        if &iff.form_type != b"IFZS" {
            return Err(ZError::quetzal("file is not a Quetzal save file"));
        }
        let Some(header_pos) = iff.chunk_position(b"IFhd") else {
            return Err(ZError::quetzal("save file has no IFhd chunk"));
        };
        for name in [b"CMem", b"UMem", b"Stks"] {
            if let Some(pos) = iff.chunk_position(name) {
                if pos < header_pos {
                    return Err(ZError::quetzal("data chunk precedes the IFhd header"));
                }
            }
        }
        if iff.find_chunk(b"CMem").is_none() && iff.find_chunk(b"UMem").is_none() {
            return Err(ZError::quetzal("save file has no memory chunk"));
        }
        if iff.find_chunk(b"Stks").is_none() {
            return Err(ZError::quetzal("save file has no Stks chunk"));
        }
        Ok(RestoreGame { iff })
    }

    /// Rebuild the engine from the save. On success the VM is
    /// indistinguishable from having reached the saved point by normal
    /// execution, with the PC placed so the cycle resumes at the
    /// instruction after the one that saved.
    pub fn restore_to_vm(&self, vm: &mut VM) -> ZResult<()> {
        let ifhd_chunk = self
            .iff
            .find_chunk(b"IFhd")
            .ok_or_else(|| ZError::quetzal("save file has no IFhd chunk"))?;
        let ifhd = IfhdChunk::from_bytes(&ifhd_chunk.data)?;
        if ifhd.release != vm.header.release || ifhd.checksum != vm.header.checksum {
            return Err(ZError::quetzal("wrong game"));
        }
        if ifhd.serial != vm.header.serial {
            warn!("serial number mismatch; save may be incompatible");
        }
        if ifhd.pc == 0 {
            return Err(ZError::quetzal("saved program counter is zero"));
        }

        // Materialize everything fallible before touching the VM.
        let dynamic = if let Some(cmem) = self.iff.find_chunk(b"CMem") {
            decompress(&cmem.data, vm.memory.original_dynamic())?
        } else {
            let umem = self
                .iff
                .find_chunk(b"UMem")
                .ok_or_else(|| ZError::quetzal("save file has no memory chunk"))?;
            if umem.data.len() != vm.memory.dynamic_end() {
                return Err(ZError::quetzal(
                    "uncompressed memory image is the wrong size",
                ));
            }
            umem.data.clone()
        };

        let stks_chunk = self
            .iff
            .find_chunk(b"Stks")
            .ok_or_else(|| ZError::quetzal("save file has no Stks chunk"))?;
        let stks = StksChunk {
            data: stks_chunk.data.clone(),
        };
        let frames = stks.parse()?;
        let total_values: usize = frames
            .iter()
            .map(|f| f.locals.len() + f.stack.len())
            .sum();
        if total_values > STACK_SIZE {
            return Err(ZError::quetzal("saved stacks exceed the value-stack limit"));
        }

        // Commit: fresh init, then overlay.
        vm.reset()?;
        vm.memory.overwrite_dynamic(&dynamic);
        for frame in &frames {
            self.push_frame(vm, frame)?;
        }
        vm.pc = ifhd.pc as usize - 1;
        info!("restore complete, pc {:#06x}", vm.pc);
        Ok(())
    }

    /// Frames with a nonzero packed PC become call-frame records; the
    /// dummy frame only contributes its stack values.
    fn push_frame(&self, vm: &mut VM, frame: &StackFrame) -> ZResult<()> {
        if frame.return_pc > 0 {
            vm.call_stack.push(CallFrame {
                return_pc: frame.return_pc as usize - 1,
                return_var: frame.return_var,
                num_locals: frame.locals.len() as u8,
                arg_mask: frame.arg_mask,
                stack_base: vm.stack.len(),
            });
        }
        for &value in frame.locals.iter().chain(&frame.stack) {
            vm.push(value)?;
        }
        Ok(())
    }
}
