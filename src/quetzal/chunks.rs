//! IFhd and Stks chunk codecs

use crate::error::{ZError, ZResult};
use crate::vm::VM;

/// IFhd: fingerprint of the running story plus the resume point. The PC is
/// recorded as `pc + 1` (the chunk counts from the byte after the opcode;
/// the loader subtracts the 1 back out).
pub struct IfhdChunk {
    pub release: u16,
    pub serial: [u8; 6],
    pub checksum: u16,
    /// 3-byte packed program counter, already incremented.
    pub pc: u32,
}

impl IfhdChunk {
    pub fn from_vm(vm: &VM) -> IfhdChunk {
        IfhdChunk {
            release: vm.header.release,
            serial: vm.header.serial,
            checksum: vm.header.checksum,
            pc: vm.pc as u32 + 1,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(13);
        bytes.extend_from_slice(&self.release.to_be_bytes());
        bytes.extend_from_slice(&self.serial);
        bytes.extend_from_slice(&self.checksum.to_be_bytes());
        bytes.push((self.pc >> 16) as u8);
        bytes.push((self.pc >> 8) as u8);
        bytes.push(self.pc as u8);
        bytes
    }

    pub fn from_bytes(data: &[u8]) -> ZResult<IfhdChunk> {
        if data.len() < 13 {
            return Err(ZError::quetzal("IFhd chunk too small"));
        }
        let mut serial = [0u8; 6];
        serial.copy_from_slice(&data[2..8]);
        Ok(IfhdChunk {
            release: u16::from_be_bytes([data[0], data[1]]),
            serial,
            checksum: u16::from_be_bytes([data[8], data[9]]),
            pc: ((data[10] as u32) << 16) | ((data[11] as u32) << 8) | data[12] as u32,
        })
    }
}

/// One decoded Stks frame.
pub struct StackFrame {
    /// Packed return PC as stored (`pc + 1`); 0 marks the dummy frame.
    pub return_pc: u32,
    pub return_var: u8,
    pub arg_mask: u8,
    pub locals: Vec<u16>,
    /// Stack-only values (beyond the locals).
    pub stack: Vec<u16>,
}

/// Stks: one frame per active call, outermost first, preceded by a
/// synthetic dummy frame for the top-level context. Each frame is a 3-byte
/// packed return PC, a flags byte (local count in the low nibble), the
/// return variable, the supplied-argument mask, a 2-byte count of
/// stack-only values, then the locals and the stack values as words.
pub struct StksChunk {
    pub data: Vec<u8>,
}

impl StksChunk {
    pub fn from_vm(vm: &VM) -> StksChunk {
        let mut data = Vec::new();

        // The dummy frame owns whatever value-stack entries sit below the
        // first real frame (the whole stack when no call is active, so an
        // immediate save/restore round-trip loses nothing).
        let dummy_end = vm
            .call_stack
            .first()
            .map(|f| f.stack_base)
            .unwrap_or(vm.stack.len());
        write_frame(&mut data, 0, 0, 0, 0, &[], &vm.stack[..dummy_end]);

        for (idx, frame) in vm.call_stack.iter().enumerate() {
            let end = vm
                .call_stack
                .get(idx + 1)
                .map(|next| next.stack_base)
                .unwrap_or(vm.stack.len());
            let locals_end = frame.stack_base + frame.num_locals as usize;
            let locals = &vm.stack[frame.stack_base..locals_end];
            let extra = &vm.stack[locals_end..end];
            write_frame(
                &mut data,
                frame.return_pc as u32 + 1,
                frame.num_locals & 0x0F,
                frame.return_var,
                frame.arg_mask,
                locals,
                extra,
            );
        }

        StksChunk { data }
    }

    /// Decode the frames; fails on any truncation.
    pub fn parse(&self) -> ZResult<Vec<StackFrame>> {
        let data = &self.data;
        let mut frames = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            if offset + 8 > data.len() {
                return Err(ZError::quetzal("truncated stack frame in save data"));
            }
            let return_pc = ((data[offset] as u32) << 16)
                | ((data[offset + 1] as u32) << 8)
                | data[offset + 2] as u32;
            let flags = data[offset + 3];
            let return_var = data[offset + 4];
            let arg_mask = data[offset + 5];
            let stack_count =
                u16::from_be_bytes([data[offset + 6], data[offset + 7]]) as usize;
            offset += 8;

            let local_count = (flags & 0x0F) as usize;
            let words = local_count + stack_count;
            if offset + words * 2 > data.len() {
                return Err(ZError::quetzal("truncated stack values in save data"));
            }
            let mut read_word = || {
                let w = u16::from_be_bytes([data[offset], data[offset + 1]]);
                offset += 2;
                w
            };
            let locals: Vec<u16> = (0..local_count).map(|_| read_word()).collect();
            let stack: Vec<u16> = (0..stack_count).map(|_| read_word()).collect();

            frames.push(StackFrame {
                return_pc,
                return_var,
                arg_mask,
                locals,
                stack,
            });
        }
        Ok(frames)
    }
}

fn write_frame(
    data: &mut Vec<u8>,
    packed_pc: u32,
    flags: u8,
    return_var: u8,
    arg_mask: u8,
    locals: &[u16],
    stack: &[u16],
) {
    data.push((packed_pc >> 16) as u8);
    data.push((packed_pc >> 8) as u8);
    data.push(packed_pc as u8);
    data.push(flags);
    data.push(return_var);
    data.push(arg_mask);
    data.extend_from_slice(&(stack.len() as u16).to_be_bytes());
    for &w in locals.iter().chain(stack) {
        data.extend_from_slice(&w.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestStory;
    use crate::vm::CallFrame;

    #[test]
    fn ifhd_round_trips_thirteen_bytes() {
        let vm = TestStory::new().build_vm();
        let chunk = IfhdChunk::from_vm(&vm);
        let bytes = chunk.to_bytes();
        assert_eq!(bytes.len(), 13);
        let parsed = IfhdChunk::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.release, vm.header.release);
        assert_eq!(parsed.serial, vm.header.serial);
        assert_eq!(parsed.pc, vm.pc as u32 + 1);
        assert!(IfhdChunk::from_bytes(&bytes[..12]).is_err());
    }

    #[test]
    fn stks_writes_dummy_then_frames_outermost_first() {
        let mut vm = TestStory::new().build_vm();
        vm.push(0x1111).unwrap(); // top-level stack entry
        vm.call_stack.push(CallFrame {
            return_pc: 0x8AB,
            return_var: 0x05,
            num_locals: 2,
            arg_mask: 0x3F,
            stack_base: 1,
        });
        vm.push(10).unwrap(); // local 1
        vm.push(20).unwrap(); // local 2
        vm.push(0x2222).unwrap(); // frame temporary

        let chunk = StksChunk::from_vm(&vm);
        let frames = chunk.parse().unwrap();
        assert_eq!(frames.len(), 2);

        let dummy = &frames[0];
        assert_eq!(dummy.return_pc, 0);
        assert!(dummy.locals.is_empty());
        assert_eq!(dummy.stack, vec![0x1111]);

        let frame = &frames[1];
        assert_eq!(frame.return_pc, 0x8AC); // stored as pc + 1
        assert_eq!(frame.return_var, 0x05);
        assert_eq!(frame.arg_mask, 0x3F);
        assert_eq!(frame.locals, vec![10, 20]);
        assert_eq!(frame.stack, vec![0x2222]);
    }

    #[test]
    fn empty_call_stack_dummy_owns_everything() {
        let mut vm = TestStory::new().build_vm();
        vm.push(7).unwrap();
        vm.push(8).unwrap();
        let frames = StksChunk::from_vm(&vm).parse().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].stack, vec![7, 8]);
    }

    #[test]
    fn truncated_stks_fails() {
        let mut vm = TestStory::new().build_vm();
        vm.push(7).unwrap();
        let chunk = StksChunk::from_vm(&vm);
        let cut = StksChunk {
            data: chunk.data[..chunk.data.len() - 1].to_vec(),
        };
        assert!(cut.parse().is_err());
    }
}
