//! Writing Quetzal save files
//!
//! Saving is a pure read of engine state: the chunks are assembled from
//! the current memory image, stacks and PC without mutating anything.

use std::path::Path;

use crate::error::ZResult;
use crate::quetzal::chunks::{IfhdChunk, StksChunk};
use crate::quetzal::compressed_memory::compress;
use crate::quetzal::iff::IffFile;
use crate::vm::VM;
use log::info;

pub struct SaveGame {
    iff: IffFile,
}

impl SaveGame {
    /// Assemble IFhd + CMem + Stks plus the informational ANNO/AUTH
    /// chunks from the current engine state.
    pub fn from_vm(vm: &VM) -> SaveGame {
        let mut iff = IffFile::new();
        iff.add_chunk(*b"IFhd", IfhdChunk::from_vm(vm).to_bytes());
        iff.add_chunk(
            *b"CMem",
            compress(vm.memory.dynamic(), vm.memory.original_dynamic()),
        );
        iff.add_chunk(*b"Stks", StksChunk::from_vm(vm).data);
        iff.add_chunk(*b"ANNO", b"Saved by lantern".to_vec());
        let author = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
        iff.add_chunk(*b"AUTH", author.into_bytes());
        SaveGame { iff }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.iff.to_bytes()
    }

    pub fn write_to_file(&self, path: &Path) -> ZResult<()> {
        self.iff.write_to_file(path)?;
        info!("saved game to {}", path.display());
        Ok(())
    }
}
