//! IFF (Interchange File Format) container handling

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::{ZError, ZResult};

/// An IFF FORM and its chunks.
pub struct IffFile {
    /// Form type; "IFZS" for Quetzal.
    pub form_type: [u8; 4],
    pub chunks: Vec<IffChunk>,
}

/// One named chunk.
pub struct IffChunk {
    pub chunk_type: [u8; 4],
    pub data: Vec<u8>,
}

impl IffFile {
    /// A fresh Quetzal FORM.
    pub fn new() -> IffFile {
        IffFile {
            form_type: *b"IFZS",
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, chunk_type: [u8; 4], data: Vec<u8>) {
        self.chunks.push(IffChunk { chunk_type, data });
    }

    /// First chunk of the given type.
    pub fn find_chunk(&self, chunk_type: &[u8; 4]) -> Option<&IffChunk> {
        self.chunks.iter().find(|c| &c.chunk_type == chunk_type)
    }

    /// Index of the first chunk of the given type.
    pub fn chunk_position(&self, chunk_type: &[u8; 4]) -> Option<usize> {
        self.chunks.iter().position(|c| &c.chunk_type == chunk_type)
    }

    /// Serialize the FORM. Chunks are padded to even length, and the pad
    /// bytes count toward the FORM length.
    pub fn to_bytes(&self) -> Vec<u8> {
        let content_size: usize = 4 + self
            .chunks
            .iter()
            .map(|c| 8 + c.data.len() + c.data.len() % 2)
            .sum::<usize>();

        let mut out = Vec::with_capacity(8 + content_size);
        out.extend_from_slice(b"FORM");
        out.extend_from_slice(&(content_size as u32).to_be_bytes());
        out.extend_from_slice(&self.form_type);
        for chunk in &self.chunks {
            out.extend_from_slice(&chunk.chunk_type);
            out.extend_from_slice(&(chunk.data.len() as u32).to_be_bytes());
            out.extend_from_slice(&chunk.data);
            if chunk.data.len() % 2 == 1 {
                out.push(0);
            }
        }
        out
    }

    pub fn write_to_file(&self, path: &Path) -> ZResult<()> {
        let mut file = File::create(path)
            .map_err(|e| ZError::quetzal(format!("failed to create save file: {e}")))?;
        file.write_all(&self.to_bytes())
            .map_err(|e| ZError::quetzal(format!("failed to write save file: {e}")))
    }

    /// Parse a FORM from raw bytes.
    pub fn from_bytes(data: &[u8]) -> ZResult<IffFile> {
        if data.len() < 12 || &data[0..4] != b"FORM" {
            return Err(ZError::quetzal("not an IFF file (missing FORM header)"));
        }
        let mut form_type = [0u8; 4];
        form_type.copy_from_slice(&data[8..12]);

        let mut iff = IffFile {
            form_type,
            chunks: Vec::new(),
        };

        let mut offset = 12;
        while offset + 8 <= data.len() {
            let mut chunk_type = [0u8; 4];
            chunk_type.copy_from_slice(&data[offset..offset + 4]);
            let size = u32::from_be_bytes([
                data[offset + 4],
                data[offset + 5],
                data[offset + 6],
                data[offset + 7],
            ]) as usize;
            offset += 8;
            if offset + size > data.len() {
                return Err(ZError::quetzal("truncated chunk in save file"));
            }
            iff.chunks.push(IffChunk {
                chunk_type,
                data: data[offset..offset + size].to_vec(),
            });
            offset += size + size % 2;
        }
        Ok(iff)
    }

    pub fn read_from_file(path: &Path) -> ZResult<IffFile> {
        let mut file = File::open(path)
            .map_err(|e| ZError::quetzal(format!("failed to open save file: {e}")))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| ZError::quetzal(format!("failed to read save file: {e}")))?;
        IffFile::from_bytes(&data)
    }
}

impl Default for IffFile {
    fn default() -> Self {
        IffFile::new()
    }
}
