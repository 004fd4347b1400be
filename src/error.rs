//! Error types shared across the interpreter
//!
//! Two kinds of failure exist at runtime: story errors (the loaded game is
//! malformed or asked for something illegal) and Quetzal errors (a save file
//! is malformed or belongs to a different game). Story errors always abort
//! the run; Quetzal errors abort unless they surface at the `save`/`restore`
//! opcodes, which convert them into a branch-false result.

use thiserror::Error;

/// Runtime error raised by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ZError {
    /// Malformed or out-of-range story data (bad version, illegal operand,
    /// unknown opcode, malformed object tree, ...).
    #[error("story error: {0}")]
    Story(String),

    /// Malformed save-file content (bad magic, size mismatch, corrupt RLE
    /// state, wrong game).
    #[error("quetzal error: {0}")]
    Quetzal(String),
}

pub type ZResult<T> = Result<T, ZError>;

impl ZError {
    pub fn story(msg: impl Into<String>) -> ZError {
        ZError::Story(msg.into())
    }

    pub fn quetzal(msg: impl Into<String>) -> ZError {
        ZError::Quetzal(msg.into())
    }
}
