//! lantern: a Z-Machine interpreter for Infocom-format story files,
//! versions 1-3
//!
//! The engine is a synchronous fetch-decode-execute loop over a flat
//! memory image, with the object tree, packed-text codec and dictionary
//! living directly in that image. Saves use the standard Quetzal
//! interchange format. All terminal concerns sit behind the `ZMachineIo`
//! trait; the library never owns a console.

pub mod dictionary;
pub mod error;
pub mod header;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod opcodes_display;
pub mod opcodes_math;
pub mod opcodes_memory;
pub mod opcodes_object;
pub mod quetzal;
pub mod test_util;
pub mod text;
pub mod vm;
pub mod zio;
pub mod zobject;
pub mod zrand;
