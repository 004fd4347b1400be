//! Quetzal save file format
//!
//! Quetzal is the standard interchange format for Z-Machine save files: an
//! IFF `FORM` of type `IFZS` whose chunks carry the story fingerprint
//! (IFhd), the dynamic-memory delta (CMem, or UMem uncompressed), and the
//! call/value stacks (Stks). Unknown chunks are skipped by length.

pub mod chunks;
pub mod compressed_memory;
pub mod iff;
pub mod restore;
pub mod save;

pub use restore::RestoreGame;
pub use save::SaveGame;
