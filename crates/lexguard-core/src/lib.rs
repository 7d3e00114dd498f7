//! Shared types for lexguard: character classes, the lexicon entry model,
//! detection results and the error taxonomy used by every engine crate.

pub mod character;
pub mod detection;
pub mod entry;
pub mod enums;
pub mod error;
