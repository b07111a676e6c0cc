//! Shared utilities: hashing, subprocess execution, flag tokenization.

pub mod hash;
pub mod process;
pub mod shellwords;
