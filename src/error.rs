//! Error types for llvmwrap.

use std::path::PathBuf;
use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between locating `llvm-config` and
/// loading the generated binding artifact.
///
/// None of these conditions are retried: a facade construction either
/// fully succeeds or fails with exactly one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither the override environment variable nor any of the candidate
    /// executable names resolved on the search path.
    #[error(
        "could not find {env_var} or any of the following executables in PATH: {}",
        candidates.join(" ")
    )]
    ToolNotFound {
        env_var: String,
        candidates: Vec<String>,
    },

    /// `llvm-config` could not be started or exited non-zero.
    #[error("llvm-config invocation `{command}` failed: {message}")]
    ToolchainQuery { command: String, message: String },

    /// No shared library was declared, found on disk, or synthesizable.
    #[error(
        "no usable LLVM libraries found in {}; LLVM must be built with BUILD_SHARED_LIBS",
        libdir.display()
    )]
    NoUsableLibrary { libdir: PathBuf },

    /// The linker invocation that manufactures a shared library from the
    /// static archives exited non-zero. There is no further fallback.
    #[error("failed to link a shared LLVM library from static archives: {message}")]
    Link { message: String },

    /// The generated binding artifact is unreadable, not a recognized
    /// shared object, or failed to load.
    #[error("failed to load binding artifact {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    /// A subprocess exceeded the configured time budget and was killed.
    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The external binding generator reported a failure; propagated as-is.
    #[error("binding generation failed: {0:#}")]
    Generate(anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
