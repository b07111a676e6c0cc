//! Manufacturing a shared library from LLVM's static archives.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::process::{failure_summary, ProcessBuilder, ProcessError};

/// Inputs for a synthesis run: the compiler used as the linker driver and
/// the flag groups reported by `llvm-config`.
#[derive(Debug)]
pub struct SynthesisInputs<'a> {
    pub compiler: &'a Path,
    pub ldflags: &'a [String],
    pub libs: &'a [String],
    pub system_libs: &'a [String],
    pub timeout: Option<Duration>,
}

/// Link the static archives into `<output_dir>/libLLVM.so`.
///
/// The library flags are bracketed with `--whole-archive` so the linker
/// keeps every archive member: the generated bindings reference symbols
/// the linker cannot see at synthesis time, and anything dropped here
/// would surface later as an unresolved symbol at load time. System
/// libraries stay outside the bracket.
///
/// A non-zero exit is [`Error::Link`] and aborts generation entirely.
pub fn synthesize_shared(inputs: &SynthesisInputs<'_>, output_dir: &Path) -> Result<PathBuf> {
    let output = output_dir.join("libLLVM.so");

    let builder = ProcessBuilder::new(inputs.compiler)
        .arg("-shared")
        .arg("-o")
        .arg(&output)
        .args(inputs.ldflags)
        .arg("-Wl,--whole-archive")
        .args(inputs.libs)
        .arg("-Wl,--no-whole-archive")
        .args(inputs.system_libs)
        .timeout(inputs.timeout);

    tracing::info!(command = %builder.display_command(), "linking shared LLVM library");

    let result = builder.exec().map_err(|err| match err {
        ProcessError::Timeout { program, timeout } => Error::Timeout { program, timeout },
        other => Error::Link {
            message: other.to_string(),
        },
    })?;

    if !result.status.success() {
        return Err(Error::Link {
            message: failure_summary(result.status, &result.stderr),
        });
    }

    Ok(output)
}
