//! Invoking `llvm-config` and decoding its answers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::util::process::{failure_summary, ProcessBuilder, ProcessError};
use crate::util::shellwords;

/// The toolkit's self-reported packaging mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedMode {
    /// `llvm-config --shared-mode` printed `shared`.
    Shared,
    /// Printed `static`, or anything unrecognized. The resolver's scan
    /// and synthesis tiers handle toolchains that misreport this.
    Static,
}

impl SharedMode {
    fn parse(s: &str) -> Self {
        if s == "shared" {
            SharedMode::Shared
        } else {
            SharedMode::Static
        }
    }
}

/// Handle on a resolved `llvm-config` executable.
///
/// Every query is a fresh subprocess invocation; a failing helper is a
/// fatal configuration error and is never retried.
#[derive(Debug, Clone)]
pub struct LlvmConfig {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl LlvmConfig {
    pub fn new(path: PathBuf, timeout: Option<Duration>) -> Self {
        LlvmConfig { path, timeout }
    }

    /// Path of the underlying `llvm-config` executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Invoke the helper with the given flags and return its trimmed stdout.
    pub fn query(&self, flags: &[&str]) -> Result<String> {
        let builder = ProcessBuilder::new(&self.path)
            .args(flags)
            .timeout(self.timeout);
        let command = builder.display_command();
        tracing::trace!(%command, "querying llvm-config");

        let output = builder.exec().map_err(|err| match err {
            ProcessError::Timeout { program, timeout } => Error::Timeout { program, timeout },
            other => Error::ToolchainQuery {
                command: command.clone(),
                message: other.to_string(),
            },
        })?;

        if !output.status.success() {
            return Err(Error::ToolchainQuery {
                command,
                message: failure_summary(output.status, &output.stderr),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn version(&self) -> Result<String> {
        self.query(&["--version"])
    }

    pub fn bindir(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.query(&["--bindir"])?))
    }

    pub fn libdir(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.query(&["--libdir"])?))
    }

    pub fn includedir(&self) -> Result<PathBuf> {
        Ok(PathBuf::from(self.query(&["--includedir"])?))
    }

    pub fn shared_mode(&self) -> Result<SharedMode> {
        Ok(SharedMode::parse(&self.query(&["--shared-mode"])?))
    }

    /// Library file names the helper declares, space-separated.
    pub fn libnames(&self) -> Result<Vec<String>> {
        Ok(self
            .query(&["--libnames"])?
            .split_whitespace()
            .map(str::to_string)
            .collect())
    }

    /// Linker flags, tokenized respecting shell quoting.
    pub fn ldflags(&self) -> Result<Vec<String>> {
        Ok(shellwords::split(&self.query(&["--ldflags"])?))
    }

    /// Library flags, tokenized respecting shell quoting.
    pub fn libs(&self) -> Result<Vec<String>> {
        Ok(shellwords::split(&self.query(&["--libs"])?))
    }

    /// System library flags, tokenized respecting shell quoting.
    pub fn system_libs(&self) -> Result<Vec<String>> {
        Ok(shellwords::split(&self.query(&["--system-libs"])?))
    }
}
