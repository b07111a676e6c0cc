//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Errors from spawning and waiting on a subprocess.
///
/// Callers map these onto their own taxonomy (`ToolchainQuery`, `Link`,
/// `Timeout`) so the top-level error names the operation, not the plumbing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Builder for subprocess execution with output capture and an optional
/// wall-clock timeout.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            timeout: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set a wall-clock timeout; `None` means wait indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Execute the command, capture stdout/stderr, and wait for completion.
    ///
    /// If a timeout is set and expires, the child is killed and
    /// [`ProcessError::Timeout`] is returned.
    pub fn exec(&self) -> Result<Output, ProcessError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        match self.timeout {
            None => child
                .wait_with_output()
                .map_err(|source| ProcessError::Wait {
                    program: self.program.display().to_string(),
                    source,
                }),
            Some(timeout) => {
                // Drain the pipes on separate threads so a chatty child
                // cannot deadlock against a full pipe buffer while we poll.
                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                let stdout_thread = thread::spawn(move || drain(stdout));
                let stderr_thread = thread::spawn(move || drain(stderr));

                let deadline = Instant::now() + timeout;
                let status = loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) => {
                            if Instant::now() >= deadline {
                                let _ = child.kill();
                                let _ = child.wait();
                                return Err(ProcessError::Timeout {
                                    program: self.program.display().to_string(),
                                    timeout,
                                });
                            }
                            thread::sleep(Duration::from_millis(10));
                        }
                        Err(source) => {
                            return Err(ProcessError::Wait {
                                program: self.program.display().to_string(),
                                source,
                            })
                        }
                    }
                };

                let stdout = stdout_thread.join().unwrap_or_default();
                let stderr = stderr_thread.join().unwrap_or_default();
                Ok(Output {
                    status,
                    stdout,
                    stderr,
                })
            }
        }
    }
}

/// Summarize a failed invocation for error messages: exit status plus
/// whatever the child wrote to stderr.
pub fn failure_summary(status: ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {status}")
    } else {
        format!("exited with {status}: {stderr}")
    }
}

fn drain(pipe: Option<impl Read>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    buf
}
