//! Subprocess execution.
//!
//! [`ProcessRunner`] is the seam between orchestration code and the real
//! operating system: production code uses [`SystemRunner`], tests inject a
//! runner that records invocations.

use crate::error::{Error, Result};
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;

const REDACTED: &str = "<redacted>";

/// A fully described command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Working directory, inherited when `None`
    pub current_dir: Option<PathBuf>,
    /// Extra environment for the child
    pub env: Vec<(String, String)>,
    /// Argument values hidden when the command line is rendered
    secrets: Vec<String>,
}

impl Invocation {
    /// Start describing a call to `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            secrets: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_string_lossy().into_owned()));
        self
    }

    /// Run the command from `dir`.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Never show `value` when rendering this command line.
    pub fn redact(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.is_empty() {
            self.secrets.push(value);
        }
        self
    }

    /// Command line for logs and error messages, with secrets hidden.
    pub fn display(&self) -> String {
        let program = self
            .program
            .file_name()
            .map_or_else(|| self.program.to_string_lossy(), |n| n.to_string_lossy());
        let mut parts = vec![program.into_owned()];
        for arg in &self.args {
            if self.secrets.iter().any(|s| s == arg) {
                parts.push(REDACTED.to_string());
            } else {
                parts.push(arg.clone());
            }
        }
        parts.join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Captured stdout
    pub stdout: Vec<u8>,
    /// Captured stderr
    pub stderr: Vec<u8>,
    /// Both streams in the order lines arrived
    pub combined: Vec<u8>,
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    /// Whether the process exited successfully
    pub success: bool,
}

impl CommandOutput {
    /// Successful output with the given stdout (handy for fakes).
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        let stdout = stdout.into();
        Self {
            combined: stdout.clone(),
            stdout,
            stderr: Vec::new(),
            code: Some(0),
            success: true,
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Get the interleaved output as a string
    pub fn combined_str(&self) -> String {
        String::from_utf8_lossy(&self.combined).to_string()
    }
}

/// Something that can run an [`Invocation`].
pub trait ProcessRunner {
    /// Run the command to completion, whatever its exit status.
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Run the command and fail unless it exits successfully.
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let output = self.execute(invocation)?;
        if !output.success {
            return Err(Error::Exit {
                command: invocation.display(),
                code: output.code,
                output: output.combined_str().trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        (**self).execute(invocation)
    }
}

/// Runner that spawns real processes.
///
/// With `echo` enabled, child output is forwarded line by line to this
/// process's stdout/stderr while it is also captured.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner {
    echo: bool,
}

impl SystemRunner {
    /// Capture output silently.
    pub fn new() -> Self {
        Self { echo: false }
    }

    /// Capture output and also show it live.
    pub fn echoing() -> Self {
        Self { echo: true }
    }

    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if let Some(dir) = &invocation.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        cmd
    }
}

impl ProcessRunner for SystemRunner {
    fn execute(&self, invocation: &Invocation) -> Result<CommandOutput> {
        log::debug!("Running: {}", invocation.display());
        let spawn_err = |source| Error::Spawn {
            command: invocation.display(),
            source,
        };

        if !self.echo {
            let output = Self::command(invocation).output().map_err(spawn_err)?;
            let mut combined = output.stdout.clone();
            combined.extend_from_slice(&output.stderr);
            return Ok(CommandOutput {
                stdout: output.stdout,
                stderr: output.stderr,
                combined,
                code: output.status.code(),
                success: output.status.success(),
            });
        }

        let mut child = Self::command(invocation)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        let combined = Arc::new(Mutex::new(Vec::new()));
        let stderr_pipe = child.stderr.take();
        let stderr_combined = Arc::clone(&combined);
        let stderr_thread = thread::spawn(move || {
            stderr_pipe.map_or_else(Vec::new, |pipe| {
                pump(pipe, &stderr_combined, &mut std::io::stderr())
            })
        });

        let stdout = child
            .stdout
            .take()
            .map_or_else(Vec::new, |pipe| pump(pipe, &combined, &mut std::io::stdout()));
        let stderr = stderr_thread.join().unwrap_or_default();
        let status = child.wait().map_err(spawn_err)?;

        let combined = combined.lock().map(|c| c.clone()).unwrap_or_default();
        Ok(CommandOutput {
            stdout,
            stderr,
            combined,
            code: status.code(),
            success: status.success(),
        })
    }
}

/// Copy `pipe` line by line into `sink` and the shared combined buffer.
fn pump(pipe: impl Read, combined: &Mutex<Vec<u8>>, sink: &mut dyn Write) -> Vec<u8> {
    let mut captured = Vec::new();
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    while let Ok(n) = reader.read_until(b'\n', &mut line) {
        if n == 0 {
            break;
        }
        let _ = sink.write_all(&line);
        if let Ok(mut buf) = combined.lock() {
            buf.extend_from_slice(&line);
        }
        captured.extend_from_slice(&line);
        line.clear();
    }
    let _ = sink.flush();
    captured
}

/// Locate an executable: `env_override` first, then `PATH`.
pub fn find_binary(name: &str, env_override: &str) -> Result<PathBuf> {
    if let Ok(path) = std::env::var(env_override) {
        if !path.is_empty() {
            log::debug!("Using {} from {}: {}", name, env_override, path);
            return Ok(PathBuf::from(path));
        }
    }
    which::which(name).map_err(|_| Error::BinaryNotFound(name.to_string()))
}
