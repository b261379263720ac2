//! External tool invocation.
//!
//! Every collaborator process (script analyzer, markdown linter, example
//! compiler) goes through the [`ToolRunner`] trait so the checks can be
//! driven by a fake in tests.

pub mod analyzer;
pub mod examples;
pub mod markdown;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::ToolCommand;
use crate::diagnostics::{Diagnostic, Severity, T001, T002, T003};
use crate::errors::{MetaError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A fully substituted command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was ended by a signal.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// Runs external tools.
pub trait ToolRunner {
    /// Run `invocation` to completion.
    ///
    /// # Errors
    ///
    /// [`MetaError::ToolUnavailable`] when the program cannot be found,
    /// [`MetaError::ToolTimeout`] when it outlives `invocation.timeout`, and
    /// [`MetaError::Io`] for other process failures. A non-zero exit status
    /// is not an error at this level.
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput>;
}

/// Runs tools as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput> {
        let mut stdout_capture = tempfile::tempfile()?;
        let mut stderr_capture = tempfile::tempfile()?;

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_capture.try_clone()?))
            .stderr(Stdio::from(stderr_capture.try_clone()?));

        tracing::debug!(program = %invocation.program, args = ?invocation.args, "starting tool");
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MetaError::ToolUnavailable {
                    program: invocation.program.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let started = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None if started.elapsed() > invocation.timeout => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(MetaError::ToolTimeout {
                        program: invocation.program.clone(),
                        seconds: invocation.timeout.as_secs(),
                    });
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };
        tracing::debug!(
            program = %invocation.program,
            status = ?status.code(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool finished"
        );

        Ok(ToolOutput {
            status: status.code(),
            stdout: read_capture(&mut stdout_capture)?,
            stderr: read_capture(&mut stderr_capture)?,
        })
    }
}

fn read_capture(file: &mut File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Values for the argument placeholders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Placeholders<'a> {
    pub path: Option<&'a Path>,
    pub root: Option<&'a Path>,
    pub file: Option<&'a Path>,
    pub output: Option<&'a Path>,
}

impl Placeholders<'_> {
    fn apply(&self, arg: &str) -> String {
        let mut out = arg.to_string();
        for (key, value) in [
            ("{path}", self.path),
            ("{root}", self.root),
            ("{file}", self.file),
            ("{output}", self.output),
        ] {
            if let Some(v) = value {
                out = out.replace(key, &v.display().to_string());
            }
        }
        out
    }
}

/// Build an invocation from a configured command line.
#[must_use]
pub fn invocation(
    command: &ToolCommand,
    placeholders: &Placeholders<'_>,
    cwd: &Path,
    timeout: Duration,
) -> ToolInvocation {
    ToolInvocation {
        program: command.program.clone(),
        args: command.args.iter().map(|a| placeholders.apply(a)).collect(),
        cwd: cwd.to_path_buf(),
        timeout,
    }
}

/// Turn an invoker error into an advisory diagnostic about `what`.
#[must_use]
pub fn degraded(what: &str, err: &MetaError) -> Diagnostic {
    match err {
        MetaError::ToolUnavailable { program } => Diagnostic::new(
            Severity::Warning,
            T001,
            format!("{what} skipped: '{program}' is not available"),
        )
        .with_suggestion(format!("Install '{program}' or configure another program")),
        MetaError::ToolTimeout { .. } => {
            Diagnostic::new(Severity::Warning, T003, format!("{what} skipped: {err}"))
        }
        _ => Diagnostic::new(Severity::Warning, T002, format!("{what} failed: {err}")),
    }
}
