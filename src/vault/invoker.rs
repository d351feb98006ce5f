//! Running the vault tool and collecting what it says.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ToolSettings;
use crate::errors::{Result, VaultBridgeError};
use crate::vault::classify::{classify, StderrClass};
use crate::vault::command::{build_invocation, Invocation, VaultCommand};
use crate::vault::credential::CredentialMode;

/// How often a running child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Raw result of one process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub success: bool,
    /// Exit code; `None` when the process was ended by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Launches processes. Swappable so tests can observe launches without
/// running anything.
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Runs processes with `std::process::Command`, never through a shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        let program = locate(&invocation.program)?;

        let mut child = Command::new(&program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| launch_error(&program, &e))?;

        // Feed stdin from its own thread so a chatty child cannot deadlock
        // against a full stdout pipe.
        let writer = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut pipe), Some(payload)) => Some(thread::spawn(move || {
                if let Err(e) = pipe.write_all(&payload) {
                    tracing::debug!(error = %e, "vault tool closed stdin early");
                }
            })),
            _ => None,
        };

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);

        let status = match invocation.timeout {
            None => Some(child.wait()?),
            Some(limit) => wait_with_deadline(&mut child, limit)?,
        };

        let Some(status) = status else {
            // Killed on timeout. Readers finish once the pipes close; they
            // are not joined in case a grandchild still holds them open.
            let secs = invocation.timeout.map_or(0, |d| d.as_secs());
            tracing::warn!(program = %program.display(), secs, "vault tool timed out");
            return Err(VaultBridgeError::Timeout(secs));
        };

        if let Some(handle) = writer {
            let _ = handle.join();
        }

        Ok(ProcessOutput {
            success: status.success(),
            code: status.code(),
            stdout: join_reader(stdout)?,
            stderr: join_reader(stderr)?,
        })
    }
}

/// Find the program on `PATH` when it is a bare name.
fn locate(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        return Ok(program.to_path_buf());
    }
    which::which(program).map_err(|e| VaultBridgeError::ProcessLaunch {
        program: program.display().to_string(),
        reason: format!("not found on PATH ({e})"),
    })
}

fn launch_error(program: &Path, err: &io::Error) -> VaultBridgeError {
    let reason = match err.kind() {
        io::ErrorKind::NotFound => "no such file".to_string(),
        io::ErrorKind::PermissionDenied => "not executable".to_string(),
        _ => err.to_string(),
    };
    VaultBridgeError::ProcessLaunch {
        program: program.display().to_string(),
        reason,
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn join_reader(handle: Option<JoinHandle<io::Result<Vec<u8>>>>) -> Result<Vec<u8>> {
    match handle {
        None => Ok(Vec::new()),
        Some(handle) => handle
            .join()
            .map_err(|_| VaultBridgeError::CommandFailed("output reader thread panicked".into()))?
            .map_err(VaultBridgeError::from),
    }
}

/// Wait for the child, killing it once `limit` has passed.
///
/// Returns `None` when the child had to be killed.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                kill_child(child);
                return Err(e.into());
            }
        }
        if start.elapsed() >= limit {
            kill_child(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill and reap the child, logging anything that goes wrong.
fn kill_child(child: &mut Child) {
    if let Err(e) = child.kill() {
        tracing::warn!(pid = child.id(), error = %e, "failed to kill vault tool");
    }
    if let Err(e) = child.wait() {
        tracing::debug!(pid = child.id(), error = %e, "failed to reap vault tool");
    }
}

/// What came back from one vault tool run, after stderr classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultResult {
    pub exited_cleanly: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    /// Stderr left after dropping known noise; `None` when benign.
    pub filtered_stderr: Option<String>,
}

impl VaultResult {
    /// Classify a raw process output.
    pub fn from_output(output: ProcessOutput) -> Result<Self> {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let filtered_stderr = match classify(&stderr) {
            StderrClass::Benign => {
                if !stderr.trim().is_empty() {
                    tracing::debug!(stderr = %stderr.trim(), "discarding benign stderr");
                }
                None
            }
            StderrClass::UserVisible(message) => Some(message),
        };

        // The tool's own message beats complaining about its output.
        let stdout = match String::from_utf8(output.stdout) {
            Ok(stdout) => stdout,
            Err(e) if filtered_stderr.is_some() => {
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
            Err(_) => {
                return Err(VaultBridgeError::CommandFailed(
                    "vault tool output is not valid UTF-8".into(),
                ))
            }
        };

        Ok(Self {
            exited_cleanly: output.success,
            exit_code: output.code,
            stdout,
            filtered_stderr,
        })
    }

    /// How the tool ended, when it did not exit cleanly.
    pub fn exit_failure(&self) -> Option<String> {
        if self.exited_cleanly {
            return None;
        }
        Some(match self.exit_code {
            Some(code) => format!("exited with status {code}"),
            None => "was terminated by a signal".to_string(),
        })
    }

    /// Turn a user-visible stderr message into an error.
    pub fn into_checked(self) -> Result<Self> {
        match self.filtered_stderr {
            Some(message) => {
                tracing::debug!(%message, "vault tool reported an error");
                Err(VaultBridgeError::Process(message))
            }
            None => Ok(self),
        }
    }
}

/// Run the vault tool and classify its output, without judging it.
pub fn execute(
    runner: &dyn ProcessRunner,
    command: &VaultCommand,
    mode: &CredentialMode,
    tool: &ToolSettings,
) -> Result<VaultResult> {
    let invocation = build_invocation(command, mode, tool)?;
    tracing::debug!(
        program = %invocation.program.display(),
        args = ?invocation.args,
        credential = mode.kind(),
        "invoking vault tool"
    );

    let output = runner.run(&invocation)?;
    VaultResult::from_output(output)
}

/// Run the vault tool and fail on anything it reports beyond known noise.
///
/// A non-zero exit with only benign stderr is not an error; the tool's
/// stderr is the only failure signal.
pub fn invoke(
    runner: &dyn ProcessRunner,
    command: &VaultCommand,
    mode: &CredentialMode,
    tool: &ToolSettings,
) -> Result<VaultResult> {
    execute(runner, command, mode, tool)?.into_checked()
}
