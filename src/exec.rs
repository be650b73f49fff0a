//! Bounded execution of the external Aseprite process.
//!
//! The executor never takes an executable path from a caller: logical
//! command names are resolved against a fixed allow-list (currently the
//! single configured Aseprite binary) and arguments are passed as an
//! argv vector, never through a shell. Each invocation runs under a
//! wall-clock budget with full (but capped) capture of both output
//! streams, and is classified into exactly one terminal outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ToolError;

/// Cap on captured bytes per stream. Output past this point is dropped
/// and noted as a warning so runaway subprocess output cannot grow the
/// result without bound.
pub const MAX_CAPTURE_BYTES: usize = 256 * 1024;

/// Delay unit between retry attempts; attempt `n` waits `n` times this.
const BACKOFF_STEP: Duration = Duration::from_millis(200);

/// A fully resolved invocation, built fresh per call.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub executable: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Terminal classification of an invocation. Every result carries
/// exactly one of these; there is no "unknown" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Process exited with code 0.
    Success,
    /// Process exceeded the wall-clock budget and was killed.
    Timeout,
    /// Process exited on its own with a nonzero code.
    NonzeroExit(i32),
    /// Process could not be started at all.
    SpawnFailure,
}

/// The observable result of one `execute` call (covering all attempts).
#[derive(Debug)]
pub struct CommandResult {
    pub outcome: Outcome,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
    /// Total attempts made, including the final one.
    pub attempts: u32,
    pub warnings: Vec<String>,
}

impl CommandResult {
    /// Convert a non-success outcome into the shared error taxonomy.
    pub fn into_ok(self, timeout: Duration, executable: &Path) -> Result<CommandResult, ToolError> {
        match self.outcome {
            Outcome::Success => Ok(self),
            Outcome::Timeout => Err(ToolError::ExecutionTimeout { timeout, attempts: self.attempts }),
            Outcome::NonzeroExit(code) => Err(ToolError::ExecutionFailed {
                code,
                stderr: self.stderr,
            }),
            Outcome::SpawnFailure => Err(ToolError::SpawnFailure {
                executable: executable.to_path_buf(),
                reason: self.stderr,
            }),
        }
    }
}

/// Result of one spawn-and-wait attempt.
struct Attempt {
    outcome: Outcome,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    warnings: Vec<String>,
    /// A spawn failure worth retrying (EAGAIN-style), as opposed to a
    /// missing or unauthorized binary which cannot succeed on retry.
    transient: bool,
}

/// Runs allow-listed external commands under a time budget.
#[derive(Debug, Clone)]
pub struct Executor {
    aseprite_path: PathBuf,
    timeout: Duration,
    max_retries: u32,
}

impl Executor {
    pub fn new(aseprite_path: PathBuf, timeout: Duration, max_retries: u32) -> Self {
        Executor { aseprite_path, timeout, max_retries }
    }

    pub fn from_config(config: &Config) -> Self {
        Executor::new(
            config.aseprite_path.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_retries,
        )
    }

    /// Resolve a logical command name to a permitted executable path.
    /// The name itself never reaches the operating system.
    pub fn resolve(&self, command_name: &str) -> Result<PathBuf, ToolError> {
        match command_name {
            "aseprite" => Ok(self.aseprite_path.clone()),
            other => Err(ToolError::invalid(format!("unknown command '{other}'"))),
        }
    }

    /// Build a spec for the named command with the executor's defaults.
    pub fn spec(&self, command_name: &str, args: Vec<String>) -> Result<CommandSpec, ToolError> {
        Ok(CommandSpec {
            executable: self.resolve(command_name)?,
            args,
            working_dir: None,
            timeout: self.timeout,
            max_retries: self.max_retries,
        })
    }

    /// Run the Aseprite binary with the given arguments, surfacing any
    /// non-success outcome as a typed error.
    pub async fn run_aseprite(&self, args: Vec<String>) -> Result<CommandResult, ToolError> {
        let spec = self.spec("aseprite", args)?;
        let result = execute(&spec).await;
        result.into_ok(spec.timeout, &spec.executable)
    }

    /// Write `script` to a transient `.lua` file and run Aseprite in
    /// batch mode against it, optionally opening `open_file` first.
    /// The temp file is removed when the invocation finishes.
    pub async fn run_script(
        &self,
        script: &str,
        open_file: Option<&Path>,
    ) -> Result<CommandResult, ToolError> {
        if script.trim().is_empty() {
            return Err(ToolError::invalid("script content cannot be empty"));
        }

        let tmp = tempfile::Builder::new()
            .prefix("aseprite-mcp-")
            .suffix(".lua")
            .tempfile()?;
        std::fs::write(tmp.path(), script)?;

        let mut args = vec!["--batch".to_string()];
        if let Some(file) = open_file {
            if file.exists() {
                args.push(file.display().to_string());
            } else {
                warn!(file = %file.display(), "file to open not found, running script without it");
            }
        }
        args.push("--script".to_string());
        args.push(tmp.path().display().to_string());

        // `tmp` stays alive (and on disk) until after the process exits.
        self.run_aseprite(args).await
    }
}

/// Execute a command spec: up to `max_retries + 1` attempts, with a
/// linearly increasing backoff between them. Only timeouts and transient
/// spawn failures are retried; a nonzero exit is deterministic and
/// surfaces immediately. Always returns a classified result.
pub async fn execute(spec: &CommandSpec) -> CommandResult {
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        debug!(
            executable = %spec.executable.display(),
            attempt = attempts,
            "spawning external command"
        );
        let attempt = run_once(spec).await;

        let retryable = match attempt.outcome {
            Outcome::Timeout => true,
            Outcome::SpawnFailure => attempt.transient,
            _ => false,
        };

        if retryable && attempts <= spec.max_retries {
            warn!(
                attempt = attempts,
                outcome = ?attempt.outcome,
                "command attempt failed, retrying"
            );
            tokio::time::sleep(BACKOFF_STEP * attempts).await;
            continue;
        }

        return CommandResult {
            outcome: attempt.outcome,
            exit_code: attempt.exit_code,
            stdout: attempt.stdout,
            stderr: attempt.stderr,
            elapsed: started.elapsed(),
            attempts,
            warnings: attempt.warnings,
        };
    }
}

async fn run_once(spec: &CommandSpec) -> Attempt {
    let mut cmd = Command::new(&spec.executable);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &spec.working_dir {
        cmd.current_dir(dir);
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            let transient = matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted
            );
            return Attempt {
                outcome: Outcome::SpawnFailure,
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
                warnings: Vec::new(),
                transient,
            };
        }
    };

    // Drain both pipes concurrently so a full pipe can never deadlock
    // the child; each drain is capped at MAX_CAPTURE_BYTES.
    let stdout_task = tokio::spawn(read_capped(child.stdout.take()));
    let stderr_task = tokio::spawn(read_capped(child.stderr.take()));

    let status = match tokio::time::timeout(spec.timeout, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            return Attempt {
                outcome: Outcome::SpawnFailure,
                exit_code: None,
                stdout: String::new(),
                stderr: format!("failed waiting for process: {e}"),
                warnings: Vec::new(),
                transient: false,
            };
        }
        Err(_) => {
            // Budget exhausted: kill and reap so no zombie survives.
            let _ = child.start_kill();
            let _ = child.wait().await;
            None
        }
    };

    let (stdout, out_truncated) = stdout_task.await.unwrap_or_default();
    let (stderr, err_truncated) = stderr_task.await.unwrap_or_default();

    let mut warnings = Vec::new();
    if out_truncated {
        warnings.push(format!("stdout truncated at {MAX_CAPTURE_BYTES} bytes"));
    }
    if err_truncated {
        warnings.push(format!("stderr truncated at {MAX_CAPTURE_BYTES} bytes"));
    }

    let (outcome, exit_code) = match status {
        None => (Outcome::Timeout, None),
        Some(status) => match status.code() {
            Some(0) => (Outcome::Success, Some(0)),
            Some(code) => (Outcome::NonzeroExit(code), Some(code)),
            // Killed by a signal; treat like a nonzero exit.
            None => (Outcome::NonzeroExit(-1), None),
        },
    };

    Attempt { outcome, exit_code, stdout, stderr, warnings, transient: false }
}

/// Read a child stream to completion, keeping at most MAX_CAPTURE_BYTES.
/// Returns the (lossily decoded) capture and whether it was truncated.
async fn read_capped<R>(stream: Option<R>) -> (String, bool)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut stream) = stream else {
        return (String::new(), false);
    };

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut chunk = [0u8; 8 * 1024];
    let mut truncated = false;
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if buf.len() < MAX_CAPTURE_BYTES {
                    let take = n.min(MAX_CAPTURE_BYTES - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
                // Keep draining past the cap so the child never blocks
                // on a full pipe.
            }
            Err(_) => break,
        }
    }

    (String::from_utf8_lossy(&buf).into_owned(), truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh_executor(timeout_ms: u64, max_retries: u32) -> Executor {
        Executor::new(
            PathBuf::from("/bin/sh"),
            Duration::from_millis(timeout_ms),
            max_retries,
        )
    }

    fn sh_spec(exec: &Executor, script: &str) -> CommandSpec {
        exec.spec("aseprite", vec!["-c".into(), script.into()]).unwrap()
    }

    #[tokio::test]
    async fn success_captures_stdout() {
        let exec = sh_executor(5_000, 0);
        let result = execute(&sh_spec(&exec, "echo hello")).await;
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_retried() {
        let exec = sh_executor(5_000, 3);
        let result = execute(&sh_spec(&exec, "echo oops >&2; exit 3")).await;
        assert_eq!(result.outcome, Outcome::NonzeroExit(3));
        assert_eq!(result.attempts, 1);
        assert!(result.stderr.contains("oops"));
    }

    #[tokio::test]
    async fn missing_binary_is_spawn_failure_with_one_attempt() {
        let exec = Executor::new(
            PathBuf::from("/nonexistent/definitely-not-aseprite"),
            Duration::from_secs(5),
            4,
        );
        let result = execute(&exec.spec("aseprite", vec![]).unwrap()).await;
        assert_eq!(result.outcome, Outcome::SpawnFailure);
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test]
    async fn timeout_is_retried_to_the_limit() {
        let exec = sh_executor(100, 2);
        let started = Instant::now();
        let result = execute(&sh_spec(&exec, "sleep 30")).await;
        assert_eq!(result.outcome, Outcome::Timeout);
        assert_eq!(result.attempts, 3);
        // 3 attempts * 100ms + backoff; nowhere near the 30s sleep.
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn oversized_output_is_truncated_with_warning() {
        let exec = sh_executor(10_000, 0);
        let script = format!("head -c {} /dev/zero | tr '\\0' 'x'", MAX_CAPTURE_BYTES * 2);
        let result = execute(&sh_spec(&exec, &script)).await;
        assert_eq!(result.outcome, Outcome::Success);
        assert_eq!(result.stdout.len(), MAX_CAPTURE_BYTES);
        assert!(result.warnings.iter().any(|w| w.contains("stdout truncated")));
    }

    #[tokio::test]
    async fn unknown_command_name_is_rejected_before_spawn() {
        let exec = sh_executor(1_000, 0);
        let err = exec.spec("rm", vec!["-rf".into()]).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn run_script_rejects_empty_script() {
        let exec = sh_executor(1_000, 0);
        let err = exec.run_script("   \n", None).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn into_ok_maps_timeout_to_typed_error() {
        let exec = sh_executor(100, 0);
        let spec = sh_spec(&exec, "sleep 30");
        let result = execute(&spec).await;
        let err = result.into_ok(spec.timeout, &spec.executable).unwrap_err();
        assert!(matches!(err, ToolError::ExecutionTimeout { attempts: 1, .. }));
    }
}
