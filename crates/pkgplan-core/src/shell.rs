//! Shell command execution behind the `CommandRunner` seam.
//!
//! Every external interaction of the planner (availability probes, list
//! commands, check templates, PATH lookups, installs) goes through this trait
//! so resolution can be exercised against `MockShell` without touching the
//! host.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

/// Upper bound for probes, list commands and check templates when the source
/// does not set `timeout_secs`.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` exited with {}", describe_code(.code))]
    Exit { command: String, code: Option<i32> },
    #[error("`{command}` timed out after {}s", .timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },
}

fn describe_code(code: &Option<i32>) -> String {
    match *code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_owned(),
    }
}

pub trait CommandRunner: Send + Sync {
    /// Run `line` with all output discarded. `Ok` means exit code 0.
    fn run_quiet(&self, line: &str, timeout: Duration) -> Result<(), ShellError>;

    /// Run `line` and return its stdout. Only a zero exit code yields `Ok`.
    fn capture(&self, line: &str, timeout: Duration) -> Result<String, ShellError>;

    /// Whether `binary` resolves to an executable on the search path.
    fn has_binary(&self, binary: &str) -> bool;

    /// Run `line` attached to the terminal with extra environment variables.
    fn run_inherited(
        &self,
        line: &str,
        env: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<(), ShellError>;

    /// Like `run_inherited`, but executes `argv` directly without a shell.
    fn run_program(
        &self,
        argv: &[String],
        env: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<(), ShellError>;
}

/// Runs command lines through the platform shell (`sh -c`, `cmd /C`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        Self
    }
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", line]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", line]);
        cmd
    }
}

fn io_error(line: &str, source: std::io::Error) -> ShellError {
    ShellError::Io {
        command: line.to_owned(),
        source,
    }
}

fn check_status(line: &str, status: ExitStatus) -> Result<(), ShellError> {
    if status.success() {
        Ok(())
    } else {
        Err(ShellError::Exit {
            command: line.to_owned(),
            code: status.code(),
        })
    }
}

/// Wait for `child`, killing it once `timeout` elapses.
fn wait_bounded(child: &mut Child, line: &str, timeout: Duration) -> Result<ExitStatus, ShellError> {
    match child.wait_timeout(timeout) {
        Ok(Some(status)) => Ok(status),
        Ok(None) => {
            warn!("`{line}` timed out after {}s, killing it", timeout.as_secs());
            let _ = child.kill();
            let _ = child.wait();
            Err(ShellError::TimedOut {
                command: line.to_owned(),
                timeout,
            })
        }
        Err(e) => Err(io_error(line, e)),
    }
}

impl CommandRunner for SystemShell {
    fn run_quiet(&self, line: &str, timeout: Duration) -> Result<(), ShellError> {
        debug!("probe: {line}");
        let mut child = shell_command(line)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| io_error(line, e))?;
        let status = wait_bounded(&mut child, line, timeout)?;
        check_status(line, status)
    }

    fn capture(&self, line: &str, timeout: Duration) -> Result<String, ShellError> {
        debug!("capture: {line}");
        let mut child = shell_command(line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| io_error(line, e))?;

        // Drain stdout on a helper thread. Grandchildren may keep the pipe
        // open after the shell exits, so the read shares the same deadline.
        let deadline = Instant::now() + timeout;
        let stdout = child.stdout.take();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                let _ = out.read_to_end(&mut buf);
            }
            let _ = tx.send(buf);
        });

        let status = wait_bounded(&mut child, line, timeout)?;
        let buf = match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(buf) => buf,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("`{line}` left its output open past {}s", timeout.as_secs());
                return Err(ShellError::TimedOut {
                    command: line.to_owned(),
                    timeout,
                });
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Vec::new(),
        };
        check_status(line, status)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn has_binary(&self, binary: &str) -> bool {
        which::which(binary).is_ok()
    }

    fn run_inherited(
        &self,
        line: &str,
        env: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<(), ShellError> {
        debug!("run: {line}");
        run_attached(shell_command(line), line, env, timeout)
    }

    fn run_program(
        &self,
        argv: &[String],
        env: &[(String, String)],
        timeout: Option<Duration>,
    ) -> Result<(), ShellError> {
        let line = argv.join(" ");
        let Some((program, args)) = argv.split_first() else {
            return Err(io_error(
                &line,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            ));
        };
        debug!("exec: {line}");
        let mut cmd = Command::new(program);
        cmd.args(args);
        run_attached(cmd, &line, env, timeout)
    }
}

/// Spawn `cmd` on the terminal's stdio and wait, bounded when `timeout` is set.
fn run_attached(
    mut cmd: Command,
    line: &str,
    env: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<(), ShellError> {
    let mut child = cmd
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| io_error(line, e))?;
    let status = match timeout {
        Some(t) => wait_bounded(&mut child, line, t)?,
        None => child.wait().map_err(|e| io_error(line, e))?,
    };
    check_status(line, status)
}
