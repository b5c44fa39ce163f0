//! Small utility helpers shared across the crate: binary byte units, byte
//! formatting, and the subprocess execution seam.
//!
//! The functions in this module are intentionally lightweight and
//! dependency-free to keep hot paths fast. Command execution is abstracted
//! behind [`CommandRunner`] so callers (preflight probes, the apt driver,
//! conflict detection, snapshot capture) can be exercised in isolation.

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Bytes in one kibibyte.
pub const KB: u64 = 1024;
/// Bytes in one mebibyte.
pub const MB: u64 = 1024 * KB;
/// Bytes in one gibibyte.
pub const GB: u64 = 1024 * MB;

/// What: Render a byte count with a binary-unit suffix.
///
/// Input:
/// - `bytes`: Raw byte count.
///
/// Output:
/// - Human-readable string such as `"512 B"`, `"10.0 MiB"`, or `"1.5 GiB"`.
///
/// Details:
/// - Uses binary units (1024-based) throughout; one decimal place above bytes.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= GB {
        format!("{:.1} GiB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MiB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KiB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// What: Error type capturing subprocess spawning, execution, and decoding
/// failures.
///
/// Inputs: Generated internally by [`CommandRunner`] implementations.
///
/// Output: Implements `Display`/`Error` for ergonomic propagation.
///
/// Details:
/// - Wraps I/O errors, UTF-8 conversion failures, non-success exit statuses
///   (with a stderr tail for diagnostics), and cancellation.
#[derive(Debug)]
pub enum CommandError {
    /// Spawning or waiting on the subprocess failed.
    Io(std::io::Error),
    /// Captured stdout was not valid UTF-8.
    Utf8(std::string::FromUtf8Error),
    /// The subprocess ran but exited unsuccessfully.
    Failed {
        /// Executable that was invoked.
        program: String,
        /// Arguments passed to the executable.
        args: Vec<String>,
        /// Exit status reported by the OS.
        status: std::process::ExitStatus,
        /// Trailing portion of stderr, trimmed for display.
        stderr: String,
    },
    /// The cancellation token fired while the subprocess was running.
    Cancelled,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Io(err) => write!(f, "I/O error: {err}"),
            CommandError::Utf8(err) => write!(f, "UTF-8 decoding error: {err}"),
            CommandError::Failed {
                program,
                args,
                status,
                stderr,
            } => {
                if stderr.is_empty() {
                    write!(f, "`{program} {}` exited with {status}", args.join(" "))
                } else {
                    write!(
                        f,
                        "`{program} {}` exited with {status}: {stderr}",
                        args.join(" ")
                    )
                }
            }
            CommandError::Cancelled => write!(f, "command cancelled"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Io(err) => Some(err),
            CommandError::Utf8(err) => Some(err),
            CommandError::Failed { .. } | CommandError::Cancelled => None,
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(value: std::io::Error) -> Self {
        CommandError::Io(value)
    }
}

impl From<std::string::FromUtf8Error> for CommandError {
    fn from(value: std::string::FromUtf8Error) -> Self {
        CommandError::Utf8(value)
    }
}

/// What: Abstract subprocess execution interface used for spawning helper
/// binaries such as `apt-get`, `dpkg-query`, and `lspci`.
///
/// Inputs:
/// - `ctx`: Cancellation token observed while the subprocess runs.
/// - `program`: Executable name to run.
/// - `args`: Positional arguments passed to the executable.
/// - `envs`: Extra environment variables set for the invocation.
///
/// Output:
/// - `Ok(String)` containing UTF-8 stdout on success.
/// - `Err(CommandError)` when the invocation fails, is cancelled, or stdout
///   is not valid UTF-8.
///
/// Details:
/// - Implementations may stub command results to enable deterministic unit
///   testing. Production code relies on [`SystemCommandRunner`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and `envs`, returning captured stdout.
    async fn run(
        &self,
        ctx: &CancellationToken,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<String, CommandError>;
}

/// Real command runner backed by `tokio::process::Command`.
#[derive(Debug, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(
        &self,
        ctx: &CancellationToken,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<String, CommandError> {
        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.kill_on_drop(true);
        let output = tokio::select! {
            out = cmd.output() => out?,
            () = ctx.cancelled() => return Err(CommandError::Cancelled),
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join(" | ");
            return Err(CommandError::Failed {
                program: program.to_string(),
                args: args.iter().map(|s| (*s).to_string()).collect(),
                status: output.status,
                stderr: tail,
            });
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    /// What: Verify binary unit constants and byte formatting boundaries.
    ///
    /// - Input: Byte counts straddling the KiB/MiB/GiB thresholds.
    /// - Output: Expected suffixes and one-decimal rendering.
    fn format_bytes_uses_binary_units() {
        assert_eq!(KB, 1024);
        assert_eq!(MB, 1024 * 1024);
        assert_eq!(GB, 1024 * 1024 * 1024);
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2 * KB), "2.0 KiB");
        assert_eq!(format_bytes(10 * MB), "10.0 MiB");
        assert_eq!(format_bytes(GB + GB / 2), "1.5 GiB");
    }

    #[tokio::test]
    /// What: The system runner captures stdout from a successful command.
    ///
    /// - Input: `echo` invocation through [`SystemCommandRunner`].
    /// - Output: Captured stdout contains the echoed text.
    async fn system_runner_captures_stdout() {
        let runner = SystemCommandRunner;
        let ctx = CancellationToken::new();
        let out = runner
            .run(&ctx, "echo", &["hello"], &[])
            .await
            .expect("echo should succeed");
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    /// What: A failing command surfaces its exit status as `CommandError::Failed`.
    ///
    /// - Input: `false` invocation (always exits 1).
    /// - Output: `CommandError::Failed` with the program name preserved.
    async fn system_runner_reports_failure() {
        let runner = SystemCommandRunner;
        let ctx = CancellationToken::new();
        let err = runner
            .run(&ctx, "false", &[], &[])
            .await
            .expect_err("false should fail");
        match err {
            CommandError::Failed { program, .. } => assert_eq!(program, "false"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    /// What: A pre-cancelled token aborts the subprocess call.
    ///
    /// - Input: Cancelled token passed to a `sleep` invocation.
    /// - Output: `CommandError::Cancelled`.
    async fn system_runner_observes_cancellation() {
        let runner = SystemCommandRunner;
        let ctx = CancellationToken::new();
        ctx.cancel();
        let err = runner
            .run(&ctx, "sleep", &["5"], &[])
            .await
            .expect_err("cancelled token should abort");
        assert!(matches!(err, CommandError::Cancelled));
    }
}
