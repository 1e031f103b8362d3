//! Time-bounded subprocess execution.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use crate::error::ExtractError;
use crate::extract::tools::Invocation;

/// Maximum number of characters of stderr kept as a failure reason.
pub const STDERR_LIMIT: usize = 500;

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    /// What the tool said about its run: stderr, or stdout when stderr is
    /// blank, capped at [`STDERR_LIMIT`] characters.
    pub fn reason(&self) -> String {
        let text = match self.stderr.trim() {
            "" => self.stdout.trim(),
            stderr => stderr,
        };
        truncate_chars(text, STDERR_LIMIT)
    }
}

/// Kills the child's whole process group when dropped, unless disarmed.
///
/// Tools fork helpers of their own (the downloader runs the transcoder), and
/// `kill_on_drop` only reaches the direct child.
struct ProcessGroupGuard {
    pgid: Option<i32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self {
            pgid: pid.and_then(|pid| i32::try_from(pid).ok()),
        }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        if let Some(pgid) = self.pgid.take() {
            // SAFETY: killpg only sends a signal to the group created for this child
            if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ESRCH) {
                    log::warn!("Failed to kill process group {}: {}", pgid, err);
                }
            } else {
                log::debug!("Killed process group {}", pgid);
            }
        }
    }
}

/// Runs `invocation` with `args`, killing it if it outlives `timeout`.
///
/// A non-zero exit becomes [`ExtractError::ToolFailed`] carrying the first
/// [`STDERR_LIMIT`] characters of stderr.
pub async fn run_tool(
    invocation: &Invocation,
    args: &[OsString],
    timeout: Duration,
    capture_stdout: bool,
) -> Result<ProcessOutput, ExtractError> {
    let mut cmd = invocation.command(args);
    cmd.stdin(Stdio::null())
        .stdout(if capture_stdout {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    log::debug!(
        "Running {} ({}) with {} args",
        invocation.tool,
        invocation.program.display(),
        args.len()
    );

    let child = cmd.spawn().map_err(|e| ExtractError::Spawn {
        tool: invocation.tool.clone(),
        source: e,
    })?;
    let mut group = ProcessGroupGuard::new(child.id());

    // Dropping the future on timeout drops the child, which kills it; the
    // guard takes down anything it spawned.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => {
            group.disarm();
            result?
        }
        Err(_) => {
            log::warn!(
                "{} exceeded {}s, terminating",
                invocation.tool,
                timeout.as_secs()
            );
            drop(group);
            return Err(ExtractError::Timeout {
                tool: invocation.tool.clone(),
                secs: timeout.as_secs(),
            });
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if output.status.success() {
        Ok(ProcessOutput { stdout, stderr })
    } else {
        Err(ExtractError::ToolFailed {
            tool: invocation.tool.clone(),
            code: output.status.code(),
            stderr: truncate_chars(&stderr, STDERR_LIMIT),
        })
    }
}

/// First `limit` characters of `text`.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// First non-blank line of `stdout`, trimmed.
pub fn first_non_blank_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).find(|line| !line.is_empty())
}
