use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

use crate::error::RunnerError;

use super::{CommandSpec, ProcessOutput, ProcessRunner};

// ============================================================================
// NativeRunner - argv-only process execution with an output cap
// ============================================================================

/// Process runner backed by `tokio::process`.
///
/// Stdin is always closed: some elevation front-ends wait for stdin EOF
/// before returning. Each of stdout and stderr is capped at `max_buffer`
/// bytes; a process that writes more is killed.
///
/// # Example
///
/// ```rust,no_run
/// use sudoprompt_runner::{CommandSpec, NativeRunner, ProcessRunner};
///
/// # async fn example() {
/// let runner = NativeRunner::new(1024 * 1024);
/// let output = runner.run(&CommandSpec::new("echo").arg("hello")).await.unwrap();
/// assert!(output.success());
/// # }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NativeRunner {
    max_buffer: usize,
}

impl NativeRunner {
    #[must_use]
    pub const fn new(max_buffer: usize) -> Self {
        Self { max_buffer }
    }

    #[must_use]
    pub const fn max_buffer(&self) -> usize {
        self.max_buffer
    }
}

impl Default for NativeRunner {
    fn default() -> Self {
        Self::new(sudoprompt_config::DEFAULT_MAX_BUFFER_BYTES)
    }
}

#[async_trait]
impl ProcessRunner for NativeRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, RunnerError> {
        let mut command = cmd.to_tokio_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: cmd.program.to_string_lossy().into_owned(),
            reason: e.to_string(),
        })?;

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::NativeExecutionFailed {
                reason: "Failed to capture stdout".to_string(),
            })?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::NativeExecutionFailed {
                reason: "Failed to capture stderr".to_string(),
            })?;

        let limit = self.max_buffer;
        let read = tokio::try_join!(
            read_capped(stdout_pipe, limit),
            read_capped(stderr_pipe, limit)
        );

        match read {
            Ok((stdout, stderr)) => {
                let status = child
                    .wait()
                    .await
                    .map_err(|e| RunnerError::NativeExecutionFailed {
                        reason: format!("Failed to wait for process: {e}"),
                    })?;
                Ok(ProcessOutput::new(stdout, stderr, status.code()))
            }
            Err(err) => {
                debug!(error = %err, "Killing process after read failure");
                let _ = child.start_kill();
                let _ = child.wait().await;
                Err(err)
            }
        }
    }
}

/// Read `pipe` to EOF, failing once more than `limit` bytes arrive.
async fn read_capped<R>(pipe: R, limit: usize) -> Result<Vec<u8>, RunnerError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    pipe.take(cap)
        .read_to_end(&mut buf)
        .await
        .map_err(|e| RunnerError::NativeExecutionFailed {
            reason: format!("Failed to read process output: {e}"),
        })?;
    if buf.len() > limit {
        return Err(RunnerError::OutputTooLarge { limit });
    }
    Ok(buf)
}
