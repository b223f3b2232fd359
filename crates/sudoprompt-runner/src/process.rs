use async_trait::async_trait;

use crate::error::RunnerError;

use super::CommandSpec;

// ============================================================================
// ProcessRunner Trait - argv-only process execution
// ============================================================================

/// Output from a process execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code from the process (None if terminated by signal)
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stdout: Vec<u8>, stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self {
            stdout,
            stderr,
            exit_code,
        }
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit code with signal termination reported as `-1`.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }
}

/// Trait for one-shot process execution.
///
/// Implementations MUST use argv-style APIs only (no shell string evaluation)
/// and MUST run the process with stdin closed. Strategies hold an
/// `Arc<dyn ProcessRunner>` so tests can substitute a scripted runner.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use sudoprompt_runner::{CommandSpec, ProcessOutput, ProcessRunner, RunnerError};
///
/// struct Canned;
///
/// #[async_trait]
/// impl ProcessRunner for Canned {
///     async fn run(&self, _cmd: &CommandSpec) -> Result<ProcessOutput, RunnerError> {
///         Ok(ProcessOutput::new(b"SUDOPROMPT\nok".to_vec(), Vec::new(), Some(0)))
///     }
/// }
/// ```
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `cmd` to completion and collect its output.
    ///
    /// * `Ok(ProcessOutput)` - the process ran (possibly with non-zero exit code)
    /// * `Err(RunnerError::SpawnFailed)` - the program could not be started
    /// * `Err(RunnerError::OutputTooLarge)` - output exceeded the runner's cap;
    ///   the process has been killed
    async fn run(&self, cmd: &CommandSpec) -> Result<ProcessOutput, RunnerError>;
}
