use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use sudoprompt_config::Config;
use sudoprompt_utils::error::ElevationError;
use sudoprompt_validation::Invocation;

use super::{ElevationStrategy, ExecOutput, SpawnOutcome};
use crate::builder::{PosixCommand, build_posix_command};
use crate::context::EnvContext;
use crate::discovery::find_binary;
use crate::dispatch::StrategyKind;
use crate::error::RunnerError;
use crate::marker;
use crate::native::NativeRunner;
use crate::poll::{ConfirmPolicy, Sleeper, TokioSleeper};
use crate::process::ProcessRunner;
use crate::stream;

/// Elevation through a graphical sudo front-end (kdesudo, pkexec).
///
/// The first binary in `binaries` that exists is used. The elevated shell
/// prints the marker before the command runs.
pub struct PosixPrompt {
    binaries: Vec<PathBuf>,
    runner: Arc<dyn ProcessRunner>,
    sleeper: Arc<dyn Sleeper>,
    confirm: ConfirmPolicy,
}

impl PosixPrompt {
    #[must_use]
    pub fn new(
        binaries: Vec<PathBuf>,
        runner: Arc<dyn ProcessRunner>,
        sleeper: Arc<dyn Sleeper>,
        confirm: ConfirmPolicy,
    ) -> Self {
        Self {
            binaries,
            runner,
            sleeper,
            confirm,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.posix_binaries(),
            Arc::new(NativeRunner::new(config.max_buffer_bytes())),
            Arc::new(TokioSleeper),
            ConfirmPolicy::from_config(config),
        )
    }

    #[must_use]
    pub fn binaries(&self) -> &[PathBuf] {
        &self.binaries
    }

    async fn command(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<PosixCommand, ElevationError> {
        let binary = find_binary(&self.binaries).await?;
        Ok(build_posix_command(&binary, invocation, ctx))
    }
}

impl std::fmt::Debug for PosixPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosixPrompt")
            .field("binaries", &self.binaries)
            .field("confirm", &self.confirm)
            .finish_non_exhaustive()
    }
}

/// Map a plumbing failure to an outcome. Without output there is no marker,
/// so nothing was elevated.
pub(crate) fn runner_failure(err: RunnerError) -> ElevationError {
    match err {
        RunnerError::OutputTooLarge { .. } => ElevationError::internal(err.to_string()),
        RunnerError::SpawnFailed { .. } | RunnerError::NativeExecutionFailed { .. } => {
            debug!(error = %err, "Elevation front-end did not run");
            ElevationError::PermissionDenied
        }
    }
}

#[async_trait]
impl ElevationStrategy for PosixPrompt {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PosixPrompt
    }

    async fn exec(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<ExecOutput, ElevationError> {
        let command = self.command(invocation, ctx).await?;
        let output = self
            .runner
            .run(&command.to_command_spec())
            .await
            .map_err(runner_failure)?;
        marker::classify(&output, &invocation.joined_command())
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<SpawnOutcome, ElevationError> {
        let command = self.command(invocation, ctx).await?;
        stream::spawn_with_marker(
            &command.to_command_spec(),
            invocation,
            self.sleeper.as_ref(),
            self.confirm,
            marker::classify,
        )
        .await
    }

    async fn describe(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<String, ElevationError> {
        Ok(self.command(invocation, ctx).await?.to_shell_string())
    }
}
