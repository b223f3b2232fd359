use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use sudoprompt_config::Config;
use sudoprompt_utils::error::ElevationError;
use sudoprompt_validation::Invocation;

use super::posix::runner_failure;
use super::{ElevationStrategy, ExecOutput, SpawnOutcome};
use crate::builder::build_mac_command;
use crate::command_spec::CommandSpec;
use crate::context::EnvContext;
use crate::discovery::find_binary;
use crate::dispatch::StrategyKind;
use crate::marker;
use crate::native::NativeRunner;
use crate::poll::{ConfirmPolicy, Sleeper, TokioSleeper};
use crate::process::ProcessRunner;
use crate::stream;

pub const OSASCRIPT: &str = "/usr/bin/osascript";

/// Elevation through the macOS administrator dialog.
///
/// `do shell script` hands output back only when the script ends, so a
/// spawned command is confirmed once it has finished.
pub struct NativeMac {
    runner: Arc<dyn ProcessRunner>,
    sleeper: Arc<dyn Sleeper>,
    confirm: ConfirmPolicy,
}

impl NativeMac {
    #[must_use]
    pub fn new(runner: Arc<dyn ProcessRunner>, sleeper: Arc<dyn Sleeper>, confirm: ConfirmPolicy) -> Self {
        Self {
            runner,
            sleeper,
            confirm,
        }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(NativeRunner::new(config.max_buffer_bytes())),
            Arc::new(TokioSleeper),
            ConfirmPolicy::from_config(config),
        )
    }

    async fn command(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<CommandSpec, ElevationError> {
        find_binary(&[PathBuf::from(OSASCRIPT)]).await?;
        if let Some(icon) = invocation.icon() {
            debug!(icon = %icon.display(), "osascript dialogs cannot show a custom icon, ignoring it");
        }
        Ok(build_mac_command(invocation, ctx))
    }
}

impl std::fmt::Debug for NativeMac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeMac")
            .field("confirm", &self.confirm)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ElevationStrategy for NativeMac {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NativeMac
    }

    async fn exec(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<ExecOutput, ElevationError> {
        let command = self.command(invocation, ctx).await?;
        let output = self.runner.run(&command).await.map_err(runner_failure)?;
        marker::classify_mac(&output, &invocation.joined_command())
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<SpawnOutcome, ElevationError> {
        let command = self.command(invocation, ctx).await?;
        stream::spawn_with_marker(
            &command,
            invocation,
            self.sleeper.as_ref(),
            self.confirm,
            marker::classify_mac,
        )
        .await
    }

    async fn describe(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<String, ElevationError> {
        Ok(build_mac_command(invocation, ctx).display())
    }
}
