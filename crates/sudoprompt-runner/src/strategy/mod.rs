//! Elevation strategies
//!
//! One strategy per host family, all behind [`ElevationStrategy`]:
//!
//! | Strategy | Host | Mechanism | Result channel |
//! |----------|------|-----------|----------------|
//! | [`PosixPrompt`] | Linux | kdesudo / pkexec | pipes + marker |
//! | [`FileHandshake`] | Windows | UAC via PowerShell | sidecar files + polling |
//! | [`NativeMac`] | macOS | osascript administrator dialog | pipes + marker |

mod mac;
mod posix;
mod windows;

pub use mac::NativeMac;
pub use posix::PosixPrompt;
pub use windows::FileHandshake;

use async_trait::async_trait;
use serde::Serialize;

use sudoprompt_utils::error::ElevationError;
use sudoprompt_validation::Invocation;

use crate::context::EnvContext;
use crate::dispatch::StrategyKind;
use crate::stream::ElevatedChild;

/// Output of an elevated command that exited 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Result of a successful [`ElevationStrategy::spawn`].
#[derive(Debug)]
pub enum SpawnOutcome {
    /// Elevation was confirmed and the command keeps running on its own.
    /// The pid is that of the elevation front-end, when one is known.
    Detached { pid: Option<u32> },
    /// Elevation was confirmed; output is available through the handle.
    Attached(ElevatedChild),
}

#[async_trait]
pub trait ElevationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Run the command once and collect all of its output.
    async fn exec(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<ExecOutput, ElevationError>;

    /// Start the command and return once elevation is confirmed.
    async fn spawn(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<SpawnOutcome, ElevationError>;

    /// Human-readable rendering of what [`exec`](Self::exec) would run.
    async fn describe(
        &self,
        invocation: &Invocation,
        ctx: &EnvContext,
    ) -> Result<String, ElevationError>;
}
