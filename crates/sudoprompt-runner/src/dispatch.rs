//! Strategy selection and the library entry point
//!
//! [`Elevator`] picks the strategy for the host once, captures the process
//! context per call and wraps every call in an invocation span.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;

use sudoprompt_config::Config;
use sudoprompt_utils::error::ElevationError;
use sudoprompt_utils::logging::{invocation_span, log_invocation_outcome, log_invocation_start};
use sudoprompt_utils::types::HostPlatform;
use sudoprompt_validation::Invocation;

use crate::context::EnvContext;
use crate::strategy::{ElevationStrategy, ExecOutput, FileHandshake, NativeMac, PosixPrompt, SpawnOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    PosixPrompt,
    FileHandshake,
    NativeMac,
}

impl StrategyKind {
    /// Strategy for a host family. Hosts outside Linux, Windows and macOS are unsupported.
    pub fn for_platform(platform: &HostPlatform) -> Result<Self, ElevationError> {
        match platform {
            HostPlatform::Linux => Ok(Self::PosixPrompt),
            HostPlatform::Windows => Ok(Self::FileHandshake),
            HostPlatform::Macos => Ok(Self::NativeMac),
            HostPlatform::Other(name) => Err(ElevationError::UnsupportedPlatform {
                platform: name.clone(),
            }),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PosixPrompt => "posix-prompt",
            Self::FileHandshake => "file-handshake",
            Self::NativeMac => "native-mac",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runs invocations through the strategy chosen for the host.
#[derive(Clone)]
pub struct Elevator {
    strategy: Arc<dyn ElevationStrategy>,
    temp_dir: Option<PathBuf>,
    context: Option<EnvContext>,
}

impl Elevator {
    /// Elevator for the current host.
    pub fn new(config: &Config) -> Result<Self, ElevationError> {
        Self::for_platform(config, &HostPlatform::current())
    }

    pub fn for_platform(config: &Config, platform: &HostPlatform) -> Result<Self, ElevationError> {
        let strategy: Arc<dyn ElevationStrategy> = match StrategyKind::for_platform(platform)? {
            StrategyKind::PosixPrompt => Arc::new(PosixPrompt::from_config(config)),
            StrategyKind::FileHandshake => Arc::new(FileHandshake::from_config(config)),
            StrategyKind::NativeMac => Arc::new(NativeMac::from_config(config)),
        };
        Ok(Self::with_strategy(strategy, config))
    }

    #[must_use]
    pub fn with_strategy(strategy: Arc<dyn ElevationStrategy>, config: &Config) -> Self {
        Self {
            strategy,
            temp_dir: config.temp_dir().map(PathBuf::from),
            context: None,
        }
    }

    /// Use a fixed context instead of capturing the process state per call.
    #[must_use]
    pub fn with_context(mut self, context: EnvContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    fn context(&self) -> Result<EnvContext, ElevationError> {
        match &self.context {
            Some(ctx) => Ok(ctx.clone()),
            None => EnvContext::capture(self.temp_dir.as_deref()).map_err(|e| {
                ElevationError::internal(format!("failed to read the working directory: {e}"))
            }),
        }
    }

    /// Run the command elevated and collect its output.
    pub async fn exec(&self, invocation: &Invocation) -> Result<ExecOutput, ElevationError> {
        let span = invocation_span(invocation.name().as_str(), self.kind().as_str());
        async {
            let ctx = self.context()?;
            log_invocation_start(self.kind().as_str(), invocation.env().keys());
            let started = Instant::now();
            let result = self.strategy.exec(invocation, &ctx).await;
            log_result(&result, started);
            result
        }
        .instrument(span)
        .await
    }

    /// Start the command elevated and return once elevation is confirmed.
    pub async fn spawn(&self, invocation: &Invocation) -> Result<SpawnOutcome, ElevationError> {
        let span = invocation_span(invocation.name().as_str(), self.kind().as_str());
        async {
            let ctx = self.context()?;
            log_invocation_start(self.kind().as_str(), invocation.env().keys());
            let started = Instant::now();
            let result = self.strategy.spawn(invocation, &ctx).await;
            log_result(&result, started);
            result
        }
        .instrument(span)
        .await
    }

    /// What [`exec`](Self::exec) would run, without running anything.
    pub async fn describe(&self, invocation: &Invocation) -> Result<String, ElevationError> {
        let ctx = self.context()?;
        self.strategy.describe(invocation, &ctx).await
    }
}

impl fmt::Debug for Elevator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elevator")
            .field("strategy", &self.kind())
            .field("temp_dir", &self.temp_dir)
            .field("context", &self.context)
            .finish()
    }
}

fn log_result<T>(result: &Result<T, ElevationError>, started: Instant) {
    match result {
        Ok(_) => log_invocation_outcome("success", Some(0), started.elapsed()),
        Err(e) => log_invocation_outcome(e.kind(), e.code(), started.elapsed()),
    }
}
