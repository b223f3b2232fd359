//! sudoprompt - run a shell command with administrator privileges
//!
//! The command is elevated through the host's own prompt (kdesudo or pkexec
//! on Linux, UAC on Windows, the administrator dialog on macOS) and its
//! output and exit status come back as if it had been a normal child process.
//!
//! sudoprompt can be used in two ways:
//! - **CLI**: `sudoprompt --name "My App" -- apt-get update`
//! - **Library**: call [`exec`] or [`spawn`], or build an [`Elevator`]
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use sudoprompt::{Options, exec};
//!
//! # async fn example() -> Result<(), sudoprompt::SudoPromptError> {
//! let output = exec("id -u", Options::new().name("My App")).await?;
//! assert_eq!(output.stdout.trim(), "0");
//! # Ok(())
//! # }
//! ```
//!
//! # Outcomes
//!
//! A refused prompt is [`ElevationError::PermissionDenied`]; an elevated
//! command that exits non-zero is [`ElevationError::CommandFailed`] and
//! carries that command's exit code and output. Only the latter means the
//! command actually ran as administrator.
//!
//! # Stable Public API
//!
//! - [`exec`], [`spawn`] and their `_with_config` variants
//! - [`Elevator`], [`StrategyKind`]
//! - [`Options`], [`SpawnOptions`], [`StdioMode`], [`Operator`]
//! - [`ExecOutput`], [`SpawnOutcome`], [`ElevatedChild`], [`StreamEvent`]
//! - [`Config`], [`ConfigBuilder`], [`CliArgs`]
//! - [`SudoPromptError`], [`ElevationError`], [`ExitCode`]

pub use sudoprompt_config::{CliArgs, Config, ConfigBuilder};
pub use sudoprompt_runner::{
    ElevatedChild, ElevationStrategy, Elevator, EnvContext, ExecOutput, SpawnOutcome,
    StrategyKind, StreamEvent,
};
pub use sudoprompt_utils::error::{
    ConfigError, ElevationError, SudoPromptError, UserFriendlyError, ValidationError,
};
pub use sudoprompt_utils::exit_codes::ExitCode;
pub use sudoprompt_utils::types::{CommandLine, Operator};
pub use sudoprompt_validation::{Invocation, Options, SpawnOptions, StdioMode};

#[doc(hidden)]
pub use sudoprompt_runner as runner;
#[doc(hidden)]
pub use sudoprompt_utils::{logging, types};
#[doc(hidden)]
pub use sudoprompt_validation as validation;

#[doc(hidden)]
pub mod cli;

/// Run `command` elevated with the built-in configuration and collect its output.
pub async fn exec(
    command: impl Into<CommandLine>,
    options: Options,
) -> Result<ExecOutput, SudoPromptError> {
    exec_with_config(command, options, &Config::default()).await
}

/// Like [`exec`] with an explicit configuration.
pub async fn exec_with_config(
    command: impl Into<CommandLine>,
    options: Options,
    config: &Config,
) -> Result<ExecOutput, SudoPromptError> {
    let invocation = invocation(command, options, config)?;
    let elevator = Elevator::new(config)?;
    Ok(elevator.exec(&invocation).await?)
}

/// Start `command` elevated and return once the prompt has been accepted.
pub async fn spawn(
    command: impl Into<CommandLine>,
    options: Options,
) -> Result<SpawnOutcome, SudoPromptError> {
    spawn_with_config(command, options, &Config::default()).await
}

/// Like [`spawn`] with an explicit configuration.
pub async fn spawn_with_config(
    command: impl Into<CommandLine>,
    options: Options,
    config: &Config,
) -> Result<SpawnOutcome, SudoPromptError> {
    let invocation = invocation(command, options, config)?;
    let elevator = Elevator::new(config)?;
    Ok(elevator.spawn(&invocation).await?)
}

/// Validate a request, filling the display name from the configuration when the caller gave none.
pub fn invocation(
    command: impl Into<CommandLine>,
    mut options: Options,
    config: &Config,
) -> Result<Invocation, SudoPromptError> {
    if options.name.is_none()
        && let Some(name) = config.default_name()
    {
        options.name = Some(name.to_string());
    }
    Ok(Invocation::new(command, options)?)
}

/// Returns the sudoprompt version.
#[must_use]
pub fn sudoprompt_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
