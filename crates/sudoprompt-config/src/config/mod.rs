//! Configuration management for sudoprompt
//!
//! Supports TOML configuration files with `[defaults]`, `[posix]`, `[windows]`
//! and `[spawn]` sections. Accessors resolve unset values to the built-in
//! defaults so callers never handle the `Option`s directly.

mod builder;
mod cli_args;
mod discovery;
mod model;
mod sources;
mod validation;

pub use builder::ConfigBuilder;
pub use cli_args::CliArgs;
pub use model::*;
pub use sudoprompt_utils::types::ConfigSource;

use std::path::{Path, PathBuf};
use std::time::Duration;

use sudoprompt_utils::types::Operator;

impl Config {
    /// Display name to use when the caller supplies none.
    #[must_use]
    pub fn default_name(&self) -> Option<&str> {
        self.defaults.name.as_deref()
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.defaults.operator.unwrap_or_default()
    }

    #[must_use]
    pub fn max_buffer_bytes(&self) -> usize {
        self.defaults
            .max_buffer_bytes
            .unwrap_or(DEFAULT_MAX_BUFFER_BYTES)
    }

    /// Candidate elevation binaries in probe order.
    #[must_use]
    pub fn posix_binaries(&self) -> Vec<PathBuf> {
        match &self.posix.binaries {
            Some(binaries) => binaries.clone(),
            None => DEFAULT_POSIX_BINARIES.iter().map(PathBuf::from).collect(),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(
            self.windows
                .poll_interval_ms
                .unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        )
    }

    #[must_use]
    pub fn stdout_grace_attempts(&self) -> u32 {
        self.windows
            .stdout_grace_attempts
            .unwrap_or(DEFAULT_STDOUT_GRACE_ATTEMPTS)
    }

    /// Ceiling on status polls once the command is running; `None` when unbounded.
    #[must_use]
    pub fn max_poll_attempts(&self) -> Option<u32> {
        self.windows.max_poll_attempts.filter(|&n| n > 0)
    }

    /// Workspace root override, if configured.
    #[must_use]
    pub fn temp_dir(&self) -> Option<&Path> {
        self.windows.temp_dir.as_deref()
    }

    #[must_use]
    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(
            self.spawn
                .confirm_delay_ms
                .unwrap_or(DEFAULT_CONFIRM_DELAY_MS),
        )
    }

    #[must_use]
    pub fn confirm_attempts(&self) -> u32 {
        self.spawn
            .confirm_attempts
            .unwrap_or(DEFAULT_CONFIRM_ATTEMPTS)
    }
}
