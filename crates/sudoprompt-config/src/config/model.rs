use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use sudoprompt_utils::types::{ConfigSource, Operator};

/// Largest combined stdout/stderr accepted from an elevated command (128 MiB).
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 134_217_728;

/// Elevation binaries probed on Linux, in order.
pub const DEFAULT_POSIX_BINARIES: [&str; 2] = ["/usr/bin/kdesudo", "/usr/bin/pkexec"];

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Polls allowed for the stdout sidecar to appear after the status check fails.
pub const DEFAULT_STDOUT_GRACE_ATTEMPTS: u32 = 3;

pub const DEFAULT_CONFIRM_DELAY_MS: u64 = 1000;

/// Two minutes at the default delay.
pub const DEFAULT_CONFIRM_ATTEMPTS: u32 = 120;

/// Effective sudoprompt configuration.
///
/// Built by [`Config::discover`], [`Config::discover_from`] or
/// [`Config::builder`]. Unset fields fall back to the `DEFAULT_*` constants
/// through the accessor methods.
///
/// # Example
///
/// ```toml
/// [defaults]
/// name = "My App"
/// operator = "&&"
///
/// [posix]
/// binaries = ["/usr/bin/pkexec"]
///
/// [windows]
/// poll_interval_ms = 500
///
/// [spawn]
/// confirm_attempts = 60
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub defaults: Defaults,
    pub posix: PosixConfig,
    pub windows: WindowsConfig,
    pub spawn: SpawnConfig,
    /// Source attribution for each setting (for `--dry-run` display).
    pub source_attribution: HashMap<String, ConfigSource>,
}

/// `[defaults]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Display name used when the caller supplies none.
    pub name: Option<String>,
    pub operator: Option<Operator>,
    pub max_buffer_bytes: Option<usize>,
}

/// `[posix]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PosixConfig {
    /// Candidate elevation binaries, probed in order.
    pub binaries: Option<Vec<PathBuf>>,
}

/// `[windows]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WindowsConfig {
    pub poll_interval_ms: Option<u64>,
    pub stdout_grace_attempts: Option<u32>,
    /// Ceiling on status polls once the command is running. `0` means none.
    pub max_poll_attempts: Option<u32>,
    /// Overrides the OS temp directory as the workspace root.
    pub temp_dir: Option<PathBuf>,
}

/// `[spawn]` section
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SpawnConfig {
    pub confirm_delay_ms: Option<u64>,
    pub confirm_attempts: Option<u32>,
}
