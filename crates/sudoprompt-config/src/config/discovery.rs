use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sudoprompt_utils::error::ConfigError;

use super::{CliArgs, Config, ConfigSource, Defaults, PosixConfig, SpawnConfig, WindowsConfig};

/// Keys with a built-in default, attributed to `default` until overridden.
const DEFAULTED_KEYS: [&str; 8] = [
    "operator",
    "max_buffer_bytes",
    "posix_binaries",
    "poll_interval_ms",
    "stdout_grace_attempts",
    "max_poll_attempts",
    "confirm_delay_ms",
    "confirm_attempts",
];

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    posix: Option<PosixConfig>,
    windows: Option<WindowsConfig>,
    spawn: Option<SpawnConfig>,
}

/// Replace `target` with `value` when the latter is set, recording where it came from.
fn overlay<T>(
    target: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut HashMap<String, ConfigSource>,
) {
    if value.is_some() {
        *target = value;
        attribution.insert(key.to_string(), source.clone());
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli_args`.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover and load configuration starting from a specific directory.
    ///
    /// The path-driven variant used by tests to avoid process-global state.
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        let mut config = Config::default();
        for key in DEFAULTED_KEYS {
            config
                .source_attribution
                .insert(key.to_string(), ConfigSource::Default);
        }

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.is_file() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir)?,
        };

        if let Some(path) = &config_path {
            let file_config = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file_config);
        }

        // CLI overrides file
        let cli = ConfigSource::Cli;
        let attribution = &mut config.source_attribution;
        overlay(
            &mut config.defaults.name,
            cli_args.name.clone(),
            "name",
            &cli,
            attribution,
        );
        overlay(
            &mut config.defaults.operator,
            cli_args.operator,
            "operator",
            &cli,
            attribution,
        );

        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: TomlConfig) {
        let source = ConfigSource::Config;
        let attribution = &mut self.source_attribution;

        if let Some(defaults) = file.defaults {
            overlay(&mut self.defaults.name, defaults.name, "name", &source, attribution);
            overlay(
                &mut self.defaults.operator,
                defaults.operator,
                "operator",
                &source,
                attribution,
            );
            overlay(
                &mut self.defaults.max_buffer_bytes,
                defaults.max_buffer_bytes,
                "max_buffer_bytes",
                &source,
                attribution,
            );
        }

        if let Some(posix) = file.posix {
            overlay(
                &mut self.posix.binaries,
                posix.binaries,
                "posix_binaries",
                &source,
                attribution,
            );
        }

        if let Some(windows) = file.windows {
            overlay(
                &mut self.windows.poll_interval_ms,
                windows.poll_interval_ms,
                "poll_interval_ms",
                &source,
                attribution,
            );
            overlay(
                &mut self.windows.stdout_grace_attempts,
                windows.stdout_grace_attempts,
                "stdout_grace_attempts",
                &source,
                attribution,
            );
            overlay(
                &mut self.windows.max_poll_attempts,
                windows.max_poll_attempts,
                "max_poll_attempts",
                &source,
                attribution,
            );
            overlay(
                &mut self.windows.temp_dir,
                windows.temp_dir,
                "temp_dir",
                &source,
                attribution,
            );
        }

        if let Some(spawn) = file.spawn {
            overlay(
                &mut self.spawn.confirm_delay_ms,
                spawn.confirm_delay_ms,
                "confirm_delay_ms",
                &source,
                attribution,
            );
            overlay(
                &mut self.spawn.confirm_attempts,
                spawn.confirm_attempts,
                "confirm_attempts",
                &source,
                attribution,
            );
        }
    }

    /// Search upward from `start_dir` for `.sudoprompt/config.toml`.
    ///
    /// The search stops at the filesystem root or at a repository root
    /// (a directory containing `.git`, `.hg` or `.svn`).
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".sudoprompt").join("config.toml");
            if config_path.is_file() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists()
                || current_dir.join(".hg").exists()
                || current_dir.join(".svn").exists()
            {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: TomlConfig = toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("{}: {}", path.display(), e.message()))
        })?;
        Ok(config)
    }
}
