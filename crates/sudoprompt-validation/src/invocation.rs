//! Validated invocation model
//!
//! [`Options`] is what callers fill in; [`Invocation`] is what the elevation
//! strategies consume. The only way from one to the other is
//! [`Invocation::new`], so every strategy can assume its input is well formed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sudoprompt_utils::error::ValidationError;
use sudoprompt_utils::types::{CommandLine, Operator};

use crate::rules::{is_valid_display_name, validate_env_entry};

/// A display name that passed [`is_valid_display_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        if is_valid_display_name(name) {
            Ok(Self(name.to_string()))
        } else {
            Err(ValidationError::InvalidName {
                name: name.to_string(),
            })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Environment overrides for the elevated command, in key order.
///
/// Ordering is deterministic so generated scripts are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvVars(BTreeMap<String, String>);

impl EnvVars {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Variable names only. Safe to log.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Where a spawned child's output goes once elevation is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StdioMode {
    /// Delivered to the caller as stream events.
    #[default]
    Piped,
    /// Relayed to this process's own stdout and stderr.
    Inherit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpawnOptions {
    /// Return as soon as elevation is confirmed instead of handing back a child handle.
    pub detached: bool,
    pub stdio: StdioMode,
    /// Keep a writable stdin pipe to the elevated command.
    pub keep_stdin_open: bool,
}

/// Caller-supplied options, checked by [`Invocation::new`].
///
/// ```rust
/// use sudoprompt_validation::Options;
///
/// let options = Options::new()
///     .name("Disk Tool")
///     .env_var("LANG", "C")
///     .env_var("MODE", "repair");
/// assert_eq!(options.name.as_deref(), Some("Disk Tool"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub name: Option<String>,
    pub icon: Option<PathBuf>,
    /// `Some` with no entries is rejected; use `None` for no overrides.
    pub env: Option<BTreeMap<String, String>>,
    pub operator: Operator,
    pub spawn: SpawnOptions,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Path to an icon for the consent dialog.
    ///
    /// Validated and kept on the [`Invocation`], but none of the current
    /// dialogs (kdesudo, pkexec, UAC, osascript) can show a custom icon, so
    /// every strategy ignores it.
    #[must_use]
    pub fn icon(mut self, icon: impl Into<PathBuf>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    #[must_use]
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    #[must_use]
    pub fn spawn(mut self, spawn: SpawnOptions) -> Self {
        self.spawn = spawn;
        self
    }
}

/// A fully validated elevation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    command: CommandLine,
    operator: Operator,
    name: DisplayName,
    icon: Option<PathBuf>,
    env: EnvVars,
    spawn: SpawnOptions,
}

impl Invocation {
    /// Validate `command` and `options`, defaulting the name from the running
    /// executable's file stem.
    pub fn new(
        command: impl Into<CommandLine>,
        options: Options,
    ) -> Result<Self, ValidationError> {
        let title = process_title();
        Self::with_process_title(command, options, title.as_deref())
    }

    /// Like [`new`](Self::new) with an explicit process title for the name fallback.
    pub fn with_process_title(
        command: impl Into<CommandLine>,
        options: Options,
        process_title: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let command = command.into();
        if command.is_blank() {
            return Err(ValidationError::EmptyCommand);
        }
        if has_sudo_prefix(command.head()) {
            return Err(ValidationError::SudoPrefix);
        }

        let name = match options.name.as_deref() {
            Some(name) => DisplayName::parse(name)?,
            None => {
                let title = process_title.unwrap_or_default();
                DisplayName::parse(title).map_err(|_| ValidationError::InvalidProcessTitle {
                    title: title.to_string(),
                })?
            }
        };

        if let Some(icon) = &options.icon
            && icon.as_os_str().to_string_lossy().trim().is_empty()
        {
            return Err(ValidationError::EmptyIcon);
        }

        let env = match options.env {
            None => EnvVars::default(),
            Some(map) if map.is_empty() => return Err(ValidationError::EmptyEnv),
            Some(map) => {
                for (key, value) in &map {
                    validate_env_entry(key, value)?;
                }
                EnvVars(map)
            }
        };

        Ok(Self {
            command,
            operator: options.operator,
            name,
            icon: options.icon,
            env,
            spawn: options.spawn,
        })
    }

    #[must_use]
    pub fn command(&self) -> &CommandLine {
        &self.command
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// The command as one line, fragments joined with the operator.
    #[must_use]
    pub fn joined_command(&self) -> String {
        self.command.joined(self.operator)
    }

    #[must_use]
    pub fn name(&self) -> &DisplayName {
        &self.name
    }

    #[must_use]
    pub fn icon(&self) -> Option<&PathBuf> {
        self.icon.as_ref()
    }

    #[must_use]
    pub fn env(&self) -> &EnvVars {
        &self.env
    }

    #[must_use]
    pub fn spawn_options(&self) -> SpawnOptions {
        self.spawn
    }
}

fn has_sudo_prefix(command: &str) -> bool {
    command
        .get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sudo"))
}

fn process_title() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    exe.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
