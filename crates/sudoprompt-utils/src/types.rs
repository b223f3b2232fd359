//! Value types shared across sudoprompt crates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Chaining operator used to join a sequence of command fragments.
///
/// | Variant | Shell | Semantics |
/// |---------|-------|-----------|
/// | `Sequential` | `;` | run every fragment regardless of the previous result |
/// | `And` | `&&` | run the next fragment only if the previous one succeeded |
/// | `Or` | `\|\|` | run the next fragment only if the previous one failed |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = ";")]
    Sequential,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
}

impl Operator {
    /// The literal shell token for this operator.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => ";",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ";" => Ok(Self::Sequential),
            "&&" => Ok(Self::And),
            "||" => Ok(Self::Or),
            other => Err(format!(
                "unknown operator '{other}' (expected one of ';', '&&', '||')"
            )),
        }
    }
}

/// The command to elevate: one shell string, or ordered fragments joined by an [`Operator`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Single(String),
    Sequence(Vec<String>),
}

impl CommandLine {
    /// Join the command into one line using `operator` between fragments.
    ///
    /// Fragments are separated by exactly one space on each side of the operator.
    #[must_use]
    pub fn joined(&self, operator: Operator) -> String {
        match self {
            Self::Single(command) => command.clone(),
            Self::Sequence(parts) => parts.join(&format!(" {} ", operator.as_str())),
        }
    }

    /// True when there is nothing to run (blank string or no non-blank fragment).
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Single(command) => command.trim().is_empty(),
            Self::Sequence(parts) => parts.iter().all(|p| p.trim().is_empty()),
        }
    }

    /// First fragment of the command, used for prefix checks.
    #[must_use]
    pub fn head(&self) -> &str {
        match self {
            Self::Single(command) => command,
            Self::Sequence(parts) => parts.first().map(String::as_str).unwrap_or(""),
        }
    }
}

impl From<&str> for CommandLine {
    fn from(command: &str) -> Self {
        Self::Single(command.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(command: String) -> Self {
        Self::Single(command)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(parts: Vec<String>) -> Self {
        Self::Sequence(parts)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(parts: Vec<&str>) -> Self {
        Self::Sequence(parts.into_iter().map(str::to_string).collect())
    }
}

/// Host operating system families sudoprompt knows how to elevate on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPlatform {
    Linux,
    Windows,
    Macos,
    Other(String),
}

impl HostPlatform {
    /// Platform of the running process.
    #[must_use]
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS name as reported by `std::env::consts::OS`.
    #[must_use]
    pub fn from_os(os: &str) -> Self {
        match os {
            "linux" => Self::Linux,
            "windows" => Self::Windows,
            "macos" => Self::Macos,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of a configuration value.
///
/// Precedence: CLI arguments > config file > programmatic overrides > built-in defaults.
/// Serializes to lowercase strings: `"cli"`, `"config"`, `"programmatic"`, `"default"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}
