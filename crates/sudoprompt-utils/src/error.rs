use std::fmt;
use thiserror::Error;

use crate::exit_codes::ExitCode;

/// Fixed, non-localized message for a refused or failed elevation prompt.
pub const PERMISSION_DENIED: &str = "User did not grant permission.";

/// Fixed message for a polkit setup with no authentication agent running.
pub const NO_POLKIT_AGENT: &str = "No polkit authentication agent found.";

/// Library-level error type returned by the sudoprompt facade.
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Validation` | The command or options were rejected before dispatch |
/// | `Config` | Configuration file or CLI argument errors |
/// | `Elevation` | The elevation attempt or the elevated command failed |
/// | `Io` | Filesystem errors outside of an elevation attempt |
///
/// # Exit Code Mapping
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Validation and configuration errors |
/// | 10 | Prompt timed out |
/// | 69 | No elevation mechanism on this host |
/// | 71 | Unsupported platform |
/// | 77 | Permission denied / no polkit agent |
/// | *n* | Elevated command exited with code *n* |
/// | 1 | Other errors |
///
/// Library code returns `SudoPromptError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum SudoPromptError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Elevation(#[from] ElevationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SudoPromptError {
    /// Map this error to the process exit code the CLI should use.
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::Validation(_) | Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Elevation(err) => err.to_exit_code(),
            Self::Io(_) => ExitCode::INTERNAL,
        }
    }

    /// The elevation outcome, if this error came out of an elevation attempt.
    #[must_use]
    pub fn as_elevation(&self) -> Option<&ElevationError> {
        match self {
            Self::Elevation(err) => Some(err),
            _ => None,
        }
    }

    /// Format the error with context and suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut out = format!("error: {}", self.user_message());
        if let Some(context) = self.context() {
            out.push_str(&format!("\n  context: {context}"));
        }
        for suggestion in self.suggestions() {
            out.push_str(&format!("\n  hint: {suggestion}"));
        }
        out
    }
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Authorization,
    CommandExecution,
    Platform,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Validation => write!(f, "Validation"),
            Self::Authorization => write!(f, "Authorization"),
            Self::CommandExecution => write!(f, "Command Execution"),
            Self::Platform => write!(f, "Platform"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Terminal outcomes of an elevation attempt other than success.
///
/// Before elevation is confirmed every failure is normalized to
/// [`PermissionDenied`](Self::PermissionDenied) or
/// [`NoPolkitAgent`](Self::NoPolkitAgent); native messages are internationalized
/// and never surface here. After confirmation a failing command is reported as
/// [`CommandFailed`](Self::CommandFailed) with its stderr untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElevationError {
    /// The user declined the prompt, or the prompt could not be shown.
    #[error("User did not grant permission.")]
    PermissionDenied,

    /// polkit is installed but no authentication agent is running.
    #[error("No polkit authentication agent found.")]
    NoPolkitAgent,

    /// Nothing on this host can elevate a command.
    #[error("Unable to find an elevation mechanism: {reason}")]
    MechanismUnavailable { reason: String },

    /// The interactive wait exceeded its bounded limit.
    #[error("Timed out after {waited_ms} ms waiting for the elevation prompt")]
    PromptTimedOut { waited_ms: u64 },

    /// Elevation succeeded and the command exited nonzero.
    #[error("Command failed with exit code {code}: {command}\n{stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    /// Filesystem, IPC or workspace failure unrelated to the authorization decision.
    #[error("Internal failure: {reason}")]
    Internal { reason: String },

    #[error("Platform not yet supported: {platform}")]
    UnsupportedPlatform { platform: String },
}

impl ElevationError {
    /// Shorthand for an [`Internal`](Self::Internal) failure.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// Exit status of the elevated command, present only for command failures.
    #[must_use]
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Stable snake_case name of the outcome, for logs and machine-readable output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::NoPolkitAgent => "no_polkit_agent",
            Self::MechanismUnavailable { .. } => "mechanism_unavailable",
            Self::PromptTimedOut { .. } => "prompt_timed_out",
            Self::CommandFailed { .. } => "command_failed",
            Self::Internal { .. } => "internal",
            Self::UnsupportedPlatform { .. } => "unsupported_platform",
        }
    }

    /// True when the failure happened after elevation was granted.
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }

    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            Self::PermissionDenied | Self::NoPolkitAgent => ExitCode::PERMISSION_DENIED,
            Self::MechanismUnavailable { .. } => ExitCode::MECHANISM_UNAVAILABLE,
            Self::PromptTimedOut { .. } => ExitCode::PROMPT_TIMEOUT,
            Self::CommandFailed { code, .. } => ExitCode::from_command_status(*code),
            Self::Internal { .. } => ExitCode::INTERNAL,
            Self::UnsupportedPlatform { .. } => ExitCode::UNSUPPORTED_PLATFORM,
        }
    }
}

impl UserFriendlyError for ElevationError {
    fn user_message(&self) -> String {
        match self {
            Self::CommandFailed { code, .. } => {
                format!("The elevated command exited with code {code}")
            }
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::PermissionDenied => Some(
                "The elevation prompt was dismissed, refused, or could not be displayed."
                    .to_string(),
            ),
            Self::NoPolkitAgent => Some(
                "pkexec needs a graphical polkit authentication agent to ask for a password."
                    .to_string(),
            ),
            Self::MechanismUnavailable { .. } => Some(
                "sudoprompt looks for kdesudo and pkexec on Linux, PowerShell on Windows and osascript on macOS."
                    .to_string(),
            ),
            Self::PromptTimedOut { .. } => {
                Some("Nobody answered the elevation prompt in time.".to_string())
            }
            Self::CommandFailed { stderr, .. } if !stderr.trim().is_empty() => {
                Some(stderr.trim().to_string())
            }
            Self::Internal { .. } => Some(
                "The failure happened in sudoprompt itself, not in the elevation prompt."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::PermissionDenied => vec![
                "Run the command again and accept the elevation prompt".to_string(),
            ],
            Self::NoPolkitAgent => vec![
                "Start a polkit agent (e.g. polkit-gnome-authentication-agent-1)".to_string(),
                "Install kdesudo as an alternative elevation binary".to_string(),
            ],
            Self::MechanismUnavailable { .. } => vec![
                "Install polkit (pkexec) or kdesudo".to_string(),
                "List a custom elevation binary under [posix] binaries in .sudoprompt/config.toml"
                    .to_string(),
            ],
            Self::PromptTimedOut { .. } => vec![
                "Increase [spawn] confirm_attempts or confirm_delay_ms".to_string(),
            ],
            Self::CommandFailed { .. } => vec![
                "Check the command's own error output above".to_string(),
            ],
            Self::Internal { .. } => vec![
                "Check that the temporary directory is writable".to_string(),
                "Re-run with --verbose for details".to_string(),
            ],
            Self::UnsupportedPlatform { .. } => vec![
                "sudoprompt supports Linux, macOS and Windows".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::PermissionDenied | Self::NoPolkitAgent | Self::PromptTimedOut { .. } => {
                ErrorCategory::Authorization
            }
            Self::CommandFailed { .. } => ErrorCategory::CommandExecution,
            Self::MechanismUnavailable { .. } | Self::UnsupportedPlatform { .. } => {
                ErrorCategory::Platform
            }
            Self::Internal { .. } => ErrorCategory::FileSystem,
        }
    }
}

/// Errors raised while checking the command and options before dispatch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Command should not be empty.")]
    EmptyCommand,

    #[error("Command should not be prefixed with \"sudo\".")]
    SudoPrefix,

    #[error("options.name must be alphanumeric only (spaces are allowed) and <= 70 characters.")]
    InvalidName { name: String },

    #[error("process title cannot be used as a valid name: {title:?}")]
    InvalidProcessTitle { title: String },

    #[error("options.icon must not be empty if provided.")]
    EmptyIcon,

    #[error("options.env must not be empty if provided.")]
    EmptyEnv,

    #[error("options.env has an invalid environment variable name: {key:?}")]
    InvalidEnvName { key: String },

    #[error("options.env has an invalid environment variable value: {value:?}")]
    InvalidEnvValue { value: String },
}

impl UserFriendlyError for ValidationError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::SudoPrefix => {
                Some("sudoprompt performs the elevation itself.".to_string())
            }
            Self::InvalidName { .. } | Self::InvalidProcessTitle { .. } => Some(
                "The name is shown unescaped in native consent dialogs.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::SudoPrefix => vec!["Drop the leading 'sudo' from the command".to_string()],
            Self::InvalidName { .. } | Self::InvalidProcessTitle { .. } => {
                vec!["Pass --name with letters, digits and spaces only".to_string()]
            }
            Self::InvalidEnvName { .. } => {
                vec!["Variable names must match [A-Za-z_][A-Za-z0-9_]*".to_string()]
            }
            Self::InvalidEnvValue { .. } => {
                vec!["Remove line breaks from environment values".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Validation
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        Some(
            "Configuration is loaded with precedence: CLI flags > .sudoprompt/config.toml > defaults"
                .to_string(),
        )
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec!["Check the TOML syntax of the config file".to_string()],
            Self::InvalidValue { key, .. } => vec![format!("Fix or remove '{key}'")],
            Self::NotFound { .. } => vec!["Check the path passed to --config".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

impl UserFriendlyError for SudoPromptError {
    fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.user_message(),
            Self::Config(e) => e.user_message(),
            Self::Elevation(e) => e.user_message(),
            Self::Io(e) => format!("IO error: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Validation(e) => e.context(),
            Self::Config(e) => e.context(),
            Self::Elevation(e) => e.context(),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Validation(e) => e.suggestions(),
            Self::Config(e) => e.suggestions(),
            Self::Elevation(e) => e.suggestions(),
            Self::Io(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(e) => e.category(),
            Self::Config(e) => e.category(),
            Self::Elevation(e) => e.category(),
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_messages() {
        assert_eq!(ElevationError::PermissionDenied.to_string(), PERMISSION_DENIED);
        assert_eq!(ElevationError::NoPolkitAgent.to_string(), NO_POLKIT_AGENT);
    }

    #[test]
    fn test_only_command_failures_carry_a_code() {
        let failed = ElevationError::CommandFailed {
            command: "exit 7".to_string(),
            code: 7,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(failed.code(), Some(7));
        assert!(failed.is_elevated());

        assert_eq!(ElevationError::PermissionDenied.code(), None);
        assert_eq!(ElevationError::internal("disk full").code(), None);
        assert!(!ElevationError::NoPolkitAgent.is_elevated());
    }

    #[test]
    fn test_command_failed_message_keeps_stderr() {
        let failed = ElevationError::CommandFailed {
            command: "ls /nope".to_string(),
            code: 2,
            stdout: String::new(),
            stderr: "ls: cannot access '/nope'".to_string(),
        };
        let message = failed.to_string();
        assert!(message.contains("ls /nope"));
        assert!(message.contains("ls: cannot access '/nope'"));
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(
            SudoPromptError::from(ValidationError::SudoPrefix).to_exit_code(),
            ExitCode::CLI_ARGS
        );
        assert_eq!(
            SudoPromptError::from(ElevationError::PermissionDenied).to_exit_code(),
            ExitCode::PERMISSION_DENIED
        );
        assert_eq!(
            SudoPromptError::from(ElevationError::PromptTimedOut { waited_ms: 10 })
                .to_exit_code(),
            ExitCode::PROMPT_TIMEOUT
        );
        let failed = ElevationError::CommandFailed {
            command: "exit 7".to_string(),
            code: 7,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(failed.to_exit_code().as_i32(), 7);
    }

    #[test]
    fn test_display_for_user_includes_hints() {
        let err = SudoPromptError::from(ElevationError::NoPolkitAgent);
        let text = err.display_for_user();
        assert!(text.starts_with("error: No polkit authentication agent found."));
        assert!(text.contains("hint:"));
        assert_eq!(err.category(), ErrorCategory::Authorization);
    }

    #[test]
    fn test_validation_error_category() {
        let err = ValidationError::InvalidEnvName {
            key: "1BAD".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("\"1BAD\""));
    }
}
