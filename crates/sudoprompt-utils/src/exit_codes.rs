//! Exit code constants for the sudoprompt CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Elevated command completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, options or configuration |
//! | 10 | `PROMPT_TIMEOUT` | Nobody answered the elevation prompt in time |
//! | 69 | `MECHANISM_UNAVAILABLE` | No elevation binary found on this host |
//! | 71 | `UNSUPPORTED_PLATFORM` | The host OS has no elevation strategy |
//! | 77 | `PERMISSION_DENIED` | Elevation refused, or no polkit agent |
//!
//! When the elevated command itself fails, the CLI exits with that command's
//! own status instead (see [`ExitCode::from_command_status`]).

/// Exit codes matching the documented exit code table.
///
/// ```rust
/// use sudoprompt_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::from_command_status(3).as_i32(), 3);
/// assert_eq!(ExitCode::from_command_status(-1), ExitCode::INTERNAL);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - elevated command exited 0
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, options or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Prompt timeout - the bounded wait for the prompt ran out
    pub const PROMPT_TIMEOUT: ExitCode = ExitCode(10);

    /// No elevation mechanism available (sysexits `EX_UNAVAILABLE`)
    pub const MECHANISM_UNAVAILABLE: ExitCode = ExitCode(69);

    /// Unsupported platform (sysexits `EX_OSERR`)
    pub const UNSUPPORTED_PLATFORM: ExitCode = ExitCode(71);

    /// Permission denied (sysexits `EX_NOPERM`)
    pub const PERMISSION_DENIED: ExitCode = ExitCode(77);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Exit code that forwards a failed elevated command's status.
    ///
    /// Statuses outside `1..=255` (signals, Windows NTSTATUS values) collapse
    /// to [`INTERNAL`](Self::INTERNAL) so a failure never exits 0.
    #[must_use]
    pub const fn from_command_status(status: i32) -> Self {
        if status >= 1 && status <= 255 {
            ExitCode(status)
        } else {
            Self::INTERNAL
        }
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::PROMPT_TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::MECHANISM_UNAVAILABLE.as_i32(), 69);
        assert_eq!(ExitCode::UNSUPPORTED_PLATFORM.as_i32(), 71);
        assert_eq!(ExitCode::PERMISSION_DENIED.as_i32(), 77);
    }

    #[test]
    fn test_command_status_forwarding() {
        assert_eq!(ExitCode::from_command_status(7).as_i32(), 7);
        assert_eq!(ExitCode::from_command_status(255).as_i32(), 255);
        assert_eq!(ExitCode::from_command_status(0), ExitCode::INTERNAL);
        assert_eq!(ExitCode::from_command_status(256), ExitCode::INTERNAL);
        assert_eq!(ExitCode::from_command_status(-1073741510), ExitCode::INTERNAL);
    }

    #[test]
    fn test_conversions() {
        let code: ExitCode = 42.into();
        let raw: i32 = code.into();
        assert_eq!(raw, 42);
        assert_eq!(ExitCode::from_i32(42), code);
    }
}
