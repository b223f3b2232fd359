//! Elevation-success marker protocol
//!
//! The elevated script echoes [`MARKER_WORD`] before doing anything else. Its
//! presence at the very start of stdout is the only evidence that elevation
//! was granted: whatever happens afterwards is the command's own result, and
//! any failure without it is the elevation mechanism's.

use sudoprompt_utils::error::ElevationError;

use crate::process::ProcessOutput;
use crate::strategy::ExecOutput;

pub const MARKER_WORD: &str = "SUDOPROMPT";

/// What the elevated shell prints first: the marker word and a line feed.
pub const MAGIC: &str = "SUDOPROMPT\n";

const NO_AGENT_PATTERN: &str = "No authentication agent found";

/// Split the marker off the front of `stdout`, if it is there.
#[must_use]
pub fn strip_marker(stdout: &str) -> Option<&str> {
    stdout.strip_prefix(MAGIC)
}

/// Outcome for an attempt that ended without the marker.
///
/// Native messages are localized and never surface; only the polkit agent
/// case is told apart.
#[must_use]
pub fn unelevated_error(stderr: &str) -> ElevationError {
    if stderr.contains(NO_AGENT_PATTERN) {
        ElevationError::NoPolkitAgent
    } else {
        ElevationError::PermissionDenied
    }
}

/// Classify a finished POSIX elevation attempt.
pub fn classify(output: &ProcessOutput, command: &str) -> Result<ExecOutput, ElevationError> {
    let stdout = output.stdout_string();
    let stderr = output.stderr_string();

    let Some(rest) = strip_marker(&stdout) else {
        return Err(unelevated_error(&stderr));
    };

    if output.success() {
        Ok(ExecOutput {
            stdout: rest.to_string(),
            stderr,
        })
    } else {
        Err(ElevationError::CommandFailed {
            command: command.to_string(),
            code: output.code(),
            stdout: rest.to_string(),
            stderr,
        })
    }
}

/// Classify a finished `osascript` attempt.
///
/// `do shell script` only reports output on success, and `osascript` appends
/// a line feed when printing the result. A failing command surfaces as an
/// `execution error` whose trailing number is the shell exit status; negative
/// numbers are AppleScript's own errors (`-128` is a cancelled dialog).
pub fn classify_mac(output: &ProcessOutput, command: &str) -> Result<ExecOutput, ElevationError> {
    if output.success() {
        let stdout = output.stdout_string();
        let stdout = stdout.strip_suffix('\n').unwrap_or(&stdout);
        return match strip_marker(stdout) {
            Some(rest) => Ok(ExecOutput {
                stdout: rest.to_string(),
                stderr: output.stderr_string(),
            }),
            None => Err(ElevationError::PermissionDenied),
        };
    }

    match parse_applescript_error(&output.stderr_string()) {
        Some((code, message)) if code > 0 => Err(ElevationError::CommandFailed {
            command: command.to_string(),
            code,
            stdout: String::new(),
            stderr: message,
        }),
        _ => Err(ElevationError::PermissionDenied),
    }
}

/// Parse `0:42: execution error: <message> (<number>)`.
fn parse_applescript_error(stderr: &str) -> Option<(i32, String)> {
    let (_, tail) = stderr.split_once("execution error: ")?;
    let tail = tail.trim_end();
    let body = tail.strip_suffix(')')?;
    let (message, number) = body.rsplit_once(" (")?;
    let code = number.trim().parse::<i32>().ok()?;
    Some((code, message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str, code: Option<i32>) -> ProcessOutput {
        ProcessOutput::new(stdout.as_bytes().to_vec(), stderr.as_bytes().to_vec(), code)
    }

    #[test]
    fn test_marker_stripped_on_success() {
        let result = classify(&output("SUDOPROMPT\nhello\n", "", Some(0)), "echo hello");
        assert_eq!(
            result,
            Ok(ExecOutput {
                stdout: "hello\n".to_string(),
                stderr: String::new()
            })
        );
    }

    #[test]
    fn test_marker_present_nonzero_is_command_failure() {
        let result = classify(&output("SUDOPROMPT\npartial", "boom\n", Some(3)), "false");
        assert_eq!(
            result,
            Err(ElevationError::CommandFailed {
                command: "false".to_string(),
                code: 3,
                stdout: "partial".to_string(),
                stderr: "boom\n".to_string()
            })
        );
    }

    #[test]
    fn test_signal_killed_command_reports_minus_one() {
        let result = classify(&output("SUDOPROMPT\n", "", None), "sleep 9");
        assert_eq!(result.unwrap_err().code(), Some(-1));
    }

    #[test]
    fn test_no_marker_is_permission_denied_without_native_text() {
        let result = classify(
            &output("", "Error executing command as another user: Not authorized\n", Some(127)),
            "ls",
        );
        assert_eq!(result, Err(ElevationError::PermissionDenied));
    }

    #[test]
    fn test_no_marker_with_agent_message() {
        let result = classify(
            &output("", "Error: No authentication agent found.\n", Some(127)),
            "ls",
        );
        assert_eq!(result, Err(ElevationError::NoPolkitAgent));
    }

    #[test]
    fn test_no_marker_with_zero_exit_is_denied() {
        assert_eq!(
            classify(&output("something else\n", "", Some(0)), "ls"),
            Err(ElevationError::PermissionDenied)
        );
    }

    #[test]
    fn test_marker_must_be_at_start() {
        assert_eq!(
            classify(&output("x SUDOPROMPT\n", "", Some(0)), "ls"),
            Err(ElevationError::PermissionDenied)
        );
        assert_eq!(
            classify(&output("SUDOPROMPT", "", Some(0)), "ls"),
            Err(ElevationError::PermissionDenied)
        );
    }

    #[test]
    fn test_mac_success_strips_result_newline() {
        let result = classify_mac(&output("SUDOPROMPT\nroot\n\n", "", Some(0)), "whoami");
        assert_eq!(result.unwrap().stdout, "root\n");
    }

    #[test]
    fn test_mac_cancel_is_denied() {
        let result = classify_mac(
            &output("", "0:140: execution error: User canceled. (-128)\n", Some(1)),
            "ls",
        );
        assert_eq!(result, Err(ElevationError::PermissionDenied));
    }

    #[test]
    fn test_mac_command_failure() {
        let result = classify_mac(
            &output("", "0:140: execution error: ls: /nope: No such file or directory (1)\n", Some(1)),
            "ls /nope",
        );
        assert_eq!(
            result,
            Err(ElevationError::CommandFailed {
                command: "ls /nope".to_string(),
                code: 1,
                stdout: String::new(),
                stderr: "ls: /nope: No such file or directory".to_string()
            })
        );
    }

    #[test]
    fn test_mac_unparseable_failure_is_denied() {
        assert_eq!(
            classify_mac(&output("", "garbage", Some(1)), "ls"),
            Err(ElevationError::PermissionDenied)
        );
    }
}
