//! Rendering of CLI results
//!
//! Human output writes the elevated command's streams through unchanged;
//! `--json` emits one [`RunReport`] on stdout instead.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::{ElevationError, ExecOutput, StrategyKind};

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub strategy: StrategyKind,
    /// `success`, `started` or the snake_case outcome of the failure.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn from_result(strategy: StrategyKind, result: &Result<ExecOutput, ElevationError>) -> Self {
        match result {
            Ok(output) => Self {
                strategy,
                status: "success".to_string(),
                exit_code: Some(0),
                stdout: Some(output.stdout.clone()),
                stderr: Some(output.stderr.clone()),
                pid: None,
                error: None,
            },
            Err(ElevationError::CommandFailed {
                code,
                stdout,
                stderr,
                ..
            }) => Self {
                strategy,
                status: "command_failed".to_string(),
                exit_code: Some(*code),
                stdout: Some(stdout.clone()),
                stderr: Some(stderr.clone()),
                pid: None,
                error: None,
            },
            Err(e) => Self {
                strategy,
                status: e.kind().to_string(),
                exit_code: None,
                stdout: None,
                stderr: None,
                pid: None,
                error: Some(e.to_string()),
            },
        }
    }

    #[must_use]
    pub fn started(strategy: StrategyKind, pid: Option<u32>) -> Self {
        Self {
            strategy,
            status: "started".to_string(),
            exit_code: None,
            stdout: None,
            stderr: None,
            pid,
            error: None,
        }
    }
}

/// Result of `--dry-run`.
#[derive(Debug, Serialize)]
pub struct DryRunReport {
    pub strategy: StrategyKind,
    pub command: String,
    /// Effective configuration as `key -> { value, source }`.
    pub config: BTreeMap<String, ConfigEntry>,
}

#[derive(Debug, Serialize)]
pub struct ConfigEntry {
    pub value: String,
    pub source: String,
}

pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("error: failed to serialize output: {e}"),
    }
}

/// Write the elevated command's output to our own stdout and stderr.
pub fn write_streams(stdout: &str, stderr: &str) {
    write_stdout(stdout);
    write_stderr(stderr);
}

pub fn write_stdout(text: &str) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(text.as_bytes());
    let _ = out.flush();
}

pub fn write_stderr(text: &str) {
    let mut err = std::io::stderr().lock();
    let _ = err.write_all(text.as_bytes());
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_for_command_failure_keeps_output() {
        let result = Err(ElevationError::CommandFailed {
            command: "false".to_string(),
            code: 1,
            stdout: "o".to_string(),
            stderr: "e".to_string(),
        });
        let report = RunReport::from_result(StrategyKind::PosixPrompt, &result);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "posix-prompt");
        assert_eq!(json["status"], "command_failed");
        assert_eq!(json["exit_code"], 1);
        assert_eq!(json["stdout"], "o");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_report_for_denial_has_no_code() {
        let report = RunReport::from_result(
            StrategyKind::FileHandshake,
            &Err(ElevationError::PermissionDenied),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "permission_denied");
        assert_eq!(json["error"], "User did not grant permission.");
        assert!(json.get("exit_code").is_none());
    }

    #[test]
    fn test_started_report() {
        let json = serde_json::to_value(RunReport::started(StrategyKind::NativeMac, Some(42))).unwrap();
        assert_eq!(json["status"], "started");
        assert_eq!(json["pid"], 42);
    }
}
