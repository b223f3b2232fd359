//! CLI argument definitions
//!
//! Everything after `--` is the command to elevate.

use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::Operator;

/// sudoprompt - run a command with administrator privileges
#[derive(Parser, Debug)]
#[command(name = "sudoprompt")]
#[command(about = "Run a shell command with administrator privileges through the native OS prompt")]
#[command(long_about = r#"
sudoprompt asks the interactive user for administrator rights through the host's
own prompt (kdesudo or pkexec on Linux, UAC on Windows, the administrator dialog
on macOS), runs one command elevated and hands back its output and exit status.

EXAMPLES:
  # Run one command
  sudoprompt --name "Disk Tool" -- fdisk -l

  # Chain fragments, stopping at the first failure
  sudoprompt --sequence --operator '&&' -- "apt-get update" "apt-get -y upgrade"

  # Pass environment variables to the elevated command
  sudoprompt --env LANG=C --env MODE=repair -- ./repair.sh

  # Show what would be run, without prompting
  sudoprompt --dry-run -- systemctl restart nginx

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  Config file is discovered by searching upward from CWD for .sudoprompt/config.toml
  Use --config to specify an explicit config file path

EXIT CODES:
  0 success, 1 internal error, 2 invalid arguments or configuration,
  10 prompt timed out, 69 no elevation mechanism, 71 unsupported platform,
  77 permission denied. A failing elevated command exits with its own code.
"#)]
#[command(version)]
pub struct Cli {
    /// Application name shown in the prompt (letters, digits and spaces)
    #[arg(long)]
    pub name: Option<String>,

    /// Icon for the prompt (validated, currently ignored by every platform)
    #[arg(long)]
    pub icon: Option<PathBuf>,

    /// Environment variable for the elevated command (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Operator joining command fragments: ';', '&&' or '||'
    #[arg(long)]
    pub operator: Option<Operator>,

    /// Treat each trailing argument as a separate command fragment
    #[arg(long)]
    pub sequence: bool,

    /// Stream output as it is produced instead of waiting for the command to finish
    #[arg(long)]
    pub spawn: bool,

    /// Return once the prompt has been accepted and leave the command running
    #[arg(long)]
    pub detach: bool,

    /// Emit a JSON result on stdout
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file (overrides discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print the elevation command that would be run, without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Command to elevate
    #[arg(last = true, required = true, num_args = 1.., value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Environment entries, later duplicates winning. `None` when no `--env` was given.
    #[must_use]
    pub fn env_map(&self) -> Option<BTreeMap<String, String>> {
        if self.env.is_empty() {
            return None;
        }
        Some(self.env.iter().cloned().collect())
    }
}

/// Parse `KEY=VALUE`. The value may itself contain `=`.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Build the clap command, for help rendering and completions.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
