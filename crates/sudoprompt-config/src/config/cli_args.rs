use std::path::PathBuf;

use sudoprompt_utils::types::Operator;

/// Command-line values that take part in configuration precedence.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; disables discovery.
    pub config_path: Option<PathBuf>,
    pub name: Option<String>,
    pub operator: Option<Operator>,
}
