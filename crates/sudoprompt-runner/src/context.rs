use std::io;
use std::path::{Path, PathBuf};

use sudoprompt_utils::types::HostPlatform;

/// Process-wide facts the command builder depends on.
///
/// Captured once per invocation at the library boundary and passed down, so
/// the builder functions stay pure and tests can supply any values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvContext {
    /// Working directory the elevated command starts in.
    pub cwd: PathBuf,
    pub platform: HostPlatform,
    /// Root under which handshake workspaces are created.
    pub temp_dir: PathBuf,
}

impl EnvContext {
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>, platform: HostPlatform, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            platform,
            temp_dir: temp_dir.into(),
        }
    }

    /// Capture the current process state. `temp_override` replaces the OS temp directory.
    pub fn capture(temp_override: Option<&Path>) -> io::Result<Self> {
        let cwd = std::env::current_dir()?;
        let temp_dir = temp_override.map_or_else(std::env::temp_dir, Path::to_path_buf);
        Ok(Self::new(cwd, HostPlatform::current(), temp_dir))
    }
}
