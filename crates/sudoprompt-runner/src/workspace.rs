//! Per-invocation temp workspace for the file handshake
//!
//! Layout under `<temp_root>/<id>/`:
//!
//! | File | Written by | Contents |
//! |------|------------|----------|
//! | `execute.bat` | sudoprompt | redirects and runs `command.bat`, records the status |
//! | `command.bat` | sudoprompt | the user command with cwd and env applied |
//! | `stdout` | elevated process | command stdout |
//! | `stderr` | elevated process | command stderr |
//! | `status` | elevated process | `%ERRORLEVEL%` followed by a line break |

use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use rand::rngs::OsRng;
use sudoprompt_utils::error::ElevationError;
use tracing::{debug, warn};

const ID_CONTEXT: &str = "sudo-prompt-3";
const ID_LEN: usize = 32;
const RANDOM_BYTES: usize = 256;

pub const EXECUTE_SCRIPT: &str = "execute.bat";
pub const COMMAND_SCRIPT: &str = "command.bat";
pub const STDOUT_FILE: &str = "stdout";
pub const STDERR_FILE: &str = "stderr";
pub const STATUS_FILE: &str = "status";

/// Derive a workspace id from the display name, the command and fresh randomness.
///
/// The id is the last 32 hex characters of a keyed BLAKE3 hash.
#[must_use]
pub fn generate_id(name: &str, command: &str) -> String {
    let mut random = [0u8; RANDOM_BYTES];
    if let Err(e) = OsRng.try_fill_bytes(&mut random) {
        warn!(error = %e, "OS randomness unavailable, falling back to clock entropy");
        fill_from_clock(&mut random);
    }

    let mut hasher = blake3::Hasher::new_derive_key(ID_CONTEXT);
    hasher.update(name.as_bytes());
    hasher.update(command.as_bytes());
    hasher.update(&random);
    let hex = hasher.finalize().to_hex();
    hex[hex.len() - ID_LEN..].to_string()
}

fn fill_from_clock(buf: &mut [u8]) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seed = [nanos.to_le_bytes().as_slice(), &std::process::id().to_le_bytes()].concat();
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte = seed[i % seed.len()] ^ (i as u8);
    }
}

/// Check that `id` is exactly 32 lowercase hex characters.
pub fn validate_id(id: &str) -> Result<(), ElevationError> {
    let valid = id.len() == ID_LEN && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
    if valid {
        Ok(())
    } else {
        Err(ElevationError::internal(format!(
            "invalid workspace id '{id}'"
        )))
    }
}

/// A created workspace directory. Remove it with [`TempWorkspace::remove`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempWorkspace {
    id: String,
    dir: PathBuf,
}

impl TempWorkspace {
    /// Allocate a fresh id and create `<temp_root>/<id>`.
    pub async fn create(temp_root: &Path, name: &str, command: &str) -> Result<Self, ElevationError> {
        Self::create_with_id(temp_root, &generate_id(name, command)).await
    }

    /// Create the workspace for a caller-chosen id.
    ///
    /// Nothing touches the filesystem unless [`locate`](Self::locate) accepts
    /// the root and id.
    pub async fn create_with_id(temp_root: &Path, id: &str) -> Result<Self, ElevationError> {
        let workspace = Self::locate(temp_root, id)?;
        tokio::fs::create_dir(&workspace.dir).await.map_err(|e| {
            ElevationError::internal(format!(
                "failed to create workspace {}: {e}",
                workspace.dir.display()
            ))
        })?;
        debug!(workspace = %workspace.dir.display(), "Created handshake workspace");
        Ok(workspace)
    }

    /// Resolve the workspace path without creating it.
    ///
    /// The root must be non-empty, the id valid and the path free of `"`.
    pub fn locate(temp_root: &Path, id: &str) -> Result<Self, ElevationError> {
        if temp_root.as_os_str().is_empty() {
            return Err(ElevationError::internal("temp directory is not defined"));
        }
        validate_id(id)?;

        let dir = temp_root.join(id);
        if dir.to_string_lossy().contains('"') {
            return Err(ElevationError::internal(format!(
                "workspace path {} contains '\"'",
                dir.display()
            )));
        }

        Ok(Self {
            id: id.to_string(),
            dir,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn execute_script(&self) -> PathBuf {
        self.dir.join(EXECUTE_SCRIPT)
    }

    #[must_use]
    pub fn command_script(&self) -> PathBuf {
        self.dir.join(COMMAND_SCRIPT)
    }

    #[must_use]
    pub fn stdout_path(&self) -> PathBuf {
        self.dir.join(STDOUT_FILE)
    }

    #[must_use]
    pub fn stderr_path(&self) -> PathBuf {
        self.dir.join(STDERR_FILE)
    }

    #[must_use]
    pub fn status_path(&self) -> PathBuf {
        self.dir.join(STATUS_FILE)
    }

    /// Recursively delete the workspace. A directory that is already gone is not an error.
    pub async fn remove(self) -> Result<(), ElevationError> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => {
                debug!(workspace = %self.dir.display(), "Removed handshake workspace");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ElevationError::internal(format!(
                "failed to remove workspace {}: {e}",
                self.dir.display()
            ))),
        }
    }
}
