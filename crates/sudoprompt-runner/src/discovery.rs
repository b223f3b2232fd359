use std::io;
use std::path::{Path, PathBuf};

use sudoprompt_utils::error::ElevationError;
use tracing::debug;

/// Return the first candidate that exists, probing in order.
///
/// Only `metadata` is consulted; nothing is executed. A missing path, or a
/// path whose parent is not a directory, moves on to the next candidate. Any
/// other IO error stops the search.
pub async fn find_binary(candidates: &[PathBuf]) -> Result<PathBuf, ElevationError> {
    for candidate in candidates {
        match probe(candidate).await {
            Ok(true) => {
                debug!(binary = %candidate.display(), "Found elevation binary");
                return Ok(candidate.clone());
            }
            Ok(false) => {
                debug!(binary = %candidate.display(), "Elevation binary not present");
            }
            Err(e) => {
                return Err(ElevationError::internal(format!(
                    "failed to probe {}: {e}",
                    candidate.display()
                )));
            }
        }
    }

    let tried: Vec<String> = candidates.iter().map(|c| c.display().to_string()).collect();
    Err(ElevationError::MechanismUnavailable {
        reason: format!("none of [{}] exist", tried.join(", ")),
    })
}

async fn probe(path: &Path) -> io::Result<bool> {
    match tokio::fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_first_existing_candidate_wins() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::write(&first, "").unwrap();
        std::fs::write(&second, "").unwrap();

        let found = find_binary(&[first.clone(), second]).await.unwrap();
        assert_eq!(found, first);
    }

    #[tokio::test]
    async fn test_missing_candidates_are_skipped() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let present = dir.path().join("present");
        std::fs::write(&present, "").unwrap();

        let found = find_binary(&[missing, present.clone()]).await.unwrap();
        assert_eq!(found, present);
    }

    #[tokio::test]
    async fn test_not_a_directory_is_skipped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, "").unwrap();
        let through_file = file.join("pkexec");
        let present = dir.path().join("present");
        std::fs::write(&present, "").unwrap();

        let found = find_binary(&[through_file, present.clone()]).await.unwrap();
        assert_eq!(found, present);
    }

    #[tokio::test]
    async fn test_none_found_is_mechanism_unavailable() {
        let dir = TempDir::new().unwrap();
        let result = find_binary(&[dir.path().join("a"), dir.path().join("b")]).await;
        assert!(matches!(
            result,
            Err(ElevationError::MechanismUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_list_is_mechanism_unavailable() {
        assert!(matches!(
            find_binary(&[]).await,
            Err(ElevationError::MechanismUnavailable { .. })
        ));
    }
}
