use crate::cancel::CancelToken;
use crate::error::Result;
use crate::folder::{self, FolderName};
use crate::sprint;
use crate::status_file;
use crate::types::SprintStatus;
use serde::Serialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Inconsistency
// ---------------------------------------------------------------------------

/// A sprint whose folder prefix disagrees with its status file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inconsistency {
    pub path: PathBuf,
    pub name_status: SprintStatus,
    pub file_status: SprintStatus,
    /// Folder name implied by trusting the status file.
    pub expected_name: String,
}

impl Inconsistency {
    pub fn expected_path(&self) -> PathBuf {
        self.path
            .parent()
            .map(|p| p.join(&self.expected_name))
            .unwrap_or_else(|| PathBuf::from(&self.expected_name))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairResult {
    pub repaired: usize,
    pub failed: usize,
    pub errors: Vec<RepairFailure>,
}

// ---------------------------------------------------------------------------
// Detect / repair
// ---------------------------------------------------------------------------

/// Compare folder prefix and status file for every sprint that has a status
/// file. Sprints without one are consistent by definition; unreadable status
/// files are logged and skipped.
pub fn detect(sprints_dir: &std::path::Path, cancel: &CancelToken) -> Result<Vec<Inconsistency>> {
    cancel.check()?;
    let mut found = Vec::new();

    for path in sprint::sprint_dirs(sprints_dir, cancel)? {
        cancel.check()?;
        let file_status = match status_file::read_record(&path) {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping sprint with unreadable status file");
                continue;
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name_status = folder::extract_status(&name);
        if name_status == file_status {
            continue;
        }

        let expected_name = FolderName::decode_lenient(&name)
            .with_status(file_status)
            .encode();
        tracing::debug!(folder = %name, %file_status, expected = %expected_name, "status mismatch");
        found.push(Inconsistency {
            path,
            name_status,
            file_status,
            expected_name,
        });
    }

    Ok(found)
}

/// Rename each inconsistent folder to the name its status file implies. The
/// status file is never rewritten. Failures are collected, not raised.
pub fn repair(inconsistencies: &[Inconsistency]) -> RepairResult {
    let mut result = RepairResult::default();
    for inc in inconsistencies {
        match crate::io::rename_no_clobber(&inc.path, &inc.expected_path()) {
            Ok(()) => {
                tracing::info!(from = %inc.path.display(), to = %inc.expected_name, "repaired sprint folder");
                result.repaired += 1;
            }
            Err(e) => {
                tracing::warn!(path = %inc.path.display(), error = %e, "repair failed");
                result.failed += 1;
                result.errors.push(RepairFailure {
                    path: inc.path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GittaError;
    use crate::paths;
    use std::path::Path;
    use tempfile::TempDir;

    fn make(dir: &Path, name: &str, status: Option<&str>) -> PathBuf {
        let path = dir.join(name);
        std::fs::create_dir_all(path.join(".gitta")).unwrap();
        if let Some(s) = status {
            std::fs::write(paths::status_path(&path), format!("{s}\n")).unwrap();
        }
        path
    }

    #[test]
    fn detect_then_repair_round_trip() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let bad = make(root, "!Sprint_24_Checkout", Some("ready"));
        make(root, "~Sprint_23", Some("archived"));

        let found = detect(root, &CancelToken::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, bad);
        assert_eq!(found[0].name_status, SprintStatus::Active);
        assert_eq!(found[0].file_status, SprintStatus::Ready);
        assert_eq!(found[0].expected_name, "+Sprint_24_Checkout");

        let result = repair(&found);
        assert_eq!(result.repaired, 1);
        assert_eq!(result.failed, 0);
        assert!(!bad.exists());
        assert!(root.join("+Sprint_24_Checkout").is_dir());
        assert!(detect(root, &CancelToken::new()).unwrap().is_empty());
    }

    #[test]
    fn sprints_without_status_file_are_consistent() {
        let dir = TempDir::new().unwrap();
        make(dir.path(), "!Sprint_1", None);
        make(dir.path(), "Sprint_0", None);
        assert!(detect(dir.path(), &CancelToken::new()).unwrap().is_empty());
    }

    #[test]
    fn corrupt_status_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        make(dir.path(), "!Sprint_1", Some("garbage"));
        make(dir.path(), "+Sprint_2", Some("planning"));
        let found = detect(dir.path(), &CancelToken::new()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].expected_name, "@Sprint_2");
    }

    #[test]
    fn legacy_unprefixed_folder_gets_prefix() {
        let dir = TempDir::new().unwrap();
        make(dir.path(), "Sprint_3", Some("archived"));
        let found = detect(dir.path(), &CancelToken::new()).unwrap();
        assert_eq!(found[0].expected_name, "~Sprint_3");
    }

    #[test]
    fn repair_continues_after_a_failure() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        make(root, "!Sprint_1", Some("archived"));
        make(root, "~Sprint_1", None);
        make(root, "@Sprint_2", Some("ready"));

        let found = detect(root, &CancelToken::new()).unwrap();
        assert_eq!(found.len(), 2);

        let result = repair(&found);
        assert_eq!(result.repaired, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].path, root.join("!Sprint_1"));
        assert!(result.errors[0].error.contains("already exists"));
        assert!(root.join("+Sprint_2").is_dir());
    }

    #[test]
    fn precancelled_detect_returns_promptly() {
        let dir = TempDir::new().unwrap();
        for i in 0..200 {
            make(dir.path(), &format!("+Sprint_{i}"), Some("planning"));
        }
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            detect(dir.path(), &cancel),
            Err(GittaError::Cancelled)
        ));
    }

    #[test]
    fn missing_sprints_root_has_no_inconsistencies() {
        let dir = TempDir::new().unwrap();
        assert!(detect(&dir.path().join("nope"), &CancelToken::new())
            .unwrap()
            .is_empty());
    }
}
