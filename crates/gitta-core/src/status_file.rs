use crate::error::{GittaError, IoContext, Result};
use crate::folder;
use crate::paths;
use crate::types::SprintStatus;
use std::path::Path;

/// Read the sidecar status file only. `Ok(None)` when it does not exist.
pub fn read_record(sprint_dir: &Path) -> Result<Option<SprintStatus>> {
    let path = paths::status_path(sprint_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(GittaError::io("read", &path, e)),
    };
    SprintStatus::parse_token(&data)
        .map(Some)
        .ok_or_else(|| GittaError::CorruptStatus {
            path,
            token: data.trim().to_string(),
        })
}

/// Effective status of a sprint directory: the sidecar file when present,
/// otherwise the folder prefix. A folder with neither is an error.
pub fn read(sprint_dir: &Path) -> Result<SprintStatus> {
    if let Some(status) = read_record(sprint_dir)? {
        return Ok(status);
    }
    let name = sprint_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    folder::explicit_status(&name)
        .ok_or_else(|| GittaError::UndeterminedStatus(sprint_dir.to_path_buf()))
}

/// Write `status` to the sidecar file, creating `.gitta/` if needed.
pub fn write(sprint_dir: &Path, status: SprintStatus) -> Result<()> {
    if !sprint_dir.is_dir() {
        return Err(GittaError::io(
            "write status for",
            sprint_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "sprint directory does not exist"),
        ));
    }
    let path = paths::status_path(sprint_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).io_ctx("create directory", parent)?;
    }
    let data = format!("{}\n", status.as_str());
    crate::io::atomic_write(&path, data.as_bytes())?;
    tracing::debug!(path = %path.display(), %status, "wrote sprint status");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn sprint(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn write_then_read() {
        let dir = TempDir::new().unwrap();
        let s = sprint(&dir, "+Sprint_1");
        write(&s, SprintStatus::Planning).unwrap();
        assert_eq!(
            std::fs::read_to_string(paths::status_path(&s)).unwrap(),
            "planning\n"
        );
        assert_eq!(read(&s).unwrap(), SprintStatus::Planning);
    }

    #[test]
    fn write_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let s = sprint(&dir, "!Sprint_1");
        write(&s, SprintStatus::Active).unwrap();
        write(&s, SprintStatus::Active).unwrap();
        assert_eq!(read_record(&s).unwrap(), Some(SprintStatus::Active));
    }

    #[test]
    fn read_is_case_insensitive_and_trimmed() {
        let dir = TempDir::new().unwrap();
        let s = sprint(&dir, "!Sprint_1");
        std::fs::create_dir_all(s.join(".gitta")).unwrap();
        std::fs::write(paths::status_path(&s), "  Archived \r\n").unwrap();
        assert_eq!(read(&s).unwrap(), SprintStatus::Archived);
    }

    #[test]
    fn corrupt_token_is_distinguishable() {
        let dir = TempDir::new().unwrap();
        let s = sprint(&dir, "!Sprint_1");
        std::fs::create_dir_all(s.join(".gitta")).unwrap();
        std::fs::write(paths::status_path(&s), "finished\n").unwrap();

        let err = read(&s).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Corruption);
        assert!(matches!(err, GittaError::CorruptStatus { ref token, .. } if token == "finished"));
    }

    #[test]
    fn missing_file_falls_back_to_prefix() {
        let dir = TempDir::new().unwrap();
        let s = sprint(&dir, "@Sprint_9_Ideas");
        assert_eq!(read_record(&s).unwrap(), None);
        assert_eq!(read(&s).unwrap(), SprintStatus::Planning);
    }

    #[test]
    fn missing_file_and_prefix_is_undetermined() {
        let dir = TempDir::new().unwrap();
        let s = sprint(&dir, "Sprint_9");
        assert!(matches!(read(&s), Err(GittaError::UndeterminedStatus(_))));
    }

    #[test]
    fn write_into_missing_sprint_fails() {
        let dir = TempDir::new().unwrap();
        let err = write(&dir.path().join("+Ghost"), SprintStatus::Ready).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
    }
}
