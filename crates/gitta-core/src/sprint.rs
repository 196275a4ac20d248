use crate::cancel::CancelToken;
use crate::error::{GittaError, IoContext, Result};
use crate::folder::{self, FolderName};
use crate::paths;
use crate::status_file;
use crate::types::SprintStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// SprintMeta
// ---------------------------------------------------------------------------

/// Optional scheduling details stored in `<sprint>/.gitta/sprint.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SprintMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl SprintMeta {
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none() && self.end_date.is_none() && self.duration.is_none()
    }

    pub fn load(sprint_dir: &Path) -> Result<Option<Self>> {
        let path = paths::sprint_meta_path(sprint_dir);
        if !path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&path).io_ctx("read", &path)?;
        Ok(Some(serde_yaml::from_str(&data)?))
    }

    pub fn save(&self, sprint_dir: &Path) -> Result<()> {
        let path = paths::sprint_meta_path(sprint_dir);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Sprint
// ---------------------------------------------------------------------------

/// A sprint directory as found on disk.
///
/// The two status views are kept apart on purpose: `name_status` is what the
/// folder prefix says, `file_status` is what the sidecar file says. They only
/// disagree after an interrupted workflow, which is what the doctor repairs.
#[derive(Debug, Clone, Serialize)]
pub struct Sprint {
    pub path: PathBuf,
    pub folder_name: String,
    pub identifier: String,
    pub description: Option<String>,
    pub name_status: SprintStatus,
    pub file_status: Option<SprintStatus>,
    #[serde(flatten)]
    pub meta: SprintMeta,
}

impl Sprint {
    /// Build a `Sprint` from its directory, reading the sidecar files.
    pub fn from_dir(path: &Path) -> Self {
        let folder_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let decoded = FolderName::decode_lenient(&folder_name);

        let file_status = match status_file::read_record(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable status file");
                None
            }
        };
        let meta = match SprintMeta::load(path) {
            Ok(m) => m.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable sprint metadata");
                SprintMeta::default()
            }
        };

        Self {
            path: path.to_path_buf(),
            folder_name,
            identifier: decoded.identifier,
            description: decoded.description,
            name_status: decoded.status,
            file_status,
            meta,
        }
    }

    /// Authoritative status: the sidecar file when present, else the prefix.
    pub fn status(&self) -> SprintStatus {
        self.file_status.unwrap_or(self.name_status)
    }

    pub fn is_consistent(&self) -> bool {
        self.file_status.is_none_or(|s| s == self.name_status)
    }

    pub fn folder(&self) -> FolderName {
        FolderName::new(
            self.name_status,
            self.identifier.clone(),
            self.description.clone(),
        )
    }

    /// Case-insensitive substring match against the identifier.
    pub fn matches(&self, query: &str) -> bool {
        self.identifier
            .to_lowercase()
            .contains(&query.to_lowercase())
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Sprint directories under `sprints_dir`, sorted by folder name. A missing
/// sprints root yields an empty list.
pub fn list_sprints(sprints_dir: &Path, cancel: &CancelToken) -> Result<Vec<Sprint>> {
    cancel.check()?;
    let mut sprints = Vec::new();
    for path in sprint_dirs(sprints_dir, cancel)? {
        cancel.check()?;
        sprints.push(Sprint::from_dir(&path));
    }
    Ok(sprints)
}

/// Candidate sprint directories in folder-name order, skipping hidden
/// entries, pointer objects and anything that is not a real directory.
pub(crate) fn sprint_dirs(sprints_dir: &Path, cancel: &CancelToken) -> Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(sprints_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(GittaError::io("list", sprints_dir, e)),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        cancel.check()?;
        let entry = entry.io_ctx("list", sprints_dir)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || paths::is_pointer_name(&name) {
            continue;
        }
        if entry.file_type().io_ctx("stat", &entry.path())?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// First sprint (in listing order) whose identifier contains `query` and
/// whose folder prefix is one of `statuses`. The status file is not consulted
/// here; callers read it and validate the transition themselves.
pub fn find_sprint<'a>(
    sprints: &'a [Sprint],
    query: &str,
    statuses: &[SprintStatus],
) -> Result<&'a Sprint> {
    if query.trim().is_empty() {
        return Err(GittaError::EmptyQuery);
    }
    let mut candidates = sprints
        .iter()
        .filter(|s| statuses.contains(&s.name_status) && s.matches(query));
    let first = candidates
        .next()
        .ok_or_else(|| GittaError::SprintNotFound(query.to_string()))?;
    let others: Vec<&str> = candidates.map(|s| s.identifier.as_str()).collect();
    if !others.is_empty() {
        tracing::warn!(
            query,
            chosen = %first.identifier,
            also_matched = ?others,
            "ambiguous sprint query; using the first match"
        );
    }
    Ok(first)
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NewSprint {
    pub identifier: String,
    pub description: Option<String>,
    pub status: SprintStatus,
    pub meta: SprintMeta,
}

/// Next `<stem>_<n>` identifier after the highest existing one.
pub fn next_sprint_identifier(sprints: &[Sprint], stem: &str) -> String {
    let lead = format!("{}_", stem.to_lowercase());
    let max = sprints
        .iter()
        .filter_map(|s| {
            let id = s.identifier.to_lowercase();
            id.strip_prefix(&lead)
                .and_then(|n| n.parse::<u64>().ok())
        })
        .max()
        .unwrap_or(0);
    format!("{stem}_{}", max + 1)
}

fn validate_new(new: &NewSprint) -> Result<()> {
    let invalid = |reason: String| GittaError::InvalidFolderName {
        name: folder::encode(new.status, &new.identifier, new.description.as_deref()),
        reason,
    };
    if !matches!(new.status, SprintStatus::Ready | SprintStatus::Planning) {
        return Err(invalid(format!(
            "new sprints start as ready or planning, not {}",
            new.status
        )));
    }
    let id = new.identifier.as_str();
    if id.trim().is_empty() {
        return Err(invalid("identifier is empty".to_string()));
    }
    let bad_char = |c: char| SprintStatus::is_reserved_char(c) || c == '/' || c == '\\';
    if id.chars().any(bad_char) {
        return Err(invalid(
            "identifier contains a reserved character (! + @ ~ / \\)".to_string(),
        ));
    }
    if let Some(desc) = new.description.as_deref().filter(|d| !d.is_empty()) {
        if desc.chars().any(bad_char) {
            return Err(invalid(
                "description contains a reserved character (! + @ ~ / \\)".to_string(),
            ));
        }
        if desc.contains('_') {
            return Err(invalid("description must not contain '_'".to_string()));
        }
        if desc.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid(
                "an all-digit description would be read back as part of the identifier"
                    .to_string(),
            ));
        }
    }
    // The identifier must survive a decode of its own folder name.
    let name = folder::encode(new.status, id, new.description.as_deref());
    let decoded = FolderName::decode(&name)?;
    if decoded.identifier != id {
        return Err(invalid(format!(
            "identifier would be read back as '{}'",
            decoded.identifier
        )));
    }
    Ok(())
}

/// Create a sprint directory in Ready or Planning status.
pub fn create_sprint(sprints_dir: &Path, new: NewSprint, cancel: &CancelToken) -> Result<Sprint> {
    validate_new(&new)?;

    let existing = list_sprints(sprints_dir, cancel)?;
    if existing
        .iter()
        .any(|s| s.identifier.eq_ignore_ascii_case(&new.identifier))
    {
        return Err(GittaError::SprintExists(new.identifier));
    }

    let name = folder::encode(new.status, &new.identifier, new.description.as_deref());
    let dir = sprints_dir.join(&name);
    crate::io::ensure_dir(sprints_dir)?;
    std::fs::create_dir(&dir).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AlreadyExists {
            GittaError::SprintExists(new.identifier.clone())
        } else {
            GittaError::io("create sprint directory", &dir, e)
        }
    })?;

    status_file::write(&dir, new.status)?;
    if !new.meta.is_empty() {
        new.meta.save(&dir)?;
    }
    tracing::debug!(sprint = %name, "created sprint");
    Ok(Sprint::from_dir(&dir))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn new_sprint(id: &str, desc: Option<&str>, status: SprintStatus) -> NewSprint {
        NewSprint {
            identifier: id.to_string(),
            description: desc.map(str::to_string),
            status,
            meta: SprintMeta::default(),
        }
    }

    #[test]
    fn missing_root_lists_nothing() {
        let dir = TempDir::new().unwrap();
        let sprints = list_sprints(&dir.path().join("sprints"), &CancelToken::new()).unwrap();
        assert!(sprints.is_empty());
    }

    #[test]
    fn list_skips_hidden_pointer_and_files() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("+Sprint_2")).unwrap();
        std::fs::create_dir_all(root.join("!Sprint_1")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("Current.txt"), "!Sprint_1\n").unwrap();
        std::fs::write(root.join("notes.md"), "hi").unwrap();

        let sprints = list_sprints(root, &CancelToken::new()).unwrap();
        let names: Vec<&str> = sprints.iter().map(|s| s.folder_name.as_str()).collect();
        assert_eq!(names, vec!["!Sprint_1", "+Sprint_2"]);
    }

    #[test]
    fn list_keeps_both_status_views() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("!Sprint_4_Search");
        std::fs::create_dir_all(&path).unwrap();
        status_file::write(&path, SprintStatus::Ready).unwrap();

        let sprints = list_sprints(dir.path(), &CancelToken::new()).unwrap();
        let s = &sprints[0];
        assert_eq!(s.identifier, "Sprint_4");
        assert_eq!(s.description.as_deref(), Some("Search"));
        assert_eq!(s.name_status, SprintStatus::Active);
        assert_eq!(s.file_status, Some(SprintStatus::Ready));
        assert_eq!(s.status(), SprintStatus::Ready);
        assert!(!s.is_consistent());
    }

    #[test]
    fn corrupt_status_file_does_not_abort_listing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("+Sprint_1");
        std::fs::create_dir_all(path.join(".gitta")).unwrap();
        std::fs::write(paths::status_path(&path), "???\n").unwrap();

        let sprints = list_sprints(dir.path(), &CancelToken::new()).unwrap();
        assert_eq!(sprints[0].file_status, None);
        assert_eq!(sprints[0].status(), SprintStatus::Ready);
    }

    #[test]
    fn cancelled_listing_stops() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("+Sprint_1")).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            list_sprints(dir.path(), &cancel),
            Err(GittaError::Cancelled)
        ));
    }

    #[test]
    fn find_prefers_first_match_and_filters_status() {
        let dir = TempDir::new().unwrap();
        for name in ["!Sprint_10", "+Sprint_11", "@Sprint_12"] {
            std::fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        let sprints = list_sprints(dir.path(), &CancelToken::new()).unwrap();
        let pending = [SprintStatus::Ready, SprintStatus::Planning];

        let found = find_sprint(&sprints, "sprint_1", &pending).unwrap();
        assert_eq!(found.identifier, "Sprint_11");

        let found = find_sprint(&sprints, "12", &pending).unwrap();
        assert_eq!(found.identifier, "Sprint_12");

        assert!(matches!(
            find_sprint(&sprints, "10", &pending),
            Err(GittaError::SprintNotFound(_))
        ));
    }

    #[test]
    fn find_rejects_blank_query() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("+Sprint_1")).unwrap();
        let sprints = list_sprints(dir.path(), &CancelToken::new()).unwrap();
        let pending = [SprintStatus::Ready, SprintStatus::Planning];

        for query in ["", "   "] {
            let err = find_sprint(&sprints, query, &pending).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
    }

    #[test]
    fn find_selects_by_folder_prefix_not_status_file() {
        let dir = TempDir::new().unwrap();
        let stuck = dir.path().join("+Sprint_2");
        std::fs::create_dir_all(stuck.join(".gitta")).unwrap();
        std::fs::write(paths::status_path(&stuck), "archived\n").unwrap();
        let sprints = list_sprints(dir.path(), &CancelToken::new()).unwrap();

        let found = find_sprint(&sprints, "sprint_2", &[SprintStatus::Ready]).unwrap();
        assert_eq!(found.file_status, Some(SprintStatus::Archived));
    }

    #[test]
    fn create_writes_folder_status_and_meta() {
        let dir = TempDir::new().unwrap();
        let mut new = new_sprint("Sprint_3", Some("Billing"), SprintStatus::Planning);
        new.meta = SprintMeta {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 2),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 13),
            duration: Some("2w".to_string()),
        };
        let sprint = create_sprint(dir.path(), new, &CancelToken::new()).unwrap();

        assert_eq!(sprint.folder_name, "@Sprint_3_Billing");
        assert_eq!(sprint.file_status, Some(SprintStatus::Planning));
        assert_eq!(sprint.meta.duration.as_deref(), Some("2w"));
        assert_eq!(sprint.meta.start_date, NaiveDate::from_ymd_opt(2026, 3, 2));
    }

    #[test]
    fn create_rejects_duplicates_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        create_sprint(dir.path(), new_sprint("Sprint_1", None, SprintStatus::Ready), &cancel)
            .unwrap();
        let err = create_sprint(
            dir.path(),
            new_sprint("sprint_1", Some("Again"), SprintStatus::Planning),
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn create_rejects_names_that_do_not_decode_back() {
        let dir = TempDir::new().unwrap();
        let cancel = CancelToken::new();
        let bad = [
            new_sprint("", None, SprintStatus::Ready),
            new_sprint("Sprint!", None, SprintStatus::Ready),
            new_sprint("Sprint_1", Some("two_words"), SprintStatus::Ready),
            new_sprint("Sprint", Some("42"), SprintStatus::Ready),
            new_sprint("my_sprint", None, SprintStatus::Ready),
            new_sprint("Sprint_1", None, SprintStatus::Active),
        ];
        for new in bad {
            let err = create_sprint(dir.path(), new.clone(), &cancel).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{new:?}");
        }
        assert!(list_sprints(dir.path(), &cancel).unwrap().is_empty());
    }

    #[test]
    fn next_identifier_follows_highest() {
        let dir = TempDir::new().unwrap();
        for name in ["~Sprint_2", "!Sprint_7_Launch", "+Hotfix"] {
            std::fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        let sprints = list_sprints(dir.path(), &CancelToken::new()).unwrap();
        assert_eq!(next_sprint_identifier(&sprints, "Sprint"), "Sprint_8");
        assert_eq!(next_sprint_identifier(&[], "Sprint"), "Sprint_1");
    }
}
