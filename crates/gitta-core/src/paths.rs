use crate::error::{GittaError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const GITTA_DIR: &str = ".gitta";
pub const CONFIG_FILE: &str = ".gitta/config.yaml";
pub const COUNTERS_FILE: &str = ".gitta/id-counters.json";
pub const DEFAULT_SPRINTS_DIR: &str = "sprints";

/// Sidecar files, relative to a sprint directory.
pub const STATUS_FILE: &str = ".gitta/status";
pub const SPRINT_META_FILE: &str = ".gitta/sprint.yaml";

/// Current pointer names, relative to the sprints root.
pub const CURRENT_POINTER: &str = "Current";
pub const CURRENT_POINTER_TEXT: &str = "Current.txt";
pub const LEGACY_CURRENT_POINTER: &str = ".current-sprint";

pub const LOCK_SUFFIX: &str = ".lock";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn gitta_dir(root: &Path) -> PathBuf {
    root.join(GITTA_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn counters_path(root: &Path) -> PathBuf {
    root.join(COUNTERS_FILE)
}

/// `<counter file>.lock`, next to the file it guards.
pub fn lock_marker_path(guarded: &Path) -> PathBuf {
    let mut name = guarded.as_os_str().to_owned();
    name.push(LOCK_SUFFIX);
    PathBuf::from(name)
}

pub fn status_path(sprint_dir: &Path) -> PathBuf {
    sprint_dir.join(STATUS_FILE)
}

pub fn sprint_meta_path(sprint_dir: &Path) -> PathBuf {
    sprint_dir.join(SPRINT_META_FILE)
}

/// True for names the sprint scanners must never treat as sprints.
pub fn is_pointer_name(name: &str) -> bool {
    name == CURRENT_POINTER || name == CURRENT_POINTER_TEXT || name == LEGACY_CURRENT_POINTER
}

// ---------------------------------------------------------------------------
// Id prefix validation
// ---------------------------------------------------------------------------

static PREFIX_RE: OnceLock<Regex> = OnceLock::new();

fn prefix_re() -> &'static Regex {
    PREFIX_RE.get_or_init(|| Regex::new(r"^[A-Z]{2}$").unwrap())
}

pub fn validate_id_prefix(prefix: &str) -> Result<()> {
    if !prefix_re().is_match(prefix) {
        return Err(GittaError::InvalidPrefix(prefix.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
