use crate::error::{GittaError, IoContext, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// LockConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_lock_timeout() -> u64 {
    5_000
}

fn default_poll_interval() -> u64 {
    10
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl LockConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ---------------------------------------------------------------------------
// IdConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> u64 {
    100
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_sprints_dir")]
    pub sprints_dir: PathBuf,
    #[serde(default = "default_sprint_prefix")]
    pub sprint_prefix: String,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub ids: IdConfig,
}

fn default_version() -> u32 {
    1
}

fn default_sprints_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_SPRINTS_DIR)
}

fn default_sprint_prefix() -> String {
    "Sprint".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            sprints_dir: default_sprints_dir(),
            sprint_prefix: default_sprint_prefix(),
            lock: LockConfig::default(),
            ids: IdConfig::default(),
        }
    }
}

impl Config {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(GittaError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path).io_ctx("read", &path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Like [`Config::load`], but an uninitialised repository gets defaults.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(GittaError::NotInitialized) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Absolute location of the sprints root for the repository at `root`.
    pub fn sprints_path(&self, root: &Path) -> PathBuf {
        root.join(&self.sprints_dir)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut push = |level: WarnLevel, message: String| {
            warnings.push(ConfigWarning { level, message });
        };

        if self.sprints_dir.is_absolute() {
            push(
                WarnLevel::Warning,
                format!(
                    "sprints_dir '{}' is absolute; it will not move with the repository",
                    self.sprints_dir.display()
                ),
            );
        }
        if self.sprint_prefix.trim().is_empty() {
            push(WarnLevel::Error, "sprint_prefix is empty".to_string());
        }
        if self.lock.timeout_ms == 0 {
            push(
                WarnLevel::Error,
                "lock.timeout_ms is 0; every contended id request will time out".to_string(),
            );
        }
        if self.lock.poll_interval_ms == 0 {
            push(
                WarnLevel::Warning,
                "lock.poll_interval_ms is 0; waiting for the lock will spin".to_string(),
            );
        } else if self.lock.poll_interval_ms > self.lock.timeout_ms {
            push(
                WarnLevel::Warning,
                format!(
                    "lock.poll_interval_ms ({}) exceeds lock.timeout_ms ({})",
                    self.lock.poll_interval_ms, self.lock.timeout_ms
                ),
            );
        }
        if self.ids.max_attempts == 0 {
            push(
                WarnLevel::Error,
                "ids.max_attempts is 0; id generation can never succeed".to_string(),
            );
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let yaml = serde_yaml::to_string(&cfg).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.sprints_dir, PathBuf::from("sprints"));
        assert_eq!(parsed.version, 1);
        assert_eq!(parsed.lock.timeout_ms, 5_000);
        assert_eq!(parsed.ids.max_attempts, 3);
    }

    #[test]
    fn sparse_yaml_fills_defaults() {
        let cfg: Config = serde_yaml::from_str("sprints_dir: planning/sprints\n").unwrap();
        assert_eq!(cfg.sprints_dir, PathBuf::from("planning/sprints"));
        assert_eq!(cfg.sprint_prefix, "Sprint");
        assert_eq!(cfg.lock.poll_interval_ms, 10);
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Config::load(dir.path()),
            Err(GittaError::NotInitialized)
        ));
        let cfg = Config::load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.sprints_path(dir.path()), dir.path().join("sprints"));
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::default();
        cfg.ids.max_attempts = 5;
        cfg.save(dir.path()).unwrap();
        assert_eq!(Config::load(dir.path()).unwrap().ids.max_attempts, 5);
    }

    #[test]
    fn default_config_has_no_warnings() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_bad_lock_settings() {
        let mut cfg = Config::default();
        cfg.lock.timeout_ms = 0;
        cfg.ids.max_attempts = 0;
        let warnings = cfg.validate();
        assert_eq!(
            warnings
                .iter()
                .filter(|w| w.level == WarnLevel::Error)
                .count(),
            2
        );
        assert!(warnings
            .iter()
            .any(|w| w.message.contains("exceeds lock.timeout_ms")));
    }
}
