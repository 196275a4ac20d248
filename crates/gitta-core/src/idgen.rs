//! Sequential, per-prefix identifiers (`US-1`, `US-2`, `BG-1`, ...) shared by
//! every process working on the same repository.
//!
//! The counter file is only ever read and rewritten while the advisory lock
//! is held. The whole acquire/read/increment/write/release cycle is retried
//! with exponential backoff when, and only when, the lock could not be
//! acquired in time.

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{ErrorKind, GittaError, IoContext, Result};
use crate::lock::{AdvisoryLock, MarkerLock};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Counter file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    #[serde(default)]
    pub counters: BTreeMap<String, u64>,
}

impl Counters {
    /// Missing or zero-byte file means no identifiers issued yet. Anything that
    /// does not parse is corruption.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(GittaError::io("read", path, e)),
        };
        if data.is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_slice(&data).map_err(|e| GittaError::CorruptCounters {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut data = serde_json::to_vec_pretty(self)?;
        data.push(b'\n');
        crate::io::atomic_write(path, &data)
    }

    pub fn last(&self, prefix: &str) -> u64 {
        self.counters.get(prefix).copied().unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub lock_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): doubles each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

// ---------------------------------------------------------------------------
// IdGenerator
// ---------------------------------------------------------------------------

pub struct IdGenerator<L: AdvisoryLock = MarkerLock> {
    counter_path: PathBuf,
    lock: L,
    policy: RetryPolicy,
}

impl IdGenerator<MarkerLock> {
    /// Generator for the repository at `root`, tuned by its configuration.
    pub fn for_repo(root: &Path, cfg: &Config) -> Self {
        let counter_path = paths::counters_path(root);
        let lock = MarkerLock::new(
            paths::lock_marker_path(&counter_path),
            cfg.lock.poll_interval(),
        );
        let policy = RetryPolicy {
            max_attempts: cfg.ids.max_attempts,
            initial_backoff: Duration::from_millis(cfg.ids.initial_backoff_ms),
            lock_timeout: cfg.lock.timeout(),
        };
        Self::new(counter_path, lock, policy)
    }
}

impl<L: AdvisoryLock> IdGenerator<L> {
    pub fn new(counter_path: impl Into<PathBuf>, lock: L, policy: RetryPolicy) -> Self {
        Self {
            counter_path: counter_path.into(),
            lock,
            policy,
        }
    }

    pub fn counter_path(&self) -> &Path {
        &self.counter_path
    }

    pub fn lock(&self) -> &L {
        &self.lock
    }

    /// Issue the next identifier for `prefix`, e.g. `US-7`.
    pub fn generate_next_id(&self, prefix: &str, cancel: &CancelToken) -> Result<String> {
        paths::validate_id_prefix(prefix)?;

        let mut attempt = 1;
        loop {
            cancel.check()?;
            match self.try_once(prefix, cancel) {
                Ok(value) => {
                    let id = format!("{prefix}-{value}");
                    tracing::debug!(%id, attempt, "issued id");
                    return Ok(id);
                }
                Err(e) if e.kind() == ErrorKind::LockTimeout && attempt < self.policy.max_attempts => {
                    let delay = self.policy.backoff(attempt);
                    tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "id lock busy; retrying");
                    cancel.sleep(delay)?;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn try_once(&self, prefix: &str, cancel: &CancelToken) -> Result<u64> {
        let guard = self.lock.acquire(self.policy.lock_timeout, cancel)?;
        let outcome = self.bump(prefix);
        match self.lock.release(guard) {
            Ok(()) => outcome,
            Err(release_err) => match outcome {
                // The id is already persisted; losing it would leave a gap.
                Ok(value) => {
                    tracing::warn!(error = %release_err, "issued id but could not release lock");
                    Ok(value)
                }
                Err(e) => {
                    tracing::warn!(error = %release_err, "could not release lock");
                    Err(e)
                }
            },
        }
    }

    fn bump(&self, prefix: &str) -> Result<u64> {
        let mut counters = Counters::load(&self.counter_path)?;
        let next = counters
            .last(prefix)
            .checked_add(1)
            .ok_or_else(|| GittaError::CorruptCounters {
                path: self.counter_path.clone(),
                reason: format!("counter for {prefix} overflowed"),
            })?;
        counters.counters.insert(prefix.to_string(), next);
        counters.save(&self.counter_path)?;
        Ok(next)
    }
}

/// Read-only snapshot of the counters, without taking the lock.
pub fn peek(root: &Path) -> Result<Counters> {
    Counters::load(&paths::counters_path(root))
}

/// Create the `.gitta` directory that holds the counter file.
pub fn ensure_counter_dir(root: &Path) -> Result<()> {
    let dir = paths::gitta_dir(root);
    std::fs::create_dir_all(&dir).io_ctx("create directory", &dir)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
