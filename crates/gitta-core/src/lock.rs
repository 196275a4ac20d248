//! Advisory cross-process locking.
//!
//! [`MarkerLock`] represents "locked" by the existence of a marker file,
//! created with `create_new` so exactly one process can win. There is no
//! owner tracking: a holder that dies without releasing leaves the marker in
//! place, and every later acquirer times out until it is removed by hand
//! (`gitta id unlock`).

use crate::cancel::CancelToken;
use crate::error::{GittaError, IoContext, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A mutual-exclusion primitive shared by cooperating processes.
pub trait AdvisoryLock {
    type Guard;

    /// Block until the lock is held, `timeout` elapses (`LockTimeout`), or
    /// `cancel` fires (`Cancelled`).
    fn acquire(&self, timeout: Duration, cancel: &CancelToken) -> Result<Self::Guard>;

    fn release(&self, guard: Self::Guard) -> Result<()>;
}

// ---------------------------------------------------------------------------
// MarkerLock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MarkerLock {
    marker: PathBuf,
    poll_interval: Duration,
}

/// Proof of holding a [`MarkerLock`]. Dropping it without calling
/// [`AdvisoryLock::release`] still removes the marker, best effort.
#[derive(Debug)]
pub struct MarkerGuard {
    marker: PathBuf,
    released: bool,
}

impl MarkerLock {
    pub fn new(marker: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            marker: marker.into(),
            poll_interval,
        }
    }

    pub fn marker(&self) -> &Path {
        &self.marker
    }

    pub fn is_held(&self) -> bool {
        self.marker.exists()
    }

    /// Delete a leftover marker regardless of who created it. Returns whether
    /// a marker was present.
    pub fn force_release(&self) -> Result<bool> {
        match std::fs::remove_file(&self.marker) {
            Ok(()) => {
                tracing::warn!(marker = %self.marker.display(), "removed lock marker by force");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GittaError::io("remove lock marker", &self.marker, e)),
        }
    }

    fn try_create(&self) -> Result<bool> {
        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.marker)
        {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(GittaError::io("create lock marker", &self.marker, e)),
        }
    }
}

impl AdvisoryLock for MarkerLock {
    type Guard = MarkerGuard;

    fn acquire(&self, timeout: Duration, cancel: &CancelToken) -> Result<MarkerGuard> {
        if let Some(parent) = self.marker.parent() {
            std::fs::create_dir_all(parent).io_ctx("create directory", parent)?;
        }
        let started = Instant::now();
        loop {
            cancel.check()?;
            if self.try_create()? {
                tracing::debug!(marker = %self.marker.display(), "lock acquired");
                return Ok(MarkerGuard {
                    marker: self.marker.clone(),
                    released: false,
                });
            }
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(GittaError::LockTimeout {
                    path: self.marker.clone(),
                    waited,
                });
            }
            cancel.sleep(self.poll_interval.min(timeout - waited))?;
        }
    }

    fn release(&self, mut guard: MarkerGuard) -> Result<()> {
        guard.released = true;
        std::fs::remove_file(&guard.marker).io_ctx("remove lock marker", &guard.marker)
    }
}

impl Drop for MarkerGuard {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = std::fs::remove_file(&self.marker) {
                tracing::warn!(marker = %self.marker.display(), error = %e, "failed to remove lock marker on drop");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
