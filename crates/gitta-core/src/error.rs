use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Coarse classification of every [`GittaError`], for callers that need to
/// branch on the category of a failure (retry, report, suggest a repair).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    Corruption,
    LockTimeout,
    IllegalTransition,
    IoFailure,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Corruption => "corruption",
            ErrorKind::LockTimeout => "lock_timeout",
            ErrorKind::IllegalTransition => "illegal_transition",
            ErrorKind::IoFailure => "io_failure",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ActivationStep
// ---------------------------------------------------------------------------

/// The mutating steps of activation and archival, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationStep {
    ArchiveStatus,
    ArchiveRename,
    ActivateStatus,
    ActivateRename,
    UpdatePointer,
}

impl fmt::Display for ActivationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActivationStep::ArchiveStatus => "writing the archived status",
            ActivationStep::ArchiveRename => "renaming the folder to its archived name",
            ActivationStep::ActivateStatus => "writing the active status",
            ActivationStep::ActivateRename => "renaming the folder to its active name",
            ActivationStep::UpdatePointer => "updating the Current pointer",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// GittaError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GittaError {
    #[error("not initialized: run 'gitta init'")]
    NotInitialized,

    #[error("sprint not found: {0}")]
    SprintNotFound(String),

    #[error("sprint already exists: {0}")]
    SprintExists(String),

    #[error("no Current pointer in {}", .0.display())]
    NoCurrentPointer(PathBuf),

    #[error("cannot rename to {}: destination already exists", .0.display())]
    DestinationExists(PathBuf),

    #[error("invalid id prefix '{0}': must be exactly two uppercase letters (A-Z)")]
    InvalidPrefix(String),

    #[error("invalid sprint folder name '{name}': {reason}")]
    InvalidFolderName { name: String, reason: String },

    #[error("sprint query is empty")]
    EmptyQuery,

    #[error("invalid sprint status '{0}': expected active, ready, planning or archived")]
    InvalidStatus(String),

    #[error("cannot determine status of {}: no status file and no status prefix", .0.display())]
    UndeterminedStatus(PathBuf),

    #[error("corrupt status file {}: unrecognized token '{token}'", .path.display())]
    CorruptStatus { path: PathBuf, token: String },

    #[error("corrupt counter file {}: {reason}", .path.display())]
    CorruptCounters { path: PathBuf, reason: String },

    #[error(
        "timed out after {}ms waiting for lock {}; check for a competing gitta process \
         or remove a stale marker with 'gitta id unlock'",
        .waited.as_millis(),
        .path.display()
    )]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("invalid transition from {from} to {to}: {reason}")]
    IllegalTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{step} failed: {source}; {durable}")]
    Activation {
        step: ActivationStep,
        durable: String,
        #[source]
        source: Box<GittaError>,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl GittaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GittaError::NotInitialized
            | GittaError::SprintNotFound(_)
            | GittaError::NoCurrentPointer(_) => ErrorKind::NotFound,
            GittaError::SprintExists(_) | GittaError::DestinationExists(_) => {
                ErrorKind::AlreadyExists
            }
            GittaError::InvalidPrefix(_)
            | GittaError::InvalidFolderName { .. }
            | GittaError::InvalidStatus(_)
            | GittaError::EmptyQuery
            | GittaError::UndeterminedStatus(_) => ErrorKind::InvalidInput,
            GittaError::CorruptStatus { .. }
            | GittaError::CorruptCounters { .. }
            | GittaError::Yaml(_)
            | GittaError::Json(_) => ErrorKind::Corruption,
            GittaError::LockTimeout { .. } => ErrorKind::LockTimeout,
            GittaError::IllegalTransition { .. } => ErrorKind::IllegalTransition,
            GittaError::Io { .. } => ErrorKind::IoFailure,
            GittaError::Cancelled => ErrorKind::Cancelled,
            GittaError::Activation { source, .. } => source.kind(),
        }
    }

    pub(crate) fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        GittaError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Attach the operation and path to a bare `std::io::Error`.
pub(crate) trait IoContext<T> {
    fn io_ctx(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_ctx(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|e| GittaError::io(op, path, e))
    }
}

pub type Result<T> = std::result::Result<T, GittaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_error_takes_kind_of_cause() {
        let err = GittaError::Activation {
            step: ActivationStep::ArchiveRename,
            durable: "status of 'S1' already set to archived".to_string(),
            source: Box::new(GittaError::DestinationExists(PathBuf::from("/tmp/~S1"))),
        };
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        let msg = err.to_string();
        assert!(msg.contains("renaming the folder to its archived name"));
        assert!(msg.contains("already set to archived"));
    }

    #[test]
    fn lock_timeout_message_suggests_unlock() {
        let err = GittaError::LockTimeout {
            path: PathBuf::from(".gitta/id-counters.json.lock"),
            waited: Duration::from_millis(250),
        };
        assert_eq!(err.kind(), ErrorKind::LockTimeout);
        assert!(err.to_string().contains("gitta id unlock"));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn io_context_keeps_path_and_op() {
        let res: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.io_ctx("rename", Path::new("sprints/!S1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IoFailure);
        assert_eq!(err.to_string(), "rename sprints/!S1: denied");
    }
}
