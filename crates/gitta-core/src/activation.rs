//! Sprint activation and manual archival.
//!
//! Every status change writes the sidecar file first and renames the folder
//! second. An interruption between the two leaves the sidecar ahead of the
//! folder name, which the doctor detects and repairs. Nothing is rolled back.

use crate::cancel::CancelToken;
use crate::error::{ActivationStep, GittaError, Result};
use crate::pointer::{self, PointerMechanism};
use crate::sprint::{self, Sprint};
use crate::status_file;
use crate::transition;
use crate::types::SprintStatus;
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ActivationOutcome {
    pub activated: Sprint,
    pub archived: Vec<Sprint>,
    pub pointer: PointerMechanism,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub archived: Sprint,
    pub pointer_cleared: bool,
}

/// Activate the first Ready or Planning sprint whose identifier contains
/// `query`, archiving whichever sprint is active now.
pub fn activate_sprint(
    sprints_dir: &Path,
    query: &str,
    cancel: &CancelToken,
) -> Result<ActivationOutcome> {
    let sprints = sprint::list_sprints(sprints_dir, cancel)?;
    let target = sprint::find_sprint(
        &sprints,
        query,
        &[SprintStatus::Ready, SprintStatus::Planning],
    )?;

    let current = status_file::read(&target.path)?;
    transition::validate(current, SprintStatus::Active)?;

    let previous = confirmed_active(&sprints, &target.path)?;
    cancel.check()?;

    // Mutations start here; no further cancellation points until done.
    let mut archived = Vec::with_capacity(previous.len());
    for old in previous {
        let path = move_to_status(
            old,
            SprintStatus::Archived,
            ActivationStep::ArchiveStatus,
            ActivationStep::ArchiveRename,
        )?;
        tracing::info!(sprint = %old.identifier, "archived previously active sprint");
        archived.push(Sprint::from_dir(&path));
    }

    let durable_archive = describe_archived(&archived);
    let new_path = move_to_status(
        target,
        SprintStatus::Active,
        ActivationStep::ActivateStatus,
        ActivationStep::ActivateRename,
    )
    .map_err(|e| prepend_durable(e, &durable_archive))?;

    let mechanism = pointer::set(sprints_dir, &new_path).map_err(|e| GittaError::Activation {
        step: ActivationStep::UpdatePointer,
        durable: format!(
            "{}'{}' is active at {}; rerun activation or fix the Current pointer by hand",
            durable_archive,
            target.identifier,
            new_path.display()
        ),
        source: Box::new(e),
    })?;
    tracing::info!(sprint = %target.identifier, %mechanism, "activated sprint");

    Ok(ActivationOutcome {
        activated: Sprint::from_dir(&new_path),
        archived,
        pointer: mechanism,
    })
}

/// Archive the first non-archived sprint whose identifier contains `query`.
pub fn archive_sprint(
    sprints_dir: &Path,
    query: &str,
    cancel: &CancelToken,
) -> Result<ArchiveOutcome> {
    let sprints = sprint::list_sprints(sprints_dir, cancel)?;
    let target = sprint::find_sprint(
        &sprints,
        query,
        &[
            SprintStatus::Active,
            SprintStatus::Ready,
            SprintStatus::Planning,
        ],
    )?;

    let current = status_file::read(&target.path)?;
    transition::validate(current, SprintStatus::Archived)?;
    cancel.check()?;

    let was_current = pointer::resolve(sprints_dir)
        .map(|p| p.target == target.path)
        .unwrap_or(false);

    let new_path = move_to_status(
        target,
        SprintStatus::Archived,
        ActivationStep::ArchiveStatus,
        ActivationStep::ArchiveRename,
    )?;

    let pointer_cleared = was_current
        && match pointer::clear(sprints_dir) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "archived sprint but could not clear the Current pointer");
                false
            }
        };
    tracing::info!(sprint = %target.identifier, "archived sprint");

    Ok(ArchiveOutcome {
        archived: Sprint::from_dir(&new_path),
        pointer_cleared,
    })
}

/// Sprints other than `exclude` whose prefix says Active and whose status
/// file (or prefix, when there is none) agrees.
fn confirmed_active<'a>(sprints: &'a [Sprint], exclude: &Path) -> Result<Vec<&'a Sprint>> {
    let mut found = Vec::new();
    for s in sprints {
        if s.path == exclude || s.name_status != SprintStatus::Active {
            continue;
        }
        match status_file::read(&s.path) {
            Ok(SprintStatus::Active) => found.push(s),
            Ok(other) => {
                tracing::warn!(
                    sprint = %s.folder_name,
                    status_file = %other,
                    "folder says active but status file disagrees; leaving it for the doctor"
                );
            }
            Err(GittaError::UndeterminedStatus(_)) => {}
            Err(e) => return Err(e),
        }
    }
    if found.len() > 1 {
        tracing::warn!(count = found.len(), "more than one active sprint; archiving all");
    }
    Ok(found)
}

/// Write `status` to the sidecar file, then rename the folder to match.
fn move_to_status(
    sprint: &Sprint,
    status: SprintStatus,
    status_step: ActivationStep,
    rename_step: ActivationStep,
) -> Result<PathBuf> {
    status_file::write(&sprint.path, status).map_err(|e| GittaError::Activation {
        step: status_step,
        durable: format!("nothing changed for '{}'", sprint.identifier),
        source: Box::new(e),
    })?;

    let new_name = sprint.folder().with_status(status).encode();
    let new_path = sprint
        .path
        .parent()
        .map(|p| p.join(&new_name))
        .unwrap_or_else(|| PathBuf::from(&new_name));
    if new_path == sprint.path {
        return Ok(new_path);
    }

    crate::io::rename_no_clobber(&sprint.path, &new_path).map_err(|e| {
        GittaError::Activation {
            step: rename_step,
            durable: format!(
                "status of '{}' is already {status} but its folder is still '{}'; run 'gitta doctor --fix'",
                sprint.identifier, sprint.folder_name
            ),
            source: Box::new(e),
        }
    })?;
    Ok(new_path)
}

fn describe_archived(archived: &[Sprint]) -> String {
    archived
        .iter()
        .map(|s| format!("'{}' is archived; ", s.identifier))
        .collect()
}

fn prepend_durable(err: GittaError, prefix: &str) -> GittaError {
    match err {
        GittaError::Activation {
            step,
            durable,
            source,
        } if !prefix.is_empty() => GittaError::Activation {
            step,
            durable: format!("{prefix}{durable}"),
            source,
        },
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
