use crate::output::{print_json, print_table};
use anyhow::Context;
use chrono::NaiveDate;
use clap::Subcommand;
use gitta_core::{
    activation,
    config::Config,
    pointer,
    sprint::{self, NewSprint, Sprint, SprintMeta},
    transition,
    types::SprintStatus,
    CancelToken,
};
use std::path::Path;

#[derive(Subcommand)]
pub enum SprintSubcommand {
    /// List all sprints
    List,
    /// Create a sprint in ready (default) or planning status
    Create {
        /// Identifier, e.g. Sprint_12 (default: next in sequence)
        identifier: Option<String>,
        /// Short description appended to the folder name
        #[arg(long)]
        description: Option<String>,
        /// Create in planning status instead of ready
        #[arg(long)]
        planning: bool,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Free-form duration, e.g. 2w
        #[arg(long)]
        duration: Option<String>,
    },
    /// Activate a ready or planning sprint, archiving the active one
    Activate {
        /// Case-insensitive part of the sprint identifier
        query: String,
    },
    /// Archive a sprint
    Archive {
        /// Case-insensitive part of the sprint identifier
        query: String,
    },
    /// Show where the Current pointer leads
    Current,
    /// Check whether a status transition is allowed
    Check { from: SprintStatus, to: SprintStatus },
}

pub fn run(
    root: &Path,
    subcmd: SprintSubcommand,
    cancel: &CancelToken,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = Config::load_or_default(root).context("failed to load config")?;
    let sprints_dir = cfg.sprints_path(root);

    match subcmd {
        SprintSubcommand::List => list(&sprints_dir, cancel, json),
        SprintSubcommand::Create {
            identifier,
            description,
            planning,
            start,
            end,
            duration,
        } => {
            let status = if planning {
                SprintStatus::Planning
            } else {
                SprintStatus::Ready
            };
            let meta = SprintMeta {
                start_date: start,
                end_date: end,
                duration,
            };
            create(&cfg, &sprints_dir, identifier, description, status, meta, cancel, json)
        }
        SprintSubcommand::Activate { query } => activate(&sprints_dir, &query, cancel, json),
        SprintSubcommand::Archive { query } => archive(&sprints_dir, &query, cancel, json),
        SprintSubcommand::Current => current(&sprints_dir, json),
        SprintSubcommand::Check { from, to } => check(from, to, json),
    }
}

fn list(sprints_dir: &Path, cancel: &CancelToken, json: bool) -> anyhow::Result<()> {
    let sprints = sprint::list_sprints(sprints_dir, cancel).context("failed to list sprints")?;

    if json {
        return print_json(&sprints);
    }

    if sprints.is_empty() {
        println!("No sprints. Create one with: gitta sprint create");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = sprints
        .iter()
        .map(|s| {
            let status = if s.is_consistent() {
                s.status().to_string()
            } else {
                format!("{} (folder: {})", s.status(), s.name_status)
            };
            vec![
                s.identifier.clone(),
                s.description.clone().unwrap_or_default(),
                status,
                date_range(s),
            ]
        })
        .collect();
    print_table(&["ID", "DESCRIPTION", "STATUS", "DATES"], rows);

    if sprints.iter().any(|s| !s.is_consistent()) {
        println!("\nSome folders disagree with their status files. Run: gitta doctor --fix");
    }
    Ok(())
}

fn date_range(s: &Sprint) -> String {
    match (s.meta.start_date, s.meta.end_date) {
        (Some(a), Some(b)) => format!("{a} .. {b}"),
        (Some(a), None) => format!("from {a}"),
        (None, Some(b)) => format!("until {b}"),
        (None, None) => s.meta.duration.clone().unwrap_or_default(),
    }
}

#[allow(clippy::too_many_arguments)]
fn create(
    cfg: &Config,
    sprints_dir: &Path,
    identifier: Option<String>,
    description: Option<String>,
    status: SprintStatus,
    meta: SprintMeta,
    cancel: &CancelToken,
    json: bool,
) -> anyhow::Result<()> {
    let identifier = match identifier {
        Some(id) => id,
        None => {
            let existing =
                sprint::list_sprints(sprints_dir, cancel).context("failed to list sprints")?;
            sprint::next_sprint_identifier(&existing, &cfg.sprint_prefix)
        }
    };

    let created = sprint::create_sprint(
        sprints_dir,
        NewSprint {
            identifier: identifier.clone(),
            description,
            status,
            meta,
        },
        cancel,
    )
    .with_context(|| format!("failed to create sprint '{identifier}'"))?;

    if json {
        return print_json(&created);
    }
    println!(
        "Created sprint '{}' ({}) at {}",
        created.identifier,
        created.status(),
        created.path.display()
    );
    Ok(())
}

fn activate(
    sprints_dir: &Path,
    query: &str,
    cancel: &CancelToken,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = activation::activate_sprint(sprints_dir, query, cancel)
        .with_context(|| format!("failed to activate sprint matching '{query}'"))?;

    if json {
        return print_json(&outcome);
    }
    for old in &outcome.archived {
        println!("Archived sprint '{}' -> {}", old.identifier, old.folder_name);
    }
    println!(
        "Activated sprint '{}' -> {}",
        outcome.activated.identifier, outcome.activated.folder_name
    );
    println!("  Current pointer: {}", outcome.pointer);
    Ok(())
}

fn archive(
    sprints_dir: &Path,
    query: &str,
    cancel: &CancelToken,
    json: bool,
) -> anyhow::Result<()> {
    let outcome = activation::archive_sprint(sprints_dir, query, cancel)
        .with_context(|| format!("failed to archive sprint matching '{query}'"))?;

    if json {
        return print_json(&outcome);
    }
    println!(
        "Archived sprint '{}' -> {}",
        outcome.archived.identifier, outcome.archived.folder_name
    );
    if outcome.pointer_cleared {
        println!("  Current pointer removed; no sprint is active.");
    }
    Ok(())
}

fn current(sprints_dir: &Path, json: bool) -> anyhow::Result<()> {
    let resolved = pointer::resolve(sprints_dir).context("no current sprint")?;
    let exists = resolved.target_exists();

    if json {
        return print_json(&serde_json::json!({
            "target": resolved.target,
            "mechanism": resolved.mechanism,
            "exists": exists,
        }));
    }
    println!("{}", resolved.target.display());
    if !exists {
        println!("  warning: the pointer is stale; re-run 'gitta sprint activate'");
    }
    Ok(())
}

fn check(from: SprintStatus, to: SprintStatus, json: bool) -> anyhow::Result<()> {
    let verdict = transition::validate(from, to);
    if json {
        print_json(&serde_json::json!({
            "from": from,
            "to": to,
            "allowed": verdict.is_ok(),
            "reason": verdict.as_ref().err().map(|e| e.to_string()),
        }))?;
    } else if verdict.is_ok() {
        println!("{from} -> {to}: allowed");
    }
    verdict.map_err(anyhow::Error::from)
}
