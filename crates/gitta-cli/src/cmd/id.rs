use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use gitta_core::{config::Config, idgen::IdGenerator, CancelToken};
use std::path::Path;

#[derive(Subcommand)]
pub enum IdSubcommand {
    /// Issue the next identifier for a two-letter prefix, e.g. US
    Next { prefix: String },

    /// Remove a lock marker left behind by a crashed process
    Unlock,
}

pub fn run(
    root: &Path,
    subcmd: IdSubcommand,
    cancel: &CancelToken,
    json: bool,
) -> anyhow::Result<()> {
    let cfg = Config::load_or_default(root).context("failed to load config")?;
    let ids = IdGenerator::for_repo(root, &cfg);

    match subcmd {
        IdSubcommand::Next { prefix } => {
            let id = ids
                .generate_next_id(&prefix, cancel)
                .with_context(|| format!("failed to issue an id for '{prefix}'"))?;
            if json {
                print_json(&serde_json::json!({ "id": id }))?;
            } else {
                println!("{id}");
            }
        }
        IdSubcommand::Unlock => {
            let removed = ids.lock().force_release().context("failed to remove lock")?;
            if json {
                print_json(&serde_json::json!({
                    "marker": ids.lock().marker(),
                    "removed": removed,
                }))?;
            } else if removed {
                println!("Removed {}", ids.lock().marker().display());
            } else {
                println!("No lock marker present.");
            }
        }
    }
    Ok(())
}
