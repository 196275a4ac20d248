use crate::output::print_json;
use anyhow::Context;
use gitta_core::{config::Config, idgen, io, paths};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    idgen::ensure_counter_dir(root).context("failed to create .gitta directory")?;

    // Write config.yaml if missing; an existing one decides the sprints dir.
    let config_path = paths::config_path(root);
    let created_config = !config_path.exists();
    let cfg = if created_config {
        let cfg = Config::default();
        cfg.save(root).context("failed to write config.yaml")?;
        cfg
    } else {
        Config::load(root).context("failed to load config.yaml")?
    };

    let sprints = cfg.sprints_path(root);
    io::ensure_dir(&sprints)
        .with_context(|| format!("failed to create {}", sprints.display()))?;

    if json {
        return print_json(&serde_json::json!({
            "root": root,
            "config_created": created_config,
            "sprints_dir": sprints,
        }));
    }

    println!("Initializing gitta in: {}", root.display());
    if created_config {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    println!("  sprints: {}", cfg.sprints_dir.display());
    Ok(())
}
