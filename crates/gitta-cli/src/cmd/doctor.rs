use crate::output::{print_json, print_table};
use anyhow::Context;
use gitta_core::{config::Config, doctor, CancelToken};
use std::path::Path;

pub fn run(root: &Path, fix: bool, cancel: &CancelToken, json: bool) -> anyhow::Result<()> {
    let cfg = Config::load_or_default(root).context("failed to load config")?;
    let sprints_dir = cfg.sprints_path(root);

    let found = doctor::detect(&sprints_dir, cancel).context("consistency scan failed")?;
    let repair = if fix && !found.is_empty() {
        Some(doctor::repair(&found))
    } else {
        None
    };

    if json {
        print_json(&serde_json::json!({
            "inconsistencies": found,
            "repair": repair,
        }))?;
    } else if found.is_empty() {
        println!("All sprint folders agree with their status files.");
    } else {
        let rows: Vec<Vec<String>> = found
            .iter()
            .map(|inc| {
                vec![
                    inc.path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    inc.name_status.to_string(),
                    inc.file_status.to_string(),
                    inc.expected_name.clone(),
                ]
            })
            .collect();
        print_table(&["FOLDER", "NAME SAYS", "FILE SAYS", "EXPECTED"], rows);

        match &repair {
            Some(r) => {
                println!("\nRepaired {} folder(s), {} failed.", r.repaired, r.failed);
                for f in &r.errors {
                    println!("  {}: {}", f.path.display(), f.error);
                }
            }
            None => println!("\nRun 'gitta doctor --fix' to rename them."),
        }
    }

    match repair {
        None if !found.is_empty() => {
            anyhow::bail!("{} inconsistent sprint folder(s)", found.len())
        }
        Some(r) if r.failed > 0 => anyhow::bail!("{} repair(s) failed", r.failed),
        _ => Ok(()),
    }
}
