//! Show command - displays information.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::rebuild;
use crate::stage;
use crate::store::ArtifactStore;

/// Show target for the show command.
pub enum ShowTarget {
    /// Show configuration
    Config,
    /// Show build status (what needs rebuilding)
    Status,
}

/// Execute the show command.
pub fn cmd_show(base_dir: &Path, target: ShowTarget, config: &Config) -> Result<()> {
    match target {
        ShowTarget::Config => {
            config.print();
        }
        ShowTarget::Status => show_status(base_dir, config)?,
    }
    Ok(())
}

fn show_status(base_dir: &Path, config: &Config) -> Result<()> {
    let store = ArtifactStore::open(&stage::output_dir(base_dir))?;

    println!("Build status:");

    let stage_line = |name: &str, stale: bool| {
        if stale {
            println!("  {}: NEEDS REBUILD", name);
        } else {
            println!("  {}: up to date", name);
        }
    };

    stage_line(
        "Installer stage",
        rebuild::deps_needs_rebuild(base_dir, config),
    );
    stage_line(
        "Native rebuild",
        rebuild::native_needs_rebuild(base_dir, &store),
    );
    stage_line(
        "Runtime assembly",
        rebuild::runtime_needs_rebuild(base_dir, &store),
    );

    let records: Vec<_> = store.records().collect();
    if records.is_empty() {
        println!("\nNo published artifacts. Run 'stevedore build' to start.");
    } else {
        println!("\nPublished artifacts:");
        for record in records {
            println!("  {} ({})", record.name, &record.hash[..12]);
        }
    }

    let image_config = stage::output_dir(base_dir).join("image-config.json");
    if image_config.exists() {
        println!("\nImage config: {}", image_config.display());
    }

    Ok(())
}
