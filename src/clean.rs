//! Build artifact cleaning.

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::stage;

/// Clean all build outputs (preserves the tool cache).
pub fn clean_outputs(base_dir: &Path) -> Result<()> {
    let output_dir = stage::output_dir(base_dir);

    if output_dir.exists() {
        println!("Removing {}...", output_dir.display());
        fs::remove_dir_all(&output_dir)?;
    }

    println!("Clean complete (tool cache preserved).");
    Ok(())
}

/// Clean the installer stage tree only.
pub fn clean_deps(base_dir: &Path) -> Result<()> {
    let output_dir = stage::output_dir(base_dir);
    let tree = output_dir.join("stage-deps");
    let hash = output_dir.join(".deps-inputs.hash");

    let mut cleaned = false;

    if tree.exists() {
        println!("Removing installer stage tree...");
        fs::remove_dir_all(&tree)?;
        cleaned = true;
    }

    if hash.exists() {
        fs::remove_file(&hash)?;
        cleaned = true;
    }

    if cleaned {
        println!("Installer stage cleaned.");
    } else {
        println!("No installer stage artifacts to clean.");
    }

    Ok(())
}

/// Clean the rebuilder stage tree only.
pub fn clean_native(base_dir: &Path) -> Result<()> {
    let output_dir = stage::output_dir(base_dir);
    let tree = output_dir.join("stage-native");
    let hash = output_dir.join(".native-inputs.hash");

    let mut cleaned = false;

    if tree.exists() {
        println!("Removing rebuilder stage tree...");
        fs::remove_dir_all(&tree)?;
        cleaned = true;
    }

    if hash.exists() {
        fs::remove_file(&hash)?;
        cleaned = true;
    }

    if cleaned {
        println!("Rebuilder stage cleaned.");
    } else {
        println!("No rebuilder stage artifacts to clean.");
    }

    Ok(())
}

/// Clean the runtime filesystem and image config only.
pub fn clean_rootfs(base_dir: &Path) -> Result<()> {
    let output_dir = stage::output_dir(base_dir);
    let rootfs = output_dir.join("rootfs");
    let image_config = output_dir.join("image-config.json");
    let hash = output_dir.join(".runtime-inputs.hash");

    let mut cleaned = false;

    if rootfs.exists() {
        println!("Removing runtime filesystem...");
        fs::remove_dir_all(&rootfs)?;
        cleaned = true;
    }

    if image_config.exists() {
        println!("Removing image config...");
        fs::remove_file(&image_config)?;
        cleaned = true;
    }

    if hash.exists() {
        fs::remove_file(&hash)?;
        cleaned = true;
    }

    if cleaned {
        println!("Runtime artifacts cleaned.");
    } else {
        println!("No runtime artifacts to clean.");
    }

    Ok(())
}

/// Clean the artifact store only.
pub fn clean_store(base_dir: &Path) -> Result<()> {
    let store_dir = stage::output_dir(base_dir).join("store");

    if store_dir.exists() {
        println!("Removing artifact store...");
        fs::remove_dir_all(&store_dir)?;
        println!("Artifact store cleaned.");
    } else {
        println!("No artifact store to clean.");
    }

    Ok(())
}

/// Clean the pinned global tool cache (~/.cache/stevedore/tools).
pub fn clean_tool_cache(config: &Config) -> Result<()> {
    let prefix = config.tools_prefix();

    if prefix.exists() {
        println!("Removing tool cache ({})...", prefix.display());
        fs::remove_dir_all(&prefix)?;
        println!("Tool cache cleaned.");
    } else {
        println!("No tool cache to clean.");
    }

    Ok(())
}

/// Clean everything (outputs + tool cache).
pub fn clean_all(base_dir: &Path, config: &Config) -> Result<()> {
    clean_outputs(base_dir)?;
    clean_tool_cache(config)?;
    println!("\nFull clean complete.");
    Ok(())
}
