//! Installer stage: produce a pruned, deduplicated production dependency
//! tree and an SBOM describing it.
//!
//! The stage imports the application source into a private tree, runs
//! the declarative components in phase order, and publishes two
//! artifacts: the cleaned tree and the pre-rebuild copy of the native
//! module (the baseline the substitution check compares against).

use anyhow::{bail, Result};
use std::path::Path;

use crate::common::files::copy_tree;
use crate::config::Config;
use crate::pipeline::executor::{remove_dir_if_present, StageContext};
use crate::pipeline::{definitions, executor};
use crate::store::ArtifactStore;

use super::{output_dir, APP_TREE, NATIVE_MODULE_BASELINE};

/// Top-level source entries never imported into the stage tree.
const SOURCE_EXCLUDES: &[&str] = &["node_modules", ".git", "output"];

/// Run the installer stage.
pub fn run(base_dir: &Path, config: &Config, store: &mut ArtifactStore) -> Result<()> {
    if !config.has_app_source() {
        bail!(
            "No application source at {} (package.json missing). Set APP_SOURCE in .env.",
            config.app_source.display()
        );
    }

    let tree = output_dir(base_dir).join("stage-deps");

    // The source tree is immutable once copied in; a stale stage tree is
    // discarded rather than patched.
    remove_dir_if_present(&tree)?;
    println!("Importing source tree...");
    copy_tree(&config.app_source, &tree, SOURCE_EXCLUDES)?;

    let ctx = StageContext::new(tree.clone(), config);
    for component in definitions::all() {
        executor::execute(&ctx, component)?;
    }

    publish(config, store, &tree)
}

/// Publish the stage outputs to the artifact store.
pub fn publish(config: &Config, store: &mut ArtifactStore, tree: &Path) -> Result<()> {
    let module_dir = tree.join("node_modules").join(&config.native_module);
    if !module_dir.is_dir() {
        bail!(
            "Native module '{}' was not installed; cannot publish the baseline",
            config.native_module
        );
    }

    store.publish(NATIVE_MODULE_BASELINE, &module_dir)?;
    store.publish(APP_TREE, tree)?;
    Ok(())
}
