//! Clean command - removes build artifacts.

use anyhow::Result;
use std::path::Path;

use crate::clean;
use crate::config::Config;

/// Clean target for the clean command.
pub enum CleanTarget {
    /// Clean outputs only (default)
    Outputs,
    /// Clean the installer stage tree
    Deps,
    /// Clean the rebuilder stage tree
    Native,
    /// Clean the runtime filesystem and image config
    Rootfs,
    /// Clean the artifact store
    Store,
    /// Clean the pinned tool cache
    Cache,
    /// Clean everything
    All,
}

/// Execute the clean command.
pub fn cmd_clean(base_dir: &Path, target: CleanTarget, config: &Config) -> Result<()> {
    match target {
        CleanTarget::Outputs => clean::clean_outputs(base_dir)?,
        CleanTarget::Deps => clean::clean_deps(base_dir)?,
        CleanTarget::Native => clean::clean_native(base_dir)?,
        CleanTarget::Rootfs => clean::clean_rootfs(base_dir)?,
        CleanTarget::Store => clean::clean_store(base_dir)?,
        CleanTarget::Cache => clean::clean_tool_cache(config)?,
        CleanTarget::All => clean::clean_all(base_dir, config)?,
    }
    Ok(())
}
