//! Runtime assembly: compose the minimal runtime filesystem and its
//! image configuration record.
//!
//! The stage consumes the cleaned app tree and layers the rebuilt
//! native module on top, rewriting ownership to the runtime identity at
//! copy time. The result is verified (single rebuilt module, shell-free
//! tree, SBOM present) before the image config is written; verification
//! also runs standalone so skipped builds are still checked.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::image::ImageConfig;
use crate::store::{self, ArtifactStore};

use super::{output_dir, APP_TREE, NATIVE_MODULE, NATIVE_MODULE_BASELINE};

/// Shells must not exist anywhere in the final tree; the entry point is
/// invoked directly.
const SHELL_PATHS: &[&str] = &["bin/sh", "usr/bin/sh", "bin/bash", "usr/bin/bash"];

/// Run runtime assembly.
///
/// A missing consumed artifact is a fatal copy failure: no partial
/// runtime image is ever shipped.
pub fn run(base_dir: &Path, config: &Config, store: &ArtifactStore) -> Result<()> {
    let rootfs = output_dir(base_dir).join("rootfs");

    println!("Assembling runtime filesystem...");
    store
        .consume_owned(APP_TREE, &rootfs, config.runtime_uid, config.runtime_gid)
        .context("Runtime assembly requires the installer stage's app tree")?;

    let module_dest = rootfs.join("node_modules").join(&config.native_module);
    store
        .consume_owned(
            NATIVE_MODULE,
            &module_dest,
            config.runtime_uid,
            config.runtime_gid,
        )
        .context("Runtime assembly requires the rebuilt native module")?;

    // The manifest was generated in the installer stage, before the
    // rebuilt module was layered in. It describes declared dependency
    // versions, not the rebuilt binary.
    println!("  bom.json carried over from the installer stage");

    verify(base_dir, config, store)?;

    let image_config = ImageConfig::from_config(config);
    let config_path = output_dir(base_dir).join("image-config.json");
    image_config.write(&config_path)?;
    println!("  Wrote {}", config_path.display());

    Ok(())
}

/// Verify the assembled runtime filesystem.
pub fn verify(base_dir: &Path, config: &Config, store: &ArtifactStore) -> Result<()> {
    let rootfs = output_dir(base_dir).join("rootfs");
    if !rootfs.is_dir() {
        bail!("Runtime filesystem not found at {}", rootfs.display());
    }

    // Exactly one copy of the native module, and it must be the rebuilt
    // one, not the installer stage's original.
    let copies = find_module_copies(&rootfs, &config.native_module)?;
    if copies.len() != 1 {
        bail!(
            "Expected exactly one copy of '{}' in the runtime tree, found {}",
            config.native_module,
            copies.len()
        );
    }

    let actual = store::tree_hash(&copies[0])?;
    let rebuilt = store
        .hash_of(NATIVE_MODULE)
        .context("Rebuilt native module has not been published")?;
    if actual != rebuilt {
        bail!(
            "Native module in the runtime tree does not match the rebuilt artifact \
             ({} != {})",
            &actual[..12],
            &rebuilt[..12]
        );
    }
    if let Some(baseline) = store.hash_of(NATIVE_MODULE_BASELINE) {
        if actual == baseline {
            bail!(
                "Native module in the runtime tree is identical to the pre-rebuild \
                 copy; the rebuilt artifact was not layered in"
            );
        }
    }

    for shell in SHELL_PATHS {
        if rootfs.join(shell).exists() {
            bail!("Runtime tree must be shell-less but contains {}", shell);
        }
    }

    if !rootfs.join("bom.json").exists() {
        bail!("SBOM (bom.json) is missing from the runtime tree");
    }

    println!("  [VERIFY] Runtime filesystem OK (rebuilt module, no shell, SBOM present)");
    Ok(())
}

/// Find every directory named after the native module that sits directly
/// under a `node_modules` directory.
fn find_module_copies(rootfs: &Path, module: &str) -> Result<Vec<PathBuf>> {
    let mut copies = Vec::new();
    for entry in WalkDir::new(rootfs).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", rootfs.display()))?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_module = entry.file_name().to_str() == Some(module)
            && entry
                .path()
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                == Some("node_modules");
        if is_module {
            copies.push(entry.path().to_path_buf());
        }
    }
    Ok(copies)
}
