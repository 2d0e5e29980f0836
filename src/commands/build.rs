//! Build command - runs the three-stage pipeline.

use anyhow::Result;
use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::rebuild;
use crate::stage;
use crate::store::ArtifactStore;
use crate::timing::{format_duration, Timer};

/// Build target for the build command.
pub enum BuildTarget {
    /// Full build (installer, rebuilder, runtime assembly)
    Full,
    /// Installer stage only
    Deps,
    /// Native module rebuild only
    Native,
    /// Runtime assembly only
    Runtime,
}

/// Execute the build command.
pub fn cmd_build(base_dir: &Path, target: BuildTarget, config: &Config) -> Result<()> {
    match target {
        BuildTarget::Full => build_full(base_dir, config),
        BuildTarget::Deps => build_deps_only(base_dir, config),
        BuildTarget::Native => build_native_only(base_dir, config),
        BuildTarget::Runtime => build_runtime_only(base_dir, config),
    }
}

/// Full build. Skips stages whose inputs haven't changed; any stage
/// failure aborts the whole pipeline, so no partial image ships.
fn build_full(base_dir: &Path, config: &Config) -> Result<()> {
    println!("=== Full Image Build ===\n");
    let build_start = Instant::now();
    let mut store = ArtifactStore::open(&stage::output_dir(base_dir))?;

    // 1. Installer stage
    if rebuild::deps_needs_rebuild(base_dir, config) {
        let t = Timer::start("Installer stage");
        stage::deps::run(base_dir, config, &mut store)?;
        rebuild::cache_deps_hash(base_dir, config);
        t.finish();
    } else {
        println!("[SKIP] Installer stage (dependency manifests unchanged)");
        // A cleaned store with an intact stage tree can republish without
        // rerunning the install.
        if !store.contains(stage::APP_TREE) {
            let tree = stage::output_dir(base_dir).join("stage-deps");
            stage::deps::publish(config, &mut store, &tree)?;
        }
    }

    // 2. Native module rebuild
    if rebuild::native_needs_rebuild(base_dir, &store) {
        println!();
        let t = Timer::start("Native rebuild");
        stage::native::run(base_dir, config, &mut store)?;
        rebuild::cache_native_hash(base_dir, &store);
        t.finish();
    } else {
        println!("\n[SKIP] Native module rebuild (app tree unchanged)");
    }

    // 3. Runtime assembly
    if rebuild::runtime_needs_rebuild(base_dir, &store) {
        println!();
        let t = Timer::start("Runtime assembly");
        stage::runtime::run(base_dir, config, &store)?;
        rebuild::cache_runtime_hash(base_dir, &store);
        t.finish();
    } else {
        println!("\n[SKIP] Runtime assembly (consumed artifacts unchanged)");
    }

    // 4. ALWAYS verify (whether just built or skipped).
    // This catches broken artifacts from previous runs.
    println!("\n=== Artifact Verification ===");
    stage::runtime::verify(base_dir, config, &store)?;

    let total = build_start.elapsed().as_secs_f64();
    println!("\n=== Build Complete ({}) ===", format_duration(total));
    println!("  Rootfs: output/rootfs");
    println!("  Image config: output/image-config.json");
    println!("\nNext: stevedore probe");

    Ok(())
}

/// Installer stage only.
fn build_deps_only(base_dir: &Path, config: &Config) -> Result<()> {
    let mut store = ArtifactStore::open(&stage::output_dir(base_dir))?;

    if rebuild::deps_needs_rebuild(base_dir, config) {
        stage::deps::run(base_dir, config, &mut store)?;
        rebuild::cache_deps_hash(base_dir, config);
    } else {
        println!("[SKIP] Installer stage (dependency manifests unchanged)");
        println!("  Use 'clean deps' then rebuild to force");
    }
    Ok(())
}

/// Native module rebuild only.
fn build_native_only(base_dir: &Path, config: &Config) -> Result<()> {
    let mut store = ArtifactStore::open(&stage::output_dir(base_dir))?;

    if rebuild::native_needs_rebuild(base_dir, &store) {
        stage::native::run(base_dir, config, &mut store)?;
        rebuild::cache_native_hash(base_dir, &store);
    } else {
        println!("[SKIP] Native module rebuild (app tree unchanged)");
        println!("  Use 'clean native' then rebuild to force");
    }
    Ok(())
}

/// Runtime assembly only.
fn build_runtime_only(base_dir: &Path, config: &Config) -> Result<()> {
    let store = ArtifactStore::open(&stage::output_dir(base_dir))?;

    stage::runtime::run(base_dir, config, &store)?;
    rebuild::cache_runtime_hash(base_dir, &store);
    Ok(())
}
