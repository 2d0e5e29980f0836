//! Rebuild detection logic.
//!
//! Uses hash-based caching to skip stages whose inputs haven't changed.
//! The installer stage is keyed on the dependency manifests; the later
//! stages are keyed on the hashes of the artifacts they consume.

use std::path::Path;

use crate::cache;
use crate::config::Config;
use crate::stage::{self, APP_TREE, NATIVE_MODULE};
use crate::store::ArtifactStore;

/// Check if the installer stage needs to run.
///
/// Keyed on the dependency manifests; the SBOM is the stage's final
/// step, so its presence marks a completed stage tree.
pub fn deps_needs_rebuild(base_dir: &Path, config: &Config) -> bool {
    let tree = stage::output_dir(base_dir).join("stage-deps");
    let sbom = tree.join("bom.json");
    let hash_file = stage::output_dir(base_dir).join(".deps-inputs.hash");

    let manifest = config.app_source.join("package.json");
    let lockfile = config.app_source.join("package-lock.json");
    let current_hash = match cache::hash_inputs(&[&manifest, &lockfile]) {
        Some(h) => h,
        None => return true,
    };

    cache::needs_rebuild(&current_hash, &hash_file, &sbom)
}

/// Cache the installer stage input hash after a successful run.
pub fn cache_deps_hash(base_dir: &Path, config: &Config) {
    let manifest = config.app_source.join("package.json");
    let lockfile = config.app_source.join("package-lock.json");
    if let Some(hash) = cache::hash_inputs(&[&manifest, &lockfile]) {
        let _ = cache::write_cached_hash(
            &stage::output_dir(base_dir).join(".deps-inputs.hash"),
            &hash,
        );
    }
}

/// Check if the rebuilder stage needs to run.
///
/// Keyed on the published app tree: a new install invalidates the
/// rebuilt module.
pub fn native_needs_rebuild(base_dir: &Path, store: &ArtifactStore) -> bool {
    if !store.contains(NATIVE_MODULE) {
        return true;
    }
    let app_tree_hash = match store.hash_of(APP_TREE) {
        Some(h) => h.to_string(),
        None => return true,
    };

    let hash_file = stage::output_dir(base_dir).join(".native-inputs.hash");
    let stage_tree = stage::output_dir(base_dir).join("stage-native");
    cache::needs_rebuild(&app_tree_hash, &hash_file, &stage_tree)
}

/// Cache the rebuilder stage input hash after a successful run.
pub fn cache_native_hash(base_dir: &Path, store: &ArtifactStore) {
    if let Some(hash) = store.hash_of(APP_TREE) {
        let _ = cache::write_cached_hash(
            &stage::output_dir(base_dir).join(".native-inputs.hash"),
            hash,
        );
    }
}

/// Check if runtime assembly needs to run.
///
/// Keyed on both consumed artifacts; the image config is the stage's
/// final output.
pub fn runtime_needs_rebuild(base_dir: &Path, store: &ArtifactStore) -> bool {
    let image_config = stage::output_dir(base_dir).join("image-config.json");
    let hash_file = stage::output_dir(base_dir).join(".runtime-inputs.hash");

    let (app_tree, native_module) = match (store.hash_of(APP_TREE), store.hash_of(NATIVE_MODULE))
    {
        (Some(a), Some(n)) => (a, n),
        _ => return true,
    };

    let current_hash = cache::hash_strings(&[app_tree, native_module]);
    cache::needs_rebuild(&current_hash, &hash_file, &image_config)
}

/// Cache the runtime assembly input hash after a successful run.
pub fn cache_runtime_hash(base_dir: &Path, store: &ArtifactStore) {
    if let (Some(app_tree), Some(native_module)) =
        (store.hash_of(APP_TREE), store.hash_of(NATIVE_MODULE))
    {
        let hash = cache::hash_strings(&[app_tree, native_module]);
        let _ = cache::write_cached_hash(
            &stage::output_dir(base_dir).join(".runtime-inputs.hash"),
            &hash,
        );
    }
}
