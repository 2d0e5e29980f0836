//! Unit tests for the installer-stage pipeline operations.
//!
//! Everything here runs against mock trees; the package-manager-driven
//! operations (install, dedupe, SBOM) are covered by their components'
//! contracts and exercised in real builds, not here.

mod helpers;

use std::fs;

use helpers::*;
use stevedore::pipeline::definitions::{
    DEV_PRUNE, GROUP_ACCESS, LOCALE_PURGE, RUNTIME_DIRS, SENSITIVE_FILES,
};
use stevedore::pipeline::executor::{self, StageContext};
use stevedore::pipeline::{definitions, Phase};
use stevedore::store::tree_hash;

/// Run the filesystem-only components (prune through cleanup) the way
/// the installer stage does, against an imported mock tree.
fn run_fs_components(ctx: &StageContext) {
    for component in [
        &DEV_PRUNE,
        &RUNTIME_DIRS,
        &GROUP_ACCESS,
        &SENSITIVE_FILES,
        &LOCALE_PURGE,
    ] {
        executor::execute(ctx, component).expect("component failed");
    }
}

#[test]
fn dev_subtrees_are_pruned() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    executor::execute(&ctx, &DEV_PRUNE).unwrap();

    assert_absent(&env.app_source.join("frontend/node_modules"));
    assert_absent(&env.app_source.join("frontend/.angular"));
    assert_absent(&env.app_source.join("frontend/src/assets"));
    // The compiled front-end output survives.
    assert_file_exists(&env.app_source.join("frontend/dist/main.js"));
}

#[test]
fn prune_is_idempotent() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    executor::execute(&ctx, &DEV_PRUNE).unwrap();
    let after_first = tree_hash(&env.app_source).unwrap();

    executor::execute(&ctx, &DEV_PRUNE).unwrap();
    let after_second = tree_hash(&env.app_source).unwrap();

    assert_eq!(after_first, after_second);
}

#[test]
fn sensitive_files_are_removed() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    executor::execute(&ctx, &SENSITIVE_FILES).unwrap();

    assert_absent(&env.app_source.join("data/chatbot/botDefaultTrainingData.json"));
    assert_absent(&env.app_source.join("ftp/legal.md"));
    // Unrelated data survives.
    assert_file_exists(&env.app_source.join("data/static/users.yml"));
}

#[test]
fn missing_sensitive_files_do_not_fail_the_pipeline() {
    let env = TestEnv::new();
    let config = env.config();

    fs::remove_file(env.app_source.join("data/chatbot/botDefaultTrainingData.json")).unwrap();
    fs::remove_file(env.app_source.join("ftp/legal.md")).unwrap();

    let ctx = StageContext::new(env.app_source.clone(), &config);
    // Absence is success, twice over.
    executor::execute(&ctx, &SENSITIVE_FILES).unwrap();
    executor::execute(&ctx, &SENSITIVE_FILES).unwrap();
}

#[test]
fn locale_purge_removes_all_locale_json() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    executor::execute(&ctx, &LOCALE_PURGE).unwrap();

    assert_absent(&env.app_source.join("i18n/en.json"));
    assert_absent(&env.app_source.join("i18n/de.json"));
}

#[test]
fn locale_purge_with_no_matches_succeeds() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    executor::execute(&ctx, &LOCALE_PURGE).unwrap();
    // Second run finds nothing; still success.
    executor::execute(&ctx, &LOCALE_PURGE).unwrap();
}

#[test]
fn log_dir_is_created_group_writable() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    executor::execute(&ctx, &RUNTIME_DIRS).unwrap();

    let logs = env.app_source.join("logs");
    assert_dir_exists(&logs);
    assert_eq!(mode_of(&logs), 0o770);
}

#[test]
fn group_access_makes_writable_paths_group_equal() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::new();
    let config = env.config();

    // Tighten a file so the fix has something to widen.
    let upload = env.app_source.join("ftp/quarantine/.gitkeep");
    fs::set_permissions(&upload, fs::Permissions::from_mode(0o600)).unwrap();

    let ctx = StageContext::new(env.app_source.clone(), &config);
    executor::execute(&ctx, &RUNTIME_DIRS).unwrap();
    executor::execute(&ctx, &GROUP_ACCESS).unwrap();

    // g=u on every designated path that exists.
    assert_eq!(mode_of(&upload), 0o660);
    let dist = env.app_source.join("frontend/dist/main.js");
    let mode = mode_of(&dist);
    assert_eq!((mode >> 3) & 0o7, (mode >> 6) & 0o7, "group bits != user bits");
}

#[test]
fn cleanup_components_run_twice_leave_tree_identical() {
    let env = TestEnv::new();
    let config = env.config();
    let ctx = StageContext::new(env.app_source.clone(), &config);

    run_fs_components(&ctx);
    let after_first = tree_hash(&env.app_source).unwrap();

    run_fs_components(&ctx);
    let after_second = tree_hash(&env.app_source).unwrap();

    assert_eq!(after_first, after_second);
}

#[test]
fn component_definitions_are_phase_sorted() {
    let components = definitions::all();
    let mut prev = None;
    for component in components {
        if let Some(prev) = prev {
            assert!(
                component.phase >= prev,
                "component '{}' out of phase order",
                component.name
            );
        }
        prev = Some(component.phase);
    }
}

#[test]
fn manifest_is_the_last_phase() {
    let last = *definitions::all().last().unwrap();
    assert_eq!(last.phase, Phase::Manifest);
}
