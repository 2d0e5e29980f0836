//! Build environment checks.

use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::stage;

use super::types::CheckResult;

/// Check the build environment is writable.
pub fn check_build_environment(base_dir: &Path, config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    results.push(check_writable("output directory", &stage::output_dir(base_dir)));
    results.push(check_writable("tool cache", &config.tools_prefix()));

    results
}

/// Check a directory exists (or can be created) and is writable.
fn check_writable(name: &str, dir: &Path) -> CheckResult {
    if let Err(e) = fs::create_dir_all(dir) {
        return CheckResult::fail(name, &format!("Cannot create {}: {}", dir.display(), e));
    }

    let probe = dir.join(".preflight-write-test");
    match fs::write(&probe, b"ok") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            CheckResult::pass_with(name, &dir.display().to_string())
        }
        Err(e) => CheckResult::fail(name, &format!("Not writable ({}): {}", dir.display(), e)),
    }
}
