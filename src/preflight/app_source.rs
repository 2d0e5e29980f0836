//! Application source tree sanity checks.

use crate::config::Config;

use super::types::CheckResult;

/// Check the application source tree is usable.
pub fn check_app_source(config: &Config) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let manifest = config.app_source.join("package.json");
    if manifest.exists() {
        results.push(CheckResult::pass_with(
            "package.json",
            &manifest.display().to_string(),
        ));
    } else {
        results.push(CheckResult::fail(
            "package.json",
            &format!(
                "Not found under {}. Set APP_SOURCE in .env.",
                config.app_source.display()
            ),
        ));
        return results;
    }

    // A missing lockfile still installs, but reproducibility suffers.
    let lockfile = config.app_source.join("package-lock.json");
    if lockfile.exists() {
        results.push(CheckResult::pass("package-lock.json"));
    } else {
        results.push(CheckResult::warn(
            "package-lock.json",
            "Not found - installs will not be byte-reproducible",
        ));
    }

    match std::fs::read_to_string(&manifest) {
        Ok(content) if content.contains(&format!("\"{}\"", config.native_module)) => {
            results.push(CheckResult::pass_with(
                "native module",
                &format!("{} declared as a dependency", config.native_module),
            ));
        }
        Ok(_) => {
            results.push(CheckResult::warn(
                "native module",
                &format!(
                    "{} not found in package.json - the rebuild stage will fail",
                    config.native_module
                ),
            ));
        }
        Err(e) => {
            results.push(CheckResult::fail(
                "native module",
                &format!("Cannot read package.json: {}", e),
            ));
        }
    }

    results
}
