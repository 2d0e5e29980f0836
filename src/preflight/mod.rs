//! Preflight checks for the stevedore build.
//!
//! Validates host tools, the application source tree, and the build
//! environment before starting a build. Run with `stevedore preflight`.

mod app_source;
mod environment;
mod host_tools;
mod types;

use std::path::Path;

use anyhow::{bail, Result};

use crate::config::Config;

pub use types::{CheckResult, CheckStatus, PreflightReport};

/// Run all preflight checks.
pub fn run_preflight(base_dir: &Path, config: &Config) -> Result<PreflightReport> {
    let mut checks = Vec::new();

    println!("Running preflight checks...\n");

    println!("Checking host tools...");
    checks.extend(host_tools::check_host_tools());

    println!("Checking application source...");
    checks.extend(app_source::check_app_source(config));

    println!("Checking build environment...");
    checks.extend(environment::check_build_environment(base_dir, config));

    println!();

    Ok(PreflightReport { checks })
}

/// Run preflight and bail if any checks fail.
pub fn run_preflight_or_fail(base_dir: &Path, config: &Config) -> Result<()> {
    let report = run_preflight(base_dir, config)?;
    report.print();

    if !report.all_passed() {
        bail!(
            "Preflight failed: {} check(s) failed. Fix the issues above before building.",
            report.fail_count()
        );
    }

    println!("All preflight checks passed!\n");
    Ok(())
}
