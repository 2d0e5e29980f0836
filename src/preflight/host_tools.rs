//! Host tool availability checks.

use crate::process;

use super::types::CheckResult;

/// Check host tools are installed.
pub fn check_host_tools() -> Vec<CheckResult> {
    let mut results = Vec::new();

    // Required for the installer stage
    let required_tools = [
        ("node", "nodejs", "Required to run the application toolchain"),
        ("npm", "npm", "Required to install dependencies"),
        ("npx", "npm", "Required to run the SBOM generator"),
        ("git", "git", "Required for repository-URL dependency installs"),
    ];

    for (tool, package, purpose) in required_tools {
        results.push(check_tool_exists(tool, package, purpose, true));
    }

    // Required only by the native-module rebuild stage; a missing tool
    // is a failure because there is no fallback to the unrebuilt module.
    let rebuild_tools = [
        ("cc", "gcc", "Required to compile the native module"),
        ("make", "make", "Required by the native module's build tooling"),
        ("python3", "python3", "Required by node-gyp"),
    ];

    for (tool, package, purpose) in rebuild_tools {
        results.push(check_tool_exists(tool, package, purpose, true));
    }

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match process::find_tool(tool) {
        Some(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        None => {
            let msg = format!("Not found. Install '{}' package. {}", package, purpose);
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}
