//! Rebuilder stage: recompile the one architecture-sensitive native
//! module against the target platform's toolchain.
//!
//! The installer stage's environment lacks the heavy build-time-only
//! toolchain, and its module binary may not match the runtime image's
//! libc/architecture. This stage consumes the module subtree in
//! isolation, discards the previous compile output, and rebuilds.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::pipeline::executor::remove_dir_if_present;
use crate::pipeline::RemoveOutcome;
use crate::process::{tool_exists, Cmd};
use crate::store::ArtifactStore;

use super::{output_dir, NATIVE_MODULE, NATIVE_MODULE_BASELINE};

/// Toolchain the native module's own build tooling requires.
const BUILD_TOOLS: &[(&str, &str)] = &[
    ("cc", "C compiler (install gcc or clang)"),
    ("make", "build driver (install make)"),
    ("python3", "required by node-gyp"),
];

/// Run the rebuilder stage.
///
/// Build failure is fatal; there is no fallback to the unrebuilt,
/// possibly architecture-incompatible module.
pub fn run(base_dir: &Path, config: &Config, store: &mut ArtifactStore) -> Result<()> {
    for (tool, hint) in BUILD_TOOLS {
        if !tool_exists(tool) {
            bail!("'{}' is required to rebuild the native module: {}", tool, hint);
        }
    }

    let stage = output_dir(base_dir).join("stage-native");
    let module_dir = stage.join(&config.native_module);

    println!("Importing {} from the artifact store...", config.native_module);
    store.consume(NATIVE_MODULE_BASELINE, &module_dir)?;

    match remove_dir_if_present(&module_dir.join("build"))? {
        RemoveOutcome::Removed => println!("  Discarded previous compile output"),
        RemoveOutcome::NotFound => {}
    }

    println!("Rebuilding {}...", config.native_module);
    Cmd::new("npm")
        .args(["run", "build"])
        .dir(&module_dir)
        .error_msg(format!("Native module rebuild failed for {}", config.native_module))
        .run_streaming()?;

    store.publish(NATIVE_MODULE, &module_dir)?;
    Ok(())
}
