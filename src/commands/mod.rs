//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Run the build pipeline (all stages or one)
//! - `clean` - Clean build artifacts
//! - `show` - Display information
//! - `preflight` - Run preflight checks
//! - `probe` - Probe a running service's health endpoint

pub mod build;
pub mod clean;
mod preflight;
mod probe;
pub mod show;

pub use build::cmd_build;
pub use clean::cmd_clean;
pub use preflight::cmd_preflight;
pub use probe::cmd_probe;
pub use show::cmd_show;
