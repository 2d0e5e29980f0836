//! Stevedore - hardened container image build pipeline.
//!
//! Packages a pre-existing web application into a minimal runtime image
//! through three isolated stages:
//! - Installer: production dependency tree, cleanup, SBOM
//! - Rebuilder: the one architecture-sensitive native module
//! - Runtime assembly: non-root, shell-less filesystem + image config
#![allow(dead_code, unused_imports)]

mod cache;
mod clean;
mod commands;
mod common;
mod config;
mod health;
mod image;
mod pipeline;
mod preflight;
mod process;
mod rebuild;
mod stage;
mod store;
mod timing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::Config;

#[derive(Parser)]
#[command(name = "stevedore")]
#[command(about = "Hardened container image build pipeline")]
#[command(
    after_help = "QUICK START:\n  stevedore preflight  Check all dependencies\n  stevedore build      Build everything\n  stevedore probe      Check a running service\n  stevedore clean      Remove build artifacts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the runtime image (all stages, skipping unchanged ones)
    Build {
        #[command(subcommand)]
        target: Option<BuildTarget>,
    },

    /// Clean build artifacts (default: preserves the tool cache)
    Clean {
        #[command(subcommand)]
        what: Option<CleanTarget>,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },

    /// Run preflight checks (verify all dependencies before build)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Probe a running service's health endpoint
    Probe {
        /// Host to probe (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Apply the full orchestrator semantics (grace period, interval,
        /// consecutive-failure counting) instead of a single probe
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand)]
enum BuildTarget {
    /// Run the dependency installer stage only
    Deps,
    /// Rebuild the native module only
    Native,
    /// Assemble the runtime image only
    Runtime,
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show current configuration
    Config,
    /// Show build status (what needs rebuilding)
    Status,
}

#[derive(Subcommand)]
enum CleanTarget {
    /// Clean the installer stage tree only
    Deps,
    /// Clean the rebuilder stage tree only
    Native,
    /// Clean the runtime filesystem and image config only
    Rootfs,
    /// Clean the artifact store only
    Store,
    /// Clean cached pinned tools (~/.cache/stevedore/)
    Cache,
    /// Clean everything (outputs + tool cache)
    All,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));

    // Load .env if present
    dotenvy::dotenv().ok();
    let config = Config::load(&base_dir);

    match cli.command {
        Commands::Build { target } => {
            let build_target = match target {
                None => commands::build::BuildTarget::Full,
                Some(BuildTarget::Deps) => commands::build::BuildTarget::Deps,
                Some(BuildTarget::Native) => commands::build::BuildTarget::Native,
                Some(BuildTarget::Runtime) => commands::build::BuildTarget::Runtime,
            };
            commands::cmd_build(&base_dir, build_target, &config)?;
        }

        Commands::Clean { what } => {
            let clean_target = match what {
                None => commands::clean::CleanTarget::Outputs,
                Some(CleanTarget::Deps) => commands::clean::CleanTarget::Deps,
                Some(CleanTarget::Native) => commands::clean::CleanTarget::Native,
                Some(CleanTarget::Rootfs) => commands::clean::CleanTarget::Rootfs,
                Some(CleanTarget::Store) => commands::clean::CleanTarget::Store,
                Some(CleanTarget::Cache) => commands::clean::CleanTarget::Cache,
                Some(CleanTarget::All) => commands::clean::CleanTarget::All,
            };
            commands::cmd_clean(&base_dir, clean_target, &config)?;
        }

        Commands::Show { what } => {
            let show_target = match what {
                ShowTarget::Config => commands::show::ShowTarget::Config,
                ShowTarget::Status => commands::show::ShowTarget::Status,
            };
            commands::cmd_show(&base_dir, show_target, &config)?;
        }

        Commands::Preflight { strict } => {
            commands::cmd_preflight(&base_dir, &config, strict)?;
        }

        Commands::Probe { host, wait } => {
            commands::cmd_probe(&config, &host, wait)?;
        }
    }

    Ok(())
}
