//! Pipeline executor - interprets Op variants and performs the work.
//!
//! Filesystem operations are implemented directly; package-manager
//! operations shell out to npm through [`crate::process::Cmd`]. Install,
//! dedupe, and SBOM failures abort the build. Removal operations return
//! [`RemoveOutcome`] so legitimate absence never masks a real IO error.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::{lchown, PermissionsExt};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::process::{tool_exists, Cmd};

use super::{Component, Op, RemoveOutcome, VersionKey};

/// Execution context for installer-stage components.
pub struct StageContext<'a> {
    /// Root of the stage's private tree.
    pub tree: PathBuf,
    pub config: &'a Config,
}

impl<'a> StageContext<'a> {
    pub fn new(tree: PathBuf, config: &'a Config) -> Self {
        Self { tree, config }
    }

    fn version(&self, key: VersionKey) -> &str {
        match key {
            VersionKey::Typescript => &self.config.typescript_version,
            VersionKey::TsNode => &self.config.ts_node_version,
        }
    }
}

/// Execute all operations in a component.
pub fn execute(ctx: &StageContext, component: &Component) -> Result<()> {
    println!("Running {}...", component.name);

    for op in component.ops {
        execute_op(ctx, op)
            .with_context(|| format!("in component '{}': {:?}", component.name, op))?;
    }

    Ok(())
}

/// Execute a single operation.
fn execute_op(ctx: &StageContext, op: &Op) -> Result<()> {
    match op {
        Op::RequireTool(name) => handle_require_tool(name)?,
        Op::GlobalTool { package, version } => {
            handle_global_tool(ctx, package, ctx.version(*version))?
        }
        Op::InstallProduction => handle_install_production(ctx)?,
        Op::Dedupe => handle_dedupe(ctx)?,
        Op::PruneTree(path) => {
            match remove_dir_if_present(&ctx.tree.join(path))? {
                RemoveOutcome::Removed => println!("  Pruned {}", path),
                RemoveOutcome::NotFound => {}
            }
        }
        Op::LogDir(path) => handle_log_dir(ctx, path)?,
        Op::GroupShare(paths) => {
            group_share_paths(&ctx.tree, paths, ctx.config.runtime_gid)?
        }
        Op::RemoveIfPresent(path) => {
            match remove_file_if_present(&ctx.tree.join(path))? {
                RemoveOutcome::Removed => println!("  Removed {}", path),
                RemoveOutcome::NotFound => {}
            }
        }
        Op::PurgeCategory { root, extension } => {
            let removed = purge_category_under(&ctx.tree.join(root), extension)?;
            println!("  Purged {} .{} file(s) under {}", removed, extension, root);
        }
        Op::Sbom => handle_sbom(ctx)?,
    }

    Ok(())
}

fn handle_require_tool(name: &str) -> Result<()> {
    if !tool_exists(name) {
        bail!(
            "'{}' is required but not installed. Some dependencies are fetched \
             from repository URLs and cannot be installed without it.",
            name
        );
    }
    Ok(())
}

/// Install a pinned global tool into the stevedore tool prefix.
fn handle_global_tool(ctx: &StageContext, package: &str, version: &str) -> Result<()> {
    let prefix = ctx.config.tools_prefix();
    fs::create_dir_all(&prefix)
        .with_context(|| format!("Failed to create tool prefix {}", prefix.display()))?;

    println!("  Installing {}@{}...", package, version);
    Cmd::new("npm")
        .args(["install", "-g"])
        .arg(format!("{}@{}", package, version))
        .arg("--prefix")
        .arg_path(&prefix)
        .error_msg(format!("Global install of {}@{} failed", package, version))
        .run()?;
    Ok(())
}

/// Install production dependencies with lifecycle scripts disabled, then
/// run install hooks for the allow-listed packages only.
///
/// Some dependencies (native compilation, filesystem setup) need their
/// install scripts; the allow-list keeps that trust extension auditable
/// instead of granting it to the entire tree.
fn handle_install_production(ctx: &StageContext) -> Result<()> {
    println!("  Installing production dependencies...");
    Cmd::new("npm")
        .args(["install", "--omit=dev", "--ignore-scripts"])
        .dir(&ctx.tree)
        .error_msg("Production dependency install failed")
        .run_streaming()?;

    for package in &ctx.config.trusted_install_scripts {
        println!("  Running trusted install hooks for {}...", package);
        Cmd::new("npm")
            .args(["rebuild", package.as_str()])
            .dir(&ctx.tree)
            .error_msg(format!("Install hooks for '{}' failed", package))
            .run_streaming()?;
    }

    Ok(())
}

fn handle_dedupe(ctx: &StageContext) -> Result<()> {
    println!("  Deduplicating dependency tree...");
    Cmd::new("npm")
        .args(["dedupe", "--omit=dev"])
        .dir(&ctx.tree)
        .error_msg("Dependency dedupe failed")
        .run_streaming()?;
    Ok(())
}

/// Create the writable log directory owned by the runtime identity.
fn handle_log_dir(ctx: &StageContext, path: &str) -> Result<()> {
    let dir = ctx.tree.join(path);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    lchown(
        &dir,
        Some(ctx.config.runtime_uid),
        Some(ctx.config.runtime_gid),
    )
    .with_context(|| format!("Failed to chown {}", dir.display()))?;
    fs::set_permissions(&dir, fs::Permissions::from_mode(0o770))?;
    Ok(())
}

/// Recursively hand a set of paths to the runtime group and copy the
/// owner permission bits onto the group bits (g=u).
///
/// A listed path that does not exist in this application's tree is
/// skipped; the list covers every path the runtime contract names, not
/// every path each application ships.
pub fn group_share_paths(tree: &Path, paths: &[&str], gid: u32) -> Result<()> {
    for path in paths {
        let root = tree.join(path);
        if !root.exists() {
            continue;
        }
        for entry in WalkDir::new(&root).follow_links(false) {
            let entry =
                entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            lchown(entry.path(), None, Some(gid))
                .with_context(|| format!("Failed to chown {}", entry.path().display()))?;
            if entry.file_type().is_symlink() {
                continue;
            }
            let mode = entry.metadata()?.permissions().mode();
            let shared = group_equals_user(mode);
            if shared != mode {
                fs::set_permissions(entry.path(), fs::Permissions::from_mode(shared))
                    .with_context(|| {
                        format!("Failed to chmod {}", entry.path().display())
                    })?;
            }
        }
        println!("  Group-shared {}", path);
    }
    Ok(())
}

/// Copy the user permission bits onto the group bits.
pub fn group_equals_user(mode: u32) -> u32 {
    (mode & !0o070) | ((mode & 0o700) >> 3)
}

/// Delete a file if it exists.
///
/// Absence is success; any other failure (permissions, not a file) is an
/// error and aborts the pipeline.
pub fn remove_file_if_present(path: &Path) -> Result<RemoveOutcome> {
    match fs::remove_file(path) {
        Ok(()) => Ok(RemoveOutcome::Removed),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RemoveOutcome::NotFound),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Delete a directory tree if it exists.
pub fn remove_dir_if_present(path: &Path) -> Result<RemoveOutcome> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(RemoveOutcome::Removed),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RemoveOutcome::NotFound),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}

/// Delete every file with the given extension under a subtree.
///
/// Returns how many files were removed. A missing root or zero matches
/// is success; a failed removal is an error.
pub fn purge_category_under(root: &Path, extension: &str) -> Result<usize> {
    if !root.exists() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) == Some(extension) {
            fs::remove_file(entry.path())
                .with_context(|| format!("Failed to remove {}", entry.path().display()))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Generate the CycloneDX SBOM from the tree as it stands.
///
/// This runs in the manifest phase, after all install and cleanup steps;
/// the manifest is immutable from here on.
fn handle_sbom(ctx: &StageContext) -> Result<()> {
    println!("  Generating SBOM (bom.json)...");
    Cmd::new("npx")
        .args(["--yes"])
        .arg(format!(
            "@cyclonedx/cyclonedx-npm@{}",
            ctx.config.cyclonedx_version
        ))
        .args(["--omit", "dev", "--output-file", "bom.json"])
        .dir(&ctx.tree)
        .error_msg("SBOM generation failed")
        .run()?;

    if !ctx.tree.join("bom.json").exists() {
        bail!("SBOM generator exited successfully but bom.json was not written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::files::write_file_with_dirs;
    use tempfile::TempDir;

    #[test]
    fn remove_file_reports_removed() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("legal.md");
        fs::write(&file, "terms").unwrap();

        assert_eq!(remove_file_if_present(&file).unwrap(), RemoveOutcome::Removed);
        assert!(!file.exists());
    }

    #[test]
    fn remove_file_absent_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("never-existed.json");
        assert_eq!(
            remove_file_if_present(&file).unwrap(),
            RemoveOutcome::NotFound
        );
        // Idempotent: a second attempt reports the same.
        assert_eq!(
            remove_file_if_present(&file).unwrap(),
            RemoveOutcome::NotFound
        );
    }

    #[test]
    fn remove_dir_absent_is_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            remove_dir_if_present(&tmp.path().join("frontend/.angular")).unwrap(),
            RemoveOutcome::NotFound
        );
    }

    #[test]
    fn remove_dir_removes_whole_subtree() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("frontend/node_modules");
        write_file_with_dirs(root.join("pkg/index.js"), "x").unwrap();

        assert_eq!(remove_dir_if_present(&root).unwrap(), RemoveOutcome::Removed);
        assert!(!root.exists());
    }

    #[test]
    fn purge_removes_only_matching_extension() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("i18n");
        write_file_with_dirs(root.join("en.json"), "{}").unwrap();
        write_file_with_dirs(root.join("nested/de.json"), "{}").unwrap();
        write_file_with_dirs(root.join("README.md"), "docs").unwrap();

        let removed = purge_category_under(&root, "json").unwrap();
        assert_eq!(removed, 2);
        assert!(!root.join("en.json").exists());
        assert!(!root.join("nested/de.json").exists());
        assert!(root.join("README.md").exists());
    }

    #[test]
    fn purge_missing_root_is_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            purge_category_under(&tmp.path().join("i18n"), "json").unwrap(),
            0
        );
    }

    #[test]
    fn group_equals_user_copies_owner_bits() {
        assert_eq!(group_equals_user(0o755), 0o755);
        assert_eq!(group_equals_user(0o700), 0o770);
        assert_eq!(group_equals_user(0o640), 0o660);
        assert_eq!(group_equals_user(0o4750), 0o4770);
    }

    #[test]
    fn group_share_sets_group_bits() {
        let gid = unsafe { libc::getgid() };

        let tmp = TempDir::new().unwrap();
        let tree = tmp.path();
        let file = tree.join("ftp/upload.txt");
        write_file_with_dirs(&file, "payload").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o640)).unwrap();

        group_share_paths(tree, &["ftp"], gid).unwrap();

        let mode = fs::metadata(&file).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o660);
    }

    #[test]
    fn group_share_skips_absent_paths() {
        let gid = unsafe { libc::getgid() };
        let tmp = TempDir::new().unwrap();
        // None of the listed paths exist; this must not error.
        group_share_paths(tmp.path(), &["ftp", "logs"], gid).unwrap();
    }
}
