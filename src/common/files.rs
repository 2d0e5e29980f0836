//! File and tree operations with automatic parent directory creation.

use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs::{lchown, symlink, PermissionsExt};
use std::path::Path;
use walkdir::WalkDir;

/// Write a file, creating parent directories as needed.
pub fn write_file_with_dirs<P: AsRef<Path>, C: AsRef<[u8]>>(path: P, content: C) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

/// Recursively copy a directory tree, preserving permission bits and
/// recreating symlinks.
///
/// `exclude` names are matched against top-level entries of `src` only;
/// this is how the source-tree import skips `node_modules`, `.git` and the
/// build output directory itself.
pub fn copy_tree(src: &Path, dst: &Path, exclude: &[&str]) -> Result<()> {
    copy_tree_inner(src, dst, exclude, None)
}

/// Like [`copy_tree`], but rewrites ownership of every copied entry to the
/// given uid/gid. This is the cross-stage copy used by runtime assembly,
/// where the final tree must belong to the runtime identity.
pub fn copy_tree_owned(src: &Path, dst: &Path, uid: u32, gid: u32) -> Result<()> {
    copy_tree_inner(src, dst, &[], Some((uid, gid)))
}

fn copy_tree_inner(
    src: &Path,
    dst: &Path,
    exclude: &[&str],
    owner: Option<(u32, u32)>,
) -> Result<()> {
    if !src.is_dir() {
        anyhow::bail!("Copy source is not a directory: {}", src.display());
    }
    fs::create_dir_all(dst)
        .with_context(|| format!("Failed to create {}", dst.display()))?;
    if let Some((uid, gid)) = owner {
        lchown(dst, Some(uid), Some(gid))
            .with_context(|| format!("Failed to chown {}", dst.display()))?;
    }

    let mut walker = WalkDir::new(src).follow_links(false).into_iter();
    while let Some(entry) = walker.next() {
        let entry = entry.with_context(|| format!("Failed to walk {}", src.display()))?;
        if entry.depth() == 0 {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .expect("walkdir entry outside its root");
        if entry.depth() == 1 {
            if let Some(name) = rel.file_name().and_then(|n| n.to_str()) {
                if exclude.contains(&name) {
                    if entry.file_type().is_dir() {
                        walker.skip_current_dir();
                    }
                    continue;
                }
            }
        }

        let target = dst.join(rel);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
            let mode = entry.metadata()?.permissions().mode();
            fs::set_permissions(&target, fs::Permissions::from_mode(mode))?;
        } else if file_type.is_symlink() {
            let link_target = fs::read_link(entry.path())
                .with_context(|| format!("Failed to read link {}", entry.path().display()))?;
            if target.symlink_metadata().is_ok() {
                fs::remove_file(&target)?;
            }
            symlink(&link_target, &target)
                .with_context(|| format!("Failed to create symlink {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }

        if let Some((uid, gid)) = owner {
            lchown(&target, Some(uid), Some(gid))
                .with_context(|| format!("Failed to chown {}", target.display()))?;
        }
    }

    Ok(())
}
