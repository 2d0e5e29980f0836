//! Content-addressed artifact store for cross-stage handoff.
//!
//! Stages never read each other's trees directly. A stage publishes named
//! outputs here; later stages declare which names they consume. The store
//! keys every object by the SHA256 of its content, so re-publishing
//! identical output is a no-op and a consumer can verify what it received.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::common::files::{copy_tree, copy_tree_owned};

/// A published artifact as recorded in the store index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub hash: String,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    File,
    Tree,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreIndex {
    artifacts: BTreeMap<String, ArtifactRecord>,
}

/// On-disk artifact store under `output/store/`.
pub struct ArtifactStore {
    root: PathBuf,
    index: StoreIndex,
}

impl ArtifactStore {
    /// Open (or create) the store for the given output directory.
    pub fn open(output_dir: &Path) -> Result<Self> {
        let root = output_dir.join("store");
        fs::create_dir_all(root.join("objects"))
            .with_context(|| format!("Failed to create artifact store at {}", root.display()))?;

        let index_path = root.join("index.json");
        let index = if index_path.exists() {
            let json = fs::read_to_string(&index_path)
                .with_context(|| format!("Failed to read {}", index_path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Corrupt store index at {}", index_path.display()))?
        } else {
            StoreIndex::default()
        };

        Ok(Self { root, index })
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("index.json")
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        self.root.join("objects").join(hash)
    }

    fn save_index(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.index)?;
        fs::write(self.index_path(), json)
            .with_context(|| format!("Failed to write {}", self.index_path().display()))?;
        Ok(())
    }

    /// Publish a file or directory tree under a name.
    ///
    /// Identical content is stored once; re-publishing different content
    /// under an existing name replaces the index entry (the old object is
    /// kept, other names may still reference it).
    pub fn publish(&mut self, name: &str, src: &Path) -> Result<String> {
        let (hash, kind) = if src.is_dir() {
            (tree_hash(src)?, ArtifactKind::Tree)
        } else if src.is_file() {
            (file_hash(src)?, ArtifactKind::File)
        } else {
            bail!(
                "Cannot publish '{}': {} does not exist",
                name,
                src.display()
            );
        };

        let object = self.object_path(&hash);
        if !object.exists() {
            match kind {
                ArtifactKind::Tree => copy_tree(src, &object, &[])?,
                ArtifactKind::File => {
                    fs::create_dir_all(&object)?;
                    fs::copy(src, object.join(file_name(src)?))?;
                }
            }
        }

        self.index.artifacts.insert(
            name.to_string(),
            ArtifactRecord {
                name: name.to_string(),
                hash: hash.clone(),
                kind,
            },
        );
        self.save_index()?;

        println!("  [STORE] Published '{}' ({})", name, short(&hash));
        Ok(hash)
    }

    /// Materialize a published artifact at `dest`, replacing whatever is there.
    pub fn consume(&self, name: &str, dest: &Path) -> Result<ArtifactRecord> {
        self.consume_inner(name, dest, None)
    }

    /// Like [`consume`](Self::consume), but rewrites ownership of every
    /// materialized entry to the given uid/gid. Used by runtime assembly,
    /// where the final tree must belong to the runtime identity.
    pub fn consume_owned(
        &self,
        name: &str,
        dest: &Path,
        uid: u32,
        gid: u32,
    ) -> Result<ArtifactRecord> {
        self.consume_inner(name, dest, Some((uid, gid)))
    }

    fn consume_inner(
        &self,
        name: &str,
        dest: &Path,
        owner: Option<(u32, u32)>,
    ) -> Result<ArtifactRecord> {
        let record = self
            .index
            .artifacts
            .get(name)
            .with_context(|| format!("Artifact '{}' has not been published", name))?
            .clone();

        let object = self.object_path(&record.hash);
        if !object.exists() {
            bail!(
                "Store object for '{}' is missing at {}",
                name,
                object.display()
            );
        }

        match record.kind {
            ArtifactKind::Tree => {
                if dest.exists() {
                    fs::remove_dir_all(dest)
                        .with_context(|| format!("Failed to clear {}", dest.display()))?;
                }
                match owner {
                    Some((uid, gid)) => copy_tree_owned(&object, dest, uid, gid)?,
                    None => copy_tree(&object, dest, &[])?,
                }
            }
            ArtifactKind::File => {
                let entry = fs::read_dir(&object)?
                    .next()
                    .with_context(|| format!("Store object for '{}' is empty", name))??;
                if let Some(parent) = dest.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), dest)
                    .with_context(|| format!("Failed to copy artifact to {}", dest.display()))?;
                if let Some((uid, gid)) = owner {
                    std::os::unix::fs::lchown(dest, Some(uid), Some(gid))
                        .with_context(|| format!("Failed to chown {}", dest.display()))?;
                }
            }
        }

        Ok(record)
    }

    /// Hash of a published artifact, if any.
    pub fn hash_of(&self, name: &str) -> Option<&str> {
        self.index.artifacts.get(name).map(|r| r.hash.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.artifacts.contains_key(name)
    }

    /// All published records, name-ordered.
    pub fn records(&self) -> impl Iterator<Item = &ArtifactRecord> {
        self.index.artifacts.values()
    }
}

/// SHA256 over a directory tree: relative path, permission bits, and
/// content (or symlink target) of every entry, walked in sorted order.
///
/// Ownership is deliberately excluded so that the same content hashes
/// identically before and after the runtime-identity rewrite.
pub fn tree_hash(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if entry.depth() == 0 {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir entry outside its root");
        hasher.update(rel.to_string_lossy().as_bytes());
        hasher.update([0u8]);

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            hasher.update(b"l");
            hasher.update(target.to_string_lossy().as_bytes());
        } else {
            let mode = entry.metadata()?.permissions().mode() & 0o7777;
            hasher.update(mode.to_le_bytes());
            if file_type.is_file() {
                let content = fs::read(entry.path())
                    .with_context(|| format!("Failed to read {}", entry.path().display()))?;
                hasher.update(&content);
            }
        }
        hasher.update([0u8]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

fn file_hash(path: &Path) -> Result<String> {
    let content =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name()
        .with_context(|| format!("Path has no file name: {}", path.display()))
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(12)]
}
