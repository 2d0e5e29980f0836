//! Stage input caching - hash-based rebuild detection.
//!
//! Uses SHA256 hashes of the dependency manifests to detect actual content
//! changes, not just mtimes. This keeps repeat builds from re-running a
//! multi-minute npm install when nothing relevant changed.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Compute the SHA256 hash of multiple files concatenated.
///
/// Files that do not exist are skipped (a missing lockfile is a legitimate
/// state, not an error); returns None only when none of the inputs exist
/// or one of them exists but cannot be read.
pub fn hash_inputs(paths: &[&Path]) -> Option<String> {
    let mut hasher = Sha256::new();
    let mut hashed_any = false;
    for path in paths {
        if !path.exists() {
            continue;
        }
        match fs::read(path) {
            Ok(content) => {
                hasher.update(path.to_string_lossy().as_bytes());
                hasher.update(&content);
                hashed_any = true;
            }
            Err(e) => {
                eprintln!(
                    "  [WARN] Failed to read {} for hashing: {} (cache will be invalidated)",
                    path.display(),
                    e
                );
                return None;
            }
        }
    }
    if hashed_any {
        Some(format!("{:x}", hasher.finalize()))
    } else {
        None
    }
}

/// Compute the SHA256 hash of a list of strings (e.g. published artifact
/// hashes), order-sensitive.
pub fn hash_strings(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// Read a cached hash from a .hash file.
pub fn read_cached_hash(hash_file: &Path) -> Option<String> {
    if !hash_file.exists() {
        return None;
    }
    match fs::read_to_string(hash_file) {
        Ok(s) => Some(s.trim().to_string()),
        Err(e) => {
            eprintln!(
                "  [WARN] Failed to read cache hash file {}: {} (will rebuild)",
                hash_file.display(),
                e
            );
            None
        }
    }
}

/// Write a hash to a .hash file.
pub fn write_cached_hash(hash_file: &Path, hash: &str) -> Result<()> {
    if let Some(parent) = hash_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(hash_file, hash)?;
    Ok(())
}

/// Check if a target needs rebuilding based on its input hash.
///
/// Returns true if the target doesn't exist or the input hash differs from
/// the cached hash. A missing hash file with an existing target establishes
/// the hash and trusts the existing output.
pub fn needs_rebuild(input_hash: &str, hash_file: &Path, target: &Path) -> bool {
    if !target.exists() {
        return true;
    }

    match read_cached_hash(hash_file) {
        Some(cached) => cached != input_hash,
        None => {
            let _ = write_cached_hash(hash_file, input_hash);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hash_inputs_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let present = dir.path().join("package.json");
        let absent = dir.path().join("package-lock.json");
        fs::write(&present, "{}").unwrap();

        let with_missing = hash_inputs(&[&present, &absent]).unwrap();
        let without = hash_inputs(&[&present]).unwrap();
        assert_eq!(with_missing, without);
    }

    #[test]
    fn hash_inputs_none_when_nothing_exists() {
        let dir = TempDir::new().unwrap();
        let absent = dir.path().join("missing.json");
        assert!(hash_inputs(&[&absent]).is_none());
    }

    #[test]
    fn hash_changes_when_content_changes() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("package.json");

        fs::write(&manifest, r#"{"name":"a"}"#).unwrap();
        let before = hash_inputs(&[&manifest]).unwrap();

        fs::write(&manifest, r#"{"name":"b"}"#).unwrap();
        let after = hash_inputs(&[&manifest]).unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn needs_rebuild_when_target_missing() {
        let dir = TempDir::new().unwrap();
        let hash_file = dir.path().join(".inputs.hash");
        let target = dir.path().join("bom.json");

        assert!(needs_rebuild("abc", &hash_file, &target));
    }

    #[test]
    fn existing_target_without_hash_establishes_baseline() {
        let dir = TempDir::new().unwrap();
        let hash_file = dir.path().join(".inputs.hash");
        let target = dir.path().join("bom.json");
        fs::write(&target, "{}").unwrap();

        assert!(!needs_rebuild("abc", &hash_file, &target));
        // Baseline was written; a different hash now triggers a rebuild.
        assert!(needs_rebuild("def", &hash_file, &target));
    }

    #[test]
    fn hash_strings_is_order_sensitive() {
        assert_ne!(hash_strings(&["a", "b"]), hash_strings(&["b", "a"]));
        assert_eq!(hash_strings(&["a", "b"]), hash_strings(&["a", "b"]));
    }
}
