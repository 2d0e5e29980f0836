//! OCI-style image configuration record.
//!
//! Runtime assembly writes this next to the rootfs. It declares the
//! non-root identity, the exposed port, the exec-form entry point, the
//! health check, and the provenance labels. Everything here is a static
//! string or a build-time-supplied config value; nothing is computed.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::health::HealthCheck;

/// The image metadata record written as `image-config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Runtime identity as `uid:gid`. The gid is 0 by convention so
    /// orchestrators can run the container under an arbitrary UID.
    pub user: String,
    pub exposed_port: u16,
    /// Exec-form entry point. No shell exists in the image, so the
    /// command must be directly executable.
    pub entrypoint: Vec<String>,
    pub healthcheck: HealthCheckRecord,
    pub labels: BTreeMap<String, String>,
}

/// Docker-style health check declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckRecord {
    pub test: Vec<String>,
    pub interval_secs: u64,
    pub timeout_secs: u64,
    pub start_period_secs: u64,
    pub retries: u32,
}

impl ImageConfig {
    pub fn from_config(config: &Config) -> Self {
        let check = HealthCheck::from_config(config);

        let mut labels = BTreeMap::new();
        let mut label = |key: &str, value: &str| {
            labels.insert(key.to_string(), value.to_string());
        };
        label("org.opencontainers.image.title", "Web Application");
        label(
            "org.opencontainers.image.description",
            "Hardened runtime image built by stevedore",
        );
        label("org.opencontainers.image.licenses", "MIT");
        label("org.opencontainers.image.version", &config.image_version);
        label("org.opencontainers.image.created", &config.image_created);
        label("org.opencontainers.image.revision", &config.image_revision);
        label(
            "org.opencontainers.image.source",
            "https://github.com/example/webapp",
        );
        label(
            "org.opencontainers.image.documentation",
            "https://github.com/example/webapp#readme",
        );
        label("maintainer", "stevedore");

        Self {
            user: format!("{}:{}", config.runtime_uid, config.runtime_gid),
            exposed_port: config.port,
            entrypoint: vec![
                config.runtime_binary.clone(),
                config.app_entry.clone(),
            ],
            healthcheck: HealthCheckRecord {
                test: check.probe_command(&config.runtime_binary),
                interval_secs: check.interval_secs,
                timeout_secs: check.timeout_secs,
                start_period_secs: check.start_period_secs,
                retries: check.retries,
            },
            labels,
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Corrupt image config at {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config() -> Config {
        Config::load(Path::new("/nonexistent"))
    }

    #[test]
    fn user_is_nonroot_uid_with_group_zero() {
        let image = ImageConfig::from_config(&test_config());
        let (uid, gid) = image.user.split_once(':').unwrap();
        assert_ne!(uid, "0");
        assert_eq!(gid, "0");
    }

    #[test]
    fn entrypoint_has_no_shell() {
        let image = ImageConfig::from_config(&test_config());
        assert_eq!(image.entrypoint.len(), 2);
        for part in &image.entrypoint {
            assert!(!part.ends_with("/sh") && !part.ends_with("/bash"), "{}", part);
        }
    }

    #[test]
    fn all_provenance_labels_are_present() {
        let image = ImageConfig::from_config(&test_config());
        for key in [
            "org.opencontainers.image.title",
            "org.opencontainers.image.description",
            "org.opencontainers.image.licenses",
            "org.opencontainers.image.version",
            "org.opencontainers.image.created",
            "org.opencontainers.image.revision",
            "org.opencontainers.image.source",
            "org.opencontainers.image.documentation",
            "maintainer",
        ] {
            assert!(image.labels.contains_key(key), "missing label {}", key);
        }
    }

    #[test]
    fn roundtrips_through_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("image-config.json");

        let image = ImageConfig::from_config(&test_config());
        image.write(&path).unwrap();
        let loaded = ImageConfig::load(&path).unwrap();

        assert_eq!(loaded.user, image.user);
        assert_eq!(loaded.exposed_port, image.exposed_port);
        assert_eq!(loaded.healthcheck.retries, 3);
        assert_eq!(loaded.labels, image.labels);
    }
}
