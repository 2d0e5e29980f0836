//! Configuration management for stevedore.
//!
//! Reads configuration from .env file and environment variables.
//! Environment variables take precedence over .env file.
//!
//! All version pins live here. Reproducibility depends on these never
//! floating: the install steps pass exact versions, so an identical
//! manifest always yields an identical installed tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default pinned version of the TypeScript compiler.
pub const DEFAULT_TYPESCRIPT_VERSION: &str = "5.4.5";

/// Default pinned version of ts-node.
pub const DEFAULT_TS_NODE_VERSION: &str = "10.9.2";

/// Default pinned version of the CycloneDX SBOM generator.
pub const DEFAULT_CYCLONEDX_VERSION: &str = "1.19.3";

/// Default runtime uid (group is always 0 for arbitrary-UID orchestration).
pub const DEFAULT_RUNTIME_UID: u32 = 65532;

/// Stevedore configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the application source tree (default: app)
    pub app_source: PathBuf,
    /// Pinned TypeScript compiler version
    pub typescript_version: String,
    /// Pinned ts-node version
    pub ts_node_version: String,
    /// Pinned CycloneDX SBOM generator version
    pub cyclonedx_version: String,
    /// Name of the native module rebuilt for the runtime image
    pub native_module: String,
    /// Packages whose install hooks are trusted to run (allow-list)
    pub trusted_install_scripts: Vec<String>,
    /// Numeric uid the runtime process runs as
    pub runtime_uid: u32,
    /// Group the runtime tree is shared with (0 by convention)
    pub runtime_gid: u32,
    /// TCP port the application listens on
    pub port: u16,
    /// Unauthenticated status endpoint used by the liveness probe
    pub health_endpoint: String,
    /// Absolute path of the language runtime inside the image
    pub runtime_binary: String,
    /// Application entry artifact, relative to the image root
    pub app_entry: String,
    /// Image version label (build-time supplied)
    pub image_version: String,
    /// Image revision label, usually a VCS commit (build-time supplied)
    pub image_revision: String,
    /// Image creation timestamp label (build-time supplied)
    pub image_created: String,
}

impl Config {
    /// Load configuration from .env file and environment.
    ///
    /// The .env file is looked up in the stevedore base directory;
    /// real environment variables override it.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let env_path = base_dir.join(".env");
        if env_path.exists() {
            if let Ok(content) = fs::read_to_string(&env_path) {
                for line in content.lines() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((key, value)) = line.split_once('=') {
                        let key = key.trim();
                        let value = value.trim();
                        let value = value.trim_matches('"').trim_matches('\'');
                        env_vars.insert(key.to_string(), value.to_string());
                    }
                }
            }
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        let app_source = env_vars
            .get("APP_SOURCE")
            .map(|s| {
                let path = PathBuf::from(s);
                if path.is_absolute() {
                    path
                } else {
                    base_dir.join(path)
                }
            })
            .unwrap_or_else(|| base_dir.join("app"));

        let string = |key: &str, default: &str| -> String {
            env_vars
                .get(key)
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };

        let trusted_install_scripts = string("TRUSTED_INSTALL_SCRIPTS", "libxmljs2,sqlite3")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let runtime_uid = env_vars
            .get("RUNTIME_UID")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_RUNTIME_UID);

        let runtime_gid = env_vars
            .get("RUNTIME_GID")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let port = env_vars
            .get("APP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        Self {
            app_source,
            typescript_version: string("TYPESCRIPT_VERSION", DEFAULT_TYPESCRIPT_VERSION),
            ts_node_version: string("TS_NODE_VERSION", DEFAULT_TS_NODE_VERSION),
            cyclonedx_version: string("CYCLONEDX_VERSION", DEFAULT_CYCLONEDX_VERSION),
            native_module: string("NATIVE_MODULE", "libxmljs2"),
            trusted_install_scripts,
            runtime_uid,
            runtime_gid,
            port,
            health_endpoint: string("HEALTH_ENDPOINT", "/rest/admin/application-version"),
            runtime_binary: string("RUNTIME_BINARY", "/nodejs/bin/node"),
            app_entry: string("APP_ENTRY", "build/app.js"),
            image_version: string("IMAGE_VERSION", "0.0.0"),
            image_revision: string("IMAGE_REVISION", "unknown"),
            image_created: string("IMAGE_CREATED", "unknown"),
        }
    }

    /// Check if the application source tree looks usable.
    pub fn has_app_source(&self) -> bool {
        self.app_source.join("package.json").exists()
    }

    /// Directory where pinned global tools are installed.
    ///
    /// Lives under the user cache so repeated builds reuse the exact
    /// pinned toolchain instead of re-downloading it.
    pub fn tools_prefix(&self) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("stevedore/tools")
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  APP_SOURCE: {}", self.app_source.display());
        println!("  TYPESCRIPT_VERSION: {}", self.typescript_version);
        println!("  TS_NODE_VERSION: {}", self.ts_node_version);
        println!("  CYCLONEDX_VERSION: {}", self.cyclonedx_version);
        println!("  NATIVE_MODULE: {}", self.native_module);
        println!(
            "  TRUSTED_INSTALL_SCRIPTS: {}",
            self.trusted_install_scripts.join(",")
        );
        println!("  RUNTIME_UID: {}", self.runtime_uid);
        println!("  RUNTIME_GID: {}", self.runtime_gid);
        println!("  APP_PORT: {}", self.port);
        println!("  HEALTH_ENDPOINT: {}", self.health_endpoint);
        println!("  RUNTIME_BINARY: {}", self.runtime_binary);
        println!("  APP_ENTRY: {}", self.app_entry);
        println!("  IMAGE_VERSION: {}", self.image_version);
        if self.has_app_source() {
            println!("  App source: FOUND");
        } else {
            println!("  App source: NOT FOUND (set APP_SOURCE in .env)");
        }
    }
}
