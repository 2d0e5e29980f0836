//! Shared test utilities for stevedore tests.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use stevedore::config::Config;

/// Test environment with a temporary base directory and a mock
/// application source tree.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Base directory (project root simulation)
    pub base_dir: PathBuf,
    /// Mock application source tree
    pub app_source: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with a mock application source.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        let app_source = base_dir.join("app");

        create_mock_app(&app_source);

        Self {
            _temp_dir: temp_dir,
            base_dir,
            app_source,
        }
    }

    /// Config pointing at the mock app, with the runtime identity set to
    /// the calling user so ownership rewrites succeed unprivileged.
    pub fn config(&self) -> Config {
        Config {
            app_source: self.app_source.clone(),
            typescript_version: "5.4.5".to_string(),
            ts_node_version: "10.9.2".to_string(),
            cyclonedx_version: "1.19.3".to_string(),
            native_module: "libxmljs2".to_string(),
            trusted_install_scripts: vec!["libxmljs2".to_string()],
            runtime_uid: unsafe { libc::getuid() },
            runtime_gid: unsafe { libc::getgid() },
            port: 3000,
            health_endpoint: "/rest/admin/application-version".to_string(),
            runtime_binary: "/nodejs/bin/node".to_string(),
            app_entry: "build/app.js".to_string(),
            image_version: "1.2.3".to_string(),
            image_revision: "deadbeef".to_string(),
            image_created: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        self.base_dir.join("output")
    }
}

/// Create a mock application source tree with the shapes the pipeline
/// operates on: an installed native module, uploads, data, locales, and
/// front-end build leftovers.
pub fn create_mock_app(app: &Path) {
    write(
        &app.join("package.json"),
        r#"{"name":"webapp","version":"1.0.0","dependencies":{"libxmljs2":"^0.33.0"}}"#,
    );
    write(&app.join("package-lock.json"), r#"{"lockfileVersion":3}"#);
    write(&app.join("build/app.js"), "require('http');\n");

    // Installed native module with a compiled artifact
    create_mock_native_module(&app.join("node_modules/libxmljs2"), "installer-stage");

    // Runtime-writable areas
    write(&app.join("ftp/quarantine/.gitkeep"), "");
    write(&app.join("ftp/legal.md"), "terms of use\n");
    write(&app.join("data/chatbot/botDefaultTrainingData.json"), "{}");
    write(&app.join("data/static/users.yml"), "users: []\n");
    write(&app.join("i18n/en.json"), "{\"title\":\"en\"}");
    write(&app.join("i18n/de.json"), "{\"title\":\"de\"}");
    write(&app.join("frontend/dist/main.js"), "console.log(1);\n");

    // Dev-only subtrees the prune phase removes
    write(&app.join("frontend/node_modules/left-pad/index.js"), "x");
    write(&app.join("frontend/.angular/cache/marker"), "x");
    write(&app.join("frontend/src/assets/logo.svg"), "<svg/>");
}

/// Create a mock native module tree. The `flavor` string lands in the
/// compiled artifact so rebuilt and baseline copies hash differently.
pub fn create_mock_native_module(module: &Path, flavor: &str) {
    write(
        &module.join("package.json"),
        r#"{"name":"libxmljs2","version":"0.33.0","scripts":{"build":"node-gyp rebuild"}}"#,
    );
    write(&module.join("lib/bindings.js"), "module.exports = {};\n");
    write(
        &module.join("build/Release/xmljs.node"),
        &format!("ELF-mock-{}", flavor),
    );
}

/// Write a file, creating parent directories.
pub fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent dir");
    }
    fs::write(path, content).expect("Failed to write file");
}

/// Permission bits of a path.
pub fn mode_of(path: &Path) -> u32 {
    fs::metadata(path)
        .expect("Failed to stat")
        .permissions()
        .mode()
        & 0o7777
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.is_file(), "Expected file to exist: {}", path.display());
}

/// Assert that a directory exists.
pub fn assert_dir_exists(path: &Path) {
    assert!(
        path.is_dir(),
        "Expected directory to exist: {}",
        path.display()
    );
}

/// Assert that a path does not exist.
pub fn assert_absent(path: &Path) {
    assert!(
        !path.exists(),
        "Expected path to be absent: {}",
        path.display()
    );
}
