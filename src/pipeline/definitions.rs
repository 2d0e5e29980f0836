//! Component definitions - declarative data for the installer stage.
//!
//! Each component describes one concern of the dependency-installer
//! contract. Organization follows phase order:
//! 1. Tooling - VCS client, pinned global tools
//! 2. Install - production dependencies, dedupe
//! 3. Prune - dev-only subtrees
//! 4. Ownership - log directory, group-0 access
//! 5. Cleanup - sensitive files, locale purge
//! 6. Manifest - SBOM

use super::{
    global_tool, group_share, log_dir, prune_tree, purge_category, remove_if_present,
    require_tool, Component, Op, Phase, VersionKey,
};

// =============================================================================
// Phase 1: Tooling
// =============================================================================

/// Some dependencies are fetched straight from repository URLs rather
/// than registry tarballs, so the install fails without a VCS client.
pub static VCS_CLIENT: Component = Component {
    name: "vcs-client",
    phase: Phase::Tooling,
    ops: &[require_tool("git")],
};

pub static PINNED_TOOLS: Component = Component {
    name: "pinned-tools",
    phase: Phase::Tooling,
    ops: &[
        global_tool("typescript", VersionKey::Typescript),
        global_tool("ts-node", VersionKey::TsNode),
    ],
};

// =============================================================================
// Phase 2: Install
// =============================================================================

pub static PRODUCTION_DEPS: Component = Component {
    name: "production-deps",
    phase: Phase::Install,
    ops: &[Op::InstallProduction, Op::Dedupe],
};

// =============================================================================
// Phase 3: Prune
// =============================================================================

/// Front-end build tool caches, intermediate build directories, and raw
/// un-bundled assets. None of these exist at runtime; a target that was
/// never created is not an error.
pub static DEV_PRUNE: Component = Component {
    name: "dev-prune",
    phase: Phase::Prune,
    ops: &[
        prune_tree("frontend/node_modules"),
        prune_tree("frontend/.angular"),
        prune_tree("frontend/src/assets"),
    ],
};

// =============================================================================
// Phase 4: Ownership
// =============================================================================

/// Paths the runtime must be able to write under an arbitrary non-root
/// UID in group 0: uploads, compiled front-end output, logs, data, and
/// localization files.
const WRITABLE_PATHS: &[&str] = &["ftp", "frontend/dist", "logs", "data", "i18n"];

pub static RUNTIME_DIRS: Component = Component {
    name: "runtime-dirs",
    phase: Phase::Ownership,
    ops: &[log_dir("logs")],
};

pub static GROUP_ACCESS: Component = Component {
    name: "group-access",
    phase: Phase::Ownership,
    ops: &[group_share(WRITABLE_PATHS)],
};

// =============================================================================
// Phase 5: Cleanup
// =============================================================================

pub static SENSITIVE_FILES: Component = Component {
    name: "sensitive-files",
    phase: Phase::Cleanup,
    ops: &[
        remove_if_present("data/chatbot/botDefaultTrainingData.json"),
        remove_if_present("ftp/legal.md"),
    ],
};

pub static LOCALE_PURGE: Component = Component {
    name: "locale-purge",
    phase: Phase::Cleanup,
    ops: &[purge_category("i18n", "json")],
};

// =============================================================================
// Phase 6: Manifest
// =============================================================================

pub static SBOM: Component = Component {
    name: "sbom",
    phase: Phase::Manifest,
    ops: &[Op::Sbom],
};

/// All installer-stage components in execution order.
pub fn all() -> Vec<&'static Component> {
    vec![
        &VCS_CLIENT,
        &PINNED_TOOLS,
        &PRODUCTION_DEPS,
        &DEV_PRUNE,
        &RUNTIME_DIRS,
        &GROUP_ACCESS,
        &SENSITIVE_FILES,
        &LOCALE_PURGE,
        &SBOM,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_are_ordered_by_phase() {
        let components = all();
        let mut prev_phase = None;
        for component in &components {
            if let Some(prev) = prev_phase {
                assert!(
                    component.phase >= prev,
                    "Component '{}' (phase {:?}) comes after a component with later phase {:?}",
                    component.name,
                    component.phase,
                    prev
                );
            }
            prev_phase = Some(component.phase);
        }
    }

    #[test]
    fn all_components_have_unique_names() {
        let mut names = std::collections::HashSet::new();
        for component in all() {
            assert!(
                names.insert(component.name),
                "Duplicate component name: {}",
                component.name
            );
        }
    }

    #[test]
    fn sbom_is_the_final_component() {
        let components = all();
        let last = components.last().unwrap();
        assert_eq!(last.name, "sbom");
        assert_eq!(last.phase, Phase::Manifest);
        // No other component may share the manifest phase.
        for component in &components[..components.len() - 1] {
            assert!(component.phase < Phase::Manifest);
        }
    }

    #[test]
    fn writable_paths_cover_the_runtime_contract() {
        for path in ["ftp", "frontend/dist", "logs", "data", "i18n"] {
            assert!(WRITABLE_PATHS.contains(&path), "missing {}", path);
        }
    }
}
