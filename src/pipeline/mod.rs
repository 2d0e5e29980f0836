//! Declarative pipeline operations for the dependency-installer stage.
//!
//! The installer stage is a fixed sequence of operations against one
//! private tree. Instead of imperative code scattered across the stage,
//! each concern is a static `Component` describing WHAT happens; the
//! executor interprets the definitions.
//!
//! ```text
//! Component Definition (DATA)      →     Executor (LOGIC)
//! ─────────────────────────────          ─────────────────
//! GROUP_ACCESS = Component {             for op in component.ops {
//!   ops: &[                                execute_op(ctx, op)?;
//!     group_share(WRITABLE_PATHS),       }
//!   ]
//! }
//! ```
//!
//! Ordering is carried by `Phase`: components are executed in phase
//! order, and the manifest phase is last so the SBOM always describes
//! the tree after every install, prune, and cleanup step.

pub mod definitions;
pub mod executor;

use std::fmt;

/// A unit of installer-stage work.
///
/// Components are immutable, static data describing what operations
/// need to be performed against the stage tree.
#[derive(Debug, Clone)]
pub struct Component {
    /// Human-readable name for logging.
    pub name: &'static str,
    /// Build phase (determines ordering).
    pub phase: Phase,
    /// Operations to perform.
    pub ops: &'static [Op],
}

/// Build phases determine component ordering.
///
/// Components are sorted by phase before execution. The manifest phase
/// must be the maximum: the SBOM is generated from the dependency tree
/// exactly as every earlier phase left it, and nothing mutates the tree
/// afterwards inside this stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    /// Version-control client and pinned global tools.
    Tooling = 1,
    /// Production dependency install and dedupe.
    Install = 2,
    /// Dev-only subtree removal.
    Prune = 3,
    /// Writable log directory and group-0 access fixes.
    Ownership = 4,
    /// Conditional sensitive-file deletes and locale purge.
    Cleanup = 5,
    /// SBOM generation. Always last.
    Manifest = 6,
}

/// Operations the executor knows how to perform.
///
/// Install, dedupe, and SBOM failures are fatal to the whole pipeline.
/// The removal operations distinguish legitimate absence (success) from
/// genuine IO errors (fatal) - see [`RemoveOutcome`].
#[derive(Debug, Clone)]
pub enum Op {
    /// Fail unless the tool is on PATH. Some dependency installs fetch
    /// straight from repository URLs, so the VCS client must be present.
    RequireTool(&'static str),

    /// Install a global build-time tool pinned to the exact version from
    /// config. Identical manifest must always yield the identical tree.
    GlobalTool {
        package: &'static str,
        version: VersionKey,
    },

    /// Install production dependencies only. Lifecycle scripts run only
    /// for the configured allow-list of trusted packages.
    InstallProduction,

    /// Collapse redundant nested dependency copies. Idempotent.
    Dedupe,

    /// Remove a dev-only subtree. Absence is success.
    PruneTree(&'static str),

    /// Create a writable log directory owned by the runtime identity.
    LogDir(&'static str),

    /// Recursive group ownership and group-equal permission bits on the
    /// designated writable paths, for arbitrary-UID orchestration.
    GroupShare(&'static [&'static str]),

    /// Delete a file if present. Absence is success.
    RemoveIfPresent(&'static str),

    /// Tree-wide delete of a file category under a subtree. Zero matches
    /// is success.
    PurgeCategory {
        root: &'static str,
        extension: &'static str,
    },

    /// Generate the SBOM from the dependency tree as it stands.
    Sbom,
}

/// Pinned versions are owned by config; ops reference them by key so
/// component definitions stay static data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionKey {
    Typescript,
    TsNode,
}

/// Outcome of a best-effort removal.
///
/// Genuine permission or filesystem errors are never folded into
/// `NotFound`; they surface as `Err` from the executor and abort the
/// pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotFound,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper functions for readable component definitions
// ─────────────────────────────────────────────────────────────────────────────

/// Fail unless the tool is installed.
pub const fn require_tool(name: &'static str) -> Op {
    Op::RequireTool(name)
}

/// Install a pinned global tool.
pub const fn global_tool(package: &'static str, version: VersionKey) -> Op {
    Op::GlobalTool { package, version }
}

/// Remove a dev-only subtree.
pub const fn prune_tree(path: &'static str) -> Op {
    Op::PruneTree(path)
}

/// Create the writable log directory.
pub const fn log_dir(path: &'static str) -> Op {
    Op::LogDir(path)
}

/// Group-share a set of paths.
pub const fn group_share(paths: &'static [&'static str]) -> Op {
    Op::GroupShare(paths)
}

/// Delete a file if present.
pub const fn remove_if_present(path: &'static str) -> Op {
    Op::RemoveIfPresent(path)
}

/// Delete a file category under a subtree.
pub const fn purge_category(root: &'static str, extension: &'static str) -> Op {
    Op::PurgeCategory { root, extension }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Tooling => write!(f, "Tooling"),
            Phase::Install => write!(f, "Install"),
            Phase::Prune => write!(f, "Prune"),
            Phase::Ownership => write!(f, "Ownership"),
            Phase::Cleanup => write!(f, "Cleanup"),
            Phase::Manifest => write!(f, "Manifest"),
        }
    }
}
