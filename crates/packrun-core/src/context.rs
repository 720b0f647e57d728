//! Build context and repo-level configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::ConfigDocument;

/// Target label used by plugins that do not vary per target.
pub const DEFAULT_TARGET: &str = "DEBUG";

/// Scope that is always active.
pub const DEFAULT_SCOPE: &str = "packrun";

/// Parsed repo-level configuration document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepoConfig {
    /// Run name (e.g., "Core CI").
    pub name: Option<String>,
    /// Group used when naming report suites. Defaults to `name`.
    pub group_name: Option<String>,
    /// Workspace root relative to the config file's directory.
    pub workspace_root: Option<String>,
    /// Workspace-relative package identifiers.
    pub packages: Vec<String>,
    /// Build targets (e.g., "DEBUG", "RELEASE").
    pub targets: Vec<String>,
    /// Supported architectures, exported as `TARGET_ARCH`.
    pub arch_supported: Vec<String>,
    /// Additional scopes.
    pub scopes: Vec<String>,
    /// Extra package roots, workspace relative.
    pub packages_path: Vec<String>,
    /// Per-unit timeout in seconds.
    pub unit_timeout_secs: Option<u64>,
    /// Plugin option sections.
    pub sections: ConfigDocument,
    /// Declared plugin instances.
    pub plugins: Vec<PluginDeclaration>,
    /// External package sources.
    pub dependencies: Vec<DependencySpec>,
}

/// A plugin instance declared in the repo config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDeclaration {
    /// Display name.
    pub name: String,
    /// Built-in module implementing the plugin.
    pub module: String,
    /// Explicit config key, overriding the module name.
    pub config_name: Option<String>,
    /// Only register when this scope is active.
    pub scope: Option<String>,
    /// Whether the plugin runs once per target.
    pub target_dependent: bool,
}

/// An external package source the workspace depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencySpec {
    pub name: String,
    /// Where the source lives, workspace relative.
    pub path: String,
    pub url: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
}

/// Top-level resolved configuration for a run. Immutable once resolved.
#[derive(Debug, Clone, Serialize)]
pub struct BuildContext {
    pub name: String,
    pub group_name: String,
    /// Absolute, canonical workspace root.
    pub workspace_root: PathBuf,
    /// Workspace-relative package identifiers, in run order.
    pub packages: Vec<String>,
    pub targets: Vec<String>,
    /// Active scopes, always starting with [`DEFAULT_SCOPE`].
    pub scopes: Vec<String>,
    pub arch_supported: Vec<String>,
    /// Absolute package roots besides the workspace.
    pub packages_path: Vec<PathBuf>,
    pub unit_timeout: Option<Duration>,
}

impl BuildContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Targets a plugin runs for.
    pub fn targets_for(&self, target_dependent: bool) -> Vec<&str> {
        if target_dependent && !self.targets.is_empty() {
            self.targets.iter().map(String::as_str).collect()
        } else {
            vec![DEFAULT_TARGET]
        }
    }

    /// Directory holding logs and reports.
    pub fn build_logs_dir(&self) -> PathBuf {
        self.workspace_root.join("Build").join("BuildLogs")
    }
}
