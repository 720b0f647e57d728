//! CLI command implementations.

pub mod plugins;
pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use packrun_config::{LocalDependencies, load_repo_config, resolve_context};
use packrun_core::{BuildContext, PluginRegistry, RepoConfig, WorkspacePaths};
use packrun_runner::Driver;

/// Everything resolved from the repo config before any plugin is built.
pub struct Workspace {
    pub repo: RepoConfig,
    pub context: BuildContext,
    pub paths: WorkspacePaths,
}

impl Workspace {
    /// Build the registry from the repo's plugin declarations.
    pub fn registry(&self) -> Result<PluginRegistry> {
        packrun_plugins::registry_from_declarations(&self.repo.plugins, &self.context)
            .context("Failed to load plugins")
    }

    /// Validate the configuration and hand everything to a driver.
    pub fn into_driver(self, args: Vec<String>) -> Result<Driver> {
        let registry = self.registry()?;
        Driver::new(self.context, self.repo, self.paths, registry, args)
            .context("Invalid configuration")
    }
}

/// Load the repo config and resolve the build context.
pub fn load(config_path: &Path, packages: &[String]) -> Result<Workspace> {
    let repo = load_repo_config(config_path)
        .with_context(|| format!("Failed to load config file: {}", config_path.display()))?;
    let (context, paths) = resolve_context(config_path, &repo, packages, &LocalDependencies)
        .with_context(|| format!("Failed to resolve workspace from {}", config_path.display()))?;

    Ok(Workspace {
        repo,
        context,
        paths,
    })
}
