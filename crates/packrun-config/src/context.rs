//! Build context resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use packrun_core::context::DependencySpec;
use packrun_core::{
    BuildContext, DEFAULT_SCOPE, DEFAULT_TARGET, PathResolver, RepoConfig, WorkspacePaths,
};

use crate::{ConfigError, ConfigResult, parse_repo_config};

/// Load and parse the repo-level configuration file.
pub fn load_repo_config(path: &Path) -> ConfigResult<RepoConfig> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse_repo_config(&content)
}

/// Locates the sources of external dependencies.
pub trait DependencyResolver {
    /// Return the package roots the dependencies provide.
    fn resolve(&self, workspace: &Path, dependencies: &[DependencySpec])
    -> ConfigResult<Vec<PathBuf>>;
}

/// Resolver for dependencies that are already present in the workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDependencies;

impl DependencyResolver for LocalDependencies {
    fn resolve(
        &self,
        workspace: &Path,
        dependencies: &[DependencySpec],
    ) -> ConfigResult<Vec<PathBuf>> {
        dependencies
            .iter()
            .map(|dep| {
                let path = workspace.join(&dep.path);
                if path.is_dir() {
                    Ok(path)
                } else {
                    Err(ConfigError::InvalidReference(format!(
                        "dependency '{}' not found at {}",
                        dep.name,
                        path.display()
                    )))
                }
            })
            .collect()
    }
}

/// Resolve the build context for a run.
///
/// `package_overrides` are filesystem paths (absolute or relative to the
/// current directory) that replace the configured package list.
pub fn resolve_context(
    config_path: &Path,
    repo: &RepoConfig,
    package_overrides: &[String],
    dependencies: &dyn DependencyResolver,
) -> ConfigResult<(BuildContext, WorkspacePaths)> {
    let name = repo
        .name
        .clone()
        .ok_or_else(|| ConfigError::MissingField("name".to_string()))?;
    let root = repo
        .workspace_root
        .as_deref()
        .ok_or_else(|| ConfigError::MissingField("workspace-root".to_string()))?;

    let config_dir = config_path
        .canonicalize()?
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "config path".to_string(),
            message: format!("{} has no parent directory", config_path.display()),
        })?;
    let workspace_root =
        config_dir
            .join(root)
            .canonicalize()
            .map_err(|e| ConfigError::InvalidValue {
                field: "workspace-root".to_string(),
                message: format!("{}: {}", config_dir.join(root).display(), e),
            })?;

    let mut packages_path = Vec::new();
    if !root.is_empty() {
        // The repo holding the config is not the workspace itself.
        packages_path.push(config_dir.clone());
    }
    for entry in &repo.packages_path {
        let path = workspace_root.join(entry);
        if !path.is_dir() {
            return Err(ConfigError::InvalidReference(format!(
                "packages-path entry {} does not exist",
                path.display()
            )));
        }
        packages_path.push(path);
    }
    packages_path.extend(dependencies.resolve(&workspace_root, &repo.dependencies)?);

    let paths = WorkspacePaths::new(workspace_root.clone(), packages_path.clone());

    let packages = if package_overrides.is_empty() {
        if repo.packages.is_empty() {
            return Err(ConfigError::MissingField("packages".to_string()));
        }
        repo.packages.clone()
    } else {
        package_overrides
            .iter()
            .map(|p| package_from_path(&paths, p))
            .collect::<ConfigResult<Vec<_>>>()?
    };

    let targets = if repo.targets.is_empty() {
        vec![DEFAULT_TARGET.to_string()]
    } else {
        repo.targets.clone()
    };

    let mut scopes = vec![DEFAULT_SCOPE.to_string()];
    for scope in &repo.scopes {
        if !scopes.contains(scope) {
            scopes.push(scope.clone());
        }
    }

    let context = BuildContext {
        group_name: repo.group_name.clone().unwrap_or_else(|| name.clone()),
        name,
        workspace_root,
        packages,
        targets,
        scopes,
        arch_supported: repo.arch_supported.clone(),
        packages_path,
        unit_timeout: repo.unit_timeout_secs.map(Duration::from_secs),
    };

    Ok((context, paths))
}

/// Convert a command-line package path into a package identifier.
fn package_from_path(paths: &WorkspacePaths, input: &str) -> ConfigResult<String> {
    let invalid = |message: String| ConfigError::InvalidValue {
        field: "package".to_string(),
        message,
    };

    let candidate = Path::new(input);
    let absolute = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        std::env::current_dir()?.join(candidate)
    };
    let absolute = absolute
        .canonicalize()
        .map_err(|e| invalid(format!("{}: {}", absolute.display(), e)))?;

    paths
        .relative_from_absolute(&absolute)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            invalid(format!(
                "{} is not inside the workspace or a package root",
                absolute.display()
            ))
        })
}
