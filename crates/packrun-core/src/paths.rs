//! Path resolution handle.
//!
//! Packages are identified by paths relative to the workspace root or to one
//! of the extra package roots. Plugins receive a [`PathResolver`] to turn
//! those identifiers into real paths and back.

use std::path::{Component, Path, PathBuf};

/// Converts between package-relative identifiers and absolute paths.
pub trait PathResolver: Send + Sync {
    /// Absolute workspace root.
    fn workspace_root(&self) -> &Path;

    /// Convert an absolute path into a workspace/package-root relative
    /// identifier using `/` separators. `None` if it is outside every root.
    fn relative_from_absolute(&self, path: &Path) -> Option<String>;

    /// Find the existing absolute path for a relative identifier.
    fn absolute_from_relative(&self, relative: &str) -> Option<PathBuf>;
}

/// Filesystem-backed resolver over the workspace and extra package roots.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    workspace: PathBuf,
    packages_path: Vec<PathBuf>,
}

impl WorkspacePaths {
    pub fn new(workspace: impl Into<PathBuf>, packages_path: Vec<PathBuf>) -> Self {
        Self {
            workspace: workspace.into(),
            packages_path,
        }
    }

    pub fn packages_path(&self) -> &[PathBuf] {
        &self.packages_path
    }
}

impl PathResolver for WorkspacePaths {
    fn workspace_root(&self) -> &Path {
        &self.workspace
    }

    fn relative_from_absolute(&self, path: &Path) -> Option<String> {
        // Package roots take precedence over the workspace root.
        self.packages_path
            .iter()
            .chain(std::iter::once(&self.workspace))
            .find_map(|root| path.strip_prefix(root).ok())
            .map(to_identifier)
    }

    fn absolute_from_relative(&self, relative: &str) -> Option<PathBuf> {
        std::iter::once(&self.workspace)
            .chain(self.packages_path.iter())
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists())
    }
}

fn to_identifier(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
