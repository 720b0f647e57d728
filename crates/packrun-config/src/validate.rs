//! Configuration validation.

use std::collections::BTreeSet;
use std::fmt;

use packrun_core::{BuildContext, ConfigDocument, PathResolver, RepoConfig};

use crate::{ConfigError, ConfigResult};

/// A problem that does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
}

impl ConfigWarning {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validate the repo config and the resolved context.
///
/// Duplicates and packages that do not resolve to a directory are errors.
/// Option sections no registered plugin reads are returned as warnings.
pub fn check_repo_config(
    context: &BuildContext,
    repo: &RepoConfig,
    paths: &dyn PathResolver,
    known_keys: &[&str],
) -> ConfigResult<Vec<ConfigWarning>> {
    check_unique("package", context.packages.iter().map(String::as_str))?;
    check_unique("target", context.targets.iter().map(String::as_str))?;
    check_unique("plugin", repo.plugins.iter().map(|p| p.name.as_str()))?;

    for package in &context.packages {
        match paths.absolute_from_relative(package) {
            Some(path) if path.is_dir() => {}
            _ => {
                return Err(ConfigError::InvalidReference(format!(
                    "package '{}' does not resolve to a directory",
                    package
                )));
            }
        }
    }

    Ok(unknown_sections("repo config", &repo.sections, known_keys))
}

/// Check a package config's sections against the registered config keys.
pub fn check_package_config(
    package: &str,
    doc: &ConfigDocument,
    known_keys: &[&str],
) -> Vec<ConfigWarning> {
    unknown_sections(&format!("package '{}'", package), doc, known_keys)
}

fn check_unique<'a>(kind: &str, items: impl Iterator<Item = &'a str>) -> ConfigResult<()> {
    let mut seen = BTreeSet::new();
    for item in items {
        if !seen.insert(item) {
            return Err(ConfigError::Duplicate(format!("{} '{}'", kind, item)));
        }
    }
    Ok(())
}

fn unknown_sections(origin: &str, doc: &ConfigDocument, known_keys: &[&str]) -> Vec<ConfigWarning> {
    doc.section_names()
        .filter(|name| !known_keys.contains(name))
        .map(|name| {
            ConfigWarning::new(format!(
                "{}: section '{}' does not match any registered plugin",
                origin, name
            ))
        })
        .collect()
}
