//! Configuration validation command.

use std::process::ExitCode;

use anyhow::{Context, Result};
use packrun_config::{FilePackageConfigs, PackageConfigSource, check_package_config};

use super::Workspace;

/// Load the repo config, the registry and every package config, then report warnings.
pub fn validate(workspace: Workspace) -> Result<ExitCode> {
    let driver = workspace.into_driver(Vec::new())?;
    let context = driver.context();
    let keys = driver.registry().config_keys();

    let mut warnings: Vec<String> = driver.warnings().iter().map(ToString::to_string).collect();

    let package_configs = FilePackageConfigs::new(driver.paths());
    for package in &context.packages {
        let doc = package_configs
            .load(package)
            .with_context(|| format!("Invalid config for package {}", package))?;
        if let Some(doc) = doc {
            warnings.extend(
                check_package_config(package, &doc, &keys)
                    .iter()
                    .map(ToString::to_string),
            );
        }
    }

    for warning in &warnings {
        println!("warning: {}", warning);
    }
    println!(
        "Configuration is valid: {} packages, {} plugins, {} warnings",
        context.packages.len(),
        driver.registry().len(),
        warnings.len()
    );

    Ok(ExitCode::SUCCESS)
}
