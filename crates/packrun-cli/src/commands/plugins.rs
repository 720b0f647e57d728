//! Plugin listing command.

use std::process::ExitCode;

use anyhow::Result;

use super::Workspace;

/// Print the plugins registered for the active scopes, in run order.
pub fn list(workspace: Workspace) -> Result<ExitCode> {
    let registry = workspace.registry()?;

    if registry.is_empty() {
        println!("No plugins declared for scopes {:?}", workspace.context.scopes);
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{:<24} {:<16} {:<24} {:<8} SOURCE",
        "NAME", "MODULE", "CONFIG KEY", "TARGETS"
    );
    for registered in registry.plugins() {
        let descriptor = &registered.descriptor;
        let targets = if descriptor.is_target_dependent() {
            workspace.context.targets.join(",")
        } else {
            "-".to_string()
        };
        println!(
            "{:<24} {:<16} {:<24} {:<8} {}",
            descriptor.name(),
            descriptor.module(),
            descriptor.config_key(),
            targets,
            descriptor.source()
        );
    }

    Ok(ExitCode::SUCCESS)
}
