//! The default command: run the whole matrix.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use packrun_core::ReportFormat;
use tracing::info;

use super::Workspace;

/// Run every plugin and exit with the failed unit count.
pub async fn run(
    workspace: Workspace,
    report: Option<PathBuf>,
    format: ReportFormat,
    extra: Vec<String>,
) -> Result<ExitCode> {
    info!(
        workspace = %workspace.context.workspace_root.display(),
        packages = ?workspace.context.packages,
        targets = ?workspace.context.targets,
        scopes = ?workspace.context.scopes,
        "Loaded workspace"
    );

    let driver = workspace.into_driver(extra)?.with_report(report, format);
    let summary = driver.run().await.context("Build aborted")?;

    println!(
        "{} units, {} failed. Report: {}",
        summary.tally.total,
        summary.tally.failed,
        summary.report_path.display()
    );

    Ok(ExitCode::from(summary.exit_code()))
}
