//! packrun CLI tool.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use packrun_core::ReportFormat;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "packrun")]
#[command(about = "Run build and test plugins across the packages of a workspace", long_about = None)]
struct Cli {
    /// Repo-level configuration file
    #[arg(short, long, env = "PACKRUN_CONFIG", default_value = "packrun.kdl")]
    config: PathBuf,

    /// Run only these packages (directory paths, repeatable)
    #[arg(short = 'p', long = "pkg")]
    packages: Vec<String>,

    /// Write the report here instead of Build/BuildLogs
    #[arg(long)]
    report: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Junit)]
    report_format: Format,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every plugin against every package (default)
    Run {
        /// Arguments passed through to plugins
        #[arg(last = true)]
        extra: Vec<String>,
    },
    /// Load and validate the configuration without running anything
    Validate,
    /// List the plugins that would run
    Plugins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Junit,
    Json,
}

impl From<Format> for ReportFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Junit => ReportFormat::Junit,
            Format::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let workspace = commands::load(&cli.config, &cli.packages)?;

    match cli.command.unwrap_or(Commands::Run { extra: Vec::new() }) {
        Commands::Run { extra } => {
            let log_file = logging::prepare_build_logs(&workspace.context.build_logs_dir())?;
            logging::init(Some(&log_file))?;
            commands::run::run(workspace, cli.report, cli.report_format.into(), extra).await
        }
        Commands::Validate => {
            logging::init(None)?;
            commands::validate::validate(workspace)
        }
        Commands::Plugins => {
            logging::init(None)?;
            commands::plugins::list(workspace)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_extra_args() {
        let cli = Cli::try_parse_from([
            "packrun",
            "-c",
            "ci.packrun.kdl",
            "-p",
            "CorePkg",
            "--pkg",
            "NetPkg",
            "--report-format",
            "json",
            "run",
            "--",
            "--verbose",
            "FOO=1",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("ci.packrun.kdl"));
        assert_eq!(cli.packages, vec!["CorePkg", "NetPkg"]);
        assert_eq!(cli.report_format, Format::Json);
        match cli.command {
            Some(Commands::Run { extra }) => assert_eq!(extra, vec!["--verbose", "FOO=1"]),
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_default_command() {
        let cli = Cli::try_parse_from(["packrun", "--config", "x.kdl"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(ReportFormat::from(cli.report_format), ReportFormat::Junit);
        assert!(cli.report.is_none());
    }
}
