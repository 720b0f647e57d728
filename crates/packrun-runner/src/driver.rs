//! Build driver - seeds the environment, runs the matrix and writes the report.

use std::path::PathBuf;

use packrun_config::{ConfigWarning, FilePackageConfigs, check_repo_config};
use packrun_core::{
    BuildContext, BuildEnvironment, PluginRegistry, RepoConfig, ReportFormat, TestReport,
    WorkspacePaths,
};
use tracing::{error, info, warn};

use crate::{MatrixRunner, RunTally, RunnerResult};

/// File name of the JUnit report inside the build logs directory.
pub const REPORT_FILE: &str = "TestSuites.xml";
const JSON_REPORT_FILE: &str = "TestSuites.json";

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub tally: RunTally,
    pub report_path: PathBuf,
}

impl RunSummary {
    /// Process exit status, see [`RunTally::exit_code`].
    pub fn exit_code(&self) -> u8 {
        self.tally.exit_code()
    }
}

/// Drives one run over a resolved context and a filled registry.
pub struct Driver {
    context: BuildContext,
    repo: RepoConfig,
    paths: WorkspacePaths,
    registry: PluginRegistry,
    args: Vec<String>,
    report_path: Option<PathBuf>,
    report_format: ReportFormat,
    warnings: Vec<ConfigWarning>,
}

impl Driver {
    /// Validate the repo config against the registry and prepare a run.
    pub fn new(
        context: BuildContext,
        repo: RepoConfig,
        paths: WorkspacePaths,
        registry: PluginRegistry,
        args: Vec<String>,
    ) -> RunnerResult<Self> {
        let warnings = check_repo_config(&context, &repo, &paths, &registry.config_keys())?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        Ok(Self {
            context,
            repo,
            paths,
            registry,
            args,
            report_path: None,
            report_format: ReportFormat::default(),
            warnings,
        })
    }

    /// Override where and how the report is written.
    pub fn with_report(mut self, path: Option<PathBuf>, format: ReportFormat) -> Self {
        self.report_path = path;
        self.report_format = format;
        self
    }

    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn paths(&self) -> &WorkspacePaths {
        &self.paths
    }

    /// Warnings found while validating the repo config.
    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    pub fn report_path(&self) -> PathBuf {
        self.report_path.clone().unwrap_or_else(|| {
            let file = match self.report_format {
                ReportFormat::Junit => REPORT_FILE,
                ReportFormat::Json => JSON_REPORT_FILE,
            };
            self.context.build_logs_dir().join(file)
        })
    }

    /// The environment every package starts from.
    pub fn initial_environment(&self) -> BuildEnvironment {
        BuildEnvironment::from_vars([
            (
                "TARGET_ARCH".to_string(),
                self.context.arch_supported.join(" "),
                "packrun".to_string(),
            ),
            (
                "WORKSPACE".to_string(),
                self.context.workspace_root.display().to_string(),
                "packrun".to_string(),
            ),
            (
                "PACKRUN_NAME".to_string(),
                self.context.name.clone(),
                "packrun".to_string(),
            ),
        ])
    }

    /// Run every unit and write the report.
    pub async fn run(&self) -> RunnerResult<RunSummary> {
        let mut env = self.initial_environment();
        let mut report = TestReport::new();
        let package_configs = FilePackageConfigs::new(&self.paths);

        info!(
            name = %self.context.name,
            packages = self.context.packages.len(),
            plugins = self.registry.len(),
            "Starting build"
        );

        let runner = MatrixRunner::new(
            &self.context,
            &self.repo,
            &self.paths,
            &self.registry,
            &package_configs,
            &self.args,
        );
        let tally = runner.run(&mut env, &mut report).await?;

        let report_path = self.report_path();
        report.serialize(&report_path, self.report_format)?;
        info!(path = %report_path.display(), "Report written");

        if tally.failed == 0 {
            info!(total = tally.total, "Overall build status: success");
        } else {
            error!(
                total = tally.total,
                failed = tally.failed,
                "Overall build status: failed"
            );
        }

        Ok(RunSummary { tally, report_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RunnerError;
    use packrun_config::ConfigError;
    use packrun_core::ConfigDocument;
    use std::path::Path;

    fn context(root: &Path, packages: &[&str]) -> BuildContext {
        BuildContext {
            name: "Core CI".to_string(),
            group_name: "core".to_string(),
            workspace_root: root.to_path_buf(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
            targets: vec!["DEBUG".to_string()],
            scopes: vec!["packrun".to_string()],
            arch_supported: vec!["IA32".to_string(), "X64".to_string()],
            packages_path: vec![],
            unit_timeout: None,
        }
    }

    fn driver(root: &Path, packages: &[&str], repo: RepoConfig) -> RunnerResult<Driver> {
        Driver::new(
            context(root, packages),
            repo,
            WorkspacePaths::new(root, vec![]),
            PluginRegistry::new(),
            vec![],
        )
    }

    #[test]
    fn test_initial_environment() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir(ws.path().join("CorePkg")).unwrap();
        let driver = driver(ws.path(), &["CorePkg"], RepoConfig::default()).unwrap();

        let env = driver.initial_environment();
        assert_eq!(env.get_value("TARGET_ARCH"), Some("IA32 X64"));
        assert_eq!(env.get_value("PACKRUN_NAME"), Some("Core CI"));
        assert_eq!(
            env.get_value("WORKSPACE"),
            Some(ws.path().display().to_string().as_str())
        );
        assert_eq!(env.depth(), 0);
    }

    #[test]
    fn test_new_validates_repo_config() {
        let ws = tempfile::tempdir().unwrap();
        assert!(matches!(
            driver(ws.path(), &["GhostPkg"], RepoConfig::default()),
            Err(RunnerError::Config(ConfigError::InvalidReference(_)))
        ));

        std::fs::create_dir(ws.path().join("CorePkg")).unwrap();
        let mut repo = RepoConfig::default();
        repo.sections = ConfigDocument::new().with_section("Orphan", [("x", true)]);
        let driver = driver(ws.path(), &["CorePkg"], repo).unwrap();
        assert_eq!(driver.warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_run_writes_report() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir(ws.path().join("CorePkg")).unwrap();
        let driver = driver(ws.path(), &["CorePkg"], RepoConfig::default()).unwrap();

        let summary = driver.run().await.unwrap();
        assert_eq!(summary.tally, RunTally::default());
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(
            summary.report_path,
            ws.path().join("Build").join("BuildLogs").join(REPORT_FILE)
        );

        let xml = std::fs::read_to_string(&summary.report_path).unwrap();
        assert!(xml.contains("packrun.core.CorePkg"));
    }

    #[test]
    fn test_run_future_is_send() {
        fn assert_send<T: Send>(_: T) {}

        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir(ws.path().join("CorePkg")).unwrap();
        let driver = driver(ws.path(), &["CorePkg"], RepoConfig::default()).unwrap();
        assert_send(driver.run());
    }

    #[tokio::test]
    async fn test_report_override() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir(ws.path().join("CorePkg")).unwrap();
        let target = ws.path().join("out").join("report.json");
        let driver = driver(ws.path(), &["CorePkg"], RepoConfig::default())
            .unwrap()
            .with_report(Some(target.clone()), ReportFormat::Json);

        let summary = driver.run().await.unwrap();
        assert_eq!(summary.report_path, target);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(json["suites"][0]["name"], "CorePkg");
    }
}
