//! End-to-end behavior of the execution loop over a plugin matrix.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use packrun_core::{
    BuildContext, BuildEnvironment, CaseStatus, ConfigDocument, ExecutionResult, Plugin,
    PluginContext, PluginDescriptor, PluginRegistry, RepoConfig, ReportFormat, TestReport,
    WorkspacePaths,
};
use packrun_runner::{MatrixRunner, RunTally};

/// Returns a fixed code, or faults on one target.
struct Fixed {
    code: i32,
    fault_on: Option<&'static str>,
    target_dependent: bool,
    calls: AtomicUsize,
}

impl Fixed {
    fn returning(code: i32) -> Arc<Self> {
        Arc::new(Self {
            code,
            fault_on: None,
            target_dependent: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn per_target(fault_on: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            code: 0,
            fault_on,
            target_dependent: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for Fixed {
    fn is_target_dependent(&self) -> bool {
        self.target_dependent
    }

    async fn execute(&self, ctx: PluginContext<'_>) -> anyhow::Result<i32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Package checkpoint plus unit checkpoint.
        assert_eq!(ctx.env.depth(), 2);
        if self.fault_on == Some(ctx.target) {
            anyhow::bail!("fault in {} for {}", ctx.package, ctx.target);
        }
        Ok(self.code)
    }
}

fn context(packages: &[&str], targets: &[&str]) -> BuildContext {
    BuildContext {
        name: "matrix".to_string(),
        group_name: "matrix".to_string(),
        workspace_root: std::env::temp_dir(),
        packages: packages.iter().map(|p| p.to_string()).collect(),
        targets: targets.iter().map(|t| t.to_string()).collect(),
        scopes: vec!["packrun".to_string()],
        arch_supported: vec![],
        packages_path: vec![],
        unit_timeout: None,
    }
}

async fn run(
    ctx: &BuildContext,
    repo: &RepoConfig,
    registry: &PluginRegistry,
    package_configs: &BTreeMap<String, ConfigDocument>,
) -> (RunTally, TestReport, BuildEnvironment) {
    let paths = WorkspacePaths::new(ctx.workspace_root.clone(), vec![]);
    let runner = MatrixRunner::new(ctx, repo, &paths, registry, package_configs, &[]);
    let mut env = BuildEnvironment::new();
    let mut report = TestReport::new();
    let tally = runner.run(&mut env, &mut report).await.unwrap();
    (tally, report, env)
}

#[tokio::test]
async fn test_fault_is_contained_to_its_unit() {
    let mut registry = PluginRegistry::new();
    registry
        .register(PluginDescriptor::new("Build", "build"), Fixed::per_target(None))
        .unwrap();
    registry
        .register(
            PluginDescriptor::new("Faulty", "faulty"),
            Fixed::per_target(Some("RELEASE")),
        )
        .unwrap();
    registry
        .register(PluginDescriptor::new("Test", "test"), Fixed::per_target(None))
        .unwrap();

    let ctx = context(&["CorePkg", "NetPkg"], &["DEBUG", "RELEASE"]);
    let (tally, report, env) = run(&ctx, &RepoConfig::default(), &registry, &BTreeMap::new()).await;

    assert_eq!(report.total(), 12);
    assert_eq!(report.count(CaseStatus::Error), 2);
    assert_eq!(report.count(CaseStatus::Success), 10);
    for suite in report.suites() {
        assert_eq!(suite.count(CaseStatus::Error), 1);
        assert_eq!(suite.cases().len(), 6);
        assert!(suite.cases().iter().all(|c| c.result().is_some()));
    }
    assert_eq!(tally, RunTally { total: 12, failed: 2 });
    assert_eq!(env.depth(), 0);
}

#[tokio::test]
async fn test_exit_status_counts_failures_and_errors() {
    struct Faulting;

    #[async_trait]
    impl Plugin for Faulting {
        async fn execute(&self, _ctx: PluginContext<'_>) -> anyhow::Result<i32> {
            Err(anyhow::anyhow!("unexpected"))
        }
    }

    let mut registry = PluginRegistry::new();
    registry
        .register(PluginDescriptor::new("A", "ok"), Fixed::returning(0))
        .unwrap();
    registry
        .register(PluginDescriptor::new("B", "fail"), Fixed::returning(1))
        .unwrap();
    registry
        .register(PluginDescriptor::new("C", "fault"), Arc::new(Faulting))
        .unwrap();
    registry
        .register(PluginDescriptor::new("D", "fail"), Fixed::returning(7))
        .unwrap();
    registry
        .register(PluginDescriptor::new("E", "ok"), Fixed::returning(0))
        .unwrap();

    let ctx = context(&["CorePkg"], &["DEBUG"]);
    let (tally, report, _) = run(&ctx, &RepoConfig::default(), &registry, &BTreeMap::new()).await;

    assert_eq!(report.count(CaseStatus::Success), 2);
    assert_eq!(report.count(CaseStatus::Failure), 2);
    assert_eq!(report.count(CaseStatus::Error), 1);
    assert_eq!(tally.exit_code(), 3);
}

#[tokio::test]
async fn test_skipped_plugin_is_never_invoked() {
    let skipped = Fixed::per_target(Some("DEBUG"));
    let after = Fixed::returning(0);
    let mut registry = PluginRegistry::new();
    registry
        .register(
            PluginDescriptor::new("Docs", "docs").with_config_name("Docs"),
            skipped.clone(),
        )
        .unwrap();
    registry
        .register(PluginDescriptor::new("After", "after"), after.clone())
        .unwrap();

    let mut repo = RepoConfig::default();
    repo.sections = ConfigDocument::new().with_section("Docs", [("skip", true)]);

    let ctx = context(&["CorePkg"], &["DEBUG", "RELEASE"]);
    let (tally, report, env) = run(&ctx, &repo, &registry, &BTreeMap::new()).await;

    assert_eq!(skipped.calls(), 0);
    assert_eq!(after.calls(), 1);
    assert_eq!(report.count(CaseStatus::Skipped), 2);
    for case in &report.suites()[0].cases()[..2] {
        assert_eq!(case.status(), Some(CaseStatus::Skipped));
        assert_eq!(case.duration(), Duration::ZERO);
    }
    assert_eq!(tally, RunTally { total: 3, failed: 0 });
    assert_eq!(env.depth(), 0);
    // One package checkpoint plus the single unit that ran.
    assert_eq!(env.checkpoints_taken(), 2);
}

#[test]
fn test_serialization_is_stable() {
    fn build() -> TestReport {
        let mut report = TestReport::new();
        let suite = report.new_suite("CorePkg", "packrun.core.CorePkg");

        let case = suite.new_case("Build CorePkg DEBUG", "CorePkg.Build.DEBUG");
        case.set_duration(Duration::from_millis(1250));
        case.set_result(ExecutionResult::success()).unwrap();

        let case = suite.new_case("Lint CorePkg", "CorePkg.Lint");
        case.log_mut().push_output("warning: <tab> in file & more");
        case.set_duration(Duration::from_millis(40));
        case.set_result(ExecutionResult::failure(2, "2 findings")).unwrap();
        report
    }

    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.xml");
    let second = dir.path().join("second.xml");
    build().serialize(&first, ReportFormat::Junit).unwrap();
    build().serialize(&second, ReportFormat::Junit).unwrap();

    let first = std::fs::read(first).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, std::fs::read(second).unwrap());
}
