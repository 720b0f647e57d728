//! Matrix runner - executes every plugin against every package and target.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures::FutureExt;
use packrun_config::{PackageConfigSource, check_package_config, merge};
use packrun_core::{
    BuildContext, BuildEnvironment, CaseLog, EffectiveConfig, EnvironmentSnapshot,
    ExecutionResult, PathResolver, PluginContext, PluginRegistry, RegisteredPlugin, RepoConfig,
    TestReport,
};
use tracing::{Instrument, error, info, info_span, warn};

use crate::RunnerResult;

/// Variable holding the active target while a unit runs.
pub const TARGET_VAR: &str = "TARGET";

const SOURCE: &str = "packrun";

/// Unit counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    /// Every unit, skipped ones included.
    pub total: usize,
    /// Units that failed or faulted.
    pub failed: usize,
}

impl RunTally {
    /// Process exit status: the failed unit count, saturated at 255.
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.failed).unwrap_or(u8::MAX)
    }
}

/// Checkpoint taken around one package and the state it captured.
struct PackageFrame<'p> {
    package: &'p str,
    depth: usize,
    baseline: EnvironmentSnapshot,
}

/// Executes the package × plugin × target matrix sequentially.
pub struct MatrixRunner<'a> {
    context: &'a BuildContext,
    repo: &'a RepoConfig,
    paths: &'a dyn PathResolver,
    registry: &'a PluginRegistry,
    package_configs: &'a dyn PackageConfigSource,
    args: &'a [String],
}

impl<'a> MatrixRunner<'a> {
    pub fn new(
        context: &'a BuildContext,
        repo: &'a RepoConfig,
        paths: &'a dyn PathResolver,
        registry: &'a PluginRegistry,
        package_configs: &'a dyn PackageConfigSource,
        args: &'a [String],
    ) -> Self {
        Self {
            context,
            repo,
            paths,
            registry,
            package_configs,
            args,
        }
    }

    /// Run every unit, recording one case per unit in `report`.
    ///
    /// Each package runs inside its own environment checkpoint. Only
    /// scaffolding errors (configuration, checkpoint misuse) are returned.
    pub async fn run(
        &self,
        env: &mut BuildEnvironment,
        report: &mut TestReport,
    ) -> RunnerResult<RunTally> {
        let mut tally = RunTally::default();

        for package in &self.context.packages {
            let span = info_span!("package", package = %package);
            let suite_package = format!("packrun.{}.{}", self.context.group_name, package);

            let depth = env.checkpoint();
            let frame = PackageFrame {
                package,
                depth,
                baseline: env.snapshot(),
            };
            let outcome = self
                .run_package(package, &suite_package, &frame, env, report)
                .instrument(span)
                .await;
            env.revert_to(depth)?;

            let counts = outcome?;
            tally.total += counts.total;
            tally.failed += counts.failed;
        }

        Ok(tally)
    }

    async fn run_package(
        &self,
        package: &str,
        suite_package: &str,
        frame: &PackageFrame<'_>,
        env: &mut BuildEnvironment,
        report: &mut TestReport,
    ) -> RunnerResult<RunTally> {
        let mut tally = RunTally::default();
        let suite = report.new_suite(package, suite_package);

        let package_config = self.package_configs.load(package)?.unwrap_or_default();
        let keys = self.registry.config_keys();
        for warning in check_package_config(package, &package_config, &keys) {
            warn!("{}", warning);
        }

        info!("Running package");

        for registered in self.registry.plugins() {
            let descriptor = &registered.descriptor;

            for target in self.context.targets_for(descriptor.is_target_dependent()) {
                let label = registered.plugin.describe_case(descriptor, package, target);
                let case = suite.new_case(label.name, label.class_name);
                let config = merge(&self.repo.sections, &package_config, descriptor);
                tally.total += 1;

                if config.is_skipped() {
                    info!(plugin = %descriptor.name(), build_target = %target, "Skipping plugin");
                    case.set_result(ExecutionResult::skipped())?;
                    continue;
                }

                let started = Instant::now();
                let result = self
                    .run_unit(registered, target, &config, frame, env, case.log_mut())
                    .await?;
                case.set_duration(started.elapsed());

                if result.status.is_failure() {
                    tally.failed += 1;
                }
                case.set_result(result)?;
            }
        }

        Ok(tally)
    }

    /// Run one unit between a checkpoint and its revert.
    ///
    /// The unit's own frame is restored even when the plugin leaves frames
    /// open. A plugin that pops the unit frame is recorded as an error and
    /// the package frame is rebuilt from its baseline.
    async fn run_unit(
        &self,
        registered: &RegisteredPlugin,
        target: &str,
        config: &EffectiveConfig,
        frame: &PackageFrame<'_>,
        env: &mut BuildEnvironment,
        case: &mut CaseLog,
    ) -> RunnerResult<ExecutionResult> {
        let name = registered.descriptor.name();
        info!(plugin = %name, build_target = %target, "Running plugin");

        let depth = env.checkpoint();
        let mut outcome = match env.set_value(TARGET_VAR, target, SOURCE) {
            Ok(()) => {
                let ctx = PluginContext {
                    package: frame.package,
                    target,
                    paths: self.paths,
                    args: self.args,
                    repo_config: self.repo,
                    config,
                    env: &mut *env,
                    registry: self.registry,
                    case: &mut *case,
                };
                self.invoke(registered, ctx).await
            }
            Err(e) => Err(e.into()),
        };

        match env.revert_to(depth) {
            Ok(0) => {}
            Ok(open) => {
                warn!(plugin = %name, build_target = %target, open, "Plugin left checkpoints open");
            }
            Err(e) => {
                env.reset(frame.depth, &frame.baseline);
                let unbalanced =
                    anyhow::Error::from(e).context("plugin reverted past its own checkpoint");
                outcome = match outcome {
                    Ok(_) => Err(unbalanced),
                    Err(fault) => {
                        warn!(plugin = %name, build_target = %target, "{:#}", unbalanced);
                        Err(fault)
                    }
                };
            }
        }

        let result = match outcome {
            Ok(0) => {
                info!(plugin = %name, build_target = %target, "Plugin succeeded");
                ExecutionResult::success()
            }
            Ok(code) => {
                let message = case
                    .failure_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} failed with code {}", name, code));
                error!(plugin = %name, build_target = %target, code, "Plugin failed: {}", message);
                ExecutionResult::failure(code, message)
            }
            Err(e) => {
                error!(plugin = %name, build_target = %target, error = ?e, "Plugin raised an error");
                case.push_output(format!("{:?}", e));
                ExecutionResult::error(format!("{:#}", e))
            }
        };

        Ok(result)
    }

    /// Call the plugin, turning panics and timeouts into errors.
    async fn invoke(
        &self,
        registered: &RegisteredPlugin,
        ctx: PluginContext<'_>,
    ) -> anyhow::Result<i32> {
        let call = AssertUnwindSafe(registered.plugin.execute(ctx)).catch_unwind();

        let caught = match self.context.unit_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                anyhow::anyhow!("timed out after {} seconds", limit.as_secs_f64())
            })?,
            None => call.await,
        };

        caught.map_err(|payload| anyhow::anyhow!("panicked: {}", panic_message(&*payload)))?
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
