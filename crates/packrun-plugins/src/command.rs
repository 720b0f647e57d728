//! The `command` plugin: runs an external program against a package.
//!
//! Options:
//! - `program` - Program to run (required, interpolated)
//! - `args` - Arguments, each interpolated
//! - `cwd` - Working directory relative to the package (default: the package)
//! - `before` - Helper name followed by its arguments, called before the program
//! - `pass-args` - Append the driver's extra command-line arguments

use std::process::Stdio;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use packrun_config::{VariableContext, VariableContextBuilder};
use packrun_core::{Plugin, PluginContext};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs `program` with the build environment exported.
#[derive(Debug, Clone, Default)]
pub struct CommandPlugin {
    target_dependent: bool,
}

impl CommandPlugin {
    pub fn new(target_dependent: bool) -> Self {
        Self { target_dependent }
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    fn is_target_dependent(&self) -> bool {
        self.target_dependent
    }

    async fn execute(&self, ctx: PluginContext<'_>) -> anyhow::Result<i32> {
        let package_path = ctx
            .paths
            .absolute_from_relative(ctx.package)
            .ok_or_else(|| anyhow!("package {} not found", ctx.package))?;

        let vars = VariableContextBuilder::new()
            .with_workspace(ctx.paths.workspace_root().display().to_string())
            .with_package(ctx.package, package_path.display().to_string())
            .with_target(ctx.target)
            .with_envs(ctx.env.iter())
            .build();

        let program = ctx
            .config
            .get_str("program")
            .map(|p| vars.interpolate(p))
            .ok_or_else(|| anyhow!("option 'program' is required"))?;

        if let Some(before) = ctx.config.get_string_list("before") {
            run_helper(&ctx, &vars, &before)?;
        }

        let mut args = vars.interpolate_vec(&ctx.config.get_string_list("args").unwrap_or_default());
        if ctx.config.get_bool("pass-args").unwrap_or(false) {
            args.extend(ctx.args.iter().cloned());
        }

        let cwd = match ctx.config.get_str("cwd") {
            Some(dir) => package_path.join(vars.interpolate(dir)),
            None => package_path,
        };

        info!(program = %program, ?args, cwd = %cwd.display(), "Running command");

        let output = Command::new(&program)
            .args(&args)
            .current_dir(&cwd)
            .envs(ctx.env.iter())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to start {}", program))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            debug!("{}", line);
            ctx.case.push_output(line);
        }

        match output.status.code() {
            Some(0) => Ok(0),
            Some(code) => {
                ctx.case
                    .fail_with(format!("{} exited with code {}", program, code));
                Ok(1)
            }
            None => bail!("{} was terminated by a signal", program),
        }
    }
}

fn run_helper(ctx: &PluginContext<'_>, vars: &VariableContext, before: &[String]) -> anyhow::Result<()> {
    let (helper, args) = before
        .split_first()
        .ok_or_else(|| anyhow!("option 'before' needs a helper name"))?;
    let args = vars.interpolate_vec(args);

    debug!(helper = %helper, ?args, "Calling helper");
    ctx.registry
        .call_helper(helper, &args)
        .with_context(|| format!("helper '{}' failed", helper))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::register_helpers;
    use packrun_core::{
        BuildEnvironment, CaseLog, ConfigDocument, EffectiveConfig, OptionValue, PluginRegistry,
        RepoConfig, WorkspacePaths,
    };

    struct Harness {
        ws: tempfile::TempDir,
        paths: WorkspacePaths,
        registry: PluginRegistry,
        repo: RepoConfig,
        env: BuildEnvironment,
        case: CaseLog,
    }

    impl Harness {
        fn new() -> Self {
            let ws = tempfile::tempdir().unwrap();
            std::fs::create_dir(ws.path().join("CorePkg")).unwrap();
            let paths = WorkspacePaths::new(ws.path(), vec![]);
            let mut registry = PluginRegistry::new();
            register_helpers(&mut registry);
            let mut env = BuildEnvironment::from_vars([("TARGET_ARCH", "X64", "test")]);
            env.checkpoint();
            env.set_value("TARGET", "DEBUG", "test").unwrap();

            Self {
                ws,
                paths,
                registry,
                repo: RepoConfig::default(),
                env,
                case: CaseLog::default(),
            }
        }

        async fn run(&mut self, options: Vec<(&str, OptionValue)>, args: &[String]) -> anyhow::Result<i32> {
            let doc = ConfigDocument::new().with_section("command", options);
            let config = EffectiveConfig::new(doc.section("command").cloned().unwrap_or_default());
            let ctx = PluginContext {
                package: "CorePkg",
                target: "DEBUG",
                paths: &self.paths,
                args,
                repo_config: &self.repo,
                config: &config,
                env: &mut self.env,
                registry: &self.registry,
                case: &mut self.case,
            };
            CommandPlugin::new(true).execute(ctx).await
        }
    }

    fn list(items: &[&str]) -> OptionValue {
        OptionValue::List(items.iter().map(|s| OptionValue::from(*s)).collect())
    }

    #[tokio::test]
    async fn test_success_captures_output() {
        let mut h = Harness::new();
        let code = h
            .run(
                vec![
                    ("program", "sh".into()),
                    ("args", list(&["-c", "echo ${target} $TARGET_ARCH; pwd"])),
                ],
                &[],
            )
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(h.case.output()[0], "DEBUG X64");
        assert!(h.case.output()[1].ends_with("CorePkg"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let mut h = Harness::new();
        let code = h
            .run(
                vec![("program", "sh".into()), ("args", list(&["-c", "exit 3"]))],
                &[],
            )
            .await
            .unwrap();

        assert_eq!(code, 1);
        assert_eq!(h.case.failure_message(), Some("sh exited with code 3"));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_error() {
        let mut h = Harness::new();
        let err = h
            .run(vec![("program", "/nonexistent/packrun-tool".into())], &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to start"));

        let err = h.run(vec![], &[]).await.unwrap_err();
        assert!(err.to_string().contains("program"));
    }

    #[tokio::test]
    async fn test_before_helper_and_pass_args() {
        let mut h = Harness::new();
        let extra = vec!["--verbose".to_string()];
        let code = h
            .run(
                vec![
                    ("program", "sh".into()),
                    ("args", list(&["-c", "test -d out/logs && echo \"$0\"", "first"])),
                    ("before", list(&["make-dirs", "${package_path}/out/logs"])),
                    ("pass-args", true.into()),
                ],
                &extra,
            )
            .await
            .unwrap();

        assert_eq!(code, 0);
        assert!(h.ws.path().join("CorePkg/out/logs").is_dir());
        assert_eq!(h.case.output(), ["first"]);
    }

    #[tokio::test]
    async fn test_unknown_helper_is_error() {
        let mut h = Harness::new();
        let err = h
            .run(
                vec![("program", "true".into()), ("before", list(&["nope"]))],
                &[],
            )
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("helper 'nope'"));
    }
}
