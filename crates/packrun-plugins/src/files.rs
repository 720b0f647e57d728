//! The `required-files` plugin: checks that files exist in a package.

use anyhow::anyhow;
use async_trait::async_trait;
use packrun_core::{Plugin, PluginContext};
use tracing::warn;

/// Returns the number of entries in `files` missing from the package.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiredFilesPlugin;

#[async_trait]
impl Plugin for RequiredFilesPlugin {
    async fn execute(&self, ctx: PluginContext<'_>) -> anyhow::Result<i32> {
        let package_path = ctx
            .paths
            .absolute_from_relative(ctx.package)
            .ok_or_else(|| anyhow!("package {} not found", ctx.package))?;

        let files = ctx.config.get_string_list("files").unwrap_or_default();
        let missing: Vec<&String> = files
            .iter()
            .filter(|f| !package_path.join(f).exists())
            .collect();

        for file in &missing {
            warn!(package = %ctx.package, file = %file, "Required file missing");
            ctx.case.push_output(format!("missing: {}", file));
        }
        if !missing.is_empty() {
            ctx.case
                .fail_with(format!("{} of {} required files missing", missing.len(), files.len()));
        }

        Ok(i32::try_from(missing.len()).unwrap_or(i32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packrun_core::{
        BuildEnvironment, CaseLog, ConfigDocument, EffectiveConfig, OptionValue, PluginRegistry,
        RepoConfig, WorkspacePaths,
    };

    async fn check(ws: &std::path::Path, files: &[&str]) -> (i32, CaseLog) {
        let paths = WorkspacePaths::new(ws, vec![]);
        let doc = ConfigDocument::new().with_section(
            "required-files",
            [(
                "files",
                OptionValue::List(files.iter().map(|f| OptionValue::from(*f)).collect()),
            )],
        );
        let config = EffectiveConfig::new(doc.section("required-files").cloned().unwrap_or_default());
        let mut env = BuildEnvironment::new();
        let mut case = CaseLog::default();
        let registry = PluginRegistry::new();
        let repo = RepoConfig::default();

        let ctx = PluginContext {
            package: "CorePkg",
            target: "DEBUG",
            paths: &paths,
            args: &[],
            repo_config: &repo,
            config: &config,
            env: &mut env,
            registry: &registry,
            case: &mut case,
        };
        let code = RequiredFilesPlugin.execute(ctx).await.unwrap();
        (code, case)
    }

    #[tokio::test]
    async fn test_counts_missing_files() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(ws.path().join("CorePkg/Include")).unwrap();
        std::fs::write(ws.path().join("CorePkg/Readme.md"), "# Core").unwrap();

        let (code, case) = check(ws.path(), &["Readme.md", "Include", "License.txt", "CorePkg.dec"]).await;
        assert_eq!(code, 2);
        assert_eq!(case.output(), ["missing: License.txt", "missing: CorePkg.dec"]);
        assert_eq!(case.failure_message(), Some("2 of 4 required files missing"));

        let (code, case) = check(ws.path(), &["Readme.md"]).await;
        assert_eq!(code, 0);
        assert!(case.failure_message().is_none());
    }
}
