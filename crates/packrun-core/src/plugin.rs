//! Plugin contract.
//!
//! A plugin is anything that can run against one package for one target.
//! The execution loop owns everything around the call: configuration,
//! environment checkpoints, fault containment and result recording.

use async_trait::async_trait;

use crate::{
    BuildEnvironment, CaseLog, EffectiveConfig, PathResolver, PluginDescriptor, PluginRegistry,
    RepoConfig,
};

/// Name and class name of the report case for one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLabel {
    pub name: String,
    pub class_name: String,
}

/// Everything a plugin receives for one invocation.
pub struct PluginContext<'a> {
    /// Workspace-relative package identifier.
    pub package: &'a str,
    /// Active target (also exported as `TARGET`).
    pub target: &'a str,
    pub paths: &'a dyn PathResolver,
    /// Remaining command-line arguments, passed through untouched.
    pub args: &'a [String],
    pub repo_config: &'a RepoConfig,
    /// Merged options for this plugin and package.
    pub config: &'a EffectiveConfig,
    /// Build environment, inside a checkpoint owned by the loop.
    pub env: &'a mut BuildEnvironment,
    /// Registry, for sibling plugins and helper functions.
    pub registry: &'a PluginRegistry,
    /// Output and diagnostics for the open report case.
    pub case: &'a mut CaseLog,
}

/// A build or test step run once per package (and per target if target dependent).
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Whether the plugin runs once per configured target.
    fn is_target_dependent(&self) -> bool {
        false
    }

    /// Label of the report case for a unit.
    fn describe_case(&self, descriptor: &PluginDescriptor, package: &str, target: &str) -> CaseLabel {
        if descriptor.is_target_dependent() {
            CaseLabel {
                name: format!("{} {} {}", descriptor.name(), package, target),
                class_name: format!("{}.{}.{}", package, descriptor.config_key(), target),
            }
        } else {
            CaseLabel {
                name: format!("{} {}", descriptor.name(), package),
                class_name: format!("{}.{}", package, descriptor.config_key()),
            }
        }
    }

    /// Run the plugin.
    ///
    /// `Ok(0)` is success; any other value is the number of failures found.
    /// `Err` means the plugin itself broke and is reported as an error.
    async fn execute(&self, ctx: PluginContext<'_>) -> anyhow::Result<i32>;
}
