//! Built-in plugins for packrun.
//!
//! Provides the plugin modules a repo config can declare:
//! - `command` - runs an external program per package
//! - `required-files` - checks that files exist in each package
//!
//! and the `make-dirs` helper plugins can call through the registry.

pub mod command;
pub mod files;

use std::sync::Arc;

use anyhow::Context;
use packrun_config::{ConfigError, ConfigResult};
use packrun_core::context::PluginDeclaration;
use packrun_core::{BuildContext, Plugin, PluginDescriptor, PluginRegistry};
use tracing::debug;

pub use command::CommandPlugin;
pub use files::RequiredFilesPlugin;

pub const COMMAND: &str = "command";
pub const REQUIRED_FILES: &str = "required-files";
pub const MAKE_DIRS: &str = "make-dirs";

/// Names of the built-in modules.
pub fn builtin_modules() -> &'static [&'static str] {
    &[COMMAND, REQUIRED_FILES]
}

/// Instantiate a built-in module for a declaration.
pub fn builtin(declaration: &PluginDeclaration) -> Option<Arc<dyn Plugin>> {
    match declaration.module.as_str() {
        COMMAND => Some(Arc::new(CommandPlugin::new(declaration.target_dependent))),
        REQUIRED_FILES => Some(Arc::new(RequiredFilesPlugin)),
        _ => None,
    }
}

/// Build the registry for a run from the repo config's plugin declarations.
///
/// Declarations scoped to an inactive scope are left out.
pub fn registry_from_declarations(
    declarations: &[PluginDeclaration],
    context: &BuildContext,
) -> ConfigResult<PluginRegistry> {
    let mut registry = PluginRegistry::new();

    for declaration in declarations {
        if let Some(scope) = &declaration.scope {
            if !context.has_scope(scope) {
                debug!(plugin = %declaration.name, scope = %scope, "Scope not active, skipping plugin");
                continue;
            }
        }

        let plugin = builtin(declaration).ok_or_else(|| {
            ConfigError::InvalidReference(format!(
                "plugin '{}' uses unknown module '{}'",
                declaration.name, declaration.module
            ))
        })?;

        let mut descriptor = PluginDescriptor::new(&declaration.name, &declaration.module);
        if let Some(config_name) = &declaration.config_name {
            descriptor = descriptor.with_config_name(config_name);
        }

        registry
            .register(descriptor, plugin)
            .map_err(|_| ConfigError::Duplicate(format!("plugin '{}'", declaration.name)))?;
    }

    register_helpers(&mut registry);
    Ok(registry)
}

/// Register the built-in helper functions.
pub fn register_helpers(registry: &mut PluginRegistry) {
    registry.register_helper(MAKE_DIRS, Arc::new(make_dirs));
}

/// Create every argument directory, with parents.
fn make_dirs(dirs: &[String]) -> anyhow::Result<()> {
    for dir in dirs {
        std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir))?;
    }
    Ok(())
}
