//! Plugin registry.
//!
//! The registry is filled by whatever discovers plugins (the CLI builds it
//! from the repo config's plugin declarations) and is read-only for the
//! execution loop. It also carries named helper functions plugins can share.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::{Error, Plugin, Result};

/// Identifies a registered plugin instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    name: String,
    module: String,
    config_name: Option<String>,
    source: String,
    target_dependent: bool,
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        let module = module.into();
        Self {
            name: name.into(),
            source: format!("builtin:{}", module),
            module,
            config_name: None,
            target_dependent: false,
        }
    }

    /// Give this instance its own config key.
    pub fn with_config_name(mut self, config_name: impl Into<String>) -> Self {
        self.config_name = Some(config_name.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn config_name(&self) -> Option<&str> {
        self.config_name.as_deref()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Key the plugin's options live under: the explicit per-instance name
    /// if there is one, otherwise the module name.
    pub fn config_key(&self) -> &str {
        self.config_name.as_deref().unwrap_or(&self.module)
    }

    pub fn is_target_dependent(&self) -> bool {
        self.target_dependent
    }
}

/// A descriptor and the plugin it describes.
#[derive(Clone)]
pub struct RegisteredPlugin {
    pub descriptor: PluginDescriptor,
    pub plugin: Arc<dyn Plugin>,
}

impl std::fmt::Debug for RegisteredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredPlugin")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// A shared function plugins can call by name.
pub type HelperFn = Arc<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Ordered set of plugins plus named helper functions.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
    helpers: BTreeMap<String, HelperFn>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Names must be unique; plugins run in registration order.
    pub fn register(
        &mut self,
        mut descriptor: PluginDescriptor,
        plugin: Arc<dyn Plugin>,
    ) -> Result<()> {
        if self.find(descriptor.name()).is_some() {
            return Err(Error::DuplicatePlugin(descriptor.name().to_string()));
        }
        descriptor.target_dependent = plugin.is_target_dependent();
        self.plugins.push(RegisteredPlugin { descriptor, plugin });
        Ok(())
    }

    pub fn plugins(&self) -> &[RegisteredPlugin] {
        &self.plugins
    }

    pub fn find(&self, name: &str) -> Option<&RegisteredPlugin> {
        self.plugins.iter().find(|p| p.descriptor.name() == name)
    }

    /// Config keys of every registered plugin.
    pub fn config_keys(&self) -> Vec<&str> {
        self.plugins
            .iter()
            .map(|p| p.descriptor.config_key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Register a helper function. A later registration replaces an earlier one.
    pub fn register_helper(&mut self, name: impl Into<String>, helper: HelperFn) {
        self.helpers.insert(name.into(), helper);
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name)
    }

    /// Call a helper by name.
    pub fn call_helper(&self, name: &str, args: &[String]) -> anyhow::Result<()> {
        let helper = self
            .helpers
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("helper '{}'", name)))?;
        helper(args)
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins)
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}
