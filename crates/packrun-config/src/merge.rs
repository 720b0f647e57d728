//! Merging of repo-level and package-level plugin options.

use packrun_core::{ConfigDocument, EffectiveConfig, OptionMap, PluginDescriptor};

/// Compute the options a plugin sees for one package.
///
/// Starts empty, copies the repo-level section for the descriptor's config
/// key, then overlays the package-level section. Options from other
/// sections never leak in.
pub fn merge(
    repo: &ConfigDocument,
    package: &ConfigDocument,
    descriptor: &PluginDescriptor,
) -> EffectiveConfig {
    let key = descriptor.config_key();
    let mut options = OptionMap::new();

    if let Some(section) = repo.section(key) {
        options.extend(section.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    if let Some(section) = package.section(key) {
        options.extend(section.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    EffectiveConfig::new(options)
}
