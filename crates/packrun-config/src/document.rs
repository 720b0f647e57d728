//! Repo-level and package-level configuration parsing.

use crate::{ConfigError, ConfigResult};
use kdl::{KdlDocument, KdlNode, KdlValue};
use packrun_core::context::{DependencySpec, PluginDeclaration};
use packrun_core::{ConfigDocument, OptionMap, OptionValue, RepoConfig};

/// Parse a repo-level configuration from KDL text.
///
/// Reserved top-level nodes describe the run; every other node with
/// children is a plugin option section keyed by the node name.
pub fn parse_repo_config(kdl: &str) -> ConfigResult<RepoConfig> {
    let doc: KdlDocument = kdl.parse()?;
    let mut repo = RepoConfig::default();

    for node in doc.nodes() {
        match node.name().value() {
            "name" => repo.name = get_first_string_arg(node),
            "group-name" => repo.group_name = get_first_string_arg(node),
            "workspace-root" => repo.workspace_root = get_first_string_arg(node),
            "packages" => repo.packages.extend(get_all_string_args(node)),
            "targets" => repo.targets.extend(get_all_string_args(node)),
            "arch-supported" => repo.arch_supported.extend(get_all_string_args(node)),
            "scopes" => repo.scopes.extend(get_all_string_args(node)),
            "packages-path" => repo.packages_path.extend(get_all_string_args(node)),
            "unit-timeout-secs" => {
                repo.unit_timeout_secs = Some(parse_timeout(node)?);
            }
            "plugins" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        if child.name().value() == "plugin" {
                            repo.plugins.push(parse_plugin(child)?);
                        }
                    }
                }
            }
            "dependencies" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        if child.name().value() == "dependency" {
                            repo.dependencies.push(parse_dependency(child)?);
                        }
                    }
                }
            }
            section => {
                if let Some(children) = node.children() {
                    repo.sections
                        .insert_section(section, parse_options(section, children)?);
                }
            }
        }
    }

    Ok(repo)
}

/// Parse a package-level configuration from KDL text.
/// Every top-level node with children is a plugin option section.
pub fn parse_package_config(kdl: &str) -> ConfigResult<ConfigDocument> {
    let doc: KdlDocument = kdl.parse()?;
    let mut config = ConfigDocument::new();

    for node in doc.nodes() {
        if let Some(children) = node.children() {
            let section = node.name().value();
            config.insert_section(section, parse_options(section, children)?);
        }
    }

    Ok(config)
}

fn parse_plugin(node: &KdlNode) -> ConfigResult<PluginDeclaration> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("plugin name".to_string()))?;
    let module = get_string_prop(node, "module")
        .ok_or_else(|| ConfigError::MissingField(format!("module for plugin '{}'", name)))?;

    Ok(PluginDeclaration {
        module,
        config_name: get_string_prop(node, "config-name"),
        scope: get_string_prop(node, "scope"),
        target_dependent: get_bool_prop(node, "target-dependent").unwrap_or(false),
        name,
    })
}

fn parse_dependency(node: &KdlNode) -> ConfigResult<DependencySpec> {
    let name = get_first_string_arg(node)
        .ok_or_else(|| ConfigError::MissingField("dependency name".to_string()))?;

    Ok(DependencySpec {
        path: get_string_prop(node, "path").unwrap_or_else(|| name.clone()),
        url: get_string_prop(node, "url"),
        branch: get_string_prop(node, "branch"),
        commit: get_string_prop(node, "commit"),
        name,
    })
}

fn parse_timeout(node: &KdlNode) -> ConfigResult<u64> {
    let invalid = |message: &str| ConfigError::InvalidValue {
        field: "unit-timeout-secs".to_string(),
        message: message.to_string(),
    };

    let value = node
        .entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_integer())
        .ok_or_else(|| invalid("expected an integer"))?;

    match u64::try_from(value) {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(invalid("must be a positive number of seconds")),
    }
}

/// Parse the option nodes of one section.
fn parse_options(section: &str, children: &KdlDocument) -> ConfigResult<OptionMap> {
    let mut options = OptionMap::new();

    for child in children.nodes() {
        let name = child.name().value();
        let field = format!("{}.{}", section, name);
        let mut args = child
            .entries()
            .iter()
            .filter(|e| e.name().is_none())
            .map(|e| convert_value(&field, e.value()))
            .collect::<ConfigResult<Vec<_>>>()?;

        let value = match args.len() {
            // A bare option node is a flag.
            0 => OptionValue::Bool(true),
            1 => args.remove(0),
            _ => OptionValue::List(args),
        };
        options.insert(name.to_string(), value);
    }

    Ok(options)
}

fn convert_value(field: &str, value: &KdlValue) -> ConfigResult<OptionValue> {
    if let Some(s) = value.as_string() {
        return Ok(OptionValue::String(s.to_string()));
    }
    if let Some(b) = value.as_bool() {
        return Ok(OptionValue::Bool(b));
    }
    if let Some(i) = value.as_integer() {
        return i64::try_from(i)
            .map(OptionValue::Integer)
            .map_err(|_| ConfigError::InvalidValue {
                field: field.to_string(),
                message: format!("integer {} out of range", i),
            });
    }
    if let Some(f) = value.as_float() {
        return Ok(OptionValue::Float(f));
    }
    Ok(OptionValue::Null)
}

// Helper functions for extracting values from KDL nodes

fn get_first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

fn get_all_string_args(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string())
        .map(|s| s.to_string())
        .collect()
}

fn get_string_prop(node: &KdlNode, name: &str) -> Option<String> {
    node.get(name)
        .and_then(|v| v.as_string())
        .map(|s| s.to_string())
}

fn get_bool_prop(node: &KdlNode, name: &str) -> Option<bool> {
    node.get(name).and_then(|v| v.as_bool())
}
