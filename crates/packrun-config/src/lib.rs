//! KDL configuration parsing for packrun.
//!
//! This crate handles:
//! - Repo-level and package-level configuration documents (`*.packrun.kdl`)
//! - Resolution of the build context (workspace, packages, scopes)
//! - Merging plugin option sections into an effective configuration
//! - Validation and variable interpolation

pub mod context;
pub mod document;
pub mod error;
pub mod merge;
pub mod package;
pub mod validate;
pub mod variables;

pub use context::{DependencyResolver, LocalDependencies, load_repo_config, resolve_context};
pub use document::{parse_package_config, parse_repo_config};
pub use error::{ConfigError, ConfigResult};
pub use merge::merge;
pub use package::{FilePackageConfigs, PackageConfigSource, package_config_path};
pub use validate::{ConfigWarning, check_package_config, check_repo_config};
pub use variables::{VariableContext, VariableContextBuilder};
