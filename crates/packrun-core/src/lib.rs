//! Core domain types and traits for the packrun build driver.
//!
//! This crate contains:
//! - The build environment and its checkpoint stack
//! - Configuration data model (option values, documents, build context)
//! - Plugin contract, descriptors and the plugin registry
//! - Path resolution handle
//! - The hierarchical test report

pub mod context;
pub mod env;
pub mod error;
pub mod options;
pub mod paths;
pub mod plugin;
pub mod registry;
pub mod report;

pub use context::{BuildContext, DEFAULT_SCOPE, DEFAULT_TARGET, RepoConfig};
pub use env::{BuildEnvironment, EnvVar, EnvironmentSnapshot};
pub use error::{Error, Result};
pub use options::{ConfigDocument, EffectiveConfig, OptionMap, OptionValue};
pub use paths::{PathResolver, WorkspacePaths};
pub use plugin::{CaseLabel, Plugin, PluginContext};
pub use registry::{HelperFn, PluginDescriptor, PluginRegistry, RegisteredPlugin};
pub use report::{
    CaseLog, CaseStatus, ExecutionResult, ReportFormat, TestCase, TestReport, TestSuite,
};
