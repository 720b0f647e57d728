//! Package-level configuration sources.

use std::collections::BTreeMap;

use packrun_core::{ConfigDocument, PathResolver};

use crate::{ConfigResult, parse_package_config};

/// File name suffix of package-level configuration files.
pub const PACKAGE_CONFIG_SUFFIX: &str = ".packrun.kdl";

/// Relative path of a package's config file: `<package>/<leaf>.packrun.kdl`.
pub fn package_config_path(package: &str) -> String {
    let package = package.trim_end_matches('/');
    let leaf = package.rsplit('/').next().unwrap_or(package);
    format!("{}/{}{}", package, leaf, PACKAGE_CONFIG_SUFFIX)
}

/// Where package-level configuration comes from. Loaded lazily, per package.
pub trait PackageConfigSource: Send + Sync {
    /// Load a package's configuration. `Ok(None)` if the package has none.
    fn load(&self, package: &str) -> ConfigResult<Option<ConfigDocument>>;
}

/// Loads package configuration files through a path resolver.
pub struct FilePackageConfigs<'a> {
    paths: &'a dyn PathResolver,
}

impl<'a> FilePackageConfigs<'a> {
    pub fn new(paths: &'a dyn PathResolver) -> Self {
        Self { paths }
    }
}

impl PackageConfigSource for FilePackageConfigs<'_> {
    fn load(&self, package: &str) -> ConfigResult<Option<ConfigDocument>> {
        let Some(path) = self.paths.absolute_from_relative(&package_config_path(package)) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&path)?;
        parse_package_config(&content).map(Some)
    }
}

impl PackageConfigSource for BTreeMap<String, ConfigDocument> {
    fn load(&self, package: &str) -> ConfigResult<Option<ConfigDocument>> {
        Ok(self.get(package).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use packrun_core::WorkspacePaths;

    #[test]
    fn test_package_config_path() {
        assert_eq!(package_config_path("CorePkg"), "CorePkg/CorePkg.packrun.kdl");
        assert_eq!(
            package_config_path("Silicon/NetPkg/"),
            "Silicon/NetPkg/NetPkg.packrun.kdl"
        );
    }

    #[test]
    fn test_file_source() {
        let ws = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(ws.path().join("CorePkg")).unwrap();
        std::fs::create_dir_all(ws.path().join("NetPkg")).unwrap();
        std::fs::create_dir_all(ws.path().join("BadPkg")).unwrap();
        std::fs::write(
            ws.path().join("CorePkg/CorePkg.packrun.kdl"),
            "Compile {\n    skip #true\n}\n",
        )
        .unwrap();
        std::fs::write(ws.path().join("BadPkg/BadPkg.packrun.kdl"), "Compile {").unwrap();

        let paths = WorkspacePaths::new(ws.path(), vec![]);
        let source = FilePackageConfigs::new(&paths);

        let core = source.load("CorePkg").unwrap().unwrap();
        assert!(core.section("Compile").is_some());
        assert!(source.load("NetPkg").unwrap().is_none());
        assert!(matches!(
            source.load("BadPkg").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }
}
