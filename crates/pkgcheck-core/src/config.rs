//! Checker configuration: `pkgcheck.yaml` (or `.yml`/`.json`) merged with
//! command line overrides.

use crate::build_env::BuildEnv;
use crate::cache::DEFAULT_CAPACITY;
use crate::syntax::DEFAULT_SYNTAX_ERROR_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names searched for, in order, when no config path is given.
pub const CONFIG_FILE_NAMES: &[&str] = &["pkgcheck.yaml", "pkgcheck.yml", "pkgcheck.json"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize configuration: {0}")]
    Serialize(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Import cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportCacheOptions {
    /// Keep resolved imports between checks (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached packages (default: 100)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_error_limit() -> usize {
    DEFAULT_SYNTAX_ERROR_LIMIT
}

impl Default for ImportCacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Main checker configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerConfig {
    /// Platform, tags and import search paths
    #[serde(default)]
    pub build: BuildEnv,

    /// Type errors reported per check unless all errors are requested (default: 10)
    #[serde(default = "default_error_limit")]
    pub error_limit: usize,

    /// Check in-package test files along with the target (default: false)
    #[serde(default)]
    pub include_tests: bool,

    /// Report every error instead of stopping at the limit (default: false)
    #[serde(default)]
    pub all_errors: bool,

    #[serde(default)]
    pub import_cache: ImportCacheOptions,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            build: BuildEnv::default(),
            error_limit: DEFAULT_SYNTAX_ERROR_LIMIT,
            include_tests: false,
            all_errors: false,
            import_cache: ImportCacheOptions::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the file's setting.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub os: Option<String>,
    pub arch: Option<String>,
    pub tags: Option<Vec<String>>,
    pub search_paths: Option<Vec<PathBuf>>,
    pub interop: Option<bool>,
    pub error_limit: Option<usize>,
    pub include_tests: Option<bool>,
    pub all_errors: Option<bool>,
    pub cache_enabled: Option<bool>,
    pub cache_capacity: Option<usize>,
}

impl CheckerConfig {
    /// Load configuration from a YAML or JSON file, chosen by extension
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let config: CheckerConfig = if is_json {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// First config file present in `dir`
    pub fn find_in(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Write the default configuration as YAML
    pub fn init_file(path: &Path) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(&CheckerConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Merge CLI overrides into this configuration
    pub fn merge(&mut self, overrides: &CliOverrides) {
        if let Some(os) = &overrides.os {
            self.build.os = os.clone();
        }
        if let Some(arch) = &overrides.arch {
            self.build.arch = arch.clone();
        }
        if let Some(tags) = &overrides.tags {
            self.build.tags = tags.clone();
        }
        if let Some(paths) = &overrides.search_paths {
            // command line roots are searched before the configured ones
            let mut search_paths = paths.clone();
            search_paths.extend(self.build.search_paths.drain(..));
            self.build.search_paths = search_paths;
        }
        if let Some(interop) = overrides.interop {
            self.build.interop = interop;
        }
        if let Some(limit) = overrides.error_limit {
            self.error_limit = limit;
        }
        if let Some(include_tests) = overrides.include_tests {
            self.include_tests = include_tests;
        }
        if let Some(all_errors) = overrides.all_errors {
            self.all_errors = all_errors;
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.import_cache.enabled = enabled;
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.import_cache.capacity = capacity;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.error_limit == 0 {
            return Err(ConfigError::Invalid(
                "errorLimit must be at least 1".to_string(),
            ));
        }
        if self.import_cache.capacity == 0 {
            return Err(ConfigError::Invalid(
                "importCache.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CheckerConfig::default();
        assert_eq!(config.error_limit, 10);
        assert!(config.import_cache.enabled);
        assert_eq!(config.import_cache.capacity, 100);
        assert!(config.build.interop);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_yaml() {
        let yaml = r#"
build:
  os: linux
  tags: [fast]
  searchPaths: [/opt/mini]
errorLimit: 25
importCache:
  capacity: 8
"#;
        let config: CheckerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.build.os, "linux");
        assert_eq!(config.build.tags, vec!["fast"]);
        assert_eq!(config.build.search_paths, vec![PathBuf::from("/opt/mini")]);
        assert_eq!(config.build.arch, std::env::consts::ARCH);
        assert_eq!(config.error_limit, 25);
        assert!(config.import_cache.enabled);
        assert_eq!(config.import_cache.capacity, 8);
    }

    #[test]
    fn test_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgcheck.json");
        std::fs::write(&path, r#"{"allErrors": true, "build": {"interop": false}}"#).unwrap();

        let config = CheckerConfig::from_file(&path).unwrap();
        assert!(config.all_errors);
        assert!(!config.build.interop);
    }

    #[test]
    fn test_from_file_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgcheck.yaml");
        std::fs::write(&path, "errorLimit: 0\n").unwrap();

        let err = CheckerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_file_reports_syntax_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgcheck.yaml");
        std::fs::write(&path, "errorLimit: [unclosed\n").unwrap();

        let err = CheckerConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_init_file_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pkgcheck.yaml");
        CheckerConfig::init_file(&path).unwrap();

        assert_eq!(CheckerConfig::find_in(dir.path()), Some(path.clone()));
        assert_eq!(
            CheckerConfig::from_file(&path).unwrap(),
            CheckerConfig::default()
        );
    }

    #[test]
    fn test_merge_overrides() {
        let mut config = CheckerConfig::default();
        config.build.search_paths = vec![PathBuf::from("/configured")];

        config.merge(&CliOverrides {
            os: Some("windows".to_string()),
            search_paths: Some(vec![PathBuf::from("/cli")]),
            interop: Some(false),
            cache_enabled: Some(false),
            error_limit: Some(3),
            ..CliOverrides::default()
        });

        assert_eq!(config.build.os, "windows");
        assert_eq!(
            config.build.search_paths,
            vec![PathBuf::from("/cli"), PathBuf::from("/configured")]
        );
        assert!(!config.build.interop);
        assert!(!config.import_cache.enabled);
        assert_eq!(config.error_limit, 3);
        assert!(!config.all_errors);
    }
}
