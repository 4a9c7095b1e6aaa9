//! Configuration file loader.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::schema::SolderConfig;
use super::validation::validate_config;
use crate::error::{ConfigError, ConfigResult};

/// Configuration loader with support for multiple search paths.
pub struct ConfigLoader {
    search_paths: Vec<PathBuf>,
}

impl ConfigLoader {
    /// Creates a new configuration loader with no search paths.
    pub fn new() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    /// Adds a search path for configuration files.
    pub fn add_search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.add_search_path(cwd)
        } else {
            self
        }
    }

    /// Loads configuration from the first available source, falling back to
    /// defaults when no file is found.
    pub fn load(&self) -> ConfigResult<SolderConfig> {
        if let Some(path) = self.find_config_file() {
            return self.load_from_file(&path);
        }
        info!("No configuration file found, using defaults");
        Ok(SolderConfig::default())
    }

    /// Loads configuration from a specific file.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<SolderConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        self.load_from_str(&content)
    }

    /// Loads configuration from a YAML string. An empty document yields the
    /// defaults.
    pub fn load_from_str(&self, yaml: &str) -> ConfigResult<SolderConfig> {
        let expanded = expand_env_vars(yaml);
        if expanded.trim().is_empty() {
            return Ok(SolderConfig::default());
        }
        let config: SolderConfig = serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Finds the first available configuration file.
    fn find_config_file(&self) -> Option<PathBuf> {
        const CONFIG_NAMES: &[&str] = &["solder.yaml", "solder.yml", ".solder.yaml"];

        for search_path in &self.search_paths {
            for name in CONFIG_NAMES {
                let path = search_path.join(name);
                debug!("Checking for config file: {}", path.display());
                if path.exists() {
                    info!("Found configuration file: {}", path.display());
                    return Some(path);
                }
            }
        }

        None
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().with_current_dir()
    }
}

/// Expands environment variables in the format `${VAR_NAME}` or
/// `${VAR_NAME:-default}`.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(:-([^}]*))?\}").unwrap();

    for cap in re.captures_iter(content) {
        let full_match = cap.get(0).unwrap().as_str();
        let var_name = cap.get(1).unwrap().as_str();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = std::env::var(var_name)
            .ok()
            .or_else(|| default_value.map(String::from))
            .unwrap_or_default();

        result = result.replace(full_match, &value);
    }

    result
}

/// Convenience function to load configuration with default settings.
pub fn load_config() -> ConfigResult<SolderConfig> {
    ConfigLoader::default().load()
}

/// Convenience function to load configuration from a specific file.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<SolderConfig> {
    ConfigLoader::new().load_from_file(path)
}

#[cfg(test)]
mod tests {
    use super::super::schema::LogFormat;
    use super::*;

    #[test]
    fn empty_yaml_yields_defaults() {
        let loader = ConfigLoader::new();
        let config = loader.load_from_str("").unwrap();
        assert_eq!(config.plugin_dirs, vec![PathBuf::from("plugins")]);
        assert_eq!(config.poll_interval_ms, 500);
    }

    #[test]
    fn fields_parse() {
        let yaml = r#"
plugin_dirs:
  - alpha
  - beta
poll_interval_ms: 250
analysis_threads: 4
blocked_prefixes:
  - com.vendor.internal.
logging:
  level: debug
  format: pretty
"#;
        let config = ConfigLoader::new().load_from_str(yaml).unwrap();
        assert_eq!(config.plugin_dirs.len(), 2);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.analysis_threads, 4);
        assert_eq!(config.blocked_prefixes, vec!["com.vendor.internal."]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn env_var_default_value_is_used_when_unset() {
        let yaml = r#"
plugin_dirs:
  - ${SOLDER_TEST_NONEXISTENT_DIR:-fallback-dir}
"#;
        let config = ConfigLoader::new().load_from_str(yaml).unwrap();
        assert_eq!(config.plugin_dirs, vec![PathBuf::from("fallback-dir")]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ConfigLoader::new()
            .load_from_file("/definitely/not/here/solder.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
