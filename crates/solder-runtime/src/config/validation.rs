//! Configuration validation.

use super::schema::SolderConfig;
use crate::error::{ConfigError, ConfigResult};

const KNOWN_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Checks a parsed configuration for values the host cannot run with.
pub fn validate_config(config: &SolderConfig) -> ConfigResult<()> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "poll_interval_ms must be greater than zero".to_string(),
        ));
    }
    for dir in &config.plugin_dirs {
        if dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "plugin_dirs entries must be non-empty paths".to_string(),
            ));
        }
    }
    for prefix in &config.blocked_prefixes {
        if prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "blocked_prefixes entries must be non-empty".to_string(),
            ));
        }
    }
    let level = config.logging.level.to_ascii_lowercase();
    if !KNOWN_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "unknown log level '{}'",
            config.logging.level
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        validate_config(&SolderConfig::default()).unwrap();
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let config = SolderConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn empty_plugin_dir_is_rejected() {
        let config = SolderConfig {
            plugin_dirs: vec![std::path::PathBuf::new()],
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn bogus_log_level_is_rejected() {
        let mut config = SolderConfig::default();
        config.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }
}
