//! Configuration schema.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Top-level host configuration, usually loaded from `solder.yaml`.
///
/// ```yaml
/// plugin_dirs:
///   - plugins
///   - /opt/shared-plugins
/// poll_interval_ms: 500
/// analysis_threads: 0   # 0 = PLUGIN_MANAGER_MAX_THREADS / hardware
/// blocked_prefixes:
///   - com.vendor.internal.
/// logging:
///   level: debug
///   format: compact
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolderConfig {
    /// Directory trees scanned for plugin manifests and watched for new
    /// ones.
    pub plugin_dirs: Vec<PathBuf>,
    /// Bounded wait used by the directory watcher's poll fallback.
    pub poll_interval_ms: u64,
    /// Number of concurrent manifest analyses. Non-positive means "consult
    /// `PLUGIN_MANAGER_MAX_THREADS`, then hardware concurrency".
    pub analysis_threads: i64,
    /// Identity prefixes rejected before ingestion, in addition to the
    /// manager's own namespace.
    pub blocked_prefixes: Vec<String>,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Default for SolderConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: vec![PathBuf::from("plugins")],
            poll_interval_ms: 500,
            analysis_threads: 0,
            blocked_prefixes: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

// ─── Logging ─────────────────────────────────────────────────────────────────

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line, terse output.
    #[default]
    Compact,
    /// The default `tracing_subscriber` format.
    Full,
    /// Multi-line, human-oriented output.
    Pretty,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Line format.
    pub format: LogFormat,
    /// Include thread ids in output.
    pub thread_ids: bool,
    /// Include file and line of the callsite.
    pub file_location: bool,
    /// Per-module level overrides, e.g. `solder_manager: trace`.
    pub filters: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            thread_ids: false,
            file_location: false,
            filters: HashMap::new(),
        }
    }
}
