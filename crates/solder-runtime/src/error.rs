//! Runtime error types.

use std::path::PathBuf;

use thiserror::Error;

use solder_core::PluginError;

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File not found at the specified path.
    #[error("configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to read the configuration file.
    #[error("failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// The configuration parsed but failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while running the host.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The filesystem watcher failed.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// A manifest file could not be read or parsed.
    #[error("manifest error in {path}: {message}")]
    Manifest {
        /// Path of the offending manifest.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// An error surfaced by the plugin manager core.
    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// Filesystem access failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
