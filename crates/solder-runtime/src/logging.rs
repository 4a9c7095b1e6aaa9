//! Logging setup for the solder host.
//!
//! A thin, configuration-driven wrapper over `tracing-subscriber`. The
//! `RUST_LOG` environment variable, when set, wins over the configured base
//! level; per-module overrides from the configuration are appended either
//! way.
//!
//! ```rust,ignore
//! use solder_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Initializes logging from a [`LoggingConfig`].
///
/// Safe to call more than once; later calls are ignored.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

/// A builder for configuring logging by hand.
///
/// ```rust,ignore
/// LoggingBuilder::new()
///     .level("debug")
///     .directive("solder_manager=trace")
///     .init();
/// ```
#[derive(Default)]
pub struct LoggingBuilder {
    level: Option<String>,
    directives: Vec<String>,
    format: LogFormat,
    thread_ids: bool,
    file_location: bool,
}

impl LoggingBuilder {
    /// Creates a builder with the compact format and `info` level.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from a [`LoggingConfig`].
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut builder = Self::new();
        builder.level = Some(config.level.clone());
        builder.format = config.format;
        builder.thread_ids = config.thread_ids;
        builder.file_location = config.file_location;
        for (module, level) in &config.filters {
            builder.directives.push(format!("{module}={level}"));
        }
        builder
    }

    /// Sets the base log level.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Adds a filter directive such as `solder_manager=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Sets the output format.
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Initializes the logging system, ignoring failure (e.g. a subscriber
    /// is already installed).
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Tries to initialize the logging system.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let base = self.level.unwrap_or_else(|| "info".to_string());
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base));
        for directive in &self.directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        macro_rules! init_layer {
            ($layer:expr) => {
                tracing_subscriber::registry()
                    .with(
                        $layer
                            .with_thread_ids(self.thread_ids)
                            .with_file(self.file_location)
                            .with_line_number(self.file_location),
                    )
                    .with(filter)
                    .try_init()
            };
        }

        match self.format {
            LogFormat::Compact => init_layer!(fmt::layer().compact()),
            LogFormat::Full => init_layer!(fmt::layer()),
            LogFormat::Pretty => init_layer!(fmt::layer().pretty()),
        }
    }
}
