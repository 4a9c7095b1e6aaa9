//! Configuration loading for the solder host.
//!
//! Configuration lives in `solder.yaml` (or a file the host names
//! explicitly). The schema, the loader, and validation are split into
//! submodules; [`load_config`] is the one-call entry point.

mod loader;
mod schema;
mod validation;

pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{LogFormat, LoggingConfig, SolderConfig};
pub use validation::validate_config;
