//! # Solder Runtime
//!
//! Discovery, watching, and host orchestration for the solder plugin
//! manager.
//!
//! The manager core (`solder-manager`) is synchronous and knows nothing
//! about filesystems. This crate supplies the plumbing around it:
//!
//! - **config**: `solder.yaml` schema, loader, and validation
//! - **logging**: configuration-driven `tracing` setup
//! - **discovery**: manifest scanning and the [`ContainerLoader`] seam
//! - **pool**: bounded concurrent manifest analysis
//! - **watcher**: directory watching for late-arriving plugins
//! - **host**: [`SolderHost`], the one-handle orchestration layer

pub mod config;
pub mod discovery;
pub mod error;
pub mod host;
pub mod logging;
pub mod pool;
pub mod watcher;

pub use config::{ConfigLoader, LogFormat, LoggingConfig, SolderConfig, load_config};
pub use discovery::{ContainerLoader, HookRegistry, HookSet};
pub use error::{ConfigError, ConfigResult, RuntimeError, RuntimeResult};
pub use host::{HostBuilder, SolderHost};
pub use pool::AnalysisPool;
