//! # Solder
//!
//! A runtime plugin manager whose core is a concurrent dependency resolver
//! and lifecycle state machine.
//!
//! ## Overview
//!
//! Plugins are units of code described by manifest files discovered in
//! watched directory trees. Each declares an identity, a version, an
//! optional parent, dependencies with version constraints, and ordered
//! activator/deactivator hooks. Solder registers them, matches dependency
//! requests as plugins arrive, computes linkability through a
//! cycle-tolerant fixed point, and drives every linkable plugin through
//! Construct → Activate in deterministic dependency order.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────────┐    ┌──────────────────────────┐
//! │  Watcher  │───▶│  Analysis    │───▶│  PluginManager           │
//! │  + scan   │    │  pool        │    │  registry ▸ resolver ▸   │
//! └───────────┘    └──────────────┘    │  lifecycle               │
//!                                      └──────────────────────────┘
//! ```
//!
//! - **solder-core**: identities, version ranges, manifests, descriptors
//! - **solder-manager**: registry, dependency requests, linkability,
//!   lifecycle driving
//! - **solder-runtime**: config, logging, discovery, watching, the host
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solder::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hooks = Arc::new(HookRegistry::new());
//!     hooks.register(
//!         "com.example.echo",
//!         HookSet::new().construct(Arc::new(|_args| {
//!             Ok(Arc::new(EchoPlugin::default()) as PluginInstance)
//!         })),
//!     );
//!
//!     let host = SolderHost::builder().loader(hooks).build()?;
//!     host.run(&InitArgs::new()).await?;
//!     Ok(())
//! }
//! ```

pub use solder_core as core;
pub use solder_manager as manager;
pub use solder_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use solder::prelude::*;
/// ```
pub mod prelude {
    // Host - main entry point
    pub use solder_runtime::{HostBuilder, SolderHost};

    // Discovery boundary
    pub use solder_runtime::{ContainerLoader, HookRegistry, HookSet};

    // Manager core
    pub use solder_manager::{InitReport, PluginManager, PluginRecord, PluginRegistry};

    // Foundational types
    pub use solder_core::{
        Descriptor, DescriptorBuilder, InitArgs, PluginError, PluginId, PluginInstance,
        PluginKind, PluginManifest, VersionRange,
    };

    // Errors
    pub use solder_runtime::{RuntimeError, RuntimeResult};
}
