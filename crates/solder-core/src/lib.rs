//! # Solder Core
//!
//! The foundational types for the solder plugin manager.
//!
//! This crate provides the fundamental abstractions that are not tied to any
//! particular discovery or scheduling strategy. The resolver, registry, and
//! lifecycle machinery live in `solder-manager`; discovery, watching, and
//! host orchestration live in `solder-runtime`.
//!
//! ## Core Components
//!
//! ### Identity
//! - **PluginId**: opaque, cheap-to-clone plugin identity (byte equality)
//! - **VersionRange**: `Any` / `Exact` version matching
//!
//! ### Manifests
//! - **PluginManifest**: raw, string-valued metadata consumed at the
//!   discovery boundary
//! - **PluginKind**: `standard` vs. `library` (library plugins satisfy
//!   dependencies but are never initialized)
//!
//! ### Descriptors
//! - **Descriptor**: immutable per-plugin metadata plus its lifecycle hooks
//! - **DescriptorBuilder**: validating builder from a manifest or raw parts
//! - **InitArgs**: heterogeneous argument map handed to every hook

pub mod descriptor;
pub mod error;
pub mod identity;
pub mod metadata;

pub use descriptor::{
    ConstructHook, DeclaredDep, Descriptor, DescriptorBuilder, HookEntry, InitArgs, LifecycleHook,
    PluginInstance,
};
pub use error::{BoxError, PluginError, Result};
pub use identity::{ANY_VERSION, NO_PARENT, PluginId, VersionRange};
pub use metadata::{DependencyEntry, PluginKind, PluginManifest};
