//! Error types shared across the solder crates.

use thiserror::Error;

use crate::identity::PluginId;

/// Boxed error type carried by user-supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the plugin manager core.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A descriptor was inserted whose id is already registered. The earlier
    /// registration is preserved; the new descriptor is discarded.
    #[error("duplicate plugin id '{0}'")]
    DuplicateId(PluginId),

    /// Manifest metadata failed validation and never reached the core.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// An operation required the plugin to be linkable and it was not.
    #[error("plugin '{0}' is not linkable")]
    Unlinkable(PluginId),

    /// A dependency lookup found no binding for the requested id.
    #[error("plugin '{plugin}' has no resolved dependency on '{dependency}'")]
    UnresolvedDependency {
        /// The requesting plugin.
        plugin: PluginId,
        /// The dependency that is not bound.
        dependency: PluginId,
    },

    /// The construction hook failed or the plugin could not be constructed.
    #[error("construction of plugin '{plugin}' failed")]
    Construction {
        /// The plugin being constructed.
        plugin: PluginId,
        /// The underlying hook failure.
        #[source]
        source: BoxError,
    },

    /// An activator hook failed.
    #[error("activation of plugin '{plugin}' failed")]
    Activation {
        /// The plugin being activated.
        plugin: PluginId,
        /// The underlying hook failure.
        #[source]
        source: BoxError,
    },

    /// A deactivator hook failed.
    #[error("deactivation of plugin '{plugin}' failed")]
    Deactivation {
        /// The plugin being deactivated.
        plugin: PluginId,
        /// The underlying hook failure.
        #[source]
        source: BoxError,
    },

    /// The manager is shutting down and no longer accepts work.
    #[error("the plugin manager is shutting down")]
    ShuttingDown,

    /// The operation is specified but not implemented in this version.
    #[error("{0} is not supported")]
    Unsupported(&'static str),
}

impl PluginError {
    /// Creates an [`PluginError::Activation`] from a hook failure.
    pub fn activation(plugin: PluginId, source: BoxError) -> Self {
        Self::Activation { plugin, source }
    }

    /// Creates a [`PluginError::Deactivation`] from a hook failure.
    pub fn deactivation(plugin: PluginId, source: BoxError) -> Self {
        Self::Deactivation { plugin, source }
    }
}

/// Result type used throughout the solder crates.
pub type Result<T> = std::result::Result<T, PluginError>;
