//! Immutable plugin descriptors and their lifecycle hooks.
//!
//! A [`Descriptor`] is created exactly once per discovered plugin and never
//! mutated afterwards. It bundles:
//!
//! - the identity fields (`id`, `version`, optional parent id),
//! - the ordered declared dependencies,
//! - three function-valued hook slots: `construct`, `activators`,
//!   `deactivators`.
//!
//! Hooks are plain callables supplied at the boundary (the container loader
//! attaches them while building the descriptor); the core invokes them
//! without knowing anything about the plugin's concrete type. A constructed
//! plugin is carried as a type-erased [`PluginInstance`].
//!
//! Equality and hashing use only `id`, `version`, and the dependency
//! sequence — the fields frozen at creation.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{BoxError, PluginError, Result};
use crate::identity::{PluginId, VersionRange};
use crate::metadata::{PluginKind, PluginManifest};

// ─── Hook types ──────────────────────────────────────────────────────────────

/// A constructed plugin instance, type-erased.
///
/// The inner `dyn Any` is whatever the construction hook produced; hosts
/// downcast it back to the concrete plugin type.
pub type PluginInstance = Arc<dyn Any + Send + Sync>;

/// Hook that produces the plugin instance from the initialization arguments.
pub type ConstructHook =
    Arc<dyn Fn(&InitArgs) -> std::result::Result<PluginInstance, BoxError> + Send + Sync>;

/// An activator or deactivator hook.
pub type LifecycleHook = Arc<
    dyn Fn(&PluginInstance, &InitArgs) -> std::result::Result<(), BoxError> + Send + Sync,
>;

/// One activator or deactivator with its ordering priority.
///
/// Lower priorities run first; ties run in declaration order.
#[derive(Clone)]
pub struct HookEntry {
    /// Ordering priority; lower runs first.
    pub priority: i32,
    /// The hook itself.
    pub hook: LifecycleHook,
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

// ─── InitArgs ────────────────────────────────────────────────────────────────

/// Heterogeneous argument map handed to every lifecycle hook.
///
/// Values are keyed by type; each hook pulls out what it needs and ignores
/// the rest.
///
/// # Example
///
/// ```rust,ignore
/// let mut args = InitArgs::new();
/// args.insert(MyHostHandle::new());
///
/// // inside a hook:
/// let handle = args.get::<MyHostHandle>().expect("host handle missing");
/// ```
#[derive(Default)]
pub struct InitArgs {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl InitArgs {
    /// Creates an empty argument map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, replacing any previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> &mut Self {
        self.values.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    /// Retrieves a value by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.values
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no values are stored.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for InitArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitArgs")
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

// ─── DeclaredDep ─────────────────────────────────────────────────────────────

/// A parsed dependency declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeclaredDep {
    /// Id of the plugin that satisfies the dependency.
    pub id: PluginId,
    /// Accepted versions.
    pub version: VersionRange,
    /// Whether the requestor refuses to link without this dependency.
    pub required: bool,
}

impl fmt::Display for DeclaredDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}, {}}}", self.id, self.version, self.required)
    }
}

// ─── Descriptor ──────────────────────────────────────────────────────────────

/// Immutable metadata and hooks for one plugin.
///
/// Created once by a [`DescriptorBuilder`] and never mutated; all runtime
/// state lives in the manager's plugin record.
#[derive(Clone)]
pub struct Descriptor {
    id: PluginId,
    version: String,
    parent: Option<PluginId>,
    dependencies: Vec<DeclaredDep>,
    kind: PluginKind,
    description: String,
    author: String,
    construct: ConstructHook,
    activators: Vec<HookEntry>,
    deactivators: Vec<HookEntry>,
}

impl Descriptor {
    /// Starts building a descriptor from raw parts.
    pub fn builder(id: impl Into<PluginId>, version: impl Into<String>) -> DescriptorBuilder {
        DescriptorBuilder::new(id, version)
    }

    /// The plugin id.
    pub fn id(&self) -> &PluginId {
        &self.id
    }

    /// The plugin version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The declared parent id, if any.
    pub fn parent(&self) -> Option<&PluginId> {
        self.parent.as_ref()
    }

    /// The declared dependencies in declaration order.
    pub fn dependencies(&self) -> &[DeclaredDep] {
        &self.dependencies
    }

    /// Standard or library plugin.
    pub fn kind(&self) -> PluginKind {
        self.kind
    }

    /// Free-form description, carried opaquely.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Free-form author, carried opaquely.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// The construction hook.
    pub fn construct_hook(&self) -> &ConstructHook {
        &self.construct
    }

    /// Activator hooks in declaration order (unsorted).
    pub fn activators(&self) -> &[HookEntry] {
        &self.activators
    }

    /// Deactivator hooks in declaration order (unsorted).
    pub fn deactivators(&self) -> &[HookEntry] {
        &self.deactivators
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("parent", &self.parent)
            .field("dependencies", &self.dependencies)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.version == other.version
            && self.dependencies == other.dependencies
    }
}

impl Eq for Descriptor {}

impl Hash for Descriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.version.hash(state);
        self.dependencies.hash(state);
    }
}

// ─── DescriptorBuilder ───────────────────────────────────────────────────────

/// Validating builder for [`Descriptor`]s.
///
/// The container loader builds a descriptor from a parsed manifest and
/// attaches the hooks it knows about:
///
/// ```rust,ignore
/// let descriptor = DescriptorBuilder::from_manifest(&manifest)?
///     .construct(Arc::new(|args| Ok(Arc::new(MyPlugin::new(args)) as PluginInstance)))
///     .activator(0, Arc::new(|instance, args| { /* … */ Ok(()) }))
///     .build();
/// ```
pub struct DescriptorBuilder {
    id: PluginId,
    version: String,
    parent: Option<PluginId>,
    dependencies: Vec<DeclaredDep>,
    kind: PluginKind,
    description: String,
    author: String,
    construct: Option<ConstructHook>,
    activators: Vec<HookEntry>,
    deactivators: Vec<HookEntry>,
}

impl std::fmt::Debug for DescriptorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorBuilder")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("parent", &self.parent)
            .field("dependencies", &self.dependencies)
            .field("kind", &self.kind)
            .field("description", &self.description)
            .field("author", &self.author)
            .field("construct", &self.construct.is_some())
            .field("activators", &self.activators.len())
            .field("deactivators", &self.deactivators.len())
            .finish()
    }
}

impl DescriptorBuilder {
    /// Starts a builder from raw parts. Prefer
    /// [`from_manifest`](Self::from_manifest) at the discovery boundary.
    pub fn new(id: impl Into<PluginId>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            parent: None,
            dependencies: Vec::new(),
            kind: PluginKind::Standard,
            description: String::new(),
            author: String::new(),
            construct: None,
            activators: Vec::new(),
            deactivators: Vec::new(),
        }
    }

    /// Builds from a parsed manifest, validating every field the core relies
    /// on: non-empty id and version, and a non-empty id for each declared
    /// dependency.
    pub fn from_manifest(manifest: &PluginManifest) -> Result<Self> {
        let id = manifest.id.trim();
        if id.is_empty() {
            return Err(PluginError::InvalidDescriptor(
                "plugin id must be non-empty".to_string(),
            ));
        }
        let version = manifest.version.trim();
        if version.is_empty() {
            return Err(PluginError::InvalidDescriptor(format!(
                "plugin '{id}' has an empty version"
            )));
        }

        let mut builder = Self::new(id, version);
        builder.kind = manifest.kind;
        builder.description = manifest.description.clone();
        builder.author = manifest.author.clone();
        if let Some(parent) = manifest.parent_id() {
            builder.parent = Some(PluginId::from(parent));
        }
        for entry in &manifest.dependencies {
            let dep_id = entry.id.trim();
            if dep_id.is_empty() {
                return Err(PluginError::InvalidDescriptor(format!(
                    "plugin '{id}' declares a dependency with an empty id"
                )));
            }
            builder.dependencies.push(DeclaredDep {
                id: PluginId::from(dep_id),
                version: VersionRange::parse(&entry.version),
                required: entry.required,
            });
        }
        Ok(builder)
    }

    /// Sets the parent plugin id.
    pub fn parent(mut self, parent: impl Into<PluginId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declares a dependency.
    pub fn dependency(
        mut self,
        id: impl Into<PluginId>,
        version: VersionRange,
        required: bool,
    ) -> Self {
        self.dependencies.push(DeclaredDep {
            id: id.into(),
            version,
            required,
        });
        self
    }

    /// Sets the plugin kind.
    pub fn kind(mut self, kind: PluginKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the construction hook.
    pub fn construct(mut self, hook: ConstructHook) -> Self {
        self.construct = Some(hook);
        self
    }

    /// Appends an activator hook.
    pub fn activator(mut self, priority: i32, hook: LifecycleHook) -> Self {
        self.activators.push(HookEntry { priority, hook });
        self
    }

    /// Appends a deactivator hook.
    pub fn deactivator(mut self, priority: i32, hook: LifecycleHook) -> Self {
        self.deactivators.push(HookEntry { priority, hook });
        self
    }

    /// Finalizes the descriptor.
    ///
    /// A plugin without an explicit construction hook gets an inert instance
    /// (`Arc::new(())`), which keeps hook-less library plugins constructible.
    pub fn build(self) -> Descriptor {
        let construct = self
            .construct
            .unwrap_or_else(|| Arc::new(|_args: &InitArgs| Ok(Arc::new(()) as PluginInstance)));
        Descriptor {
            id: self.id,
            version: self.version,
            parent: self.parent,
            dependencies: self.dependencies,
            kind: self.kind,
            description: self.description,
            author: self.author,
            construct,
            activators: self.activators,
            deactivators: self.deactivators,
        }
    }
}
