//! Plugin discovery: manifest scanning and descriptor loading.
//!
//! A plugin container is a manifest file — `<name>.plugin.yaml`,
//! `<name>.plugin.yml`, or `<name>.plugin.json` — holding the plugin's
//! metadata. Discovery walks the configured directory trees, parses each
//! manifest, asks the [`ContainerLoader`] for a full [`Descriptor`] (the
//! loader attaches the hooks), and hands the descriptor to the manager.
//!
//! Failures at this boundary never poison the sweep: an unreadable or
//! invalid manifest is logged and skipped, and the walk continues.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use solder_core::{
    ConstructHook, Descriptor, DescriptorBuilder, LifecycleHook, PluginId, PluginManifest, Result,
};
use solder_manager::PluginManager;

use crate::error::{RuntimeError, RuntimeResult};

/// Manifest filename suffixes recognized by discovery.
pub const MANIFEST_SUFFIXES: &[&str] = &[".plugin.yaml", ".plugin.yml", ".plugin.json"];

/// Returns `true` iff `path` names a plugin manifest.
pub fn is_manifest(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| MANIFEST_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)))
}

// ─── ContainerLoader ─────────────────────────────────────────────────────────

/// Turns parsed manifest metadata into a full descriptor.
///
/// The core only ever sees descriptors; whatever "loading the container"
/// means — locating native entry points, wiring host callbacks — happens
/// behind this seam.
pub trait ContainerLoader: Send + Sync {
    /// Builds the descriptor for this manifest, attaching hooks.
    fn load(&self, manifest: &PluginManifest) -> Result<Descriptor>;
}

/// The hooks a host supplies for one plugin id.
#[derive(Clone, Default)]
pub struct HookSet {
    construct: Option<ConstructHook>,
    activators: Vec<(i32, LifecycleHook)>,
    deactivators: Vec<(i32, LifecycleHook)>,
}

impl HookSet {
    /// Creates an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the construction hook.
    pub fn construct(mut self, hook: ConstructHook) -> Self {
        self.construct = Some(hook);
        self
    }

    /// Appends an activator with its priority.
    pub fn activator(mut self, priority: i32, hook: LifecycleHook) -> Self {
        self.activators.push((priority, hook));
        self
    }

    /// Appends a deactivator with its priority.
    pub fn deactivator(mut self, priority: i32, hook: LifecycleHook) -> Self {
        self.deactivators.push((priority, hook));
        self
    }
}

/// Default [`ContainerLoader`]: hosts register a [`HookSet`] per plugin id
/// ahead of discovery; manifests whose id has no registered hooks get an
/// inert descriptor (constructible, no activators).
#[derive(Default)]
pub struct HookRegistry {
    hooks: RwLock<HashMap<PluginId, HookSet>>,
}

impl HookRegistry {
    /// Creates an empty hook registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the hooks for a plugin id, replacing any previous set.
    pub fn register(&self, id: impl Into<PluginId>, hooks: HookSet) {
        self.hooks.write().insert(id.into(), hooks);
    }
}

impl ContainerLoader for HookRegistry {
    fn load(&self, manifest: &PluginManifest) -> Result<Descriptor> {
        let mut builder = DescriptorBuilder::from_manifest(manifest)?;
        let hooks = self.hooks.read();
        if let Some(set) = hooks.get(manifest.id.trim()) {
            if let Some(construct) = &set.construct {
                builder = builder.construct(Arc::clone(construct));
            }
            for (priority, hook) in &set.activators {
                builder = builder.activator(*priority, Arc::clone(hook));
            }
            for (priority, hook) in &set.deactivators {
                builder = builder.deactivator(*priority, Arc::clone(hook));
            }
        }
        Ok(builder.build())
    }
}

// ─── Scanning ────────────────────────────────────────────────────────────────

/// Recursively collects every manifest under `root`, in a deterministic
/// (name-sorted) order. Unreadable directories are logged and skipped.
pub fn scan(root: &Path) -> Vec<PathBuf> {
    let mut manifests = Vec::new();
    walk(root, &mut manifests);
    manifests
}

fn walk(dir: &Path, manifests: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            walk(&path, manifests);
        } else if is_manifest(&path) {
            manifests.push(path);
        } else {
            debug!(path = %path.display(), "Ignoring non-manifest file");
        }
    }
}

// ─── Parsing and analysis ────────────────────────────────────────────────────

/// Parses a manifest file's contents according to its extension.
pub fn parse_manifest(path: &Path, content: &str) -> RuntimeResult<PluginManifest> {
    let manifest = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(content).map_err(|e| RuntimeError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(content).map_err(|e| RuntimeError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };
    Ok(manifest)
}

/// Reads, parses, loads, and ingests one manifest.
///
/// Returns the registered id, or `None` when the manager swallowed the
/// descriptor (blocked id or duplicate).
pub async fn analyse_manifest(
    manager: &PluginManager,
    loader: &dyn ContainerLoader,
    path: &Path,
) -> RuntimeResult<Option<PluginId>> {
    let content = tokio::fs::read_to_string(path).await?;
    let manifest = parse_manifest(path, &content)?;
    let descriptor = loader.load(&manifest)?;
    let id = descriptor.id().clone();
    match manager.ingest(descriptor)? {
        Some(_) => {
            debug!(plugin = %id, path = %path.display(), "Manifest analysed");
            Ok(Some(id))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn manifest_suffixes_are_recognized() {
        assert!(is_manifest(Path::new("a/b/echo.plugin.yaml")));
        assert!(is_manifest(Path::new("echo.plugin.yml")));
        assert!(is_manifest(Path::new("echo.plugin.json")));
        assert!(!is_manifest(Path::new("echo.yaml")));
        assert!(!is_manifest(Path::new("echo.plugin.toml")));
        assert!(!is_manifest(Path::new("plugin.yaml")));
    }

    #[test]
    fn scan_finds_manifests_depth_first_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("zeta.plugin.yaml"), "id: z\nversion: '1'\n").unwrap();
        fs::write(root.join("alpha.plugin.yaml"), "id: a\nversion: '1'\n").unwrap();
        fs::write(root.join("notes.txt"), "not a manifest").unwrap();
        fs::write(
            root.join("nested/beta.plugin.json"),
            r#"{"id": "b", "version": "1"}"#,
        )
        .unwrap();

        let found = scan(root);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "alpha.plugin.yaml",
                "beta.plugin.json",
                "zeta.plugin.yaml"
            ]
        );
    }

    #[test]
    fn parse_dispatches_on_extension() {
        let yaml = parse_manifest(
            Path::new("x.plugin.yaml"),
            "id: com.example\nversion: '2.0'\n",
        )
        .unwrap();
        assert_eq!(yaml.id, "com.example");

        let json = parse_manifest(
            Path::new("x.plugin.json"),
            r#"{"id": "com.example", "version": "2.0"}"#,
        )
        .unwrap();
        assert_eq!(json.version, "2.0");

        let err = parse_manifest(Path::new("x.plugin.yaml"), ": not yaml :").unwrap_err();
        assert!(matches!(err, RuntimeError::Manifest { .. }));
    }

    #[test]
    fn hook_registry_attaches_registered_hooks() {
        let registry = HookRegistry::new();
        registry.register(
            "com.example",
            HookSet::new().activator(5, Arc::new(|_, _| Ok(()))),
        );

        let manifest: PluginManifest =
            serde_yaml::from_str("id: com.example\nversion: '1.0'\n").unwrap();
        let desc = registry.load(&manifest).unwrap();
        assert_eq!(desc.activators().len(), 1);
        assert_eq!(desc.activators()[0].priority, 5);

        let other: PluginManifest =
            serde_yaml::from_str("id: com.other\nversion: '1.0'\n").unwrap();
        let desc = registry.load(&other).unwrap();
        assert!(desc.activators().is_empty(), "unknown ids get inert hooks");
    }

    #[tokio::test]
    async fn analyse_registers_with_the_manager() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("echo.plugin.yaml");
        fs::write(&path, "id: com.example.echo\nversion: '1.0'\n").unwrap();

        let manager = PluginManager::new();
        let loader = HookRegistry::new();
        let id = analyse_manifest(&manager, &loader, &path).await.unwrap();
        assert_eq!(id, Some(PluginId::from("com.example.echo")));
        assert_eq!(manager.registry().len(), 1);

        // A second analysis of the same manifest is swallowed as a duplicate.
        let id = analyse_manifest(&manager, &loader, &path).await.unwrap();
        assert_eq!(id, None);
    }
}
