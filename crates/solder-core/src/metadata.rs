//! Raw manifest metadata consumed at the discovery boundary.
//!
//! A plugin container carries a manifest — a small YAML or JSON document of
//! string-valued fields. The manifest is deserialized here and validated by
//! [`DescriptorBuilder::from_manifest`]; nothing downstream of descriptor
//! construction sees raw manifest values.
//!
//! ```yaml
//! id: com.example.alpha
//! version: "1.0"
//! description: Example plugin
//! parent: "[none]"
//! type: standard
//! dependencies:
//!   - id: com.example.beta
//!     version: "1.0"
//!   - id: com.example.gamma
//!     version: "[any]"
//!     required: false
//! ```
//!
//! [`DescriptorBuilder::from_manifest`]: crate::descriptor::DescriptorBuilder::from_manifest

use serde::Deserialize;

use crate::identity::{ANY_VERSION, NO_PARENT};

// ─── PluginKind ──────────────────────────────────────────────────────────────

/// What role a plugin plays during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    /// A plugin with no special initialization instructions.
    #[default]
    #[serde(alias = "STANDARD")]
    Standard,
    /// Satisfies dependencies for other plugins but is never itself
    /// constructed or activated.
    #[serde(alias = "LIBRARY")]
    Library,
}

impl PluginKind {
    /// Returns `true` iff the lifecycle driver should construct and activate
    /// plugins of this kind.
    pub fn should_initialize(self) -> bool {
        matches!(self, PluginKind::Standard)
    }
}

// ─── DependencyEntry ─────────────────────────────────────────────────────────

/// One declared dependency as it appears in a manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencyEntry {
    /// Id of the plugin that satisfies the dependency.
    pub id: String,
    /// Version expression; the sentinel `"[any]"` accepts every version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Whether the requesting plugin refuses to link without this dependency.
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_version() -> String {
    ANY_VERSION.to_string()
}

fn default_required() -> bool {
    true
}

// ─── PluginManifest ──────────────────────────────────────────────────────────

/// Raw, string-valued plugin metadata.
///
/// `description` and `author` are carried opaquely; the core never inspects
/// them. `parent` uses the `"[none]"` sentinel (or the empty string) to mean
/// "no parent".
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// Unique plugin id. Required, non-empty.
    pub id: String,
    /// Plugin version string. Required, non-empty.
    pub version: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Free-form author.
    #[serde(default)]
    pub author: String,
    /// Parent plugin id, `"[none]"`, or empty.
    #[serde(default)]
    pub parent: String,
    /// Declared dependencies in declaration order.
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    /// Standard or library plugin.
    #[serde(default, rename = "type")]
    pub kind: PluginKind,
}

impl PluginManifest {
    /// Returns the declared parent id, or `None` when the manifest used the
    /// `"[none]"` sentinel or left the field empty.
    pub fn parent_id(&self) -> Option<&str> {
        let trimmed = self.parent.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_PARENT) {
            None
        } else {
            Some(trimmed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_manifest_fills_defaults() {
        let manifest: PluginManifest = serde_yaml::from_str(
            r#"
id: com.example.alpha
version: "1.0"
"#,
        )
        .unwrap();
        assert_eq!(manifest.id, "com.example.alpha");
        assert_eq!(manifest.version, "1.0");
        assert!(manifest.dependencies.is_empty());
        assert_eq!(manifest.kind, PluginKind::Standard);
        assert_eq!(manifest.parent_id(), None);
    }

    #[test]
    fn dependency_defaults_are_any_and_required() {
        let manifest: PluginManifest = serde_yaml::from_str(
            r#"
id: com.example.alpha
version: "1.0"
dependencies:
  - id: com.example.beta
"#,
        )
        .unwrap();
        let dep = &manifest.dependencies[0];
        assert_eq!(dep.id, "com.example.beta");
        assert_eq!(dep.version, ANY_VERSION);
        assert!(dep.required);
    }

    #[test]
    fn parent_sentinel_means_no_parent() {
        for parent in ["[none]", "[NONE]", "", "   "] {
            let manifest = PluginManifest {
                id: "a".into(),
                version: "1".into(),
                description: String::new(),
                author: String::new(),
                parent: parent.into(),
                dependencies: vec![],
                kind: PluginKind::Standard,
            };
            assert_eq!(manifest.parent_id(), None, "parent {parent:?}");
        }
    }

    #[test]
    fn library_kind_skips_initialization() {
        let manifest: PluginManifest = serde_yaml::from_str(
            r#"
id: com.example.lib
version: "1.0"
type: library
"#,
        )
        .unwrap();
        assert_eq!(manifest.kind, PluginKind::Library);
        assert!(!manifest.kind.should_initialize());
    }

    #[test]
    fn uppercase_kind_alias_is_accepted() {
        let manifest: PluginManifest = serde_yaml::from_str(
            r#"
id: com.example.lib
version: "1.0"
type: LIBRARY
"#,
        )
        .unwrap();
        assert_eq!(manifest.kind, PluginKind::Library);
    }
}
