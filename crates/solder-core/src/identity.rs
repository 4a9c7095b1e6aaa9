//! Plugin identity and version-range matching.
//!
//! Identities are opaque strings compared by byte equality. Version ranges
//! are deliberately minimal: either anything matches, or exactly one version
//! string matches. The sentinel literals [`ANY_VERSION`] and [`NO_PARENT`]
//! exist only at the manifest boundary; everything past descriptor
//! construction works with parsed values.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

/// Sentinel accepted at the manifest boundary for "matches any version".
pub const ANY_VERSION: &str = "[any]";

/// Sentinel accepted at the manifest boundary for "no parent plugin".
pub const NO_PARENT: &str = "[none]";

// ─── PluginId ────────────────────────────────────────────────────────────────

/// Opaque plugin identity.
///
/// Cheap to clone (`Arc<str>` internally) and compared by byte equality.
/// Conventionally a dotted package-style name (`com.example.alpha`), but the
/// core never inspects the contents beyond equality and prefix blocklisting.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(Arc<str>);

impl PluginId {
    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PluginId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for PluginId {
    fn from(value: String) -> Self {
        Self(Arc::from(value.as_str()))
    }
}

impl Borrow<str> for PluginId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PluginId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PluginId({})", self.0)
    }
}

// ─── VersionRange ────────────────────────────────────────────────────────────

/// The set of versions a declared dependency accepts.
///
/// Matching is byte equality; there is no semver interpretation. A bounded
/// range variant may be added later without breaking the boundary format.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VersionRange {
    /// Matches every version string.
    Any,
    /// Matches exactly this version string.
    Exact(String),
}

impl VersionRange {
    /// Parses a boundary version expression.
    ///
    /// The sentinel `"[any]"` (case-insensitive) and the empty string map to
    /// [`VersionRange::Any`]; everything else is an exact match on the
    /// trimmed string.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ANY_VERSION) {
            VersionRange::Any
        } else {
            VersionRange::Exact(trimmed.to_string())
        }
    }

    /// Returns `true` iff `version` is inside this range.
    pub fn matches(&self, version: &str) -> bool {
        match self {
            VersionRange::Any => true,
            VersionRange::Exact(v) => v == version,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Any => f.write_str(ANY_VERSION),
            VersionRange::Exact(v) => f.write_str(v),
        }
    }
}
