//! Child identity
//!
//! Children are matched across renders by a stable key. Identity must come
//! from the data (an id, a slug), not from the render pass: a key minted
//! fresh each render can never match its previous self, which defeats
//! tracking entirely.

use presence_core::TransitionConfig;
use std::fmt;

/// Stable identity for one logical child across renders.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildKey(String);

impl ChildKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Fallback key for a child that reported none. Positional tracking is
    /// fragile (reordering looks like removal + addition) and is logged as a
    /// warning at reconcile time.
    pub(crate) fn positional(index: usize) -> Self {
        Self(format!("__pos:{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_positional(&self) -> bool {
        self.0.starts_with("__pos:")
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChildKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ChildKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Capability trait for renderable child descriptors.
///
/// The group stores the latest descriptor for each key and hands it back in
/// render lists; it never interprets the contents beyond the key and the
/// optional per-child transition override.
pub trait KeyedChild {
    /// Stable key, or None to degrade to positional tracking.
    fn key(&self) -> Option<ChildKey>;

    /// Per-child transition config. None inherits the group default.
    /// An override replaces the whole config, not individual fields.
    fn transition_config(&self) -> Option<TransitionConfig> {
        None
    }
}
