//! Path Normalizer
//!
//! Turns a navigation target into the key used to identify a node across page
//! loads. The transformation is deliberately minimal: one trailing `/` is
//! stripped and an empty result becomes the root sentinel `/`. No case-folding,
//! no percent-decoding.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The root sentinel every empty target collapses to.
pub const ROOT_PATH: &str = "/";

/// A normalized navigation target.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// Normalize a raw target that is known to be present.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.strip_suffix('/').unwrap_or(raw);
        if trimmed.is_empty() {
            Self(ROOT_PATH.to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn root() -> Self {
        Self(ROOT_PATH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_PATH
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CanonicalPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize an optional link target.
///
/// `None` means the entry is not navigable (a pure container) and must never
/// be persisted.
pub fn normalize(raw_href: Option<&str>) -> Option<CanonicalPath> {
    raw_href.map(CanonicalPath::new)
}
