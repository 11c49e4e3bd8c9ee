//! Configuration location tracking.

use std::fmt;

/// Separator between segments of a logical configuration path.
pub const PATH_SEPARATOR: char = ':';

/// The logical location of a node inside a mapping document.
///
/// Paths are rendered with `:` separators (`projections:samples:items:name`)
/// and double as the configuration part of a plan cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConfigPath(String);

impl ConfigPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The empty (document root) path.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Returns the path of a child node.
    pub fn child(&self, key: &str) -> Self {
        if self.0.is_empty() {
            Self(key.to_string())
        } else {
            Self(format!("{}{}{}", self.0, PATH_SEPARATOR, key))
        }
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterates the path segments from the root down.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(PATH_SEPARATOR).filter(|s| !s.is_empty())
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}
