//! Module identity.
//!
//! A module is the pair of an import path and a version. An empty version
//! means the caller has not resolved one yet; most operations require a
//! resolved version first.

use crate::core::escape;

/// A module path plus version.
///
/// Equality and hashing cover both fields, so `foo@v1.0.0` and
/// `foo@v1.1.0` are distinct identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Module {
    pub path: String,
    pub version: String,
}

impl Module {
    pub fn new(path: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            version: version.into(),
        }
    }

    /// Parse a user-provided `path[@version]` specifier.
    ///
    /// A missing `@` leaves the version empty, meaning "resolve to latest".
    pub fn parse(spec: &str) -> Self {
        match spec.split_once('@') {
            Some((path, version)) if !path.is_empty() => Self::new(path, version),
            _ => Self::new(spec, ""),
        }
    }

    /// True when no version has been resolved yet.
    pub fn is_unresolved(&self) -> bool {
        self.version.is_empty()
    }

    /// The bang-escaped path used in proxy URLs and store paths.
    pub fn escaped_path(&self) -> String {
        escape::escape(&self.path)
    }

    /// The bang-escaped version used in artifact file names.
    pub fn escaped_version(&self) -> String {
        escape::escape(&self.version)
    }

    /// Proxy-relative path of the latest-version endpoint.
    pub fn latest_path(&self) -> String {
        format!("{}/@latest", self.escaped_path())
    }

    /// Proxy-relative path of the version-list endpoint.
    pub fn list_path(&self) -> String {
        format!("{}/@v/list", self.escaped_path())
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.path, self.version)
    }
}
