//! Package references.
//!
//! A dependency is declared as `name -> reference`, where the reference is
//! one of:
//! - an exact version (`1.2.3`)
//! - an npm range (`^1.2.0`, `1.x`, `>=2 <3`)
//! - a dist-tag (`latest`, `next`)
//! - a locator fetched as-is (`https://example.com/pkg.tgz`)

use super::version::{parse_exact, Range};
use semver::Version;
use serde::Serialize;
use std::fmt;

/// A declared dependency: a name and a reference as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageReference {
    pub name: String,
    pub reference: String,
}

impl PackageReference {
    #[must_use]
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
        }
    }

    /// Classify the reference.
    #[must_use]
    pub fn kind(&self) -> ReferenceKind {
        ReferenceKind::classify(&self.reference)
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.reference)
    }
}

/// How a reference string is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceKind {
    /// An exact version; pinned without a registry lookup.
    Exact(Version),
    /// A range resolved against the published versions.
    Range(Range),
    /// A dist-tag resolved against the registry's tag table.
    Tag(String),
    /// Anything else; fetched directly.
    Locator(String),
}

impl ReferenceKind {
    /// Classify a reference string: exact version, then range, then tag,
    /// then locator.
    #[must_use]
    pub fn classify(reference: &str) -> Self {
        if let Some(version) = parse_exact(reference) {
            return Self::Exact(version);
        }
        if let Ok(range) = Range::parse(reference) {
            return Self::Range(range);
        }
        let trimmed = reference.trim();
        if is_tag(trimmed) {
            return Self::Tag(trimmed.to_string());
        }
        Self::Locator(reference.to_string())
    }
}

/// A reference resolved to an exact version or a direct locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PinnedPackage {
    pub name: String,
    pub reference: String,
}

impl PinnedPackage {
    /// Pin to an exact version.
    #[must_use]
    pub fn exact(name: impl Into<String>, version: &Version) -> Self {
        Self {
            name: name.into(),
            reference: version.to_string(),
        }
    }

    /// Pass a locator through unchanged.
    #[must_use]
    pub fn locator(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: locator.into(),
        }
    }

    /// The exact version, if this pin is not a locator.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        parse_exact(&self.reference)
    }
}

impl fmt::Display for PinnedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.reference)
    }
}

/// Strip the scope from a package name: `@types/node` -> `node`.
#[must_use]
pub fn unscoped_name(name: &str) -> &str {
    if name.starts_with('@') {
        name.split_once('/').map_or(name, |(_, rest)| rest)
    } else {
        name
    }
}

fn is_tag(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
