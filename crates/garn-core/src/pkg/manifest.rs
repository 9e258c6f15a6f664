//! `package.json` reading.

use super::error::PkgError;
use super::spec::{unscoped_name, PackageReference};
use super::tarball::read_file_from_archive;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Manifest file name.
pub const MANIFEST_NAME: &str = "package.json";

/// A parsed `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "bin")]
    pub binaries: Option<BinaryDeclaration>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

/// The `bin` field: one path named after the package, or a name -> path map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BinaryDeclaration {
    Single(String),
    Named(BTreeMap<String, String>),
}

impl BinaryDeclaration {
    /// Expand to `(binary name, normalised relative path)` pairs.
    ///
    /// A single path is named after the unscoped package name.
    #[must_use]
    pub fn entries(&self, package_name: &str) -> Vec<(String, PathBuf)> {
        match self {
            Self::Single(path) => vec![(unscoped_name(package_name).to_string(), normalize(path))],
            Self::Named(map) => map
                .iter()
                .map(|(name, path)| (name.clone(), normalize(path)))
                .collect(),
        }
    }
}

/// Drop `.` components so `./bin/cli.js` and `bin/cli.js` link identically.
fn normalize(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Install lifecycle phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Preinstall,
    Install,
    Postinstall,
}

impl LifecyclePhase {
    /// All phases in the order they run.
    pub const ALL: [Self; 3] = [Self::Preinstall, Self::Install, Self::Postinstall];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preinstall => "preinstall",
            Self::Install => "install",
            Self::Postinstall => "postinstall",
        }
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Manifest {
    /// Parse manifest bytes.
    ///
    /// # Errors
    /// Returns `ManifestParseError` if the JSON is invalid or mistyped.
    pub fn parse(bytes: &[u8]) -> Result<Self, PkgError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Read `package.json` from a package directory.
    ///
    /// # Errors
    /// Returns `ManifestNotFound` if the file is missing, `FilesystemError` if
    /// it cannot be read, or `ManifestParseError` if it is invalid.
    pub fn read_from_dir(dir: &Path) -> Result<Self, PkgError> {
        Self::read_from_disk(&dir.join(MANIFEST_NAME))
    }

    /// Read a manifest file.
    ///
    /// # Errors
    /// See [`Manifest::read_from_dir`].
    pub fn read_from_disk(path: &Path) -> Result<Self, PkgError> {
        if !path.exists() {
            return Err(PkgError::ManifestNotFound(path.display().to_string()));
        }
        let bytes = fs::read(path).map_err(|e| PkgError::fs(path, e))?;
        Self::parse(&bytes)
    }

    /// Locate and parse `package.json` inside a `.tgz` archive.
    ///
    /// # Errors
    /// Returns `ManifestNotFound` if the archive has no top-level manifest.
    pub fn from_archive(archive: &[u8]) -> Result<Self, PkgError> {
        let bytes = read_file_from_archive(archive, MANIFEST_NAME)?
            .ok_or_else(|| PkgError::ManifestNotFound("archive".to_string()))?;
        Self::parse(&bytes)
    }

    /// Declared dependencies in name order.
    #[must_use]
    pub fn dependency_list(&self) -> Vec<PackageReference> {
        self.dependencies
            .iter()
            .map(|(name, reference)| PackageReference::new(name.as_str(), reference.as_str()))
            .collect()
    }

    /// Lifecycle scripts present in this manifest, in execution order.
    pub fn lifecycle_scripts(&self) -> impl Iterator<Item = (LifecyclePhase, &str)> {
        LifecyclePhase::ALL.into_iter().filter_map(move |phase| {
            self.scripts
                .get(phase.as_str())
                .map(|cmd| (phase, cmd.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = Manifest::parse(
            br#"{
                "name": "tool",
                "version": "1.0.0",
                "dependencies": { "b": "^2.0.0", "a": "1.0.0" },
                "bin": { "tool": "./bin/tool.js", "tool-x": "bin/x.js" },
                "scripts": { "test": "jest", "postinstall": "node build.js", "preinstall": "echo hi" }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.name, "tool");
        let deps: Vec<String> = manifest
            .dependency_list()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(deps, vec!["a@1.0.0", "b@^2.0.0"]);

        let bins = manifest.binaries.as_ref().unwrap().entries("tool");
        assert_eq!(
            bins,
            vec![
                ("tool".to_string(), PathBuf::from("bin/tool.js")),
                ("tool-x".to_string(), PathBuf::from("bin/x.js")),
            ]
        );

        let scripts: Vec<_> = manifest.lifecycle_scripts().collect();
        assert_eq!(
            scripts,
            vec![
                (LifecyclePhase::Preinstall, "echo hi"),
                (LifecyclePhase::Postinstall, "node build.js"),
            ]
        );
    }

    #[test]
    fn test_single_binary_uses_unscoped_name() {
        let manifest =
            Manifest::parse(br#"{"name":"@scope/cli","bin":"cli.js"}"#).unwrap();
        let bins = manifest.binaries.unwrap().entries("@scope/cli");
        assert_eq!(bins, vec![("cli".to_string(), PathBuf::from("cli.js"))]);
    }

    #[test]
    fn test_minimal_manifest() {
        let manifest = Manifest::parse(b"{}").unwrap();
        assert!(manifest.dependency_list().is_empty());
        assert!(manifest.binaries.is_none());
        assert_eq!(manifest.lifecycle_scripts().count(), 0);
    }

    #[test]
    fn test_parse_error() {
        let err = Manifest::parse(br#"{"dependencies": ["a"]}"#).unwrap_err();
        assert!(matches!(err, PkgError::ManifestParse(_)));
    }

    #[test]
    fn test_read_from_dir_missing() {
        let dir = tempdir().unwrap();
        let err = Manifest::read_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, PkgError::ManifestNotFound(_)));
    }

    #[test]
    fn test_read_from_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name":"app"}"#).unwrap();
        assert_eq!(Manifest::read_from_dir(dir.path()).unwrap().name, "app");
    }
}
