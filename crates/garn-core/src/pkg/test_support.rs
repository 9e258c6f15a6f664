//! Fixtures shared by the package-manager tests.

use super::error::PkgError;
use super::registry::{PackageMetadata, Registry};
use super::spec::PinnedPackage;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::json;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Build a `.tgz` from `(path, contents)` pairs with mode 0644.
pub(crate) fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    let with_modes: Vec<(&str, &[u8], u32)> =
        files.iter().map(|(p, c)| (*p, *c, 0o644)).collect();
    tarball_with_modes(&with_modes)
}

/// Build a `.tgz` from `(path, contents, mode)` triples.
pub(crate) fn tarball_with_modes(files: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (path, contents, mode) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    let tar_bytes = builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    std::io::Write::write_all(&mut encoder, &tar_bytes).unwrap();
    encoder.finish().unwrap()
}

/// Build a package archive around a manifest plus extra files.
pub(crate) fn package_archive(manifest: &serde_json::Value, files: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let manifest = serde_json::to_vec(manifest).unwrap();
    let mut entries: Vec<(String, &[u8], u32)> =
        vec![("package/package.json".to_string(), manifest.as_slice(), 0o644)];
    for (path, contents, mode) in files {
        entries.push((format!("package/{path}"), *contents, *mode));
    }
    let borrowed: Vec<(&str, &[u8], u32)> = entries
        .iter()
        .map(|(p, c, m)| (p.as_str(), *c, *m))
        .collect();
    tarball_with_modes(&borrowed)
}

/// In-memory registry that records every fetch.
#[derive(Debug, Default)]
pub(crate) struct MockRegistry {
    archives: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    tags: BTreeMap<String, BTreeMap<String, String>>,
    locators: BTreeMap<String, Vec<u8>>,
    metadata_log: RefCell<Vec<String>>,
    archive_log: RefCell<Vec<String>>,
}

impl MockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Publish `name@version` with the given dependencies and nothing else.
    pub(crate) fn publish(&mut self, name: &str, version: &str, deps: &[(&str, &str)]) -> &mut Self {
        let manifest = manifest_json(name, Some(version), deps);
        self.publish_package(name, version, &manifest, &[])
    }

    /// Publish `name@version` with a full manifest and extra files.
    pub(crate) fn publish_package(
        &mut self,
        name: &str,
        version: &str,
        manifest: &serde_json::Value,
        files: &[(&str, &[u8], u32)],
    ) -> &mut Self {
        self.archives
            .entry(name.to_string())
            .or_default()
            .insert(version.to_string(), package_archive(manifest, files));
        self
    }

    /// Serve an archive for `name` at a direct locator.
    pub(crate) fn publish_at(&mut self, locator: &str, name: &str, deps: &[(&str, &str)]) -> &mut Self {
        let manifest = manifest_json(name, None, deps);
        self.locators
            .insert(locator.to_string(), package_archive(&manifest, &[]));
        self
    }

    pub(crate) fn tag(&mut self, name: &str, tag: &str, version: &str) -> &mut Self {
        self.tags
            .entry(name.to_string())
            .or_default()
            .insert(tag.to_string(), version.to_string());
        self
    }

    /// Names whose metadata was requested, in order.
    pub(crate) fn metadata_fetches(&self) -> Vec<String> {
        self.metadata_log.borrow().clone()
    }

    /// `name@reference` of every archive requested, in order.
    pub(crate) fn archive_fetches(&self) -> Vec<String> {
        self.archive_log.borrow().clone()
    }
}

fn manifest_json(name: &str, version: Option<&str>, deps: &[(&str, &str)]) -> serde_json::Value {
    let dependencies: serde_json::Map<String, serde_json::Value> = deps
        .iter()
        .map(|(n, r)| ((*n).to_string(), json!(r)))
        .collect();
    let mut manifest = json!({ "name": name, "dependencies": dependencies });
    if let Some(version) = version {
        manifest["version"] = json!(version);
    }
    manifest
}

impl Registry for MockRegistry {
    async fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, PkgError> {
        self.metadata_log.borrow_mut().push(name.to_string());
        let versions = self
            .archives
            .get(name)
            .ok_or_else(|| PkgError::registry(format!("Package not found: {name}")))?;
        Ok(PackageMetadata {
            versions: versions.keys().cloned().collect(),
            dist_tags: self.tags.get(name).cloned().unwrap_or_default(),
        })
    }

    async fn fetch_archive(&self, pkg: &PinnedPackage) -> Result<Bytes, PkgError> {
        self.archive_log.borrow_mut().push(pkg.to_string());
        let archive = match pkg.version() {
            Some(version) => self
                .archives
                .get(&pkg.name)
                .and_then(|versions| versions.get(&version.to_string())),
            None => self.locators.get(&pkg.reference),
        };
        archive
            .map(|bytes| Bytes::from(bytes.clone()))
            .ok_or_else(|| PkgError::transport(format!("HTTP 404 for {pkg}")))
    }
}
