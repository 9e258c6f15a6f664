//! Dependency resolution.
//!
//! Turns declared references into a tree of pinned packages. Resolution is
//! nested, not flat: a dependency an ancestor already satisfies is skipped,
//! anything else is pinned and placed under the node that asked for it.
//! Fetches happen one at a time, depth-first, in declared-name order.

use super::available::AvailabilitySet;
use super::error::PkgError;
use super::manifest::Manifest;
use super::registry::Registry;
use super::report::Reporter;
use super::spec::{PackageReference, PinnedPackage, ReferenceKind};
use super::tree::DependencyNode;
use super::version::{max_satisfying, parse_exact};
use futures::future::{FutureExt, LocalBoxFuture};

/// Maximum tree depth before resolution gives up.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Recursive resolver over a [`Registry`].
#[derive(Debug)]
pub struct Resolver<'a, R, P> {
    registry: &'a R,
    reporter: P,
    max_depth: usize,
}

impl<'a, R: Registry, P: Reporter> Resolver<'a, R, P> {
    #[must_use]
    pub fn new(registry: &'a R, reporter: P) -> Self {
        Self {
            registry,
            reporter,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the depth limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve the dependencies of a project manifest.
    ///
    /// # Errors
    /// Any failure anywhere in the tree aborts the whole resolution.
    pub async fn resolve_project(&self, manifest: &Manifest) -> Result<DependencyNode, PkgError> {
        let root = PackageReference::new(manifest.name.as_str(), "");
        self.resolve(&root, &manifest.dependency_list(), &AvailabilitySet::new())
            .await
    }

    /// Build the subtree for `pkg`, whose own reference is already pinned
    /// (or empty for the project root).
    ///
    /// # Errors
    /// Any failure anywhere in the subtree aborts the whole resolution.
    pub async fn resolve(
        &self,
        pkg: &PackageReference,
        declared: &[PackageReference],
        available: &AvailabilitySet,
    ) -> Result<DependencyNode, PkgError> {
        self.resolve_node(
            pkg.clone(),
            declared.to_vec(),
            available.clone(),
            Vec::new(),
        )
        .await
    }

    fn resolve_node(
        &self,
        pkg: PackageReference,
        declared: Vec<PackageReference>,
        available: AvailabilitySet,
        ancestry: Vec<(String, AvailabilitySet)>,
    ) -> LocalBoxFuture<'_, Result<DependencyNode, PkgError>> {
        async move {
            self.reporter.resolving(&pkg);
            let mut node = DependencyNode::new(pkg.name, pkg.reference);

            for dep in declared {
                if available.satisfies(&dep) {
                    let ancestor = available.get(&dep.name).unwrap_or_default();
                    self.reporter.reused(&dep, ancestor);
                    continue;
                }

                let pinned = self
                    .pin(&dep)
                    .await
                    .map_err(|e| e.within(dep.to_string(), "pin"))?;
                self.reporter.pinned(&dep, &pinned);
                let key = pinned.to_string();
                let sub_available = available.with(&pinned);

                // Revisiting a pin with the same availability can only repeat
                // itself; a larger set may still terminate.
                let repeated = ancestry
                    .iter()
                    .any(|(seen, seen_available)| *seen == key && *seen_available == sub_available);
                if repeated || ancestry.len() >= self.max_depth {
                    let mut path: Vec<String> = ancestry.into_iter().map(|(seen, _)| seen).collect();
                    path.push(key);
                    return Err(PkgError::CycleOrDepthExceeded { path });
                }

                let manifest = self
                    .fetch_manifest(&pinned)
                    .await
                    .map_err(|e| e.within(key.as_str(), "fetch"))?;

                let mut sub_ancestry = ancestry.clone();
                sub_ancestry.push((key.clone(), sub_available.clone()));

                let child = self
                    .resolve_node(
                        PackageReference::new(pinned.name, pinned.reference),
                        manifest.dependency_list(),
                        sub_available,
                        sub_ancestry,
                    )
                    .await
                    .map_err(|e| match e {
                        PkgError::CycleOrDepthExceeded { .. } => e,
                        other => other.within(key, "dependencies"),
                    })?;
                node.children.push(child);
            }

            Ok(node)
        }
        .boxed_local()
    }

    /// Pin a declared reference to an exact version or pass a locator through.
    ///
    /// # Errors
    /// Returns an error if the registry lookup or version selection fails.
    pub async fn pin(&self, dep: &PackageReference) -> Result<PinnedPackage, PkgError> {
        match dep.kind() {
            ReferenceKind::Exact(version) => Ok(PinnedPackage::exact(dep.name.as_str(), &version)),
            ReferenceKind::Range(range) => {
                let metadata = self.registry.fetch_metadata(&dep.name).await?;
                let version = max_satisfying(range.as_str(), &metadata.versions)?;
                Ok(PinnedPackage::exact(dep.name.as_str(), &version))
            }
            ReferenceKind::Tag(tag) => {
                let metadata = self.registry.fetch_metadata(&dep.name).await?;
                let raw = metadata
                    .dist_tags
                    .get(&tag)
                    .ok_or_else(|| PkgError::no_satisfying_version(&tag, metadata.dist_tags.len()))?;
                let version = parse_exact(raw)
                    .ok_or_else(|| PkgError::invalid_version(raw, "dist-tag target is not a version"))?;
                Ok(PinnedPackage::exact(dep.name.as_str(), &version))
            }
            ReferenceKind::Locator(locator) => Ok(PinnedPackage::locator(dep.name.as_str(), locator)),
        }
    }

    async fn fetch_manifest(&self, pinned: &PinnedPackage) -> Result<Manifest, PkgError> {
        let archive = self.registry.fetch_archive(pinned).await?;
        Manifest::from_archive(&archive)
    }
}
