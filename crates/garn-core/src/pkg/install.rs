//! Materialize a resolved tree as nested `node_modules` directories.

use super::error::PkgError;
use super::link::link_binaries;
use super::manifest::Manifest;
use super::registry::Registry;
use super::report::Reporter;
use super::scripts::run_lifecycle_scripts;
use super::spec::PinnedPackage;
use super::tarball::extract_package_archive;
use super::tree::DependencyNode;
use futures::future::{FutureExt, LocalBoxFuture};
use std::path::{Path, PathBuf};

/// Writes a [`DependencyNode`] tree to disk.
///
/// Each node is extracted before its children are installed; a child's
/// binaries are linked and its lifecycle scripts run only after the child's
/// own subtree is complete.
#[derive(Debug)]
pub struct Installer<'a, R, P> {
    registry: &'a R,
    reporter: P,
}

impl<'a, R: Registry, P: Reporter> Installer<'a, R, P> {
    #[must_use]
    pub fn new(registry: &'a R, reporter: P) -> Self {
        Self { registry, reporter }
    }

    /// Install `tree` into `target_dir`. The root node itself is not fetched;
    /// its children land in `target_dir/node_modules`.
    ///
    /// # Errors
    /// The first failing fetch, extraction, link or script aborts the
    /// installation.
    pub async fn install(&self, tree: &DependencyNode, target_dir: &Path) -> Result<(), PkgError> {
        self.install_node(tree, target_dir.to_path_buf()).await
    }

    fn install_node<'s>(
        &'s self,
        node: &'s DependencyNode,
        target: PathBuf,
    ) -> LocalBoxFuture<'s, Result<(), PkgError>> {
        async move {
            if !node.is_root() {
                let pinned = PinnedPackage::locator(node.name.as_str(), node.reference.as_str());
                self.reporter.extracting(&pinned, &target);
                let archive = self
                    .registry
                    .fetch_archive(&pinned)
                    .await
                    .map_err(|e| e.within(pinned.to_string(), "fetch"))?;
                extract_package_archive(&archive, &target)
                    .map_err(|e| e.within(pinned.to_string(), "extract"))?;
            }

            for child in &node.children {
                let child_target = target.join("node_modules").join(&child.name);
                self.install_node(child, child_target.clone()).await?;

                let label = format!("{}@{}", child.name, child.reference);
                let manifest = Manifest::read_from_dir(&child_target)
                    .map_err(|e| e.within(label.as_str(), "manifest"))?;
                link_binaries(&target, &child.name, &child_target, &manifest, &self.reporter)
                    .map_err(|e| e.within(label.as_str(), "link"))?;
                run_lifecycle_scripts(&label, &manifest, &child_target, &self.reporter)
                    .await
                    .map_err(|e| e.within(label.as_str(), "scripts"))?;
            }

            Ok(())
        }
        .boxed_local()
    }
}
