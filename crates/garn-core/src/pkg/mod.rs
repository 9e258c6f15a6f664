//! Package manager functionality.
//!
//! Provides:
//! - Parsing references (`name@range`, exact versions, dist-tags, locators)
//! - npm-style range matching on top of `semver`
//! - Fetching metadata and archives from an npm registry
//! - Nested dependency resolution with ancestor-scoped reuse
//! - Extracting archives into nested `node_modules`
//! - Binary links in `node_modules/.bin` and lifecycle scripts

pub mod available;
pub mod error;
pub mod install;
pub mod link;
pub mod manifest;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod scripts;
pub mod spec;
pub mod tarball;
pub mod tree;
pub mod version;

#[cfg(test)]
pub(crate) mod test_support;

pub use available::AvailabilitySet;
pub use error::{codes as pkg_codes, PkgError};
pub use install::Installer;
pub use link::{bin_dir, link_binaries};
pub use manifest::{BinaryDeclaration, LifecyclePhase, Manifest, MANIFEST_NAME};
pub use registry::{
    PackageMetadata, Registry, RegistryClient, DEFAULT_REGISTRY, MAX_TARBALL_SIZE, REGISTRY_ENV,
};
pub use report::{NoopReporter, Reporter};
pub use resolve::{Resolver, DEFAULT_MAX_DEPTH};
pub use scripts::{run_lifecycle_scripts, run_script};
pub use spec::{PackageReference, PinnedPackage, ReferenceKind};
pub use tarball::{extract_package_archive, read_file_from_archive};
pub use tree::DependencyNode;
pub use version::{is_satisfied_by, max_satisfying, parse_exact, Range};
