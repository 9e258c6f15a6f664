//! Progress reporting.
//!
//! The resolver and installer never print or log; they describe what they
//! are doing to a [`Reporter`]. The CLI turns those events into `tracing`
//! records and progress lines.

use super::manifest::LifecyclePhase;
use super::spec::{PackageReference, PinnedPackage};
use std::path::Path;

/// Receiver for resolution and installation events. Every method defaults
/// to doing nothing.
pub trait Reporter {
    /// About to resolve the dependencies declared by `pkg`.
    fn resolving(&self, _pkg: &PackageReference) {}

    /// `dep` was pinned to `pinned`.
    fn pinned(&self, _dep: &PackageReference, _pinned: &PinnedPackage) {}

    /// `dep` was skipped because an ancestor already pins `ancestor`.
    fn reused(&self, _dep: &PackageReference, _ancestor: &str) {}

    /// About to extract `pkg` into `target`.
    fn extracting(&self, _pkg: &PinnedPackage, _target: &Path) {}

    /// Created `link` pointing at `target`.
    fn linked_binary(&self, _name: &str, _link: &Path, _target: &Path) {}

    /// About to run a lifecycle script.
    fn running_script(&self, _package: &str, _phase: LifecyclePhase, _command: &str) {}

    /// A lifecycle script finished; `stdout` is its captured output.
    fn script_output(&self, _package: &str, _phase: LifecyclePhase, _stdout: &str) {}
}

/// A reporter that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}

impl<R: Reporter + ?Sized> Reporter for &R {
    fn resolving(&self, pkg: &PackageReference) {
        (**self).resolving(pkg);
    }

    fn pinned(&self, dep: &PackageReference, pinned: &PinnedPackage) {
        (**self).pinned(dep, pinned);
    }

    fn reused(&self, dep: &PackageReference, ancestor: &str) {
        (**self).reused(dep, ancestor);
    }

    fn extracting(&self, pkg: &PinnedPackage, target: &Path) {
        (**self).extracting(pkg, target);
    }

    fn linked_binary(&self, name: &str, link: &Path, target: &Path) {
        (**self).linked_binary(name, link, target);
    }

    fn running_script(&self, package: &str, phase: LifecyclePhase, command: &str) {
        (**self).running_script(package, phase, command);
    }

    fn script_output(&self, package: &str, phase: LifecyclePhase, stdout: &str) {
        (**self).script_output(package, phase, stdout);
    }
}
