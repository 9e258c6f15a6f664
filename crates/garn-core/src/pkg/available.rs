//! Ancestor-scoped pins.
//!
//! An [`AvailabilitySet`] records which names are already pinned by some
//! ancestor on the current root-to-node path. It is never mutated in place:
//! descending into a child produces a new set, so one branch's pins are
//! never visible to a sibling.

use super::spec::{PackageReference, PinnedPackage};
use super::version::is_satisfied_by;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Persistent `name -> pinned reference` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySet {
    pins: Arc<BTreeMap<String, String>>,
}

impl AvailabilitySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of this set extended with `pin`. `self` is unchanged.
    #[must_use]
    pub fn with(&self, pin: &PinnedPackage) -> Self {
        let mut pins = (*self.pins).clone();
        pins.insert(pin.name.clone(), pin.reference.clone());
        Self {
            pins: Arc::new(pins),
        }
    }

    /// The reference an ancestor pinned for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pins.get(name).map(String::as_str)
    }

    /// Whether an ancestor's pin already satisfies `dep`: either the
    /// references are identical, or the pinned version satisfies the range.
    #[must_use]
    pub fn satisfies(&self, dep: &PackageReference) -> bool {
        self.get(&dep.name).is_some_and(|pinned| {
            pinned == dep.reference || is_satisfied_by(&dep.reference, pinned)
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }
}
