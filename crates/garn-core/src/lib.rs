#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Resolver and installer for a minimal npm-compatible package manager.
//!
//! Logging is handled by the CLI crate; this crate reports progress through
//! [`pkg::Reporter`].

pub mod config;
pub mod pkg;
pub mod version;

pub use config::Config;
pub use pkg::{DependencyNode, Installer, Manifest, PkgError, Registry, RegistryClient, Resolver};
pub use version::VERSION;
