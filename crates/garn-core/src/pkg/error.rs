//! Package manager error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Package manager error codes.
pub mod codes {
    pub const PKG_INVALID_RANGE: &str = "PKG_INVALID_RANGE";
    pub const PKG_INVALID_VERSION: &str = "PKG_INVALID_VERSION";
    pub const PKG_NO_SATISFYING_VERSION: &str = "PKG_NO_SATISFYING_VERSION";
    pub const PKG_REGISTRY_ERROR: &str = "PKG_REGISTRY_ERROR";
    pub const PKG_TRANSPORT_ERROR: &str = "PKG_TRANSPORT_ERROR";
    pub const PKG_MANIFEST_NOT_FOUND: &str = "PKG_MANIFEST_NOT_FOUND";
    pub const PKG_MANIFEST_INVALID: &str = "PKG_MANIFEST_INVALID";
    pub const PKG_FILESYSTEM_ERROR: &str = "PKG_FILESYSTEM_ERROR";
    pub const PKG_SYMLINK_COLLISION: &str = "PKG_SYMLINK_COLLISION";
    pub const PKG_SCRIPT_FAILED: &str = "PKG_SCRIPT_FAILED";
    pub const PKG_CYCLE_OR_DEPTH_EXCEEDED: &str = "PKG_CYCLE_OR_DEPTH_EXCEEDED";
}

/// Package manager error.
#[derive(Error, Debug)]
pub enum PkgError {
    #[error("invalid version range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    #[error("invalid version '{version}': {reason}")]
    InvalidVersion { version: String, reason: String },

    #[error("no published version satisfies '{range}' ({candidates} candidates)")]
    NoSatisfyingVersion { range: String, candidates: usize },

    #[error("registry error: {0}")]
    Registry(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("package.json not found in {0}")]
    ManifestNotFound(String),

    #[error("invalid package.json: {0}")]
    ManifestParse(String),

    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("refusing to replace {} (points to {}, wanted {})", .link.display(), .existing.display(), .wanted.display())]
    SymlinkCollision {
        link: PathBuf,
        existing: PathBuf,
        wanted: PathBuf,
    },

    #[error("{phase} script `{command}` failed: {reason}")]
    ScriptExecution {
        phase: String,
        command: String,
        reason: String,
    },

    #[error("dependency cycle or depth limit exceeded: {}", .path.join(" -> "))]
    CycleOrDepthExceeded { path: Vec<String> },

    #[error("{package} ({phase}): {inner}")]
    Context {
        package: String,
        phase: &'static str,
        inner: Box<PkgError>,
    },
}

impl PkgError {
    /// Get the stable error code. Context wrappers report the innermost code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRange { .. } => codes::PKG_INVALID_RANGE,
            Self::InvalidVersion { .. } => codes::PKG_INVALID_VERSION,
            Self::NoSatisfyingVersion { .. } => codes::PKG_NO_SATISFYING_VERSION,
            Self::Registry(_) => codes::PKG_REGISTRY_ERROR,
            Self::Transport(_) => codes::PKG_TRANSPORT_ERROR,
            Self::ManifestNotFound(_) => codes::PKG_MANIFEST_NOT_FOUND,
            Self::ManifestParse(_) => codes::PKG_MANIFEST_INVALID,
            Self::Filesystem { .. } => codes::PKG_FILESYSTEM_ERROR,
            Self::SymlinkCollision { .. } => codes::PKG_SYMLINK_COLLISION,
            Self::ScriptExecution { .. } => codes::PKG_SCRIPT_FAILED,
            Self::CycleOrDepthExceeded { .. } => codes::PKG_CYCLE_OR_DEPTH_EXCEEDED,
            Self::Context { inner, .. } => inner.code(),
        }
    }

    /// Strip any context wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &PkgError {
        match self {
            Self::Context { inner, .. } => inner.root_cause(),
            other => other,
        }
    }

    /// Create an invalid range error.
    pub fn invalid_range(range: &str, reason: impl ToString) -> Self {
        Self::InvalidRange {
            range: range.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid version error.
    pub fn invalid_version(version: &str, reason: impl ToString) -> Self {
        Self::InvalidVersion {
            version: version.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a no-satisfying-version error.
    #[must_use]
    pub fn no_satisfying_version(range: &str, candidates: usize) -> Self {
        Self::NoSatisfyingVersion {
            range: range.to_string(),
            candidates,
        }
    }

    /// Create a registry error.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a filesystem error for `path`.
    pub fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Create a script execution error.
    pub fn script(phase: &str, command: &str, reason: impl Into<String>) -> Self {
        Self::ScriptExecution {
            phase: phase.to_string(),
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach package and phase context.
    #[must_use]
    pub fn within(self, package: impl Into<String>, phase: &'static str) -> Self {
        Self::Context {
            package: package.into(),
            phase,
            inner: Box::new(self),
        }
    }
}

impl From<reqwest::Error> for PkgError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("Request timed out: {e}"))
        } else if e.is_connect() {
            Self::Transport(format!("Connection failed: {e}"))
        } else {
            Self::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for PkgError {
    fn from(e: serde_json::Error) -> Self {
        Self::ManifestParse(e.to_string())
    }
}

impl From<io::Error> for PkgError {
    fn from(e: io::Error) -> Self {
        Self::Filesystem {
            path: PathBuf::new(),
            source: e,
        }
    }
}
