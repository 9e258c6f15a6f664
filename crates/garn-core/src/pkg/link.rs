//! Binary symlinks in `node_modules/.bin`.

use super::error::PkgError;
use super::manifest::Manifest;
use super::report::Reporter;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Link every binary a child package declares into
/// `<target_dir>/node_modules/.bin`.
///
/// Each link is relative: `.bin/<name> -> ../<child_name>/<path>`, so the
/// tree stays valid if moved as a unit. Returns the created link paths.
///
/// # Errors
/// Returns `SymlinkCollision` if a link path already exists and points
/// elsewhere, or `FilesystemError` if a binary name is not a plain file name,
/// a binary path leaves the package, or a link cannot be created.
pub fn link_binaries(
    target_dir: &Path,
    child_name: &str,
    child_target: &Path,
    manifest: &Manifest,
    reporter: &impl Reporter,
) -> Result<Vec<PathBuf>, PkgError> {
    let Some(binaries) = &manifest.binaries else {
        return Ok(Vec::new());
    };
    let entries = binaries.entries(child_name);
    if entries.is_empty() {
        return Ok(Vec::new());
    }
    for (name, relative) in &entries {
        check_entry(child_target, name, relative)?;
    }

    let bin_dir = bin_dir(target_dir);
    fs::create_dir_all(&bin_dir).map_err(|e| PkgError::fs(&bin_dir, e))?;

    let mut links = Vec::with_capacity(entries.len());
    for (name, relative) in entries {
        let link = bin_dir.join(&name);
        let wanted = Path::new("..").join(child_name).join(&relative);

        if create_file_link(&wanted, &link)? {
            make_executable(&child_target.join(&relative))?;
        }
        reporter.linked_binary(&name, &link, &wanted);
        links.push(link);
    }

    Ok(links)
}

/// `<dir>/node_modules/.bin`.
#[must_use]
pub fn bin_dir(dir: &Path) -> PathBuf {
    dir.join("node_modules").join(".bin")
}

/// The name must be one normal path component and the path must stay inside
/// the package.
fn check_entry(child_target: &Path, name: &str, relative: &Path) -> Result<(), PkgError> {
    let mut components = Path::new(name).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(unsafe_binary(child_target, format!("binary name '{name}' is not a file name")));
    }

    let escapes = relative
        .components()
        .any(|c| matches!(c, Component::RootDir | Component::Prefix(_) | Component::ParentDir));
    if escapes || relative.as_os_str().is_empty() {
        return Err(unsafe_binary(
            child_target,
            format!("binary '{name}' points outside the package: {}", relative.display()),
        ));
    }

    Ok(())
}

fn unsafe_binary(child_target: &Path, message: String) -> PkgError {
    PkgError::fs(child_target, io::Error::new(io::ErrorKind::InvalidData, message))
}

/// Create `link -> target`. Returns `false` if an identical link already
/// exists.
fn create_file_link(target: &Path, link: &Path) -> Result<bool, PkgError> {
    if let Ok(metadata) = fs::symlink_metadata(link) {
        let existing = if metadata.file_type().is_symlink() {
            fs::read_link(link).map_err(|e| PkgError::fs(link, e))?
        } else {
            link.to_path_buf()
        };
        if existing == target {
            return Ok(false);
        }
        return Err(PkgError::SymlinkCollision {
            link: link.to_path_buf(),
            existing,
            wanted: target.to_path_buf(),
        });
    }

    #[cfg(unix)]
    std::os::unix::fs::symlink(target, link).map_err(|e| PkgError::fs(link, e))?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_file(target, link).map_err(|e| PkgError::fs(link, e))?;

    Ok(true)
}

/// Add execute bits to a binary's target. Missing targets are left for the
/// package to provide later (e.g. from a build script).
fn make_executable(path: &Path) -> Result<(), PkgError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let Ok(metadata) = fs::metadata(path) else {
            return Ok(());
        };
        let mut perms = metadata.permissions();
        perms.set_mode(perms.mode() | 0o111);
        fs::set_permissions(path, perms).map_err(|e| PkgError::fs(path, e))?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}
