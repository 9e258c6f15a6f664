//! Archive reading and extraction.
//!
//! Package archives are gzip-compressed tarballs whose entries share one
//! leading directory (usually `package/`, sometimes the bare package name).
//! That segment is stripped from every entry.

use super::error::PkgError;
use flate2::read::GzDecoder;
use std::fs::{self, OpenOptions};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

/// Read one file from an archive by its path below the leading directory.
///
/// Returns `Ok(None)` if no such entry exists.
///
/// # Errors
/// Returns an error if the archive cannot be decoded.
pub fn read_file_from_archive(bytes: &[u8], file: &str) -> Result<Option<Vec<u8>>, PkgError> {
    let mut archive = Archive::new(GzDecoder::new(bytes));

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path().map_err(archive_error)?.into_owned();
        if strip_leading_segment(&path).is_some_and(|p| p.as_path() == Path::new(file)) {
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).map_err(archive_error)?;
            return Ok(Some(contents));
        }
    }

    Ok(None)
}

/// Extract an archive into `dest`, stripping the leading directory.
///
/// Parent directories are created as needed and file modes are preserved.
/// Paths that already exist are left alone: the first writer wins.
///
/// # Errors
/// Returns an error if the archive is corrupt, contains an absolute or
/// escaping path, or a filesystem operation fails.
pub fn extract_package_archive(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    fs::create_dir_all(dest).map_err(|e| PkgError::fs(dest, e))?;

    let mut archive = Archive::new(GzDecoder::new(bytes));

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let path = entry.path().map_err(archive_error)?.into_owned();
        let path_str = path.to_string_lossy().into_owned();

        // Reject absolute paths
        if path.is_absolute() {
            return Err(unsafe_path(dest, &path_str, "absolute path"));
        }

        // Reject path traversal
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(unsafe_path(dest, &path_str, "path traversal"));
        }

        // Entries that are only the leading directory have nothing to write
        let Some(relative) = strip_leading_segment(&path) else {
            continue;
        };
        let dest_path = dest.join(&relative);

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            if !dest_path.exists() {
                fs::create_dir_all(&dest_path).map_err(|e| PkgError::fs(&dest_path, e))?;
            }
        } else if matches!(entry_type, EntryType::Regular | EntryType::Continuous) {
            if dest_path.symlink_metadata().is_ok() {
                continue;
            }
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent).map_err(|e| PkgError::fs(parent, e))?;
            }
            let mode = entry.header().mode().unwrap_or(0o644);
            write_entry(&mut entry, &dest_path, mode)?;
        }
        // Skip symlinks and other special entries for security
    }

    Ok(())
}

fn write_entry(reader: &mut impl Read, dest_path: &Path, mode: u32) -> Result<(), PkgError> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }
    #[cfg(not(unix))]
    let _ = mode;

    let mut file = options
        .open(dest_path)
        .map_err(|e| PkgError::fs(dest_path, e))?;
    io::copy(reader, &mut file).map_err(|e| PkgError::fs(dest_path, e))?;

    // The process umask applies at creation; restore the archived bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest_path, fs::Permissions::from_mode(mode & 0o7777))
            .map_err(|e| PkgError::fs(dest_path, e))?;
    }

    Ok(())
}

/// Drop the first normal path segment. `None` if nothing remains.
fn strip_leading_segment(path: &Path) -> Option<PathBuf> {
    let rest: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .skip(1)
        .collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

fn archive_error(e: io::Error) -> PkgError {
    PkgError::Filesystem {
        path: PathBuf::from("<archive>"),
        source: e,
    }
}

fn unsafe_path(dest: &Path, entry: &str, what: &str) -> PkgError {
    PkgError::fs(
        dest,
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("archive contains {what}: {entry}"),
        ),
    )
}
