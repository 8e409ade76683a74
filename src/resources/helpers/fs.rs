//! File-system resource helpers.
use std::fs;
use std::io;
use std::path::Path;

use crate::error::ResourceError;

/// Wrap an I/O error as a [`ResourceError::FileSystem`] for `path`.
pub(crate) fn fs_error(path: &Path, action: &str, err: &io::Error) -> ResourceError {
    ResourceError::FileSystem {
        path: path.to_path_buf(),
        reason: format!("{action}: {err}"),
    }
}

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), ResourceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| fs_error(parent, "create parent", &e))?;
    }
    Ok(())
}

/// Remove whatever is at `path` without following symlinks.
///
/// Real directories are removed recursively; files and symlinks (including
/// broken ones) are unlinked.
///
/// # Errors
///
/// Returns an error if the entry exists but cannot be removed.
pub(crate) fn remove_path(path: &Path) -> Result<(), ResourceError> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(fs_error(path, "read metadata", &e)),
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| fs_error(path, "remove existing", &e))
}
