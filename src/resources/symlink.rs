//! Symlink resource.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::helpers::fs::{ensure_parent_dir, fs_error, remove_path};
use super::{Applicable, Resource, ResourceChange, ResourceState};
use crate::error::ResourceError;
use crate::machine::Link;

/// How an existing destination may be replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkOptions {
    /// Create missing parent directories of the destination.
    pub parents: bool,
    /// Remove a real file or directory occupying the destination.
    pub clobber: bool,
}

/// A symlink resource that can be checked, applied and removed.
#[derive(Debug, Clone)]
pub struct SymlinkResource {
    /// What the symlink points at.
    pub target: PathBuf,
    /// Where the symlink is created.
    pub destination: PathBuf,
    /// The target is provided by the decryption collaborator and must exist.
    pub encrypted: bool,
    /// Replacement policy.
    pub options: LinkOptions,
}

impl SymlinkResource {
    /// Create a new symlink resource.
    #[must_use]
    pub const fn new(target: PathBuf, destination: PathBuf, options: LinkOptions) -> Self {
        Self {
            target,
            destination,
            encrypted: false,
            options,
        }
    }

    /// Build the resource for a declared [`Link`].
    #[must_use]
    pub fn from_link(link: &Link, options: LinkOptions) -> Self {
        Self {
            target: link.target.clone(),
            destination: link.destination.clone(),
            encrypted: link.encrypted,
            options,
        }
    }

    /// Clear the destination so a symlink can be created there.
    fn prepare_destination(&self) -> Result<(), ResourceError> {
        let meta = match fs::symlink_metadata(&self.destination) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(fs_error(&self.destination, "read metadata", &e)),
        };

        if meta.file_type().is_symlink() {
            return fs::remove_file(&self.destination)
                .map_err(|e| fs_error(&self.destination, "remove existing link", &e));
        }

        if self.options.clobber {
            return remove_path(&self.destination);
        }

        let kind = if meta.is_dir() { "directory" } else { "file" };
        Err(ResourceError::FileSystem {
            path: self.destination.clone(),
            reason: format!("destination is an existing {kind} (use --clobber to replace it)"),
        })
    }
}

impl Applicable for SymlinkResource {
    fn description(&self) -> String {
        format!("{} -> {}", self.destination.display(), self.target.display())
    }

    fn apply(&self) -> Result<ResourceChange, ResourceError> {
        if self.encrypted && !self.target.exists() {
            return Err(ResourceError::FileSystem {
                path: self.target.clone(),
                reason: "encrypted target is missing (not decrypted?)".to_string(),
            });
        }

        if self.options.parents {
            ensure_parent_dir(&self.destination)?;
        }

        self.prepare_destination()?;

        create_symlink(&self.target, &self.destination)
            .map_err(|e| fs_error(&self.destination, "create link", &e))?;

        Ok(ResourceChange::Applied)
    }

    /// Remove the link only if it is a symlink pointing at the target.
    fn remove(&self) -> Result<ResourceChange, ResourceError> {
        match self.current_state()? {
            ResourceState::Correct => {
                fs::remove_file(&self.destination)
                    .map_err(|e| fs_error(&self.destination, "remove link", &e))?;
                Ok(ResourceChange::Applied)
            }
            ResourceState::Missing => Ok(ResourceChange::Skipped {
                reason: "not present".to_string(),
            }),
            ResourceState::Incorrect { current } => Ok(ResourceChange::Skipped { reason: current }),
        }
    }
}

impl Resource for SymlinkResource {
    fn current_state(&self) -> Result<ResourceState, ResourceError> {
        match fs::read_link(&self.destination) {
            Ok(existing) if existing == self.target => Ok(ResourceState::Correct),
            Ok(existing) => Ok(ResourceState::Incorrect {
                current: format!("points to {}", existing.display()),
            }),
            Err(_) => match fs::symlink_metadata(&self.destination) {
                Ok(meta) if meta.is_dir() => Ok(ResourceState::Incorrect {
                    current: "destination is a directory".to_string(),
                }),
                Ok(_) => Ok(ResourceState::Incorrect {
                    current: "destination is a regular file".to_string(),
                }),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ResourceState::Missing),
                Err(e) => Err(fs_error(&self.destination, "read metadata", &e)),
            },
        }
    }
}

/// Create a symlink at `link` pointing to `target`.
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link)
    }

    #[cfg(windows)]
    {
        if target.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        }
    }
}

#[cfg(all(test, unix))]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("repo").join("zshrc");
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "export A=1").unwrap();
        let destination = dir.path().join("home").join(".zshrc");
        fs::create_dir_all(destination.parent().unwrap()).unwrap();
        (dir, target, destination)
    }

    fn resource(target: &Path, destination: &Path, options: LinkOptions) -> SymlinkResource {
        SymlinkResource::new(target.to_path_buf(), destination.to_path_buf(), options)
    }

    // -----------------------------------------------------------------------
    // current_state
    // -----------------------------------------------------------------------

    #[test]
    fn description_names_both_paths() {
        let r = resource(Path::new("/repo/a"), Path::new("/home/u/a"), LinkOptions::default());
        assert_eq!(r.description(), "/home/u/a -> /repo/a");
    }

    #[test]
    fn missing_when_destination_absent() {
        let (_dir, target, destination) = fixture();
        let r = resource(&target, &destination, LinkOptions::default());
        assert_eq!(r.current_state().unwrap(), ResourceState::Missing);
        assert!(r.needs_change().unwrap());
    }

    #[test]
    fn correct_when_link_points_to_target() {
        let (_dir, target, destination) = fixture();
        std::os::unix::fs::symlink(&target, &destination).unwrap();
        let r = resource(&target, &destination, LinkOptions::default());
        assert_eq!(r.current_state().unwrap(), ResourceState::Correct);
        assert!(!r.needs_change().unwrap());
    }

    #[test]
    fn incorrect_when_link_points_elsewhere() {
        let (dir, target, destination) = fixture();
        std::os::unix::fs::symlink(dir.path().join("other"), &destination).unwrap();
        let r = resource(&target, &destination, LinkOptions::default());
        assert!(matches!(
            r.current_state().unwrap(),
            ResourceState::Incorrect { ref current } if current.starts_with("points to")
        ));
    }

    // -----------------------------------------------------------------------
    // apply
    // -----------------------------------------------------------------------

    #[test]
    fn apply_creates_link() {
        let (_dir, target, destination) = fixture();
        let r = resource(&target, &destination, LinkOptions::default());
        assert_eq!(r.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(fs::read_link(&destination).unwrap(), target);
    }

    #[test]
    fn apply_allows_dangling_target() {
        let (dir, _target, destination) = fixture();
        let missing = dir.path().join("repo").join("missing");
        resource(&missing, &destination, LinkOptions::default()).apply().unwrap();
        assert_eq!(fs::read_link(&destination).unwrap(), missing);
    }

    #[test]
    fn apply_replaces_existing_symlink() {
        let (dir, target, destination) = fixture();
        std::os::unix::fs::symlink(dir.path().join("old"), &destination).unwrap();
        resource(&target, &destination, LinkOptions::default()).apply().unwrap();
        assert_eq!(fs::read_link(&destination).unwrap(), target);
    }

    #[test]
    fn apply_refuses_regular_file_without_clobber() {
        let (_dir, target, destination) = fixture();
        fs::write(&destination, "user data").unwrap();
        let err = resource(&target, &destination, LinkOptions::default())
            .apply()
            .unwrap_err();
        assert!(matches!(err, ResourceError::FileSystem { ref reason, .. } if reason.contains("--clobber")));
        assert_eq!(fs::read_to_string(&destination).unwrap(), "user data");
    }

    #[test]
    fn apply_clobbers_directory() {
        let (_dir, target, destination) = fixture();
        fs::create_dir_all(destination.join("nested")).unwrap();
        let options = LinkOptions {
            clobber: true,
            ..LinkOptions::default()
        };
        resource(&target, &destination, options).apply().unwrap();
        assert_eq!(fs::read_link(&destination).unwrap(), target);
    }

    #[test]
    fn apply_without_parents_fails_for_missing_directory() {
        let (dir, target, _destination) = fixture();
        let deep = dir.path().join("home").join(".config").join("nvim").join("init.lua");
        let err = resource(&target, &deep, LinkOptions::default())
            .apply()
            .unwrap_err();
        assert!(matches!(err, ResourceError::FileSystem { .. }));
    }

    #[test]
    fn apply_with_parents_creates_directories() {
        let (dir, target, _destination) = fixture();
        let deep = dir.path().join("home").join(".config").join("nvim").join("init.lua");
        let options = LinkOptions {
            parents: true,
            ..LinkOptions::default()
        };
        resource(&target, &deep, options).apply().unwrap();
        assert_eq!(fs::read_link(&deep).unwrap(), target);
    }

    #[test]
    fn apply_encrypted_requires_target() {
        let (dir, _target, destination) = fixture();
        let link = Link::new(dir.path().join("repo").join("netrc"), destination, true);
        let err = SymlinkResource::from_link(&link, LinkOptions::default())
            .apply()
            .unwrap_err();
        assert!(matches!(err, ResourceError::FileSystem { ref reason, .. } if reason.contains("encrypted")));
    }

    // -----------------------------------------------------------------------
    // remove
    // -----------------------------------------------------------------------

    #[test]
    fn remove_deletes_own_link() {
        let (_dir, target, destination) = fixture();
        std::os::unix::fs::symlink(&target, &destination).unwrap();
        let r = resource(&target, &destination, LinkOptions::default());
        assert_eq!(r.remove().unwrap(), ResourceChange::Applied);
        assert!(destination.symlink_metadata().is_err());
        assert!(target.exists());
    }

    #[test]
    fn remove_skips_foreign_file() {
        let (_dir, target, destination) = fixture();
        fs::write(&destination, "user data").unwrap();
        let r = resource(&target, &destination, LinkOptions::default());
        assert!(matches!(r.remove().unwrap(), ResourceChange::Skipped { .. }));
        assert!(destination.exists());
    }

    #[test]
    fn remove_skips_missing_destination() {
        let (_dir, target, destination) = fixture();
        let r = resource(&target, &destination, LinkOptions::default());
        assert!(matches!(r.remove().unwrap(), ResourceChange::Skipped { .. }));
    }
}
