//! Filesystem capability used by ingest and extraction.
//!
//! The bridge code only talks to the [`FileSystem`] trait. [`HostFs`] is the
//! real implementation on top of `std::fs`. On Unix entry names map to OS
//! strings byte for byte and permission bits are the real mode bits. On other
//! hosts names go through lossy UTF-8 and permissions degrade to the
//! read-only flag.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::perm::Permissions;

/// What a directory listing found at one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKind {
    Directory,
    File,
    /// Carries the verbatim, unresolved link target.
    Symlink(Vec<u8>),
    /// Sockets, FIFOs, devices and the like.
    Other,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirChild {
    pub name: Vec<u8>,
    pub kind: ChildKind,
}

/// The filesystem primitives the bridge needs.
pub trait FileSystem {
    /// Lists the direct children of `path` in whatever order the host yields.
    fn list_children(&self, path: &Path) -> io::Result<Vec<DirChild>>;
    fn read_link(&self, path: &Path) -> io::Result<Vec<u8>>;
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;
    /// Creates `path` and any missing parents. Succeeds if it already exists.
    fn create_dir(&self, path: &Path) -> io::Result<()>;
    fn create_symlink(&self, path: &Path, target: &[u8]) -> io::Result<()>;
    /// Creates or truncates `path` and writes `content`.
    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()>;
    /// Removes whatever is at `path`, recursively for directories.
    fn remove(&self, path: &Path) -> io::Result<()>;
    /// True if anything, including a dangling symlink, is at `path`.
    fn exists(&self, path: &Path) -> bool;
    /// True if `path` is a directory, following symlinks.
    fn is_dir(&self, path: &Path) -> bool;
    /// True if `path` itself is a symlink, dangling or not.
    fn is_symlink(&self, path: &Path) -> bool;
    /// Permission bits of `path` itself, not of a symlink's target.
    fn get_permissions(&self, path: &Path) -> io::Result<Permissions>;
    fn set_permissions(&self, path: &Path, perms: Permissions) -> io::Result<()>;
}

/// Converts an entry name to a path component.
#[cfg(unix)]
pub fn name_to_os(name: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(name).to_os_string()
}

#[cfg(not(unix))]
pub fn name_to_os(name: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(name).into_owned())
}

/// Converts a path component back to entry-name bytes.
#[cfg(unix)]
pub fn os_to_name(os: &std::ffi::OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    os.as_bytes().to_vec()
}

#[cfg(not(unix))]
pub fn os_to_name(os: &std::ffi::OsStr) -> Vec<u8> {
    os.to_string_lossy().into_owned().into_bytes()
}

/// The host filesystem, via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl FileSystem for HostFs {
    fn list_children(&self, path: &Path) -> io::Result<Vec<DirChild>> {
        let mut children = Vec::new();
        for dirent in fs::read_dir(path)? {
            let dirent = dirent?;
            let file_type = dirent.file_type()?;
            let kind = if file_type.is_symlink() {
                ChildKind::Symlink(self.read_link(&dirent.path())?)
            } else if file_type.is_dir() {
                ChildKind::Directory
            } else if file_type.is_file() {
                ChildKind::File
            } else {
                ChildKind::Other
            };
            children.push(DirChild { name: os_to_name(&dirent.file_name()), kind });
        }
        Ok(children)
    }

    fn read_link(&self, path: &Path) -> io::Result<Vec<u8>> {
        Ok(os_to_name(fs::read_link(path)?.as_os_str()))
    }

    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create_symlink(&self, path: &Path, target: &[u8]) -> io::Result<()> {
        let target = PathBuf::from(name_to_os(target));
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(target, path)
        }
        #[cfg(windows)]
        {
            std::os::windows::fs::symlink_file(target, path)
        }
        #[cfg(not(any(unix, windows)))]
        {
            let _ = (target, path);
            Err(io::Error::new(io::ErrorKind::Unsupported, "symlinks are not supported on this platform"))
        }
    }

    fn write_file(&self, path: &Path, content: &[u8]) -> io::Result<()> {
        fs::write(path, content)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).map_or(false, |meta| meta.file_type().is_symlink())
    }

    #[cfg(unix)]
    fn get_permissions(&self, path: &Path) -> io::Result<Permissions> {
        use std::os::unix::fs::PermissionsExt;
        Ok(Permissions::from_mode(fs::symlink_metadata(path)?.permissions().mode()))
    }

    #[cfg(not(unix))]
    fn get_permissions(&self, path: &Path) -> io::Result<Permissions> {
        let meta = fs::symlink_metadata(path)?;
        let base = if meta.is_dir() { Permissions::DIR_DEFAULT } else { Permissions::FILE_DEFAULT };
        if meta.permissions().readonly() {
            Ok(base - (Permissions::OWNER_WRITE | Permissions::GROUP_WRITE | Permissions::OTHERS_WRITE))
        } else {
            Ok(base)
        }
    }

    #[cfg(unix)]
    fn set_permissions(&self, path: &Path, perms: Permissions) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(perms.to_mode()))
    }

    #[cfg(not(unix))]
    fn set_permissions(&self, path: &Path, perms: Permissions) -> io::Result<()> {
        let mut current = fs::metadata(path)?.permissions();
        current.set_readonly(!perms.contains(Permissions::OWNER_WRITE));
        fs::set_permissions(path, current)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lists_every_kind_of_child() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(dir.path().join("file"), b"data")?;
        std::os::unix::fs::symlink("nowhere", dir.path().join("dangling"))?;

        let mut children = HostFs.list_children(dir.path())?;
        children.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(
            children,
            vec![
                DirChild { name: b"dangling".to_vec(), kind: ChildKind::Symlink(b"nowhere".to_vec()) },
                DirChild { name: b"file".to_vec(), kind: ChildKind::File },
                DirChild { name: b"sub".to_vec(), kind: ChildKind::Directory },
            ]
        );
        Ok(())
    }

    #[test]
    fn exists_does_not_follow_symlinks() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let link = dir.path().join("dangling");
        std::os::unix::fs::symlink("nowhere", &link)?;
        assert!(HostFs.exists(&link));
        assert!(HostFs.is_symlink(&link));
        assert!(!link.exists());
        assert!(!HostFs.is_symlink(dir.path()));
        assert!(!HostFs.is_symlink(&dir.path().join("missing")));
        HostFs.remove(&link)?;
        assert!(!HostFs.exists(&link));
        Ok(())
    }

    #[test]
    fn permissions_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("script");
        HostFs.write_file(&file, b"#!/bin/sh\n")?;
        HostFs.set_permissions(&file, Permissions::from_wire(0o750))?;
        assert_eq!(HostFs.get_permissions(&file)?.to_wire(), 0o750);
        Ok(())
    }

    #[test]
    fn names_are_raw_bytes() {
        let name = b"caf\xe9".to_vec();
        assert_eq!(os_to_name(&name_to_os(&name)), name);
    }
}
