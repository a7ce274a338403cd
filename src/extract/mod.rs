//! # Extraction Module
//!
//! Materializes a [`Tree`] onto a filesystem. Directories are created as
//! needed, files and symlinks are written subject to an [`OverwritePolicy`].
//! A failure stops the walk and leaves whatever was already written in
//! place; there is no rollback.

mod policy;

pub use policy::OverwritePolicy;

use std::path::Path;

use tracing::{debug, trace};

use crate::error::{IoResultExt, MinitarError, Result};
use crate::fsx::{name_to_os, FileSystem, HostFs};
use crate::perm::Permissions;
use crate::tree::{Entry, Tree};

/// Writes `tree` below `root`, creating `root` and any missing parents.
///
/// Directory permissions are applied after their children are written, so a
/// read-only directory can still be populated. Symlink permissions are never
/// applied. Nothing is ever written through a symlink found below `root`: a
/// link standing where the archive has a directory or file is replaced when
/// the policy allows it, and otherwise left alone (files) or reported as
/// [`MinitarError::NotADirectory`] (directories).
pub fn materialize<F: FileSystem + ?Sized>(
    fs: &F,
    tree: &Tree,
    root: &Path,
    policy: &mut OverwritePolicy<'_>,
) -> Result<()> {
    fs.create_dir(root).at(root)?;
    materialize_children(fs, tree, root, policy)?;
    debug!(root = %root.display(), entries = tree.len(), "materialized tree");
    Ok(())
}

/// [`materialize`] on the host filesystem.
pub fn materialize_path(tree: &Tree, root: &Path, mut policy: OverwritePolicy<'_>) -> Result<()> {
    materialize(&HostFs, tree, root, &mut policy)
}

fn materialize_children<F: FileSystem + ?Sized>(
    fs: &F,
    tree: &Tree,
    dir: &Path,
    policy: &mut OverwritePolicy<'_>,
) -> Result<()> {
    for entry in tree {
        check_name(entry.name())?;
        let path = dir.join(name_to_os(entry.name()));
        trace!(path = %path.display(), kind = ?entry.kind(), "materializing entry");
        match entry {
            Entry::Directory { permissions, children, .. } => {
                enter_dir(fs, &path, policy)?;
                materialize_children(fs, children, &path, policy)?;
                fs.set_permissions(&path, *permissions).at(&path)?;
            }
            Entry::File { permissions, content, .. } => {
                if fs.exists(&path) {
                    if !policy.allows(&path, content) {
                        debug!(path = %path.display(), "keeping existing file");
                        continue;
                    }
                    // Unlink first: the old file may be read-only or a symlink.
                    fs.remove(&path).at(&path)?;
                }
                fs.write_file(&path, content).at(&path)?;
                fs.set_permissions(&path, *permissions).at(&path)?;
            }
            Entry::Symlink { target, .. } => {
                if fs.exists(&path) {
                    if policy.allows(&path, target) {
                        fs.remove(&path).at(&path)?;
                    } else {
                        debug!(path = %path.display(), "keeping existing object at symlink path");
                        continue;
                    }
                }
                fs.create_symlink(&path, target).at(&path)?;
            }
        }
    }
    Ok(())
}

/// Makes `path` a real, owner-writable directory ready to receive children.
fn enter_dir<F: FileSystem + ?Sized>(fs: &F, path: &Path, policy: &mut OverwritePolicy<'_>) -> Result<()> {
    if fs.exists(path) && (fs.is_symlink(path) || !fs.is_dir(path)) {
        if !policy.allows(path, &[]) {
            return Err(MinitarError::NotADirectory(path.to_path_buf()));
        }
        debug!(path = %path.display(), "replacing non-directory with directory");
        fs.remove(path).at(path)?;
    }
    if !fs.exists(path) {
        return fs.create_dir(path).at(path);
    }
    // A previous extraction may have left it read-only.
    let current = fs.get_permissions(path).at(path)?;
    let writable = current | Permissions::OWNER_READ | Permissions::OWNER_WRITE | Permissions::OWNER_EXEC;
    if writable != current {
        fs.set_permissions(path, writable).at(path)?;
    }
    Ok(())
}

/// Entry names must be a single plain path component.
fn check_name(name: &[u8]) -> Result<()> {
    let bad = name.is_empty()
        || name == b"."
        || name == b".."
        || name.iter().any(|&b| b == b'/' || b == 0 || (cfg!(windows) && b == b'\\'));
    if bad {
        return Err(MinitarError::UnsafeName(name.to_vec()));
    }
    Ok(())
}
