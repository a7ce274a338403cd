//! Reads a live directory into a [`Tree`].

use std::path::Path;

use tracing::{debug, trace, warn};

use crate::error::{IoResultExt, MinitarError, Result};
use crate::fsx::{name_to_os, os_to_name, ChildKind, FileSystem, HostFs};
use crate::tree::{Entry, Tree};

/// Builds a tree from the children of `root`.
///
/// Symlinks are recorded with their verbatim target and never followed.
/// Sockets, FIFOs and devices are skipped. Entry order is the host's listing
/// order; call [`Tree::sort_by_name`] for a reproducible order.
pub fn ingest<F: FileSystem + ?Sized>(fs: &F, root: &Path) -> Result<Tree> {
    if !fs.is_dir(root) {
        return Err(MinitarError::NotADirectory(root.to_path_buf()));
    }
    let tree = ingest_children(fs, root)?;
    debug!(root = %root.display(), entries = tree.len(), files = tree.file_count(), "ingested directory");
    Ok(tree)
}

/// Like [`ingest`], but wraps the result in a directory entry named after
/// `root` itself and carrying its permissions.
pub fn ingest_dir<F: FileSystem + ?Sized>(fs: &F, root: &Path) -> Result<Entry> {
    let children = ingest(fs, root)?;
    let name = root
        .file_name()
        .map(os_to_name)
        .ok_or_else(|| MinitarError::UnsafeName(os_to_name(root.as_os_str())))?;
    let permissions = fs.get_permissions(root).at(root)?;
    Ok(Entry::Directory { name, permissions, children })
}

/// [`ingest`] on the host filesystem.
pub fn ingest_path(root: &Path) -> Result<Tree> {
    ingest(&HostFs, root)
}

fn ingest_children<F: FileSystem + ?Sized>(fs: &F, dir: &Path) -> Result<Tree> {
    let mut tree = Tree::new();
    for child in fs.list_children(dir).at(dir)? {
        let path = dir.join(name_to_os(&child.name));
        let entry = match child.kind {
            ChildKind::Directory => Entry::Directory {
                permissions: fs.get_permissions(&path).at(&path)?,
                children: ingest_children(fs, &path)?,
                name: child.name,
            },
            ChildKind::File => Entry::File {
                permissions: fs.get_permissions(&path).at(&path)?,
                content: fs.read_file(&path).at(&path)?,
                name: child.name,
            },
            ChildKind::Symlink(target) => Entry::Symlink {
                permissions: fs.get_permissions(&path).at(&path)?,
                target,
                name: child.name,
            },
            ChildKind::Other => {
                warn!(path = %path.display(), "skipping special file");
                continue;
            }
        };
        trace!(path = %path.display(), kind = ?entry.kind(), "ingested entry");
        tree.push(entry);
    }
    Ok(tree)
}
