//! In-memory model of an archived directory subtree.
//!
//! A [`Tree`] is an ordered list of [`Entry`] values. Order matters: it is the
//! order entries are written to the header and the order file contents appear
//! in the content section.

use serde::Serialize;

use crate::perm::Permissions;

/// One node of an archived subtree.
///
/// `name` is the entry's own base name as raw bytes, never a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory { name: Vec<u8>, permissions: Permissions, children: Tree },
    File { name: Vec<u8>, permissions: Permissions, content: Vec<u8> },
    /// `target` is stored verbatim and never resolved.
    Symlink { name: Vec<u8>, permissions: Permissions, target: Vec<u8> },
}

/// Discriminant of an [`Entry`], handy for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

impl Entry {
    pub fn directory(name: impl Into<Vec<u8>>, permissions: Permissions, children: impl Into<Tree>) -> Self {
        Entry::Directory { name: name.into(), permissions, children: children.into() }
    }

    pub fn file(name: impl Into<Vec<u8>>, permissions: Permissions, content: impl Into<Vec<u8>>) -> Self {
        Entry::File { name: name.into(), permissions, content: content.into() }
    }

    pub fn symlink(name: impl Into<Vec<u8>>, permissions: Permissions, target: impl Into<Vec<u8>>) -> Self {
        Entry::Symlink { name: name.into(), permissions, target: target.into() }
    }

    pub fn name(&self) -> &[u8] {
        match self {
            Entry::Directory { name, .. } | Entry::File { name, .. } | Entry::Symlink { name, .. } => name,
        }
    }

    pub fn permissions(&self) -> Permissions {
        match self {
            Entry::Directory { permissions, .. }
            | Entry::File { permissions, .. }
            | Entry::Symlink { permissions, .. } => *permissions,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Directory { .. } => EntryKind::Directory,
            Entry::File { .. } => EntryKind::File,
            Entry::Symlink { .. } => EntryKind::Symlink,
        }
    }
}

/// An ordered sequence of entries; a directory's `children` is itself a `Tree`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<Entry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entry> {
        self.entries.iter_mut()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Preorder walk over every entry, with depth and slash-joined path.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![(self.entries.iter(), Vec::new())] }
    }

    /// Recursively sorts entries by name bytes.
    ///
    /// Directory listing order is host dependent; sorting makes two ingests of
    /// the same logical directory encode to identical bytes.
    pub fn sort_by_name(&mut self) {
        self.entries.sort_by(|a, b| a.name().cmp(b.name()));
        for entry in &mut self.entries {
            if let Entry::Directory { children, .. } = entry {
                children.sort_by_name();
            }
        }
    }

    /// Number of file entries, at any depth.
    pub fn file_count(&self) -> usize {
        self.walk().filter(|v| v.entry.kind() == EntryKind::File).count()
    }

    /// Sum of all file content lengths, at any depth.
    pub fn content_len(&self) -> u64 {
        self.walk()
            .map(|v| match v.entry {
                Entry::File { content, .. } => content.len() as u64,
                _ => 0,
            })
            .sum()
    }

    /// Maximum directory nesting. A tree without directories has depth 0.
    pub fn depth(&self) -> usize {
        self.walk()
            .filter(|v| v.entry.kind() == EntryKind::Directory)
            .map(|v| v.depth + 1)
            .max()
            .unwrap_or(0)
    }
}

impl From<Vec<Entry>> for Tree {
    fn from(entries: Vec<Entry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<Entry> for Tree {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl IntoIterator for Tree {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Tree {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// One step of [`Tree::walk`].
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    /// 0 for top-level entries.
    pub depth: usize,
    /// Names from the tree root down to this entry, joined with `/`.
    pub path: Vec<u8>,
    pub entry: &'a Entry,
}

/// Preorder iterator returned by [`Tree::walk`].
pub struct Walk<'a> {
    stack: Vec<(std::slice::Iter<'a, Entry>, Vec<u8>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Visit<'a>> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let (iter, prefix) = self.stack.last_mut()?;
            let Some(entry) = iter.next() else {
                self.stack.pop();
                continue;
            };
            let mut path = prefix.clone();
            if !path.is_empty() {
                path.push(b'/');
            }
            path.extend_from_slice(entry.name());
            if let Entry::Directory { children, .. } = entry {
                self.stack.push((children.entries.iter(), path.clone()));
            }
            return Some(Visit { depth, path, entry });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        Tree::from(vec![
            Entry::directory(
                "a",
                Permissions::DIR_DEFAULT,
                vec![
                    Entry::file("f1", Permissions::FILE_DEFAULT, "hi"),
                    Entry::directory(
                        "b",
                        Permissions::DIR_DEFAULT,
                        vec![Entry::file("f2", Permissions::FILE_DEFAULT, "bye")],
                    ),
                    Entry::symlink("l", Permissions::all(), "f1"),
                ],
            ),
            Entry::file("top", Permissions::FILE_DEFAULT, ""),
        ])
    }

    #[test]
    fn walk_is_preorder_with_paths() {
        let tree = sample();
        let seen: Vec<(usize, String)> = tree
            .walk()
            .map(|v| (v.depth, String::from_utf8(v.path).unwrap()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (0, "a".to_string()),
                (1, "a/f1".to_string()),
                (1, "a/b".to_string()),
                (2, "a/b/f2".to_string()),
                (1, "a/l".to_string()),
                (0, "top".to_string()),
            ]
        );
    }

    #[test]
    fn summaries() {
        let tree = sample();
        assert_eq!(tree.file_count(), 3);
        assert_eq!(tree.content_len(), 5);
        assert_eq!(tree.depth(), 2);
        assert_eq!(Tree::new().depth(), 0);
        assert_eq!(Tree::from(vec![Entry::file("x", Permissions::empty(), "")]).depth(), 0);
    }

    #[test]
    fn sort_by_name_is_recursive() {
        let mut tree = Tree::from(vec![
            Entry::file("z", Permissions::empty(), ""),
            Entry::directory(
                "m",
                Permissions::empty(),
                vec![
                    Entry::file("y", Permissions::empty(), ""),
                    Entry::file("b", Permissions::empty(), ""),
                ],
            ),
            Entry::symlink("a", Permissions::empty(), "z"),
        ]);
        tree.sort_by_name();
        let names: Vec<Vec<u8>> = tree.walk().map(|v| v.path).collect();
        assert_eq!(names, vec![b"a".to_vec(), b"m".to_vec(), b"m/b".to_vec(), b"m/y".to_vec(), b"z".to_vec()]);
    }

    #[test]
    fn accessors() {
        let link = Entry::symlink("l", Permissions::from_wire(0o777), "target");
        assert_eq!(link.name(), b"l");
        assert_eq!(link.kind(), EntryKind::Symlink);
        assert_eq!(link.permissions().to_wire(), 0o777);
    }
}
