use std::fmt;
use std::path::Path;

use crate::fsx::FileSystem;

/// Decides what happens when materializing meets an existing file or link.
///
/// Only consulted when something already exists at the destination. A
/// predicate receives the destination path and the new content (files) or
/// link target (symlinks), and is called at most once per entry. For a
/// directory it is only asked when a symlink or other non-directory is in
/// the way, and receives an empty slice.
pub enum OverwritePolicy<'a> {
    Always,
    Never,
    Decide(Box<dyn FnMut(&Path, &[u8]) -> bool + 'a>),
}

impl<'a> OverwritePolicy<'a> {
    pub fn decide<F>(predicate: F) -> Self
    where
        F: FnMut(&Path, &[u8]) -> bool + 'a,
    {
        OverwritePolicy::Decide(Box::new(predicate))
    }

    /// Overwrites only when the destination differs from the new bytes: the
    /// link target for an existing symlink, the contents otherwise.
    /// Unreadable destinations are overwritten.
    pub fn if_changed<F: FileSystem + ?Sized>(fs: &'a F) -> Self {
        Self::decide(move |path, new| {
            let current = if fs.is_symlink(path) { fs.read_link(path) } else { fs.read_file(path) };
            current.map_or(true, |old| old != new)
        })
    }

    pub(crate) fn allows(&mut self, path: &Path, new: &[u8]) -> bool {
        match self {
            OverwritePolicy::Always => true,
            OverwritePolicy::Never => false,
            OverwritePolicy::Decide(predicate) => predicate(path, new),
        }
    }
}

impl From<bool> for OverwritePolicy<'_> {
    fn from(overwrite: bool) -> Self {
        if overwrite {
            OverwritePolicy::Always
        } else {
            OverwritePolicy::Never
        }
    }
}

impl fmt::Debug for OverwritePolicy<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverwritePolicy::Always => f.write_str("Always"),
            OverwritePolicy::Never => f.write_str("Never"),
            OverwritePolicy::Decide(_) => f.write_str("Decide(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsx::HostFs;
    use tempfile::tempdir;

    #[test]
    fn booleans_map_to_fixed_answers() {
        let path = Path::new("x");
        assert!(OverwritePolicy::from(true).allows(path, b""));
        assert!(!OverwritePolicy::from(false).allows(path, b""));
    }

    #[test]
    fn predicate_sees_path_and_new_bytes_each_time() {
        let mut calls = Vec::new();
        {
            let mut policy = OverwritePolicy::decide(|path: &Path, new: &[u8]| {
                calls.push((path.to_path_buf(), new.to_vec()));
                new.len() > 1
            });
            assert!(!policy.allows(Path::new("a"), b"1"));
            assert!(policy.allows(Path::new("a"), b"22"));
        }
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].1, b"22");
    }

    #[test]
    fn if_changed_compares_contents() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("f");
        std::fs::write(&path, b"same")?;
        let mut policy = OverwritePolicy::if_changed(&HostFs);
        assert!(!policy.allows(&path, b"same"));
        assert!(policy.allows(&path, b"different"));
        assert!(policy.allows(&dir.path().join("missing"), b"x"));
        assert_eq!(format!("{policy:?}"), "Decide(..)");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn if_changed_compares_link_targets() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join("t"), b"payload")?;
        let link = dir.path().join("l");
        std::os::unix::fs::symlink("t", &link)?;
        let mut policy = OverwritePolicy::if_changed(&HostFs);
        assert!(!policy.allows(&link, b"t"));
        assert!(policy.allows(&link, b"payload"));
        Ok(())
    }
}
