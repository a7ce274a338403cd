use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The primary error type for all operations in the `minitar` crate.
#[derive(Debug, Error)]
pub enum MinitarError {
    /// The input does not start with the `MINITAR` magic bytes.
    #[error("Not a minitar archive (magic bytes mismatch)")]
    InvalidMagic,

    /// The magic bytes matched but the format version is unknown.
    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(u8),

    /// A read would run past the end of the buffer or stream.
    #[error("Truncated archive: needed {needed} bytes at offset {offset}, only {available} available")]
    TruncatedInput { offset: u64, needed: u64, available: u64 },

    /// A tag byte outside the known set, or a terminator where none is allowed.
    #[error("Malformed tag byte {tag:#04x} at offset {offset}")]
    MalformedTag { tag: u8, offset: u64 },

    /// The ingest root is not a directory.
    #[error("Not a directory: '{}'", .0.display())]
    NotADirectory(PathBuf),

    /// An I/O error occurred, typically while reading or writing a file.
    /// Includes the path where the error happened, if known.
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io { source: io::Error, path: PathBuf },

    /// A length does not fit the width of its wire field.
    #[error("{field} length {len} does not fit its wire field")]
    SizeOverflow { field: &'static str, len: u64 },

    /// The output buffer handed to `encode` is shorter than the archive.
    #[error("Output buffer too small: archive needs {needed} bytes, buffer holds {available}")]
    BufferTooSmall { needed: u64, available: u64 },

    /// The header nests directories deeper than the decoder allows.
    #[error("Archive too deep: directory nesting exceeds {max_depth}")]
    TooDeep { max_depth: usize },

    /// An entry name that is not a single, plain path component.
    #[error("Unsafe entry name '{}'", String::from_utf8_lossy(.0))]
    UnsafeName(Vec<u8>),
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = MinitarError> = std::result::Result<T, E>;

// Generic IO error conversion that doesn't require a path
impl From<io::Error> for MinitarError {
    fn from(err: io::Error) -> Self {
        MinitarError::Io { source: err, path: PathBuf::new() }
    }
}

/// Attaches the offending path to a raw `io::Result`.
pub(crate) trait IoResultExt<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| MinitarError::Io { source, path: path.to_path_buf() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_their_source_and_path() {
        let raw: io::Result<()> = Err(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        let wrapped = raw.at(Path::new("some/where")).unwrap_err();
        match &wrapped {
            MinitarError::Io { source, path } => {
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
                assert_eq!(path, Path::new("some/where"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(std::error::Error::source(&wrapped).is_some());
        assert!(wrapped.to_string().contains("some/where"));
    }

    #[test]
    fn unsafe_name_renders_lossily() {
        let err = MinitarError::UnsafeName(b"a/\xffb".to_vec());
        assert_eq!(err.to_string(), "Unsafe entry name 'a/\u{fffd}b'");
    }
}
