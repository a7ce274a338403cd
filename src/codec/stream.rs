//! Stream codec: the same archive over `std::io::Read` / `std::io::Write`.
//!
//! The writer never materializes the archive. It emits the header as it walks
//! the tree and keeps borrowed references to file contents until the header
//! is closed. The reader consumes exactly one archive and stops at the end of
//! its content section.

use std::io::{self, Read, Write};

use tracing::debug;

use super::{buffer, decode_archive, encode_archive, DecodeOptions, WireRead, WireWrite};
use crate::error::{MinitarError, Result};
use crate::tree::Tree;

/// Largest up-front allocation made on behalf of an untrusted length field.
const PREALLOC_LIMIT: u64 = 1 << 20; // 1 MiB

/// Writes `tree` as an archive to `writer` and flushes it.
///
/// Field widths are validated before the first byte goes out. Returns the
/// number of bytes written.
pub fn write_archive<W: Write>(tree: &Tree, writer: W) -> Result<u64> {
    let expected = buffer::size_of(tree)?;
    let mut out = StreamWriter::new(writer);
    encode_archive(tree, &mut out)?;
    out.flush()?;
    debug_assert_eq!(out.written(), expected);
    debug!(bytes = out.written(), entries = tree.len(), "streamed archive");
    Ok(out.written())
}

/// Reads one archive from `reader`.
pub fn read_archive<R: Read>(reader: R) -> Result<Tree> {
    read_archive_with(reader, &DecodeOptions::default())
}

/// [`read_archive`] with explicit limits.
pub fn read_archive_with<R: Read>(reader: R, options: &DecodeOptions) -> Result<Tree> {
    let mut input = StreamReader::new(reader);
    let tree = decode_archive(&mut input, options)?;
    debug!(bytes = input.position(), entries = tree.len(), "read archive from stream");
    Ok(tree)
}

/// Sequential archive reader over any `io::Read`, tracking its offset.
pub struct StreamReader<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> WireRead for StreamReader<R> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let start = self.pos;
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => {
                    self.pos += filled as u64;
                    return Err(MinitarError::TruncatedInput {
                        offset: start,
                        needed: buf.len() as u64,
                        available: filled as u64,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pos += filled as u64;
                    return Err(e.into());
                }
            }
        }
        self.pos += filled as u64;
        Ok(())
    }

    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        let start = self.pos;
        let mut out = Vec::with_capacity(len.min(PREALLOC_LIMIT) as usize);
        let read = (&mut self.inner).take(len).read_to_end(&mut out);
        // Consumed bytes count even when the read failed part way.
        let got = out.len() as u64;
        self.pos += got;
        read?;
        if got < len {
            return Err(MinitarError::TruncatedInput { offset: start, needed: len, available: got });
        }
        Ok(out)
    }
}

/// Sequential archive writer over any `io::Write`, counting bytes written.
pub struct StreamWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        Ok(self.inner.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> WireWrite for StreamWriter<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}
