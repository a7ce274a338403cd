//! Buffer codec: exact sizing, encoding into a caller-provided slice and
//! decoding from a slice.
//!
//! The input to [`decode`] is untrusted. Every read checks the remaining
//! length first, so a short or corrupted archive yields an error and never an
//! out-of-bounds access.

use tracing::debug;

use super::{decode_archive, encode_archive, len_u32, len_u64, DecodeOptions, WireRead, WireWrite, MAGIC};
use crate::error::{MinitarError, Result};
use crate::tree::{Entry, Tree};

// tag + u32 name length + u16 permissions
const NODE_OVERHEAD: u64 = 1 + 4 + 2;

/// Exact number of bytes [`encode`] writes for `tree`.
///
/// Fails with `SizeOverflow` when a name or target does not fit in 32 bits,
/// or the archive as a whole would not fit in 64.
pub fn size_of(tree: &Tree) -> Result<u64> {
    let prefix = MAGIC.len() as u64 + 1;
    let body = level_size(tree)?;
    // trailing EXIT
    checked_sum(&[prefix, body, 1])
}

fn level_size(tree: &Tree) -> Result<u64> {
    let mut acc: u64 = 0;
    for entry in tree {
        let node = match entry {
            Entry::Directory { name, children, .. } => {
                checked_sum(&[NODE_OVERHEAD, u64::from(len_u32("name", name.len())?), level_size(children)?, 1])?
            }
            Entry::File { name, content, .. } => {
                checked_sum(&[NODE_OVERHEAD, u64::from(len_u32("name", name.len())?), 8, len_u64("content", content.len())?])?
            }
            Entry::Symlink { name, target, .. } => checked_sum(&[
                NODE_OVERHEAD,
                u64::from(len_u32("name", name.len())?),
                4,
                u64::from(len_u32("target", target.len())?),
            ])?,
        };
        acc = checked_sum(&[acc, node])?;
    }
    Ok(acc)
}

fn checked_sum(parts: &[u64]) -> Result<u64> {
    parts
        .iter()
        .try_fold(0u64, |acc, &p| acc.checked_add(p))
        .ok_or(MinitarError::SizeOverflow { field: "archive", len: u64::MAX })
}

/// Encodes `tree` into the front of `out` and returns the number of bytes
/// written, which always equals [`size_of`].
///
/// Nothing is written if `out` is too small or a field is too wide.
pub fn encode(tree: &Tree, out: &mut [u8]) -> Result<usize> {
    let needed = size_of(tree)?;
    if needed > out.len() as u64 {
        return Err(MinitarError::BufferTooSmall { needed, available: out.len() as u64 });
    }
    let mut writer = SliceWriter::new(out);
    encode_archive(tree, &mut writer)?;
    debug_assert_eq!(writer.pos as u64, needed);
    debug!(bytes = writer.pos, entries = tree.len(), "encoded archive into buffer");
    Ok(writer.pos)
}

/// Allocates exactly [`size_of`] bytes and encodes `tree` into them.
pub fn encode_to_vec(tree: &Tree) -> Result<Vec<u8>> {
    let needed = size_of(tree)?;
    let len = usize::try_from(needed).map_err(|_| MinitarError::SizeOverflow { field: "archive", len: needed })?;
    let mut out = vec![0u8; len];
    encode(tree, &mut out)?;
    Ok(out)
}

/// Decodes an archive from the front of `data`.
///
/// Returns the tree and the number of bytes the archive occupies; anything
/// after that is left alone.
pub fn decode(data: &[u8]) -> Result<(Tree, usize)> {
    decode_with(data, &DecodeOptions::default())
}

/// [`decode`] with explicit limits.
pub fn decode_with(data: &[u8], options: &DecodeOptions) -> Result<(Tree, usize)> {
    let mut reader = SliceReader::new(data);
    let tree = decode_archive(&mut reader, options)?;
    debug!(bytes = reader.pos, entries = tree.len(), "decoded archive from buffer");
    Ok((tree, reader.pos))
}

/// Bounds-checked write cursor over a mutable slice.
struct SliceWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }
}

impl WireWrite for SliceWriter<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self
            .pos
            .checked_add(bytes.len())
            .filter(|&end| end <= self.buf.len())
            .ok_or(MinitarError::BufferTooSmall {
                needed: self.pos as u64 + bytes.len() as u64,
                available: self.buf.len() as u64,
            })?;
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }
}

/// Bounds-checked read cursor over an untrusted slice.
struct SliceReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: u64) -> Result<&'a [u8]> {
        let remaining = self.buf.len() - self.pos;
        if len > remaining as u64 {
            return Err(MinitarError::TruncatedInput {
                offset: self.pos as u64,
                needed: len,
                available: remaining as u64,
            });
        }
        // len <= remaining, so it fits in usize
        let end = self.pos + len as usize;
        let out = &self.buf[self.pos..end];
        self.pos = end;
        Ok(out)
    }
}

impl WireRead for SliceReader<'_> {
    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<()> {
        let src = self.take(buf.len() as u64)?;
        buf.copy_from_slice(src);
        Ok(())
    }

    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>> {
        Ok(self.take(len)?.to_vec())
    }
}
