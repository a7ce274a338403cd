//! # The minitar wire format
//!
//! An archive is two sections back to back:
//!
//! 1.  **Header**: `"MINITAR"`, a version byte, then a preorder walk of the
//!     tree. Every node starts with a one-byte tag:
//!     - `MKDIR  u32 name_len, name, u16 perm, <children...>, CDUP`
//!     - `TOUCH  u32 name_len, name, u16 perm, u64 content_len`
//!     - `SLINK  u32 name_len, name, u16 perm, u32 target_len, target`
//!
//!     The top level is closed by `EXIT`.
//! 2.  **Content**: the bytes of every `TOUCH` node, concatenated in the same
//!     preorder, with no separators. Lengths live in the header.
//!
//! All integers are little-endian. The split lets a reader learn the whole
//! shape of the tree, and every size, before touching a content byte.
//!
//! [`buffer`] encodes into and decodes from a contiguous slice; [`stream`]
//! does the same over `std::io::Read` / `std::io::Write`. Both drive the
//! traversal in this module through the [`WireRead`] / [`WireWrite`] traits,
//! so the header walk, the content walk and the decoder's two passes cannot
//! drift apart.

pub mod buffer;
pub mod stream;

use std::collections::VecDeque;

use crate::error::{MinitarError, Result};
use crate::perm::Permissions;
use crate::tree::{Entry, Tree};

/// Leading signature of every archive.
pub const MAGIC: &[u8; 7] = b"MINITAR";
/// The only format version this crate reads or writes.
pub const VERSION: u8 = 1;
/// Default bound on directory nesting accepted by the decoders.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Node tags. The ordinal values are part of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Exit = 0,
    Mkdir = 1,
    Cdup = 2,
    Touch = 3,
    Slink = 4,
}

impl TryFrom<u8> for Tag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(Tag::Exit),
            1 => Ok(Tag::Mkdir),
            2 => Ok(Tag::Cdup),
            3 => Ok(Tag::Touch),
            4 => Ok(Tag::Slink),
            other => Err(other),
        }
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Deepest directory nesting accepted before failing with `TooDeep`.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self { max_depth: DEFAULT_MAX_DEPTH }
    }
}

/// Sequential little-endian reader over an archive.
///
/// Implementations check bounds before consuming anything and report a short
/// input as [`MinitarError::TruncatedInput`].
pub trait WireRead {
    /// Bytes consumed so far.
    fn position(&self) -> u64;

    /// Fills `buf` completely or fails.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Reads exactly `len` bytes into a fresh vector.
    fn read_bytes(&mut self, len: u64) -> Result<Vec<u8>>;

    fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_into(&mut b)?;
        Ok(b[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_into(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_into(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        self.read_into(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }
}

/// Sequential little-endian writer for an archive.
pub trait WireWrite {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()>;

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_le_bytes())
    }
}

/// Length of a name or link target as its `u32` wire field.
pub(crate) fn len_u32(field: &'static str, len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| MinitarError::SizeOverflow { field, len: len as u64 })
}

/// Length of file content as its `u64` wire field.
pub(crate) fn len_u64(field: &'static str, len: usize) -> Result<u64> {
    u64::try_from(len).map_err(|_| MinitarError::SizeOverflow { field, len: u64::MAX })
}

// --- encoding ----------------------------------------------------------

/// Writes a complete archive. Callers validate field widths first (see
/// [`buffer::size_of`]) so that a width error never leaves a partial archive.
pub(crate) fn encode_archive<W: WireWrite>(tree: &Tree, writer: &mut W) -> Result<()> {
    writer.write_bytes(MAGIC)?;
    writer.write_u8(VERSION)?;
    let mut contents: VecDeque<&[u8]> = VecDeque::new();
    encode_level(tree, writer, &mut contents)?;
    writer.write_u8(Tag::Exit as u8)?;
    while let Some(content) = contents.pop_front() {
        writer.write_bytes(content)?;
    }
    Ok(())
}

fn encode_level<'t, W: WireWrite>(tree: &'t Tree, writer: &mut W, contents: &mut VecDeque<&'t [u8]>) -> Result<()> {
    for entry in tree {
        match entry {
            Entry::Directory { name, permissions, children } => {
                writer.write_u8(Tag::Mkdir as u8)?;
                write_name(writer, name, *permissions)?;
                encode_level(children, writer, contents)?;
                writer.write_u8(Tag::Cdup as u8)?;
            }
            Entry::File { name, permissions, content } => {
                writer.write_u8(Tag::Touch as u8)?;
                write_name(writer, name, *permissions)?;
                writer.write_u64(len_u64("content", content.len())?)?;
                contents.push_back(content);
            }
            Entry::Symlink { name, permissions, target } => {
                writer.write_u8(Tag::Slink as u8)?;
                write_name(writer, name, *permissions)?;
                writer.write_u32(len_u32("target", target.len())?)?;
                writer.write_bytes(target)?;
            }
        }
    }
    Ok(())
}

fn write_name<W: WireWrite>(writer: &mut W, name: &[u8], permissions: Permissions) -> Result<()> {
    writer.write_u32(len_u32("name", name.len())?)?;
    writer.write_bytes(name)?;
    writer.write_u16(permissions.to_wire())
}

// --- decoding ----------------------------------------------------------

/// Reads a complete archive: magic, version, header, then content.
pub(crate) fn decode_archive<R: WireRead>(reader: &mut R, options: &DecodeOptions) -> Result<Tree> {
    let mut magic = [0u8; MAGIC.len()];
    reader.read_into(&mut magic)?;
    if &magic != MAGIC {
        return Err(MinitarError::InvalidMagic);
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        return Err(MinitarError::UnsupportedVersion(version));
    }

    let mut pending = VecDeque::new();
    let mut tree = decode_level(reader, &mut pending, 0, options.max_depth)?;
    fill_contents(reader, &mut tree, &mut pending)?;
    debug_assert!(pending.is_empty());
    Ok(tree)
}

/// Parses one level of the header. File contents stay empty; their lengths
/// are queued in `pending` in visitation order.
fn decode_level<R: WireRead>(
    reader: &mut R,
    pending: &mut VecDeque<u64>,
    depth: usize,
    max_depth: usize,
) -> Result<Tree> {
    let mut tree = Tree::new();
    loop {
        let offset = reader.position();
        let byte = reader.read_u8()?;
        let tag = Tag::try_from(byte).map_err(|tag| MinitarError::MalformedTag { tag, offset })?;
        match tag {
            Tag::Exit if depth == 0 => return Ok(tree),
            Tag::Cdup if depth > 0 => return Ok(tree),
            // EXIT inside a directory or CDUP at the top level.
            Tag::Exit | Tag::Cdup => return Err(MinitarError::MalformedTag { tag: byte, offset }),
            Tag::Mkdir => {
                let (name, permissions) = read_name(reader)?;
                if depth >= max_depth {
                    return Err(MinitarError::TooDeep { max_depth });
                }
                let children = decode_level(reader, pending, depth + 1, max_depth)?;
                tree.push(Entry::Directory { name, permissions, children });
            }
            Tag::Touch => {
                let (name, permissions) = read_name(reader)?;
                pending.push_back(reader.read_u64()?);
                tree.push(Entry::File { name, permissions, content: Vec::new() });
            }
            Tag::Slink => {
                let (name, permissions) = read_name(reader)?;
                let target_len = reader.read_u32()?;
                let target = reader.read_bytes(u64::from(target_len))?;
                tree.push(Entry::Symlink { name, permissions, target });
            }
        }
    }
}

fn read_name<R: WireRead>(reader: &mut R) -> Result<(Vec<u8>, Permissions)> {
    let len = reader.read_u32()?;
    let name = reader.read_bytes(u64::from(len))?;
    let permissions = Permissions::from_wire(reader.read_u16()?);
    Ok((name, permissions))
}

/// Second pass: walks the decoded tree in the same preorder and hands each
/// file the next queued length worth of content bytes.
fn fill_contents<R: WireRead>(reader: &mut R, tree: &mut Tree, pending: &mut VecDeque<u64>) -> Result<()> {
    for entry in tree.iter_mut() {
        match entry {
            Entry::Directory { children, .. } => fill_contents(reader, children, pending)?,
            Entry::File { content, .. } => {
                if let Some(len) = pending.pop_front() {
                    *content = reader.read_bytes(len)?;
                }
            }
            Entry::Symlink { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ordinals_are_fixed() {
        assert_eq!(Tag::Exit as u8, 0);
        assert_eq!(Tag::Mkdir as u8, 1);
        assert_eq!(Tag::Cdup as u8, 2);
        assert_eq!(Tag::Touch as u8, 3);
        assert_eq!(Tag::Slink as u8, 4);
        for byte in 0..=4u8 {
            assert_eq!(Tag::try_from(byte).map(|t| t as u8), Ok(byte));
        }
        assert_eq!(Tag::try_from(5), Err(5));
        assert_eq!(Tag::try_from(0xff), Err(0xff));
    }

    #[test]
    fn field_widths_are_checked() {
        assert_eq!(len_u32("name", 3).unwrap(), 3);
        assert_eq!(len_u32("target", u32::MAX as usize).unwrap(), u32::MAX);
        assert_eq!(len_u64("content", usize::MAX).unwrap(), usize::MAX as u64);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn names_wider_than_u32_overflow() {
        let len = u32::MAX as usize + 1;
        match len_u32("name", len) {
            Err(MinitarError::SizeOverflow { field, len: reported }) => {
                assert_eq!(field, "name");
                assert_eq!(reported, u64::from(u32::MAX) + 1);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn default_options() {
        assert_eq!(DecodeOptions::default().max_depth, DEFAULT_MAX_DEPTH);
    }
}
