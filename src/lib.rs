//! # minitar Core Library
//!
//! This crate provides the core functionality for the `minitar` archiver: a
//! compact, tar-like container that stores a directory tree (directories,
//! files, symlinks and POSIX permission bits) as one flat byte sequence.
//!
//! It is used by the `minitar` command-line application, but its public API
//! can also be used to build, encode, decode and extract archives
//! programmatically.
//!
//! ## Key Modules
//!
//! - [`tree`]: the in-memory [`Tree`] / [`Entry`] model.
//! - [`perm`]: the [`Permissions`] flag set and its wire mapping.
//! - [`codec`]: the wire format, with a [`codec::buffer`] codec over slices
//!   and a [`codec::stream`] codec over `Read`/`Write`.
//! - [`ingest`] / [`extract`]: bridges between a [`Tree`] and a real
//!   filesystem, through the [`fsx::FileSystem`] trait.
//!
//! ## Examples
//!
//! ```
//! use minitar::{codec::buffer, Entry, Permissions, Tree};
//!
//! let tree = Tree::from(vec![
//!     Entry::file("hello.txt", Permissions::FILE_DEFAULT, "hi"),
//!     Entry::symlink("latest", Permissions::all(), "hello.txt"),
//! ]);
//! let bytes = buffer::encode_to_vec(&tree).unwrap();
//! assert_eq!(bytes.len() as u64, buffer::size_of(&tree).unwrap());
//!
//! let (decoded, used) = buffer::decode(&bytes).unwrap();
//! assert_eq!(decoded, tree);
//! assert_eq!(used, bytes.len());
//! ```

pub mod cli;
pub mod cli_runner;
pub mod codec;
pub mod error;
pub mod extract;
pub mod fsx;
pub mod ingest;
pub mod perm;
pub mod tree;

pub use codec::{DecodeOptions, DEFAULT_MAX_DEPTH, MAGIC, VERSION};
pub use error::{MinitarError, Result};
pub use extract::{materialize, materialize_path, OverwritePolicy};
pub use ingest::{ingest, ingest_dir, ingest_path};
pub use perm::Permissions;
pub use tree::{Entry, EntryKind, Tree};
