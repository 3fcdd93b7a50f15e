//! Self-describing tagged value tree and its binary encoding.
//!
//! A [`Tag`] is one of twelve value types; a [`Compound`] is an ordered map of
//! named tags. The binary form is the classic big-endian named-tag layout:
//! a one-byte type id, a length-prefixed name, then a type-specific payload.
//! Compressed framing (gzip / zlib) lives in [`compression`].

pub mod compression;
mod compound;
mod error;
mod io;
mod tag;

pub use compound::Compound;
pub use error::NbtError;
pub use io::{MAX_DEPTH, NbtFile, from_bytes, read_named, to_bytes, write_named};
pub use tag::{Tag, TagType};
