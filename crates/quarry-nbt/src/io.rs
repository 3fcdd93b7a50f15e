//! Binary encoding of tags.
//!
//! ## Layout
//!
//! | Tag | Payload |
//! |-----|---------|
//! | Byte/Short/Int/Long | big-endian fixed width |
//! | Float/Double | big-endian IEEE 754 |
//! | ByteArray/IntArray/LongArray | `i32` length, then elements |
//! | String | `u16` byte length, then UTF-8 |
//! | List | element type id, `i32` count, then payloads |
//! | Compound | named tags, terminated by an End byte |
//!
//! A named tag is its type id, a `u16`-prefixed name and its payload.

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::compression::{self, Compression};
use crate::{Compound, NbtError, Tag, TagType};

/// Maximum nesting of lists and compounds accepted when decoding.
pub const MAX_DEPTH: usize = 512;

/// Elements preallocated for an array before its bytes have been seen.
const PREALLOC_LIMIT: usize = 4096;

/// Reads one named tag. Returns `None` when the next byte is an End tag.
pub fn read_named<R: Read>(reader: &mut R) -> Result<Option<(String, Tag)>, NbtError> {
    read_named_at(reader, 0)
}

/// Writes `tag` with the given name.
pub fn write_named<W: Write>(writer: &mut W, name: &str, tag: &Tag) -> Result<(), NbtError> {
    writer.write_u8(tag.tag_type().id())?;
    write_string(writer, name)?;
    write_payload(writer, tag)
}

/// Encodes `root` as an unnamed root compound.
pub fn to_bytes(root: &Compound) -> Result<Vec<u8>, NbtError> {
    let mut buf = Vec::new();
    write_root(&mut buf, "", root)?;
    Ok(buf)
}

/// Decodes an unnamed (or named, the name is discarded) root compound.
///
/// Bytes after the root compound are ignored.
pub fn from_bytes(bytes: &[u8]) -> Result<Compound, NbtError> {
    let mut cursor = Cursor::new(bytes);
    read_root(&mut cursor).map(|(_, root)| root)
}

/// A complete named root compound, optionally compressed on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct NbtFile {
    pub name: String,
    pub root: Compound,
}

impl NbtFile {
    pub fn new(name: impl Into<String>, root: Compound) -> Self {
        Self {
            name: name.into(),
            root,
        }
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self, NbtError> {
        let (name, root) = read_root(reader)?;
        Ok(Self { name, root })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<(), NbtError> {
        write_root(writer, &self.name, &self.root)
    }

    /// Reads a file whose bytes are compressed with `compression`.
    pub fn read_compressed(bytes: &[u8], compression: Compression) -> Result<Self, NbtError> {
        let raw = compression::decompress(bytes, compression)?;
        Self::read(&mut Cursor::new(raw))
    }

    /// Encodes and compresses the file.
    pub fn to_compressed(&self, compression: Compression) -> Result<Vec<u8>, NbtError> {
        let mut raw = Vec::new();
        self.write(&mut raw)?;
        compression::compress(&raw, compression)
    }
}

fn write_root<W: Write>(writer: &mut W, name: &str, root: &Compound) -> Result<(), NbtError> {
    writer.write_u8(TagType::Compound.id())?;
    write_string(writer, name)?;
    write_compound(writer, root)
}

fn read_root<R: Read>(reader: &mut R) -> Result<(String, Compound), NbtError> {
    match read_named(reader)? {
        Some((name, Tag::Compound(root))) => Ok((name, root)),
        Some((_, other)) => Err(NbtError::format(format!(
            "root tag is {:?}, expected a compound",
            other.tag_type()
        ))),
        None => Err(NbtError::format("root tag is End")),
    }
}

fn read_named_at<R: Read>(reader: &mut R, depth: usize) -> Result<Option<(String, Tag)>, NbtError> {
    let type_id = reader.read_u8()?;
    if type_id == TagType::End.id() {
        return Ok(None);
    }
    let tag_type = TagType::from_id(type_id)
        .ok_or_else(|| NbtError::format(format!("invalid tag type: {type_id}")))?;
    let name = read_string(reader)?;
    let tag = read_payload(reader, tag_type, depth)?;
    Ok(Some((name, tag)))
}

fn read_payload<R: Read>(reader: &mut R, tag_type: TagType, depth: usize) -> Result<Tag, NbtError> {
    if depth > MAX_DEPTH {
        return Err(NbtError::format(format!("nesting deeper than {MAX_DEPTH}")));
    }
    Ok(match tag_type {
        TagType::End => return Err(NbtError::format("End tag has no payload")),
        TagType::Byte => Tag::Byte(reader.read_i8()?),
        TagType::Short => Tag::Short(reader.read_i16::<BigEndian>()?),
        TagType::Int => Tag::Int(reader.read_i32::<BigEndian>()?),
        TagType::Long => Tag::Long(reader.read_i64::<BigEndian>()?),
        TagType::Float => Tag::Float(reader.read_f32::<BigEndian>()?),
        TagType::Double => Tag::Double(reader.read_f64::<BigEndian>()?),
        TagType::ByteArray => {
            let len = read_length(reader)?;
            let mut bytes = Vec::new();
            (&mut *reader).take(len as u64).read_to_end(&mut bytes)?;
            if bytes.len() != len {
                return Err(NbtError::Truncated);
            }
            Tag::ByteArray(bytes.into_iter().map(|b| b as i8).collect())
        }
        TagType::String => Tag::String(read_string(reader)?),
        TagType::List => {
            let element_id = reader.read_u8()?;
            let element_type = TagType::from_id(element_id)
                .ok_or_else(|| NbtError::format(format!("invalid list element type: {element_id}")))?;
            let len = read_length(reader)?;
            if element_type == TagType::End {
                if len > 0 {
                    tracing::warn!(len, "list of End elements, reading as empty");
                }
                return Ok(Tag::List(Vec::new()));
            }
            let mut list = Vec::with_capacity(len.min(PREALLOC_LIMIT));
            for _ in 0..len {
                list.push(read_payload(reader, element_type, depth + 1)?);
            }
            Tag::List(list)
        }
        TagType::Compound => {
            let mut compound = Compound::new();
            while let Some((name, tag)) = read_named_at(reader, depth + 1)? {
                compound.insert(name, tag);
            }
            Tag::Compound(compound)
        }
        TagType::IntArray => {
            let len = read_length(reader)?;
            let mut ints = Vec::with_capacity(len.min(PREALLOC_LIMIT));
            for _ in 0..len {
                ints.push(reader.read_i32::<BigEndian>()?);
            }
            Tag::IntArray(ints)
        }
        TagType::LongArray => {
            let len = read_length(reader)?;
            let mut longs = Vec::with_capacity(len.min(PREALLOC_LIMIT));
            for _ in 0..len {
                longs.push(reader.read_i64::<BigEndian>()?);
            }
            Tag::LongArray(longs)
        }
    })
}

fn read_length<R: Read>(reader: &mut R) -> Result<usize, NbtError> {
    let len = reader.read_i32::<BigEndian>()?;
    usize::try_from(len).map_err(|_| NbtError::format(format!("negative length: {len}")))
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, NbtError> {
    let len = reader.read_u16::<BigEndian>()?;
    let mut bytes = vec![0u8; usize::from(len)];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| NbtError::format(format!("invalid UTF-8 string: {e}")))
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<(), NbtError> {
    let len = u16::try_from(value.len())
        .map_err(|_| NbtError::format(format!("string of {} bytes is too long", value.len())))?;
    writer.write_u16::<BigEndian>(len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn write_length<W: Write>(writer: &mut W, len: usize) -> Result<(), NbtError> {
    let len = i32::try_from(len)
        .map_err(|_| NbtError::format(format!("array of {len} elements is too long")))?;
    writer.write_i32::<BigEndian>(len)?;
    Ok(())
}

fn write_compound<W: Write>(writer: &mut W, compound: &Compound) -> Result<(), NbtError> {
    for (name, tag) in compound {
        write_named(writer, name, tag)?;
    }
    writer.write_u8(TagType::End.id())?;
    Ok(())
}

fn write_payload<W: Write>(writer: &mut W, tag: &Tag) -> Result<(), NbtError> {
    match tag {
        Tag::Byte(v) => writer.write_i8(*v)?,
        Tag::Short(v) => writer.write_i16::<BigEndian>(*v)?,
        Tag::Int(v) => writer.write_i32::<BigEndian>(*v)?,
        Tag::Long(v) => writer.write_i64::<BigEndian>(*v)?,
        Tag::Float(v) => writer.write_f32::<BigEndian>(*v)?,
        Tag::Double(v) => writer.write_f64::<BigEndian>(*v)?,
        Tag::ByteArray(v) => {
            write_length(writer, v.len())?;
            for &b in v {
                writer.write_i8(b)?;
            }
        }
        Tag::String(v) => write_string(writer, v)?,
        Tag::List(v) => {
            let element_type = v.first().map_or(TagType::End, Tag::tag_type);
            if let Some(bad) = v.iter().find(|t| t.tag_type() != element_type) {
                return Err(NbtError::HeterogeneousList {
                    expected: element_type,
                    found: bad.tag_type(),
                });
            }
            writer.write_u8(element_type.id())?;
            write_length(writer, v.len())?;
            for tag in v {
                write_payload(writer, tag)?;
            }
        }
        Tag::Compound(v) => write_compound(writer, v)?,
        Tag::IntArray(v) => {
            write_length(writer, v.len())?;
            for &i in v {
                writer.write_i32::<BigEndian>(i)?;
            }
        }
        Tag::LongArray(v) => {
            write_length(writer, v.len())?;
            for &l in v {
                writer.write_i64::<BigEndian>(l)?;
            }
        }
    }
    Ok(())
}
