//! Compression wrappers for encoded tag data.
//!
//! The one-byte ids match the compression field of region-file chunk
//! headers, so a blob can be tagged with its scheme and decoded later.

use std::io::{Read, Write};

use flate2::Compression as Level;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::NbtError;

/// Compression scheme applied to an encoded root compound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Compression {
    Gzip = 1,
    Zlib = 2,
    None = 3,
}

impl Compression {
    /// Maps a header byte to its scheme.
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Compression::Gzip),
            2 => Some(Compression::Zlib),
            3 => Some(Compression::None),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Compresses `data` with the given scheme.
pub fn compress(data: &[u8], compression: Compression) -> Result<Vec<u8>, NbtError> {
    match compression {
        Compression::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Level::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Level::default());
            encoder.write_all(data)?;
            Ok(encoder.finish()?)
        }
        Compression::None => Ok(data.to_vec()),
    }
}

/// Decompresses `data`. A stream that ends early is reported as
/// [`NbtError::Truncated`].
pub fn decompress(data: &[u8], compression: Compression) -> Result<Vec<u8>, NbtError> {
    let mut out = Vec::new();
    match compression {
        Compression::Gzip => {
            GzDecoder::new(data).read_to_end(&mut out)?;
        }
        Compression::Zlib => {
            ZlibDecoder::new(data).read_to_end(&mut out)?;
        }
        Compression::None => out.extend_from_slice(data),
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        for c in [Compression::Gzip, Compression::Zlib, Compression::None] {
            assert_eq!(Compression::from_id(c.id()), Some(c));
        }
        assert_eq!(Compression::from_id(4), None);
    }

    #[test]
    fn test_zlib_and_gzip_round_trip() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        for c in [Compression::Gzip, Compression::Zlib, Compression::None] {
            let packed = compress(&data, c).unwrap();
            assert_eq!(decompress(&packed, c).unwrap(), data, "{c:?}");
        }
    }

    #[test]
    fn test_garbage_zlib_stream_is_error() {
        let result = decompress(b"not a zlib stream", Compression::Zlib);
        assert!(result.is_err());
    }
}
