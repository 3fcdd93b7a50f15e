//! Chunk and block coordinates.

use std::fmt;

/// Horizontal position of a chunk column, in chunk units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Packs the position into one long: `x` in the low 32 bits, `z` in the
    /// high 32 bits.
    pub fn to_long(self) -> i64 {
        (i64::from(self.x) & 0xFFFF_FFFF) | (i64::from(self.z) << 32)
    }

    pub fn from_long(packed: i64) -> Self {
        Self {
            x: packed as i32,
            z: (packed >> 32) as i32,
        }
    }

    /// The chunk containing block column `(block_x, block_z)`.
    pub fn containing(block_x: i32, block_z: i32) -> Self {
        Self::new(block_x >> 4, block_z >> 4)
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Absolute block position.
///
/// Ordered by `(x, y, z)`, which fixes the order block entities are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn chunk(self) -> ChunkPos {
        ChunkPos::containing(self.x, self.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Packs a section-local position into a short: `x | y << 4 | z << 8`.
pub fn pack_local(x: u8, y: u8, z: u8) -> i16 {
    (i16::from(x & 15)) | (i16::from(y & 15) << 4) | (i16::from(z & 15) << 8)
}

/// Inverse of [`pack_local`], returning `(x, y, z)`.
pub fn unpack_local(packed: i16) -> (u8, u8, u8) {
    (
        (packed & 15) as u8,
        ((packed >> 4) & 15) as u8,
        ((packed >> 8) & 15) as u8,
    )
}
