//! Per-column height tables.
//!
//! A heightmap stores 256 values (one per column, index `x + z * 16`), each
//! the height above the world's lowest cell. Values are packed at
//! `ceil(log2(height + 1))` bits with the same word layout as palette data.

use std::collections::BTreeMap;
use std::fmt;

use crate::bit_packed::BitPackedArray;

/// Columns in a chunk.
pub const COLUMNS: usize = 256;

/// The named heightmaps a chunk may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeightmapKind {
    WorldSurfaceWg,
    WorldSurface,
    OceanFloorWg,
    OceanFloor,
    MotionBlocking,
    MotionBlockingNoLeaves,
}

impl HeightmapKind {
    pub const ALL: [HeightmapKind; 6] = [
        HeightmapKind::WorldSurfaceWg,
        HeightmapKind::WorldSurface,
        HeightmapKind::OceanFloorWg,
        HeightmapKind::OceanFloor,
        HeightmapKind::MotionBlocking,
        HeightmapKind::MotionBlockingNoLeaves,
    ];

    /// Key used inside the `heightmaps` compound.
    pub fn name(self) -> &'static str {
        match self {
            HeightmapKind::WorldSurfaceWg => "WORLD_SURFACE_WG",
            HeightmapKind::WorldSurface => "WORLD_SURFACE",
            HeightmapKind::OceanFloorWg => "OCEAN_FLOOR_WG",
            HeightmapKind::OceanFloor => "OCEAN_FLOOR",
            HeightmapKind::MotionBlocking => "MOTION_BLOCKING",
            HeightmapKind::MotionBlockingNoLeaves => "MOTION_BLOCKING_NO_LEAVES",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for HeightmapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bits per value for a world `height` cells tall.
pub fn bits_for_height(height: usize) -> u8 {
    (usize::BITS - height.leading_zeros()) as u8
}

/// One heightmap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heightmap {
    values: BitPackedArray,
}

impl Heightmap {
    /// All-zero heightmap for a world `height` cells tall.
    pub fn new(height: usize) -> Self {
        Self {
            values: BitPackedArray::new(bits_for_height(height), COLUMNS),
        }
    }

    /// Adopts packed longs. Fails when the word count does not match the
    /// world height.
    pub fn from_longs(height: usize, longs: &[i64]) -> Option<Self> {
        BitPackedArray::from_longs(bits_for_height(height), COLUMNS, longs)
            .ok()
            .map(|values| Self { values })
    }

    pub fn to_longs(&self) -> Vec<i64> {
        self.values.to_longs()
    }

    /// Height of column `(x, z)`, both in `0..16`.
    pub fn get(&self, x: usize, z: usize) -> u32 {
        self.values.get(Self::column(x, z))
    }

    pub fn set(&mut self, x: usize, z: usize, height: u32) {
        self.values.set(Self::column(x, z), height);
    }

    fn column(x: usize, z: usize) -> usize {
        debug_assert!(x < 16 && z < 16);
        x + z * 16
    }
}

/// A heightmap slot: either loaded data or a marker saying it must be
/// recomputed before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeightmapState {
    Present(Heightmap),
    Missing,
}

/// The heightmaps of one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Heightmaps {
    maps: BTreeMap<HeightmapKind, HeightmapState>,
}

impl Heightmaps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: HeightmapKind, map: Heightmap) {
        self.maps.insert(kind, HeightmapState::Present(map));
    }

    pub fn mark_missing(&mut self, kind: HeightmapKind) {
        self.maps.insert(kind, HeightmapState::Missing);
    }

    pub fn get(&self, kind: HeightmapKind) -> Option<&Heightmap> {
        match self.maps.get(&kind) {
            Some(HeightmapState::Present(map)) => Some(map),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, kind: HeightmapKind) -> Option<&mut Heightmap> {
        match self.maps.get_mut(&kind) {
            Some(HeightmapState::Present(map)) => Some(map),
            _ => None,
        }
    }

    pub fn state(&self, kind: HeightmapKind) -> Option<&HeightmapState> {
        self.maps.get(&kind)
    }

    pub fn is_missing(&self, kind: HeightmapKind) -> bool {
        matches!(self.maps.get(&kind), Some(HeightmapState::Missing))
    }

    /// Kinds marked for recomputation.
    pub fn missing(&self) -> impl Iterator<Item = HeightmapKind> + '_ {
        self.maps
            .iter()
            .filter(|(_, state)| matches!(state, HeightmapState::Missing))
            .map(|(&kind, _)| kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HeightmapKind, &HeightmapState)> {
        self.maps.iter().map(|(&kind, state)| (kind, state))
    }
}
