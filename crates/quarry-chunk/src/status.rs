//! Generation status of a chunk.

use std::fmt;
use std::str::FromStr;

use crate::heightmap::HeightmapKind;

/// How far generation has progressed, in pipeline order.
///
/// Every status before [`ChunkStatus::Full`] is a proto chunk; `Full` is a
/// level chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChunkStatus {
    #[default]
    Empty,
    StructureStarts,
    StructureReferences,
    Biomes,
    Noise,
    Surface,
    Carvers,
    Features,
    InitializeLight,
    Light,
    Spawn,
    Full,
}

const WORLDGEN_HEIGHTMAPS: &[HeightmapKind] =
    &[HeightmapKind::WorldSurfaceWg, HeightmapKind::OceanFloorWg];

const FINAL_HEIGHTMAPS: &[HeightmapKind] = &[
    HeightmapKind::WorldSurface,
    HeightmapKind::OceanFloor,
    HeightmapKind::MotionBlocking,
    HeightmapKind::MotionBlockingNoLeaves,
];

impl ChunkStatus {
    pub const ALL: [ChunkStatus; 12] = [
        ChunkStatus::Empty,
        ChunkStatus::StructureStarts,
        ChunkStatus::StructureReferences,
        ChunkStatus::Biomes,
        ChunkStatus::Noise,
        ChunkStatus::Surface,
        ChunkStatus::Carvers,
        ChunkStatus::Features,
        ChunkStatus::InitializeLight,
        ChunkStatus::Light,
        ChunkStatus::Spawn,
        ChunkStatus::Full,
    ];

    /// Name written to the `status` field.
    pub fn name(self) -> &'static str {
        match self {
            ChunkStatus::Empty => "minecraft:empty",
            ChunkStatus::StructureStarts => "minecraft:structure_starts",
            ChunkStatus::StructureReferences => "minecraft:structure_references",
            ChunkStatus::Biomes => "minecraft:biomes",
            ChunkStatus::Noise => "minecraft:noise",
            ChunkStatus::Surface => "minecraft:surface",
            ChunkStatus::Carvers => "minecraft:carvers",
            ChunkStatus::Features => "minecraft:features",
            ChunkStatus::InitializeLight => "minecraft:initialize_light",
            ChunkStatus::Light => "minecraft:light",
            ChunkStatus::Spawn => "minecraft:spawn",
            ChunkStatus::Full => "minecraft:full",
        }
    }

    /// Parses a status name; the `minecraft:` prefix is optional.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("minecraft:").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|s| s.name().strip_prefix("minecraft:") == Some(bare))
    }

    /// `true` for a level chunk.
    pub fn is_full(self) -> bool {
        self == ChunkStatus::Full
    }

    pub fn is_or_after(self, other: ChunkStatus) -> bool {
        self >= other
    }

    /// Heightmaps a chunk at this status persists.
    pub fn required_heightmaps(self) -> &'static [HeightmapKind] {
        match self {
            ChunkStatus::Empty => &[],
            s if s < ChunkStatus::Features => WORLDGEN_HEIGHTMAPS,
            _ => FINAL_HEIGHTMAPS,
        }
    }
}

impl fmt::Display for ChunkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChunkStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown chunk status: {s}"))
    }
}
