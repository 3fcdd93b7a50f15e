//! 16×16×16 sections and their tag encoding.
//!
//! A section holds 4096 block states (index `y << 8 | z << 4 | x`), 64 biomes
//! on a 4×4×4 grid (index `y << 4 | z << 2 | x`), and two optional light
//! layers. On disk:
//!
//! ```text
//! { Y: byte,
//!   block_states: { palette: [{Name, Properties}...], data: long[] },
//!   biomes:       { palette: ["minecraft:plains"...],  data: long[] },
//!   BlockLight: byte[2048], SkyLight: byte[2048] }
//! ```

use quarry_config::PaletteConfig;
use quarry_nbt::{Compound, Tag};
use quarry_registry::RegistryLookup;

use crate::block_state::BlockState;
use crate::ids::{BiomeId, BlockStateId, RegistryId};
use crate::issues::{DecodeIssue, DecodeReport, VolumeKind};
use crate::nibble::NibbleArray;
use crate::palette::{PaletteCodec, PaletteSettings};

/// Side length of a section in cells.
pub const SECTION_SIZE: usize = 16;

/// Cells per section (16³).
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;

/// Side length of the biome grid.
pub const BIOME_SIZE: usize = 4;

/// Biome cells per section (4³).
pub const BIOME_VOLUME: usize = BIOME_SIZE * BIOME_SIZE * BIOME_SIZE;

/// Written when a block-state id has no key in the registry.
const FALLBACK_BLOCK: &str = "minecraft:air";

/// Written when a biome id has no key in the registry.
const FALLBACK_BIOME: &str = "minecraft:plains";

/// Dense, live section data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Vertical index of this section.
    pub y: i32,
    blocks: Vec<BlockStateId>,
    biomes: Vec<BiomeId>,
    pub block_light: Option<NibbleArray>,
    pub sky_light: Option<NibbleArray>,
}

impl Section {
    /// An all-default section (air, default biome) without light layers.
    pub fn new(y: i32) -> Self {
        Self {
            y,
            blocks: vec![BlockStateId::default(); SECTION_VOLUME],
            biomes: vec![BiomeId::default(); BIOME_VOLUME],
            block_light: None,
            sky_light: None,
        }
    }

    /// Builds a section from dense arrays. Returns `None` if either array has
    /// the wrong length.
    pub fn from_parts(y: i32, blocks: Vec<BlockStateId>, biomes: Vec<BiomeId>) -> Option<Self> {
        if blocks.len() != SECTION_VOLUME || biomes.len() != BIOME_VOLUME {
            return None;
        }
        Some(Self {
            y,
            blocks,
            biomes,
            block_light: None,
            sky_light: None,
        })
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockStateId {
        self.blocks[block_index(x, y, z)]
    }

    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockStateId) {
        self.blocks[block_index(x, y, z)] = block;
    }

    /// Biome at biome-grid coordinates (each in `0..4`).
    pub fn biome(&self, x: usize, y: usize, z: usize) -> BiomeId {
        self.biomes[biome_index(x, y, z)]
    }

    pub fn set_biome(&mut self, x: usize, y: usize, z: usize, biome: BiomeId) {
        self.biomes[biome_index(x, y, z)] = biome;
    }

    pub fn fill_blocks(&mut self, block: BlockStateId) {
        self.blocks.fill(block);
    }

    pub fn fill_biomes(&mut self, biome: BiomeId) {
        self.biomes.fill(biome);
    }

    pub fn blocks(&self) -> &[BlockStateId] {
        &self.blocks
    }

    pub fn biomes(&self) -> &[BiomeId] {
        &self.biomes
    }

    /// `true` if every block is the default (air).
    pub fn is_air(&self) -> bool {
        self.blocks.iter().all(|&b| b == BlockStateId::default())
    }
}

fn block_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < SECTION_SIZE && y < SECTION_SIZE && z < SECTION_SIZE);
    (y << 8) | (z << 4) | x
}

fn biome_index(x: usize, y: usize, z: usize) -> usize {
    debug_assert!(x < BIOME_SIZE && y < BIOME_SIZE && z < BIOME_SIZE);
    (y << 4) | (z << 2) | x
}

/// Converts sections to and from their tag form against one registry set.
pub(crate) struct SectionCodec<'a> {
    registries: &'a dyn RegistryLookup,
    blocks: PaletteCodec,
    biomes: PaletteCodec,
}

impl<'a> SectionCodec<'a> {
    pub(crate) fn new(registries: &'a dyn RegistryLookup, palettes: &PaletteConfig) -> Self {
        Self {
            registries,
            blocks: PaletteCodec::new(SECTION_VOLUME, PaletteSettings::blocks(palettes)),
            biomes: PaletteCodec::new(BIOME_VOLUME, PaletteSettings::biomes(palettes)),
        }
    }

    pub(crate) fn encode(&self, section: &Section) -> Compound {
        let mut tag = Compound::new();
        match i8::try_from(section.y) {
            Ok(y) => tag.insert("Y", y),
            Err(_) => tag.insert("Y", section.y),
        };

        let blocks = self.blocks.encode(
            section.blocks(),
            self.registries.entry_count(BlockStateId::REGISTRY),
        );
        tag.insert(
            "block_states",
            self.blocks.write_tag(&blocks, |id| self.block_entry(id)),
        );

        let biomes = self.biomes.encode(
            section.biomes(),
            self.registries.entry_count(BiomeId::REGISTRY),
        );
        tag.insert(
            "biomes",
            self.biomes.write_tag(&biomes, |id| self.biome_entry(id)),
        );

        if let Some(light) = &section.block_light {
            tag.insert("BlockLight", light.to_bytes());
        }
        if let Some(light) = &section.sky_light {
            tag.insert("SkyLight", light.to_bytes());
        }
        tag
    }

    /// Decodes one section. Returns `None` only when the section has no `Y`
    /// and so cannot be placed.
    pub(crate) fn decode(&self, tag: &Compound, report: &mut DecodeReport) -> Option<Section> {
        let Some(y) = tag.get_int("Y") else {
            report.malformed("sections", "section without Y");
            return None;
        };

        let blocks = self.read_volume(&self.blocks, y, VolumeKind::Blocks, tag, report, |entry| {
            let state = entry
                .as_compound()
                .and_then(BlockState::from_compound)
                .ok_or_else(|| format!("{entry:?}"))?;
            let key = state.to_string();
            self.registries
                .resolve(BlockStateId::REGISTRY, &key)
                .map(BlockStateId)
                .map_err(|_| key)
        });

        let biomes = self.read_volume(&self.biomes, y, VolumeKind::Biomes, tag, report, |entry| {
            let key = entry.as_str().ok_or_else(|| format!("{entry:?}"))?;
            self.registries
                .resolve(BiomeId::REGISTRY, key)
                .map(BiomeId)
                .map_err(|_| key.to_string())
        });

        Some(Section {
            y,
            blocks,
            biomes,
            block_light: read_light(tag, "BlockLight", y, report),
            sky_light: read_light(tag, "SkyLight", y, report),
        })
    }

    fn read_volume<T: RegistryId>(
        &self,
        codec: &PaletteCodec,
        section_y: i32,
        volume: VolumeKind,
        section: &Compound,
        report: &mut DecodeReport,
        entry: impl FnMut(&Tag) -> Result<T, String>,
    ) -> Vec<T> {
        let Some(tag) = section.get_compound(volume.field()) else {
            report.push(DecodeIssue::SectionShapeMismatch {
                section_y,
                detail: format!("{volume} missing"),
            });
            return vec![T::default(); codec.volume()];
        };

        let registry_len = self.registries.entry_count(T::REGISTRY);
        let read = codec.read_tag(tag, registry_len, entry);
        for key in read.unresolved {
            report.push(DecodeIssue::UnknownSymbolicId {
                registry: T::REGISTRY,
                field: volume.field(),
                key,
            });
        }
        if let Some(detail) = read.problem {
            report.push(DecodeIssue::SectionShapeMismatch {
                section_y,
                detail: format!("{volume}: {detail}"),
            });
        }

        let decoded = codec.decode(&read.volume, registry_len);
        if decoded.out_of_range > 0 {
            report.push(DecodeIssue::PaletteIndexOutOfRange {
                section_y,
                volume,
                count: decoded.out_of_range,
            });
        }
        if decoded.unknown_ids > 0 {
            report.push(DecodeIssue::UnknownRegistryId {
                section_y,
                volume,
                count: decoded.unknown_ids,
            });
        }
        decoded.cells
    }

    fn block_entry(&self, id: BlockStateId) -> Tag {
        let key = self.key_or_default(BlockStateId::REGISTRY, id.0, FALLBACK_BLOCK);
        let state = BlockState::from_key(key).unwrap_or_else(|| BlockState::new(FALLBACK_BLOCK));
        Tag::Compound(state.to_compound())
    }

    fn biome_entry(&self, id: BiomeId) -> Tag {
        Tag::from(self.key_or_default(BiomeId::REGISTRY, id.0, FALLBACK_BIOME))
    }

    /// Key for `id`, else the registry's default entry, else `fallback`.
    fn key_or_default(&self, registry: &str, id: u32, fallback: &'static str) -> &str {
        match self.registries.lookup(registry, id) {
            Ok(key) => key,
            Err(err) => {
                tracing::warn!(%err, "writing default entry in place of unknown id");
                self.registries.lookup(registry, 0).unwrap_or(fallback)
            }
        }
    }
}

/// Absent stays absent; a wrong length is dropped with an issue.
fn read_light(
    tag: &Compound,
    key: &'static str,
    section_y: i32,
    report: &mut DecodeReport,
) -> Option<NibbleArray> {
    let value = tag.get(key)?;
    let light = value.as_byte_array().and_then(NibbleArray::from_bytes);
    if light.is_none() {
        let detail = match value.as_byte_array() {
            Some(bytes) => format!("{key} has {} bytes", bytes.len()),
            None => format!("{key} is a {:?}", value.tag_type()),
        };
        report.push(DecodeIssue::SectionShapeMismatch { section_y, detail });
    }
    light
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::ChunkPos;
    use quarry_registry::{RegistrySet, names};

    fn registries() -> RegistrySet {
        RegistrySet::builder()
            .with_keys(
                names::BLOCK_STATE,
                ["air", "stone", "oak_log[axis=x]", "oak_log[axis=y]", "dirt"],
            )
            .unwrap()
            .with_keys(names::BIOME, ["plains", "desert", "ocean"])
            .unwrap()
            .build()
    }

    fn decode(codec: &SectionCodec<'_>, tag: &Compound) -> (Option<Section>, Vec<DecodeIssue>) {
        let mut report = DecodeReport::new(ChunkPos::new(0, 0));
        let section = codec.decode(tag, &mut report);
        (section, report.into_issues())
    }

    #[test]
    fn test_indexing() {
        let mut section = Section::new(0);
        section.set_block(1, 2, 3, BlockStateId(4));
        assert_eq!(section.blocks()[(2 << 8) | (3 << 4) | 1], BlockStateId(4));
        section.set_biome(3, 1, 2, BiomeId(2));
        assert_eq!(section.biomes()[(1 << 4) | (2 << 2) | 3], BiomeId(2));
        assert!(!section.is_air());
        assert!(Section::new(0).is_air());
    }

    #[test]
    fn test_from_parts_checks_lengths() {
        assert!(Section::from_parts(0, vec![BlockStateId(0); 10], vec![BiomeId(0); 64]).is_none());
        assert!(Section::from_parts(0, vec![BlockStateId(0); 4096], vec![BiomeId(0); 64]).is_some());
    }

    #[test]
    fn test_round_trip() {
        let set = registries();
        let codec = SectionCodec::new(&set, &PaletteConfig::default());
        let mut section = Section::new(-3);
        section.set_block(0, 0, 0, BlockStateId(3));
        section.set_block(15, 15, 15, BlockStateId(1));
        section.fill_biomes(BiomeId(1));
        section.set_biome(0, 0, 0, BiomeId(2));
        section.sky_light = Some(NibbleArray::filled(15));
        section.block_light = Some(NibbleArray::empty());

        let tag = codec.encode(&section);
        let (decoded, issues) = decode(&codec, &tag);
        assert!(issues.is_empty(), "{issues:?}");
        assert_eq!(decoded, Some(section));
    }

    #[test]
    fn test_palette_entries_on_disk() {
        let set = registries();
        let codec = SectionCodec::new(&set, &PaletteConfig::default());
        let mut section = Section::new(0);
        section.fill_blocks(BlockStateId(3));
        let tag = codec.encode(&section);

        assert_eq!(tag.get_byte("Y"), Some(0));
        let states = tag.get_compound("block_states").unwrap();
        assert!(!states.contains_key("data"));
        let entry = states.get_list("palette").unwrap()[0].as_compound().unwrap();
        assert_eq!(entry.get_str("Name"), Some("minecraft:oak_log"));
        assert_eq!(
            entry.get_compound("Properties").and_then(|p| p.get_str("axis")),
            Some("y")
        );
        let biomes = tag.get_compound("biomes").unwrap();
        assert_eq!(biomes.get_list("palette").unwrap()[0].as_str(), Some("minecraft:plains"));
        assert!(!tag.contains_key("SkyLight"));
    }

    #[test]
    fn test_missing_biomes_fall_back_to_default() {
        let set = registries();
        let codec = SectionCodec::new(&set, &PaletteConfig::default());
        let mut section = Section::new(1);
        section.fill_blocks(BlockStateId(1));
        section.fill_biomes(BiomeId(2));
        let mut tag = codec.encode(&section);
        tag.remove("biomes");

        let (decoded, issues) = decode(&codec, &tag);
        let decoded = decoded.unwrap();
        assert!(decoded.biomes().iter().all(|&b| b == BiomeId(0)));
        assert_eq!(decoded.block(5, 5, 5), BlockStateId(1));
        assert!(matches!(issues[..], [DecodeIssue::SectionShapeMismatch { section_y: 1, .. }]));
    }

    #[test]
    fn test_unknown_palette_entry_becomes_air() {
        let set = registries();
        let codec = SectionCodec::new(&set, &PaletteConfig::default());
        let mut states = Compound::new();
        states.insert(
            "palette",
            vec![
                Tag::Compound(BlockState::new("minecraft:stone").to_compound()),
                Tag::Compound(BlockState::new("quarry:unobtainium").to_compound()),
            ],
        );
        let mut indices = crate::bit_packed::BitPackedArray::new(4, SECTION_VOLUME);
        indices.set(1, 1);
        states.insert("data", indices.to_longs());
        let mut tag = Compound::new();
        tag.insert("Y", 0i8);
        tag.insert("block_states", states);

        let (decoded, issues) = decode(&codec, &tag);
        let decoded = decoded.unwrap();
        assert_eq!(decoded.blocks()[0], BlockStateId(1));
        assert_eq!(decoded.blocks()[1], BlockStateId(0));
        assert!(issues.iter().any(|i| matches!(
            i,
            DecodeIssue::UnknownSymbolicId { key, .. } if key == "quarry:unobtainium"
        )));
    }

    #[test]
    fn test_bad_light_length_dropped() {
        let set = registries();
        let codec = SectionCodec::new(&set, &PaletteConfig::default());
        let mut tag = codec.encode(&Section::new(0));
        tag.insert("SkyLight", vec![0i8; 7]);
        let (decoded, issues) = decode(&codec, &tag);
        assert_eq!(decoded.unwrap().sky_light, None);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_section_without_y_is_skipped() {
        let set = registries();
        let codec = SectionCodec::new(&set, &PaletteConfig::default());
        let mut tag = codec.encode(&Section::new(0));
        tag.remove("Y");
        let (decoded, issues) = decode(&codec, &tag);
        assert!(decoded.is_none());
        assert_eq!(issues.len(), 1);
    }
}
