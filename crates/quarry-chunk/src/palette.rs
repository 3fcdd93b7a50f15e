//! Palette-compressed storage for fixed-size volumes of registry ids.
//!
//! A volume is stored with one of three strategies:
//!
//! - **Single**: every cell holds the same value; the palette has one entry
//!   and no index data is written.
//! - **Indexed**: a local palette (in first-seen order) plus bit-packed
//!   indices into it.
//! - **Registry**: raw registry ids, bit-packed at a width covering the
//!   whole registry. Used when the distinct-value count exceeds
//!   `2^max_bits`.
//!
//! Widths are rounded up to a power of two so that a width can always be
//! recovered from a word count.

use quarry_config::PaletteConfig;
use quarry_nbt::{Compound, Tag};
use rustc_hash::FxHashMap;

use crate::bit_packed::BitPackedArray;
use crate::ids::RegistryId;

/// Power-of-two widths, narrowest first.
const WIDTHS: [u8; 6] = [1, 2, 4, 8, 16, 32];

/// Bit-width limits for one kind of volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteSettings {
    /// Minimum bits per local palette index.
    pub min_bits: u8,
    /// Local palettes may hold at most `2^max_bits` entries.
    pub max_bits: u8,
}

impl PaletteSettings {
    /// Block-state limits from the config.
    pub fn blocks(config: &PaletteConfig) -> Self {
        Self {
            min_bits: config.block_min_bits,
            max_bits: config.block_max_bits,
        }
    }

    /// Biome limits from the config.
    pub fn biomes(config: &PaletteConfig) -> Self {
        Self {
            min_bits: config.biome_min_bits,
            max_bits: config.biome_max_bits,
        }
    }

    /// Index width for a local palette of `len` entries. A single entry
    /// needs no index data.
    pub fn palette_bits(&self, len: usize) -> u8 {
        if len <= 1 {
            return 0;
        }
        align(ceil_log2(len).max(self.min_bits))
    }

    /// Largest palette the indexed strategy accepts.
    pub fn capacity(&self) -> usize {
        1usize << self.max_bits.min(31)
    }
}

/// Width of raw ids for a registry with `entry_count` entries.
pub fn registry_bits(entry_count: usize) -> u8 {
    align(ceil_log2(entry_count).max(1))
}

fn ceil_log2(n: usize) -> u8 {
    if n <= 1 {
        0
    } else {
        (usize::BITS - (n - 1).leading_zeros()) as u8
    }
}

fn align(bits: u8) -> u8 {
    match bits {
        0 => 0,
        1 => 1,
        2 => 2,
        3..=4 => 4,
        5..=8 => 8,
        9..=16 => 16,
        _ => 32,
    }
}

/// Which storage strategy a volume uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Single,
    Indexed,
    Registry,
}

/// An encoded volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PalettedVolume<T> {
    /// Every cell holds this value.
    Single(T),
    /// Local palette plus packed indices into it.
    Indexed {
        palette: Vec<T>,
        indices: BitPackedArray,
    },
    /// Packed raw registry ids.
    Registry { ids: BitPackedArray },
}

impl<T: RegistryId> PalettedVolume<T> {
    pub fn strategy(&self) -> Strategy {
        match self {
            PalettedVolume::Single(_) => Strategy::Single,
            PalettedVolume::Indexed { .. } => Strategy::Indexed,
            PalettedVolume::Registry { .. } => Strategy::Registry,
        }
    }

    /// Bits per stored cell (0 for a single-value volume).
    pub fn bits(&self) -> u8 {
        match self {
            PalettedVolume::Single(_) => 0,
            PalettedVolume::Indexed { indices, .. } => indices.bits(),
            PalettedVolume::Registry { ids } => ids.bits(),
        }
    }

    /// The local palette; empty for the registry strategy.
    pub fn palette(&self) -> &[T] {
        match self {
            PalettedVolume::Single(value) => std::slice::from_ref(value),
            PalettedVolume::Indexed { palette, .. } => palette,
            PalettedVolume::Registry { .. } => &[],
        }
    }

    /// Packed words, as written under the `data` key.
    pub fn words(&self) -> &[u64] {
        match self {
            PalettedVolume::Single(_) => &[],
            PalettedVolume::Indexed { indices, .. } => indices.raw_data(),
            PalettedVolume::Registry { ids } => ids.raw_data(),
        }
    }
}

/// Dense cells recovered from a volume, with counts of substituted cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub cells: Vec<T>,
    /// Cells whose palette index pointed past the palette.
    pub out_of_range: usize,
    /// Cells whose raw id is not in the registry.
    pub unknown_ids: usize,
}

/// A volume parsed from its tag form, with what went wrong along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadVolume<T> {
    pub volume: PalettedVolume<T>,
    /// Palette entries that could not be resolved; each was replaced by the
    /// default id.
    pub unresolved: Vec<String>,
    /// Set when the palette or data array was unusable and the volume was
    /// reset to the default value.
    pub problem: Option<String>,
}

/// Encodes and decodes volumes of a fixed cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteCodec {
    volume: usize,
    settings: PaletteSettings,
}

impl PaletteCodec {
    pub fn new(volume: usize, settings: PaletteSettings) -> Self {
        Self { volume, settings }
    }

    /// Cells per volume.
    pub fn volume(&self) -> usize {
        self.volume
    }

    pub fn settings(&self) -> PaletteSettings {
        self.settings
    }

    /// Picks the strategy for `cells` and packs them.
    ///
    /// The palette lists values in first-seen order, so encoding the output
    /// of [`decode`](Self::decode) reproduces the same volume. Under the
    /// registry strategy, ids outside the registry are written as the
    /// default id.
    pub fn encode<T: RegistryId>(&self, cells: &[T], registry_len: usize) -> PalettedVolume<T> {
        debug_assert_eq!(cells.len(), self.volume, "cell count must match volume");

        let mut lookup: FxHashMap<T, u32> = FxHashMap::default();
        let mut palette: Vec<T> = Vec::new();
        let mut indices: Vec<u32> = Vec::with_capacity(cells.len());
        for &cell in cells {
            let next = palette.len() as u32;
            let index = *lookup.entry(cell).or_insert_with(|| {
                palette.push(cell);
                next
            });
            indices.push(index);
        }

        match palette.len() {
            0 => PalettedVolume::Single(T::default()),
            1 => PalettedVolume::Single(palette[0]),
            n if n <= self.settings.capacity() => {
                let bits = self.settings.palette_bits(n);
                PalettedVolume::Indexed {
                    palette,
                    indices: BitPackedArray::from_values(bits, &indices),
                }
            }
            _ => {
                let bits = registry_bits(registry_len);
                let mut ids = BitPackedArray::new(bits, cells.len());
                let mut replaced = 0usize;
                for (i, cell) in cells.iter().enumerate() {
                    let raw = cell.raw();
                    if (raw as usize) < registry_len {
                        ids.set(i, raw);
                    } else {
                        replaced += 1;
                    }
                }
                if replaced > 0 {
                    tracing::warn!(
                        registry = T::REGISTRY,
                        replaced,
                        "ids outside the registry written as default"
                    );
                }
                PalettedVolume::Registry { ids }
            }
        }
    }

    /// Expands a volume to dense cells. Bad indices and unknown ids become
    /// the default id and are counted.
    pub fn decode<T: RegistryId>(&self, volume: &PalettedVolume<T>, registry_len: usize) -> Decoded<T> {
        let mut decoded = Decoded {
            cells: Vec::with_capacity(self.volume),
            out_of_range: 0,
            unknown_ids: 0,
        };
        match volume {
            PalettedVolume::Single(value) => decoded.cells.resize(self.volume, *value),
            PalettedVolume::Indexed { palette, indices } => {
                for index in indices.iter() {
                    let cell = match palette.get(index as usize) {
                        Some(&value) => value,
                        None => {
                            decoded.out_of_range += 1;
                            T::default()
                        }
                    };
                    decoded.cells.push(cell);
                }
            }
            PalettedVolume::Registry { ids } => {
                for raw in ids.iter() {
                    let cell = if (raw as usize) < registry_len {
                        T::from_raw(raw)
                    } else {
                        decoded.unknown_ids += 1;
                        T::default()
                    };
                    decoded.cells.push(cell);
                }
            }
        }
        decoded.cells.resize(self.volume, T::default());
        decoded
    }

    /// Tag form: `palette` (omitted for the registry strategy) and `data`
    /// (omitted for a single value).
    pub fn write_tag<T: RegistryId>(
        &self,
        volume: &PalettedVolume<T>,
        mut entry: impl FnMut(T) -> Tag,
    ) -> Compound {
        let mut tag = Compound::new();
        if volume.strategy() != Strategy::Registry {
            let palette: Vec<Tag> = volume.palette().iter().map(|&v| entry(v)).collect();
            tag.insert("palette", palette);
        }
        if volume.strategy() != Strategy::Single {
            let data: Vec<i64> = volume.words().iter().map(|&w| w as i64).collect();
            tag.insert("data", data);
        }
        tag
    }

    /// Parses the tag form. `entry` resolves one palette entry, returning
    /// a printable form of the entry when it is unknown.
    pub fn read_tag<T: RegistryId>(
        &self,
        tag: &Compound,
        registry_len: usize,
        mut entry: impl FnMut(&Tag) -> Result<T, String>,
    ) -> ReadVolume<T> {
        let mut read = ReadVolume {
            volume: PalettedVolume::Single(T::default()),
            unresolved: Vec::new(),
            problem: None,
        };
        let data = tag.get_long_array("data");

        match tag.get_list("palette") {
            Some(entries) if !entries.is_empty() => {
                let palette: Vec<T> = entries
                    .iter()
                    .map(|e| {
                        entry(e).unwrap_or_else(|unknown| {
                            read.unresolved.push(unknown);
                            T::default()
                        })
                    })
                    .collect();
                if palette.len() == 1 {
                    read.volume = PalettedVolume::Single(palette[0]);
                    return read;
                }
                let Some(words) = data else {
                    read.problem = Some(format!("palette of {} entries has no data", palette.len()));
                    return read;
                };
                let expected = self.settings.palette_bits(palette.len());
                match self.packed(expected, words) {
                    Ok(indices) => read.volume = PalettedVolume::Indexed { palette, indices },
                    Err(problem) => read.problem = Some(problem),
                }
            }
            Some(_) => read.problem = Some("empty palette".to_string()),
            None => match data {
                Some(words) => match self.packed(registry_bits(registry_len), words) {
                    Ok(ids) => read.volume = PalettedVolume::Registry { ids },
                    Err(problem) => read.problem = Some(problem),
                },
                None => read.problem = Some("no palette or data".to_string()),
            },
        }
        read
    }

    /// Adopts `words` at the expected width, falling back to whichever
    /// power-of-two width matches the word count.
    fn packed(&self, expected: u8, words: &[i64]) -> Result<BitPackedArray, String> {
        if BitPackedArray::word_count(expected, self.volume) != words.len() {
            let fallback = WIDTHS
                .iter()
                .copied()
                .find(|&bits| BitPackedArray::word_count(bits, self.volume) == words.len());
            if let Some(bits) = fallback {
                tracing::debug!(expected, bits, "packed width differs from palette size");
                return BitPackedArray::from_longs(bits, self.volume, words).map_err(|e| e.to_string());
            }
        }
        BitPackedArray::from_longs(expected, self.volume, words).map_err(|e| e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
