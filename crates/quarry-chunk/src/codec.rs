//! Chunk record ⇄ tag tree.
//!
//! The root compound of a chunk:
//!
//! ```text
//! DataVersion, x, z, yPos, lastUpdate, inhabitedTime, status, isLightOn,
//! sections: [...], heightmaps: {...}, structures: {starts, references},
//! block_ticks: [...], fluid_ticks: [...], block_entities: [...],
//! PostProcessing: [[short...]...],
//! entities: [...], CarvingMasks: {AIR, LIQUID}          (proto chunks only)
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use quarry_config::{Config, PaletteConfig};
use quarry_nbt::compression::{self, Compression};
use quarry_nbt::{Compound, Tag};
use quarry_registry::RegistryLookup;

use crate::ChunkError;
use crate::carving::{CarvingMask, CarvingStep};
use crate::heightmap::Heightmap;
use crate::ids::{RegistryId, StructureId};
use crate::issues::{DecodeIssue, DecodeReport};
use crate::pos::{BlockPos, ChunkPos};
use crate::record::{ChunkRecord, ChunkShape, WorldLayout};
use crate::section::{Section, SectionCodec};
use crate::status::ChunkStatus;
use crate::ticks::{read_ticks, write_ticks};

/// Result of reading a chunk: the record plus everything that had to be
/// repaired to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub record: ChunkRecord,
    /// Version stamped in the data, if any.
    pub data_version: Option<i32>,
    pub issues: Vec<DecodeIssue>,
}

impl DecodedChunk {
    /// `true` if nothing had to be repaired.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Encodes and decodes chunk records against one world's registries and
/// layout.
///
/// Cheap to clone and safe to share: the registry set is behind an `Arc`
/// and never mutated.
#[derive(Clone)]
pub struct ChunkCodec {
    registries: Arc<dyn RegistryLookup>,
    layout: WorldLayout,
    data_version: i32,
    palettes: PaletteConfig,
}

static_assertions::assert_impl_all!(ChunkCodec: Clone, Send, Sync);

impl std::fmt::Debug for ChunkCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkCodec")
            .field("layout", &self.layout)
            .field("data_version", &self.data_version)
            .field("palettes", &self.palettes)
            .finish_non_exhaustive()
    }
}

impl ChunkCodec {
    pub fn new(registries: Arc<dyn RegistryLookup>, config: &Config) -> Self {
        Self {
            registries,
            layout: WorldLayout::from_config(&config.world),
            data_version: config.world.data_version,
            palettes: config.palette.clone(),
        }
    }

    pub fn layout(&self) -> WorldLayout {
        self.layout
    }

    /// Version written to `DataVersion`.
    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    pub fn registries(&self) -> &dyn RegistryLookup {
        &*self.registries
    }

    /// An empty record sized for this codec's layout.
    pub fn new_record(&self, pos: ChunkPos, status: ChunkStatus) -> ChunkRecord {
        ChunkRecord::new(pos, self.layout, status)
    }

    fn sections(&self) -> SectionCodec<'_> {
        SectionCodec::new(&*self.registries, &self.palettes)
    }

    pub fn encode_section(&self, section: &Section) -> Compound {
        self.sections().encode(section)
    }

    /// Decodes one section compound. The section is `None` only when it has
    /// no `Y`.
    pub fn decode_section(&self, pos: ChunkPos, tag: &Compound) -> (Option<Section>, Vec<DecodeIssue>) {
        let mut report = DecodeReport::new(pos);
        let section = self.sections().decode(tag, &mut report);
        (section, report.into_issues())
    }

    /// Encodes `record`. Infallible: values the registries cannot name are
    /// written as defaults or dropped, with a warning.
    pub fn write(&self, record: &ChunkRecord) -> Compound {
        let mut root = Compound::new();
        root.insert("DataVersion", self.data_version);
        root.insert("x", record.pos.x);
        root.insert("z", record.pos.z);
        root.insert("yPos", record.min_section_y);
        root.insert("lastUpdate", record.last_update);
        root.insert("inhabitedTime", record.inhabited_time);
        root.insert("status", record.status.name());
        root.insert("isLightOn", record.is_light_on);

        let codec = self.sections();
        let sections: Vec<Tag> = record
            .sections
            .iter()
            .flatten()
            .map(|section| Tag::Compound(codec.encode(section)))
            .collect();
        root.insert("sections", sections);

        let mut heightmaps = Compound::new();
        for &kind in record.status.required_heightmaps() {
            if let Some(map) = record.heightmaps.get(kind) {
                heightmaps.insert(kind.name(), map.to_longs());
            }
        }
        root.insert("heightmaps", heightmaps);

        root.insert("structures", self.write_structures(record));
        root.insert("block_ticks", write_ticks(&record.block_ticks, self.registries()));
        root.insert("fluid_ticks", write_ticks(&record.fluid_ticks, self.registries()));

        let block_entities: Vec<Tag> = record
            .block_entities
            .iter()
            .map(|(pos, data)| {
                let mut tag = data.clone();
                tag.insert("x", pos.x);
                tag.insert("y", pos.y);
                tag.insert("z", pos.z);
                Tag::Compound(tag)
            })
            .collect();
        root.insert("block_entities", block_entities);

        if record.post_processing.iter().any(|p| !p.is_empty()) {
            let lists: Vec<Tag> = record
                .post_processing
                .iter()
                .map(|shorts| Tag::List(shorts.iter().map(|&s| Tag::Short(s)).collect()))
                .collect();
            root.insert("PostProcessing", lists);
        }

        match (&record.shape, record.status.is_full()) {
            (ChunkShape::Proto(proto), false) => {
                root.insert(
                    "entities",
                    proto.entities.iter().cloned().map(Tag::Compound).collect::<Vec<_>>(),
                );
                let masks: Compound = proto
                    .carving_masks
                    .iter()
                    .map(|(step, mask)| (step.name(), mask.as_longs().to_vec()))
                    .collect();
                root.insert("CarvingMasks", masks);
            }
            (ChunkShape::Level, true) => {}
            (_, full) => tracing::warn!(
                chunk_x = record.pos.x,
                chunk_z = record.pos.z,
                full,
                "chunk shape disagrees with status; writing by status"
            ),
        }

        tracing::debug!(
            chunk_x = record.pos.x,
            chunk_z = record.pos.z,
            status = %record.status,
            sections = record.sections.iter().flatten().count(),
            "chunk encoded"
        );
        root
    }

    fn write_structures(&self, record: &ChunkRecord) -> Compound {
        let mut starts = Compound::new();
        for (&id, data) in &record.structures.starts {
            if let Some(key) = self.structure_key(id) {
                starts.insert(key, data.clone());
            }
        }
        let mut references = Compound::new();
        for (&id, chunks) in &record.structures.references {
            if let Some(key) = self.structure_key(id) {
                references.insert(key, chunks.iter().copied().collect::<Vec<i64>>());
            }
        }
        let mut structures = Compound::new();
        structures.insert("starts", starts);
        structures.insert("references", references);
        structures
    }

    fn structure_key(&self, id: StructureId) -> Option<&str> {
        match self.registries.lookup(StructureId::REGISTRY, id.raw()) {
            Ok(key) => Some(key),
            Err(err) => {
                tracing::warn!(%err, "dropping structure entry with unknown id");
                None
            }
        }
    }

    /// Decodes the chunk stored for `requested`.
    ///
    /// Never fails: every problem is repaired and reported in
    /// [`DecodedChunk::issues`].
    #[tracing::instrument(skip_all, fields(x = requested.x, z = requested.z))]
    pub fn read(&self, requested: ChunkPos, root: &Compound) -> DecodedChunk {
        let mut report = DecodeReport::new(requested);

        match (root.get_int("x"), root.get_int("z")) {
            (Some(x), Some(z)) if ChunkPos::new(x, z) != requested => {
                report.push(DecodeIssue::CoordinateMismatch {
                    stored: ChunkPos::new(x, z),
                    requested,
                });
            }
            (Some(_), Some(_)) => {}
            _ => report.malformed("x/z", "stored position missing"),
        }

        let data_version = root.get_int("DataVersion");
        match data_version {
            Some(found) if found > self.data_version => {
                report.push(DecodeIssue::NewerDataVersion {
                    found,
                    supported: self.data_version,
                });
            }
            Some(_) => {}
            None => tracing::debug!(assumed = self.data_version, "no DataVersion"),
        }

        if let Some(y_pos) = root.get_int("yPos")
            && y_pos != self.layout.min_section_y
        {
            report.malformed(
                "yPos",
                format!("{y_pos} differs from configured {}", self.layout.min_section_y),
            );
        }

        let status = match root.get_str("status") {
            Some(name) => ChunkStatus::from_name(name).unwrap_or_else(|| {
                report.malformed("status", format!("unknown status {name:?}"));
                ChunkStatus::Empty
            }),
            None => {
                report.malformed("status", "missing");
                ChunkStatus::Empty
            }
        };

        let mut record = self.new_record(requested, status);
        record.last_update = root.get_long("lastUpdate").unwrap_or(0);
        record.inhabited_time = root.get_long("inhabitedTime").unwrap_or(0);
        record.is_light_on = root.get_bool("isLightOn").unwrap_or(false);

        self.read_sections(root, &mut record, &mut report);
        self.read_heightmaps(root, &mut record, &mut report);
        self.read_structures(root, &mut record, &mut report);

        if let Some(list) = list_field(root, "block_ticks", &mut report) {
            record.block_ticks = read_ticks(list, "block_ticks", self.registries(), &mut report);
        }
        if let Some(list) = list_field(root, "fluid_ticks", &mut report) {
            record.fluid_ticks = read_ticks(list, "fluid_ticks", self.registries(), &mut report);
        }

        read_block_entities(root, &mut record, &mut report);
        read_post_processing(root, &mut record, &mut report);
        read_proto(root, &mut record, &mut report);

        let issues = report.into_issues();
        tracing::debug!(status = %record.status, issues = issues.len(), "chunk decoded");
        DecodedChunk {
            record,
            data_version,
            issues,
        }
    }

    fn read_sections(&self, root: &Compound, record: &mut ChunkRecord, report: &mut DecodeReport) {
        let Some(list) = list_field(root, "sections", report) else {
            if record.status.is_full() {
                report.malformed("sections", "missing from a full chunk");
            }
            return;
        };
        let codec = self.sections();
        for entry in list {
            let Some(tag) = entry.as_compound() else {
                report.malformed("sections", format!("entry is a {:?}", entry.tag_type()));
                continue;
            };
            let Some(section) = codec.decode(tag, report) else {
                continue;
            };
            let Some(slot) = self.layout.slot(section.y) else {
                report.push(DecodeIssue::SectionShapeMismatch {
                    section_y: section.y,
                    detail: "outside the world height".to_string(),
                });
                continue;
            };
            if record.sections[slot].is_some() {
                report.push(DecodeIssue::SectionShapeMismatch {
                    section_y: section.y,
                    detail: "duplicate section, keeping the last".to_string(),
                });
            }
            record.sections[slot] = Some(section);
        }
    }

    /// Only the heightmaps the status requires are kept. Absent or
    /// unreadable ones are marked missing.
    fn read_heightmaps(&self, root: &Compound, record: &mut ChunkRecord, report: &mut DecodeReport) {
        let maps = compound_field(root, "heightmaps", report);
        for &kind in record.status.required_heightmaps() {
            let longs = maps.and_then(|m| m.get_long_array(kind.name()));
            match longs.and_then(|l| Heightmap::from_longs(self.layout.height(), l)) {
                Some(map) => record.heightmaps.insert(kind, map),
                None => {
                    if let Some(longs) = longs {
                        report.malformed("heightmaps", format!("{kind} has {} words", longs.len()));
                    }
                    record.heightmaps.mark_missing(kind);
                    report.push(DecodeIssue::HeightmapMissing(kind));
                }
            }
        }
    }

    fn read_structures(&self, root: &Compound, record: &mut ChunkRecord, report: &mut DecodeReport) {
        let Some(structures) = compound_field(root, "structures", report) else {
            return;
        };
        if let Some(starts) = compound_field(structures, "starts", report) {
            for (key, value) in starts.iter() {
                let Some(id) = self.resolve_structure(key, "structures.starts", report) else {
                    continue;
                };
                match value.as_compound() {
                    Some(data) => {
                        record.structures.starts.insert(id, data.clone());
                    }
                    None => report.malformed("structures.starts", format!("{key} is not a compound")),
                }
            }
        }
        if let Some(references) = compound_field(structures, "references", report) {
            for (key, value) in references.iter() {
                let Some(id) = self.resolve_structure(key, "structures.references", report) else {
                    continue;
                };
                match value.as_long_array() {
                    Some(chunks) => {
                        let set: BTreeSet<i64> = chunks.iter().copied().collect();
                        record.structures.references.insert(id, set);
                    }
                    None => report.malformed(
                        "structures.references",
                        format!("{key} is not a long array"),
                    ),
                }
            }
        }
    }

    fn resolve_structure(
        &self,
        key: &str,
        field: &'static str,
        report: &mut DecodeReport,
    ) -> Option<StructureId> {
        match self.registries.resolve(StructureId::REGISTRY, key) {
            Ok(id) => Some(StructureId(id)),
            Err(_) => {
                report.push(DecodeIssue::UnknownSymbolicId {
                    registry: StructureId::REGISTRY,
                    field,
                    key: key.to_string(),
                });
                None
            }
        }
    }

    /// Encodes and compresses `record`.
    pub fn write_bytes(&self, record: &ChunkRecord, compression: Compression) -> Result<Vec<u8>, ChunkError> {
        let raw = quarry_nbt::to_bytes(&self.write(record)).map_err(ChunkError::Encode)?;
        compression::compress(&raw, compression).map_err(ChunkError::Encode)
    }

    /// Decompresses and decodes a chunk. Fails only when the bytes are not a
    /// readable tag tree.
    pub fn read_bytes(
        &self,
        requested: ChunkPos,
        bytes: &[u8],
        compression: Compression,
    ) -> Result<DecodedChunk, ChunkError> {
        let raw = compression::decompress(bytes, compression).map_err(ChunkError::Decode)?;
        let root = quarry_nbt::from_bytes(&raw).map_err(ChunkError::Decode)?;
        Ok(self.read(requested, &root))
    }
}

/// The list under `key`. A value of another type is reported and treated
/// as absent.
fn list_field<'t>(root: &'t Compound, key: &'static str, report: &mut DecodeReport) -> Option<&'t [Tag]> {
    let value = root.get(key)?;
    let list = value.as_list();
    if list.is_none() {
        report.malformed(key, format!("expected a list, found {:?}", value.tag_type()));
    }
    list
}

/// The compound under `key`. A value of another type is reported and
/// treated as absent.
fn compound_field<'t>(
    root: &'t Compound,
    key: &'static str,
    report: &mut DecodeReport,
) -> Option<&'t Compound> {
    let value = root.get(key)?;
    let compound = value.as_compound();
    if compound.is_none() {
        report.malformed(key, format!("expected a compound, found {:?}", value.tag_type()));
    }
    compound
}

/// Block entities are keyed by position; the `x`/`y`/`z` fields are moved
/// into the key. Later duplicates replace earlier ones.
fn read_block_entities(root: &Compound, record: &mut ChunkRecord, report: &mut DecodeReport) {
    let Some(list) = list_field(root, "block_entities", report) else {
        return;
    };
    for entry in list {
        let Some(tag) = entry.as_compound() else {
            report.malformed("block_entities", format!("entry is a {:?}", entry.tag_type()));
            continue;
        };
        let (Some(x), Some(y), Some(z)) = (tag.get_int("x"), tag.get_int("y"), tag.get_int("z")) else {
            report.malformed("block_entities", "entry without position");
            continue;
        };
        let mut data = tag.clone();
        for key in ["x", "y", "z"] {
            data.remove(key);
        }
        record.block_entities.insert(BlockPos::new(x, y, z), data);
    }
}

fn read_post_processing(root: &Compound, record: &mut ChunkRecord, report: &mut DecodeReport) {
    let Some(lists) = list_field(root, "PostProcessing", report) else {
        return;
    };
    let slots = record.post_processing.len();
    if lists.len() > slots {
        report.malformed(
            "PostProcessing",
            format!("{} lists for {slots} sections", lists.len()),
        );
    }
    for (slot, entry) in lists.iter().take(slots).enumerate() {
        match entry.as_list() {
            Some(shorts) => {
                record.post_processing[slot] = shorts
                    .iter()
                    .filter_map(Tag::as_integer)
                    .map(|n| n as i16)
                    .collect();
            }
            None => report.malformed("PostProcessing", format!("slot {slot} is not a list")),
        }
    }
}

fn read_proto(root: &Compound, record: &mut ChunkRecord, report: &mut DecodeReport) {
    let ChunkShape::Proto(proto) = &mut record.shape else {
        if root.contains_key("CarvingMasks") {
            tracing::debug!("ignoring carving masks of a full chunk");
        }
        return;
    };
    if let Some(list) = list_field(root, "entities", report) {
        for entry in list {
            match entry.as_compound() {
                Some(entity) => proto.entities.push(entity.clone()),
                None => report.malformed("entities", format!("entry is a {:?}", entry.tag_type())),
            }
        }
    }
    if let Some(masks) = compound_field(root, "CarvingMasks", report) {
        for (name, value) in masks.iter() {
            let Some(step) = CarvingStep::from_name(name) else {
                report.malformed("CarvingMasks", format!("unknown carving step {name:?}"));
                continue;
            };
            match value.as_long_array() {
                Some(words) => {
                    proto.carving_masks.insert(step, CarvingMask::from_longs(words.to_vec()));
                }
                None => report.malformed("CarvingMasks", format!("{name} is not a long array")),
            }
        }
    }
}
