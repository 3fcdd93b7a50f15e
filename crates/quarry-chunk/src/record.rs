//! The in-memory chunk record exchanged with the codec.

use std::collections::{BTreeMap, BTreeSet};

use quarry_config::WorldConfig;
use quarry_nbt::Compound;

use crate::carving::{CarvingMask, CarvingStep};
use crate::heightmap::Heightmaps;
use crate::ids::{BlockId, FluidId, StructureId};
use crate::pos::{BlockPos, ChunkPos};
use crate::section::Section;
use crate::status::ChunkStatus;
use crate::ticks::ScheduledTick;

/// Vertical extent of a chunk column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldLayout {
    /// Vertical index of the lowest section.
    pub min_section_y: i32,
    pub section_count: usize,
}

impl WorldLayout {
    pub fn from_config(world: &WorldConfig) -> Self {
        Self {
            min_section_y: world.min_section_y,
            section_count: world.section_count,
        }
    }

    /// One past the highest section index.
    pub fn max_section_y(&self) -> i32 {
        self.min_section_y + self.section_count as i32
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.section_count * 16
    }

    /// Slot holding section `y`, if inside the column.
    pub fn slot(&self, section_y: i32) -> Option<usize> {
        let offset = section_y.checked_sub(self.min_section_y)?;
        let slot = usize::try_from(offset).ok()?;
        (slot < self.section_count).then_some(slot)
    }
}

/// Data carried only by proto chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtoData {
    /// Entities spawned during generation, kept as raw compounds.
    pub entities: Vec<Compound>,
    pub carving_masks: BTreeMap<CarvingStep, CarvingMask>,
}

/// Level chunks (status full) and proto chunks share most fields; the
/// proto-only ones live here.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkShape {
    Level,
    Proto(ProtoData),
}

impl ChunkShape {
    /// The shape a chunk at `status` has.
    pub fn for_status(status: ChunkStatus) -> Self {
        if status.is_full() {
            ChunkShape::Level
        } else {
            ChunkShape::Proto(ProtoData::default())
        }
    }

    pub fn proto(&self) -> Option<&ProtoData> {
        match self {
            ChunkShape::Proto(data) => Some(data),
            ChunkShape::Level => None,
        }
    }

    pub fn proto_mut(&mut self) -> Option<&mut ProtoData> {
        match self {
            ChunkShape::Proto(data) => Some(data),
            ChunkShape::Level => None,
        }
    }
}

/// Structure bookkeeping for one chunk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureTables {
    /// Structures whose start piece is in this chunk, with their opaque
    /// start data.
    pub starts: BTreeMap<StructureId, Compound>,
    /// Chunks (as long keys) holding starts of structures that reach into
    /// this chunk.
    pub references: BTreeMap<StructureId, BTreeSet<i64>>,
}

impl StructureTables {
    pub fn add_reference(&mut self, structure: StructureId, start: ChunkPos) {
        self.references.entry(structure).or_default().insert(start.to_long());
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty() && self.references.is_empty()
    }
}

/// A whole chunk column.
///
/// `sections` and `post_processing` have one slot per section of the
/// layout, lowest first. `shape` is [`ChunkShape::Level`] exactly when
/// `status` is full.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub pos: ChunkPos,
    pub min_section_y: i32,
    pub status: ChunkStatus,
    /// Game time of the last save.
    pub last_update: i64,
    /// Cumulative ticks players have spent nearby.
    pub inhabited_time: i64,
    pub is_light_on: bool,
    pub sections: Vec<Option<Section>>,
    pub heightmaps: Heightmaps,
    pub structures: StructureTables,
    pub block_ticks: Vec<ScheduledTick<BlockId>>,
    pub fluid_ticks: Vec<ScheduledTick<FluidId>>,
    pub block_entities: BTreeMap<BlockPos, Compound>,
    /// Packed local positions (see [`pack_local`](crate::pack_local)) awaiting
    /// post-processing, per section.
    pub post_processing: Vec<Vec<i16>>,
    pub shape: ChunkShape,
}

impl ChunkRecord {
    /// An empty chunk at `status`: no sections, no heightmaps.
    pub fn new(pos: ChunkPos, layout: WorldLayout, status: ChunkStatus) -> Self {
        Self {
            pos,
            min_section_y: layout.min_section_y,
            status,
            last_update: 0,
            inhabited_time: 0,
            is_light_on: false,
            sections: vec![None; layout.section_count],
            heightmaps: Heightmaps::new(),
            structures: StructureTables::default(),
            block_ticks: Vec::new(),
            fluid_ticks: Vec::new(),
            block_entities: BTreeMap::new(),
            post_processing: vec![Vec::new(); layout.section_count],
            shape: ChunkShape::for_status(status),
        }
    }

    pub fn layout(&self) -> WorldLayout {
        WorldLayout {
            min_section_y: self.min_section_y,
            section_count: self.sections.len(),
        }
    }

    pub fn section(&self, section_y: i32) -> Option<&Section> {
        let slot = self.layout().slot(section_y)?;
        self.sections[slot].as_ref()
    }

    pub fn section_mut(&mut self, section_y: i32) -> Option<&mut Section> {
        let slot = self.layout().slot(section_y)?;
        self.sections[slot].as_mut()
    }

    /// Stores `section` in the slot for its `y`. Returns it back if `y` is
    /// outside the column.
    pub fn set_section(&mut self, section: Section) -> Result<(), Section> {
        match self.layout().slot(section.y) {
            Some(slot) => {
                self.sections[slot] = Some(section);
                Ok(())
            }
            None => Err(section),
        }
    }

    /// Sets the status, converting the shape when crossing into or out of
    /// full. Proto data is discarded on promotion.
    pub fn set_status(&mut self, status: ChunkStatus) {
        if status.is_full() != self.status.is_full() {
            self.shape = ChunkShape::for_status(status);
        }
        self.status = status;
    }

    /// Queues a section-local position for post-processing.
    pub fn mark_for_post_processing(&mut self, pos: BlockPos) {
        if let Some(slot) = self.layout().slot(pos.y >> 4) {
            let packed = crate::pos::pack_local(
                (pos.x & 15) as u8,
                (pos.y & 15) as u8,
                (pos.z & 15) as u8,
            );
            self.post_processing[slot].push(packed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> WorldLayout {
        WorldLayout::from_config(&WorldConfig::default())
    }

    #[test]
    fn test_layout_slots() {
        let layout = layout();
        assert_eq!(layout.slot(-4), Some(0));
        assert_eq!(layout.slot(19), Some(23));
        assert_eq!(layout.slot(20), None);
        assert_eq!(layout.slot(-5), None);
        assert_eq!(layout.slot(i32::MAX), None);
        assert_eq!(layout.slot(i32::MIN), None);
        assert_eq!(layout.height(), 384);
        assert_eq!(layout.max_section_y(), 20);
    }

    #[test]
    fn test_shape_follows_status() {
        let mut record = ChunkRecord::new(ChunkPos::new(0, 0), layout(), ChunkStatus::Noise);
        assert!(record.shape.proto().is_some());
        record.set_status(ChunkStatus::Full);
        assert_eq!(record.shape, ChunkShape::Level);
        record.set_status(ChunkStatus::Light);
        assert!(record.shape.proto().is_some());
    }

    #[test]
    fn test_set_section() {
        let mut record = ChunkRecord::new(ChunkPos::new(0, 0), layout(), ChunkStatus::Full);
        assert!(record.set_section(Section::new(-1)).is_ok());
        assert!(record.section(-1).is_some());
        assert!(record.section(0).is_none());
        assert!(record.set_section(Section::new(40)).is_err());
    }

    #[test]
    fn test_post_processing_slot() {
        let mut record = ChunkRecord::new(ChunkPos::new(0, 0), layout(), ChunkStatus::Full);
        record.mark_for_post_processing(BlockPos::new(17, -63, 2));
        assert_eq!(record.post_processing[0], vec![crate::pos::pack_local(1, 1, 2)]);
    }

    #[test]
    fn test_structure_references() {
        let mut tables = StructureTables::default();
        tables.add_reference(StructureId(1), ChunkPos::new(-1, 0));
        tables.add_reference(StructureId(1), ChunkPos::new(-1, 0));
        assert_eq!(tables.references[&StructureId(1)].len(), 1);
        assert!(!tables.is_empty());
    }
}
