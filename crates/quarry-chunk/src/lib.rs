//! Chunk records and their on-disk tag encoding.
//!
//! A [`ChunkRecord`] is the live form of one chunk column: dense sections,
//! heightmaps, structure tables, scheduled ticks, block entities and the
//! proto-only generation state. [`ChunkCodec`] turns records into tag trees
//! and back. Section volumes are palette-compressed ([`palette`]) and
//! bit-packed ([`bit_packed`]).
//!
//! Decoding is lenient: damaged content is replaced by defaults and
//! reported as [`DecodeIssue`]s. Only bytes that cannot be parsed into a
//! tag tree at all produce a [`ChunkError`].

pub mod bit_packed;
mod block_state;
mod carving;
mod codec;
mod error;
mod heightmap;
mod ids;
mod issues;
mod nibble;
pub mod palette;
mod pos;
mod record;
mod section;
mod status;
mod ticks;

pub use block_state::BlockState;
pub use carving::{CarvingMask, CarvingStep};
pub use codec::{ChunkCodec, DecodedChunk};
pub use error::ChunkError;
pub use heightmap::{Heightmap, HeightmapKind, HeightmapState, Heightmaps, bits_for_height};
pub use ids::{BiomeId, BlockId, BlockStateId, FluidId, RegistryId, StructureId};
pub use issues::{DecodeIssue, VolumeKind};
pub use nibble::NibbleArray;
pub use pos::{BlockPos, ChunkPos, pack_local, unpack_local};
pub use record::{ChunkRecord, ChunkShape, ProtoData, StructureTables, WorldLayout};
pub use section::{BIOME_SIZE, BIOME_VOLUME, SECTION_SIZE, SECTION_VOLUME, Section};
pub use status::ChunkStatus;
pub use ticks::ScheduledTick;
