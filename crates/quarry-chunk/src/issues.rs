//! Recoverable problems found while decoding a chunk.
//!
//! Decoding never aborts on bad content: the offending part is replaced by
//! its default and an issue is recorded. Issues are logged as they are
//! raised and returned alongside the record.

use thiserror::Error;

use crate::heightmap::HeightmapKind;
use crate::pos::ChunkPos;

/// Volume inside a section an issue refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    Blocks,
    Biomes,
}

impl VolumeKind {
    /// Section key holding this volume.
    pub fn field(self) -> &'static str {
        match self {
            VolumeKind::Blocks => "block_states",
            VolumeKind::Biomes => "biomes",
        }
    }
}

impl std::fmt::Display for VolumeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.field())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeIssue {
    /// The stored position differs from the one requested; the requested
    /// position wins.
    #[error("stored position {stored} does not match requested {requested}")]
    CoordinateMismatch { stored: ChunkPos, requested: ChunkPos },

    /// Packed indices pointed past the palette.
    #[error("section {section_y} {volume}: {count} palette indices out of range")]
    PaletteIndexOutOfRange {
        section_y: i32,
        volume: VolumeKind,
        count: usize,
    },

    /// Raw ids not present in the active registry.
    #[error("section {section_y} {volume}: {count} unknown registry ids")]
    UnknownRegistryId {
        section_y: i32,
        volume: VolumeKind,
        count: usize,
    },

    /// A symbolic key that does not resolve. The carrying entry is dropped,
    /// or replaced by the default for palette entries.
    #[error("unknown {registry} key {key:?} in {field}")]
    UnknownSymbolicId {
        registry: &'static str,
        field: &'static str,
        key: String,
    },

    /// A section's palette, data, or light arrays have the wrong shape.
    #[error("section {section_y}: {detail}")]
    SectionShapeMismatch { section_y: i32, detail: String },

    /// A field is missing, has the wrong type, or holds a bad value.
    #[error("malformed {field}: {detail}")]
    MalformedField { field: &'static str, detail: String },

    /// A heightmap the status requires was absent; it is marked for
    /// recomputation.
    #[error("heightmap {0} missing, marked for recomputation")]
    HeightmapMissing(HeightmapKind),

    /// The chunk was written by a newer format version.
    #[error("data version {found} is newer than supported {supported}")]
    NewerDataVersion { found: i32, supported: i32 },
}

/// Collects issues for one chunk, logging each as it arrives.
#[derive(Debug)]
pub(crate) struct DecodeReport {
    pos: ChunkPos,
    issues: Vec<DecodeIssue>,
}

impl DecodeReport {
    pub(crate) fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            issues: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, issue: DecodeIssue) {
        match issue {
            DecodeIssue::HeightmapMissing(_) => {
                tracing::debug!(chunk_x = self.pos.x, chunk_z = self.pos.z, "{issue}")
            }
            _ => tracing::warn!(chunk_x = self.pos.x, chunk_z = self.pos.z, "{issue}"),
        }
        self.issues.push(issue);
    }

    pub(crate) fn malformed(&mut self, field: &'static str, detail: impl Into<String>) {
        self.push(DecodeIssue::MalformedField {
            field,
            detail: detail.into(),
        });
    }

    pub(crate) fn into_issues(self) -> Vec<DecodeIssue> {
        self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_messages() {
        let issue = DecodeIssue::CoordinateMismatch {
            stored: ChunkPos::new(1, 2),
            requested: ChunkPos::new(3, 4),
        };
        assert_eq!(
            issue.to_string(),
            "stored position [1, 2] does not match requested [3, 4]"
        );
        let issue = DecodeIssue::PaletteIndexOutOfRange {
            section_y: -2,
            volume: VolumeKind::Biomes,
            count: 3,
        };
        assert_eq!(issue.to_string(), "section -2 biomes: 3 palette indices out of range");
    }

    #[test]
    fn test_report_collects_in_order() {
        let mut report = DecodeReport::new(ChunkPos::new(0, 0));
        report.malformed("status", "missing");
        report.push(DecodeIssue::HeightmapMissing(HeightmapKind::OceanFloor));
        let issues = report.into_issues();
        assert_eq!(issues.len(), 2);
        assert!(matches!(issues[0], DecodeIssue::MalformedField { field: "status", .. }));
    }
}
