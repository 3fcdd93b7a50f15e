//! Scheduled block and fluid ticks.
//!
//! Each tick is stored as `{i: "minecraft:water", x, y, z, t: delay, p: priority}`.

use quarry_nbt::{Compound, Tag};
use quarry_registry::RegistryLookup;

use crate::ids::RegistryId;
use crate::issues::{DecodeIssue, DecodeReport};
use crate::pos::BlockPos;

/// A pending update for the block or fluid at `pos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTick<T> {
    pub target: T,
    pub pos: BlockPos,
    /// Game ticks until the update fires.
    pub delay: i32,
    /// Lower runs first among ticks due on the same game tick.
    pub priority: i32,
}

impl<T> ScheduledTick<T> {
    pub fn new(target: T, pos: BlockPos, delay: i32) -> Self {
        Self {
            target,
            pos,
            delay,
            priority: 0,
        }
    }
}

/// Encodes ticks, skipping any whose target has no registry key.
pub(crate) fn write_ticks<T: RegistryId>(
    ticks: &[ScheduledTick<T>],
    registries: &dyn RegistryLookup,
) -> Vec<Tag> {
    ticks
        .iter()
        .filter_map(|tick| {
            let key = match registries.lookup(T::REGISTRY, tick.target.raw()) {
                Ok(key) => key,
                Err(err) => {
                    tracing::warn!(%err, pos = %tick.pos, "dropping tick with unknown target");
                    return None;
                }
            };
            let mut tag = Compound::new();
            tag.insert("i", key);
            tag.insert("x", tick.pos.x);
            tag.insert("y", tick.pos.y);
            tag.insert("z", tick.pos.z);
            tag.insert("t", tick.delay);
            tag.insert("p", tick.priority);
            Some(Tag::Compound(tag))
        })
        .collect()
}

/// Decodes a tick list. Entries with missing fields or unknown targets are
/// dropped with an issue.
pub(crate) fn read_ticks<T: RegistryId>(
    list: &[Tag],
    field: &'static str,
    registries: &dyn RegistryLookup,
    report: &mut DecodeReport,
) -> Vec<ScheduledTick<T>> {
    let mut ticks = Vec::with_capacity(list.len());
    for entry in list {
        let Some(tag) = entry.as_compound() else {
            report.malformed(field, format!("entry is a {:?}", entry.tag_type()));
            continue;
        };
        let (Some(key), Some(x), Some(y), Some(z)) = (
            tag.get_str("i"),
            tag.get_int("x"),
            tag.get_int("y"),
            tag.get_int("z"),
        ) else {
            report.malformed(field, "tick without target or position");
            continue;
        };
        let target = match registries.resolve(T::REGISTRY, key) {
            Ok(id) => T::from_raw(id),
            Err(_) => {
                report.push(DecodeIssue::UnknownSymbolicId {
                    registry: T::REGISTRY,
                    field,
                    key: key.to_string(),
                });
                continue;
            }
        };
        ticks.push(ScheduledTick {
            target,
            pos: BlockPos::new(x, y, z),
            delay: tag.get_int("t").unwrap_or(0),
            priority: tag.get_int("p").unwrap_or(0),
        });
    }
    ticks
}
