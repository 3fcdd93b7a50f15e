//! Numeric registry ids carried by live chunk data.
//!
//! Each id is an index into one registry of the active [`RegistrySet`].
//! Id 0 is that registry's default entry, so zeroed storage means air,
//! the empty fluid, or the fallback biome.
//!
//! [`RegistrySet`]: quarry_registry::RegistrySet

use std::fmt;

use quarry_registry::names;

/// Common behaviour of the id newtypes.
pub trait RegistryId: Copy + Eq + Ord + std::hash::Hash + Default + fmt::Debug {
    /// Registry this id indexes.
    const REGISTRY: &'static str;

    fn from_raw(raw: u32) -> Self;

    fn raw(self) -> u32;
}

macro_rules! registry_id {
    ($(#[$meta:meta])* $name:ident => $registry:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl RegistryId for $name {
            const REGISTRY: &'static str = $registry;

            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

registry_id! {
    /// A full block state (block plus property values).
    BlockStateId => names::BLOCK_STATE
}

registry_id! {
    /// A biome.
    BiomeId => names::BIOME
}

registry_id! {
    /// A block type, as named by scheduled block ticks.
    BlockId => names::BLOCK
}

registry_id! {
    /// A fluid type, as named by scheduled fluid ticks.
    FluidId => names::FLUID
}

registry_id! {
    /// A structure type.
    StructureId => names::STRUCTURE
}
