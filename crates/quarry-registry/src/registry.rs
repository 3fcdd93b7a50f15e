//! Bidirectional key/id tables and the active registry set.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::RegistryError;
use crate::key::canonicalize;

/// Well-known registry names.
pub mod names {
    /// Full block states (`name[prop=value,...]`), used by section palettes.
    pub const BLOCK_STATE: &str = "minecraft:block_state";
    /// Block types, used by scheduled block ticks.
    pub const BLOCK: &str = "minecraft:block";
    /// Fluid types, used by scheduled fluid ticks.
    pub const FLUID: &str = "minecraft:fluid";
    /// Biomes, used by section biome palettes.
    pub const BIOME: &str = "minecraft:worldgen/biome";
    /// Structure types, used by structure start/reference tables.
    pub const STRUCTURE: &str = "minecraft:worldgen/structure";
}

/// Read interface the chunk codec depends on.
///
/// Every method is O(1) and side-effect free. Failures are always
/// recoverable at the call site.
pub trait RegistryLookup: Send + Sync {
    /// Numeric id of `key` in `registry`.
    fn resolve(&self, registry: &str, key: &str) -> Result<u32, RegistryError>;

    /// Symbolic key of `id` in `registry`.
    fn lookup(&self, registry: &str, id: u32) -> Result<&str, RegistryError>;

    /// Number of entries in `registry` (0 if the registry is not active).
    fn entry_count(&self, registry: &str) -> usize;
}

/// One registry: a dense id → key table plus its reverse index.
///
/// Ids are assigned sequentially from 0 in registration order; id 0 is the
/// registry's default entry (air, empty fluid, fallback biome).
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    /// Dense array where `index == id`.
    keys: Vec<String>,
    /// Reverse lookup: canonical key → id.
    ids: FxHashMap<String, u32>,
}

impl IdMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from keys in id order.
    pub fn from_keys<I, S>(registry: &str, keys: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = Self::new();
        for key in keys {
            map.register(registry, key.as_ref())?;
        }
        Ok(map)
    }

    /// Registers `key` and returns its id.
    ///
    /// `registry` is only used for error reporting.
    pub fn register(&mut self, registry: &str, key: &str) -> Result<u32, RegistryError> {
        let key = canonicalize(key)?;
        if self.ids.contains_key(&key) {
            return Err(RegistryError::DuplicateKey {
                registry: registry.to_string(),
                key,
            });
        }
        let id = self.keys.len() as u32;
        self.ids.insert(key.clone(), id);
        self.keys.push(key);
        Ok(id)
    }

    /// Id of `key`; the key may omit the default namespace.
    pub fn get_id(&self, key: &str) -> Option<u32> {
        if let Some(&id) = self.ids.get(key) {
            return Some(id);
        }
        let canonical = canonicalize(key).ok()?;
        self.ids.get(&canonical).copied()
    }

    pub fn get_key(&self, id: u32) -> Option<&str> {
        self.keys.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(id, key)| (id as u32, key.as_str()))
    }
}

/// The set of registries active for one world.
///
/// Immutable once built; share it through [`RegistrySet::into_shared`].
#[derive(Debug, Clone, Default)]
pub struct RegistrySet {
    registries: FxHashMap<String, IdMap>,
}

impl RegistrySet {
    pub fn builder() -> RegistrySetBuilder {
        RegistrySetBuilder::default()
    }

    /// The map for `registry`, if active.
    pub fn get(&self, registry: &str) -> Option<&IdMap> {
        self.registries.get(registry)
    }

    /// Names of all active registries.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registries.keys().map(String::as_str)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn map(&self, registry: &str) -> Result<&IdMap, RegistryError> {
        self.registries
            .get(registry)
            .ok_or_else(|| RegistryError::UnknownRegistry(registry.to_string()))
    }
}

impl RegistryLookup for RegistrySet {
    fn resolve(&self, registry: &str, key: &str) -> Result<u32, RegistryError> {
        self.map(registry)?
            .get_id(key)
            .ok_or_else(|| RegistryError::UnknownKey {
                registry: registry.to_string(),
                key: key.to_string(),
            })
    }

    fn lookup(&self, registry: &str, id: u32) -> Result<&str, RegistryError> {
        self.map(registry)?
            .get_key(id)
            .ok_or_else(|| RegistryError::UnknownId {
                registry: registry.to_string(),
                id,
            })
    }

    fn entry_count(&self, registry: &str) -> usize {
        self.registries.get(registry).map_or(0, IdMap::len)
    }
}

/// Populates a [`RegistrySet`].
#[derive(Debug, Default)]
pub struct RegistrySetBuilder {
    registries: FxHashMap<String, IdMap>,
}

impl RegistrySetBuilder {
    /// Adds (or replaces) a whole registry.
    pub fn with_map(mut self, registry: &str, map: IdMap) -> Self {
        if self.registries.insert(registry.to_string(), map).is_some() {
            tracing::debug!(registry, "registry replaced while building");
        }
        self
    }

    /// Adds a registry from keys in id order.
    pub fn with_keys<I, S>(self, registry: &str, keys: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let map = IdMap::from_keys(registry, keys)?;
        Ok(self.with_map(registry, map))
    }

    /// Appends one key to `registry`, creating the registry if needed.
    pub fn register(&mut self, registry: &str, key: &str) -> Result<u32, RegistryError> {
        self.registries
            .entry(registry.to_string())
            .or_default()
            .register(registry, key)
    }

    pub fn build(self) -> RegistrySet {
        for (name, map) in &self.registries {
            tracing::debug!(registry = %name, entries = map.len(), "registry activated");
        }
        RegistrySet {
            registries: self.registries,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(RegistrySet: Send, Sync);

    fn sample() -> RegistrySet {
        RegistrySet::builder()
            .with_keys(names::BLOCK, ["air", "stone", "dirt"])
            .unwrap()
            .with_keys(names::STRUCTURE, ["village_plains", "quarry:ruin"])
            .unwrap()
            .build()
    }

    #[test]
    fn test_default_entry_is_id_zero() {
        let set = sample();
        assert_eq!(set.resolve(names::BLOCK, "minecraft:air"), Ok(0));
        assert_eq!(set.lookup(names::BLOCK, 0), Ok("minecraft:air"));
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut builder = RegistrySet::builder();
        assert_eq!(builder.register(names::FLUID, "empty"), Ok(0));
        assert_eq!(builder.register(names::FLUID, "water"), Ok(1));
        assert_eq!(builder.register(names::FLUID, "lava"), Ok(2));
        let set = builder.build();
        assert_eq!(set.entry_count(names::FLUID), 3);
    }

    #[test]
    fn test_resolve_and_lookup_are_inverse() {
        let set = sample();
        for (id, key) in set.get(names::STRUCTURE).unwrap().iter() {
            assert_eq!(set.resolve(names::STRUCTURE, key), Ok(id));
            assert_eq!(set.lookup(names::STRUCTURE, id), Ok(key));
        }
    }

    #[test]
    fn test_resolve_accepts_missing_namespace() {
        let set = sample();
        assert_eq!(set.resolve(names::BLOCK, "stone"), Ok(1));
        assert_eq!(set.resolve(names::STRUCTURE, "quarry:ruin"), Ok(1));
    }

    #[test]
    fn test_unknown_key_and_id() {
        let set = sample();
        assert!(matches!(
            set.resolve(names::STRUCTURE, "minecraft:stronghold"),
            Err(RegistryError::UnknownKey { .. })
        ));
        assert!(matches!(
            set.lookup(names::BLOCK, 99),
            Err(RegistryError::UnknownId { id: 99, .. })
        ));
    }

    #[test]
    fn test_inactive_registry() {
        let set = sample();
        assert!(matches!(
            set.resolve(names::BIOME, "plains"),
            Err(RegistryError::UnknownRegistry(_))
        ));
        assert_eq!(set.entry_count(names::BIOME), 0);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = IdMap::from_keys(names::BLOCK, ["stone", "minecraft:stone"]);
        assert!(matches!(result, Err(RegistryError::DuplicateKey { .. })));
    }

    #[test]
    fn test_block_state_keys() {
        let map = IdMap::from_keys(
            names::BLOCK_STATE,
            ["air", "oak_log[axis=x]", "oak_log[axis=y]"],
        )
        .unwrap();
        assert_eq!(map.get_id("minecraft:oak_log[axis=y]"), Some(2));
        assert_eq!(map.get_key(1), Some("minecraft:oak_log[axis=x]"));
    }

    #[test]
    fn test_concurrent_readers() {
        let set = sample().into_shared();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let set = Arc::clone(&set);
                scope.spawn(move || {
                    for _ in 0..1000 {
                        assert_eq!(set.resolve(names::BLOCK, "dirt"), Ok(2));
                    }
                });
            }
        });
    }
}
