//! Ordered entry lists persisted as a single uncompressed NBT file.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use quarry_nbt::{Compound, NbtFile, Tag};

use crate::PersistError;
use crate::atomic::write_atomic;

/// An element that can live in an [`EntryList`].
pub trait ListEntry: Sized {
    /// Name of the list inside the root compound.
    const LIST_KEY: &'static str;

    fn to_compound(&self) -> Compound;

    /// Returns `None` for an entry missing required fields.
    fn from_compound(compound: &Compound) -> Option<Self>;
}

/// A saved multiplayer server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEntry {
    pub name: String,
    pub ip: String,
    /// Base64-encoded PNG.
    pub icon: Option<String>,
    /// `None` means the player has not been asked yet.
    pub accept_textures: Option<bool>,
}

impl ServerEntry {
    pub fn new(name: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ip: ip.into(),
            icon: None,
            accept_textures: None,
        }
    }
}

impl ListEntry for ServerEntry {
    const LIST_KEY: &'static str = "servers";

    fn to_compound(&self) -> Compound {
        let mut c = Compound::new();
        c.insert("name", self.name.as_str());
        c.insert("ip", self.ip.as_str());
        if let Some(icon) = &self.icon {
            c.insert("icon", icon.as_str());
        }
        if let Some(accept) = self.accept_textures {
            c.insert("acceptTextures", accept);
        }
        c
    }

    fn from_compound(compound: &Compound) -> Option<Self> {
        Some(Self {
            name: compound.get_str("name")?.to_string(),
            ip: compound.get_str("ip")?.to_string(),
            icon: compound.get_str("icon").map(str::to_string),
            accept_textures: compound.get_bool("acceptTextures"),
        })
    }
}

/// File-backed ordered list.
///
/// Index-taking operations treat an out-of-range index as a no-op and
/// report it through their return value.
#[derive(Debug, Clone)]
pub struct EntryList<T> {
    path: PathBuf,
    entries: Vec<T>,
}

impl<T: ListEntry> EntryList<T> {
    /// Empty list bound to `path`. Nothing is read or written.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Loads the list at `path`. A missing file yields an empty list;
    /// entries that are not compounds or lack required fields are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no list file, starting empty");
                return Ok(Self::new(path));
            }
            Err(e) => return Err(PersistError::io(&path)(e)),
        };
        let file = NbtFile::read(&mut Cursor::new(bytes)).map_err(PersistError::nbt(&path))?;

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for tag in file.root.get_list(T::LIST_KEY).unwrap_or_default() {
            match tag.as_compound().and_then(T::from_compound) {
                Some(entry) => entries.push(entry),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            tracing::warn!(
                path = %path.display(),
                skipped,
                "skipped malformed list entries"
            );
        }
        Ok(Self { path, entries })
    }

    /// Writes the list atomically, creating parent directories.
    pub fn save(&self) -> Result<(), PersistError> {
        let list: Vec<Tag> = self.entries.iter().map(|e| Tag::Compound(e.to_compound())).collect();
        let mut root = Compound::new();
        root.insert(T::LIST_KEY, list);

        let mut bytes = Vec::new();
        NbtFile::new("", root)
            .write(&mut bytes)
            .map_err(PersistError::nbt(&self.path))?;
        write_atomic(&self.path, &bytes)?;
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "list saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Appends `entry`.
    pub fn add(&mut self, entry: T) {
        self.entries.push(entry);
    }

    /// Removes and returns the entry at `index`, shifting later entries down.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Swaps two entries. Returns `false` if either index is out of range.
    pub fn swap(&mut self, a: usize, b: usize) -> bool {
        if a >= self.entries.len() || b >= self.entries.len() {
            return false;
        }
        self.entries.swap(a, b);
        true
    }

    /// Replaces the entry at `index`, returning the old one.
    pub fn replace(&mut self, index: usize, entry: T) -> Option<T> {
        let slot = self.entries.get_mut(index)?;
        Some(std::mem::replace(slot, entry))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EntryList<ServerEntry> {
        let mut list = EntryList::new("unused.dat");
        list.add(ServerEntry::new("one", "a.example:25565"));
        list.add(ServerEntry::new("two", "b.example"));
        list.add(ServerEntry::new("three", "c.example"));
        list
    }

    fn names(list: &EntryList<ServerEntry>) -> Vec<&str> {
        list.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_list_operations() {
        let mut list = sample();
        assert!(list.swap(0, 2));
        assert_eq!(names(&list), ["three", "two", "one"]);
        assert!(!list.swap(0, 3));

        let old = list.replace(1, ServerEntry::new("deux", "b.example")).unwrap();
        assert_eq!(old.name, "two");
        assert!(list.replace(9, ServerEntry::new("x", "y")).is_none());

        assert_eq!(list.remove(0).unwrap().name, "three");
        assert_eq!(names(&list), ["deux", "one"]);
        assert!(list.remove(5).is_none());
        assert_eq!(list.get(1).unwrap().name, "one");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/servers.dat");
        let mut list = sample();
        list.path = path.clone();
        list.entries[1].icon = Some("aWNvbg==".into());
        list.entries[2].accept_textures = Some(false);
        list.save().unwrap();

        let loaded = EntryList::<ServerEntry>::load(&path).unwrap();
        assert_eq!(loaded.entries, list.entries);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = EntryList::<ServerEntry>::load(dir.path().join("servers.dat")).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_malformed_entries_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.dat");

        let mut no_ip = Compound::new();
        no_ip.insert("name", "broken");
        let list = vec![
            Tag::Compound(ServerEntry::new("good", "g.example").to_compound()),
            Tag::Compound(no_ip),
            Tag::Compound(ServerEntry::new("also good", "h.example").to_compound()),
        ];
        let mut root = Compound::new();
        root.insert("servers", list);
        let mut bytes = Vec::new();
        NbtFile::new("", root).write(&mut bytes).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let loaded = EntryList::<ServerEntry>::load(&path).unwrap();
        assert_eq!(names(&loaded), ["good", "also good"]);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("servers.dat");
        std::fs::write(&path, [0xFFu8, 0x00]).unwrap();
        assert!(matches!(
            EntryList::<ServerEntry>::load(&path),
            Err(PersistError::Nbt { .. })
        ));
    }
}
