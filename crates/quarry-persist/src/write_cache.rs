//! Content-hash cache for incremental output generation.
//!
//! A generator run records every file it produces together with a hash of
//! its contents. Files whose hash matches the previous run need not be
//! rewritten; files the previous run produced but this run neither wrote
//! nor marked as kept are deleted by [`WriteCache::finalize`].
//!
//! The table lives at `<root>/<dir_name>/<file_name>` as one
//! `<hash> <relative-path>` line per file, sorted by path. Only paths that
//! stay inside the root are accepted, both from callers and from the table.

use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use quarry_config::CacheConfig;

use crate::PersistError;
use crate::atomic::write_atomic;

/// What a run changed, as returned by [`WriteCache::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeSummary {
    /// Paths recorded this run.
    pub written: usize,
    /// Paths kept without being rewritten.
    pub kept: usize,
    /// Stale paths removed from disk, sorted.
    pub deleted: Vec<String>,
}

#[derive(Debug, Default)]
struct RunState {
    written: BTreeMap<String, String>,
    keep: BTreeSet<String>,
}

/// Per-run view of the output tree under `root`.
///
/// `record_write`, `mark_keep` and `write_if_changed` take `&self` and may
/// be called from several threads.
#[derive(Debug)]
pub struct WriteCache {
    root: PathBuf,
    table_path: PathBuf,
    previous: BTreeMap<String, String>,
    run: Mutex<RunState>,
}

impl WriteCache {
    /// Opens the cache for `root`, loading the previous run's table if one
    /// exists. Malformed lines are skipped.
    pub fn open(root: &Path, config: &CacheConfig) -> Result<Self, PersistError> {
        config.validate()?;
        let table_path = root.join(&config.dir_name).join(&config.file_name);
        let previous = match std::fs::read_to_string(&table_path) {
            Ok(contents) => parse_table(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(PersistError::io(&table_path)(e)),
        };
        tracing::debug!(
            root = %root.display(),
            entries = previous.len(),
            "write cache opened"
        );
        Ok(Self {
            root: root.to_path_buf(),
            table_path,
            previous,
            run: Mutex::new(RunState::default()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Hash recorded for `path` by the previous run.
    pub fn previous_hash(&self, path: &Path) -> Option<&str> {
        self.previous.get(&self.key(path)?).map(String::as_str)
    }

    /// Records that `path` was produced this run with content `hash`.
    /// Paths outside the root are ignored with a warning.
    pub fn record_write(&self, path: &Path, hash: &str) {
        let Some(key) = self.checked_key(path) else {
            return;
        };
        if let Some(old) = self.previous.get(&key)
            && old != hash
        {
            tracing::debug!(path = %key, "content changed");
        }
        self.lock().written.insert(key, hash.to_string());
    }

    /// Exempts `path` from cleanup even if it is not written this run.
    pub fn mark_keep(&self, path: &Path) {
        if let Some(key) = self.checked_key(path) {
            self.lock().keep.insert(key);
        }
    }

    /// Writes `bytes` to `path` unless the previous run produced the same
    /// hash and the file is still there. Records the path either way and
    /// returns whether the file was written.
    pub fn write_if_changed(&self, path: &Path, bytes: &[u8], hash: &str) -> Result<bool, PersistError> {
        let key = self.key(path).ok_or_else(|| PersistError::OutsideRoot {
            path: path.to_path_buf(),
        })?;
        let full = self.root.join(&key);
        let unchanged = self.previous.get(&key).is_some_and(|old| old == hash) && full.is_file();
        if !unchanged {
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).map_err(PersistError::io(parent))?;
            }
            std::fs::write(&full, bytes).map_err(PersistError::io(&full))?;
        }
        self.lock().written.insert(key, hash.to_string());
        Ok(!unchanged)
    }

    /// Deletes stale outputs and persists the new table.
    ///
    /// A previously known path survives if it was recorded this run or
    /// marked as kept; kept paths carry their previous hash forward.
    pub fn finalize(self) -> Result<FinalizeSummary, PersistError> {
        let run = self.run.into_inner().unwrap_or_else(PoisonError::into_inner);

        let mut deleted = Vec::new();
        for key in self.previous.keys() {
            if run.written.contains_key(key) || run.keep.contains(key) {
                continue;
            }
            let full = self.root.join(key);
            match std::fs::remove_file(&full) {
                Ok(()) => deleted.push(key.clone()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(PersistError::io(full)(e)),
            }
        }

        let mut table = run.written.clone();
        let mut kept = 0;
        for key in &run.keep {
            if table.contains_key(key) {
                continue;
            }
            if let Some(hash) = self.previous.get(key) {
                table.insert(key.clone(), hash.clone());
                kept += 1;
            }
        }

        let mut contents = String::new();
        for (path, hash) in &table {
            contents.push_str(hash);
            contents.push(' ');
            contents.push_str(path);
            contents.push('\n');
        }
        write_atomic(&self.table_path, contents.as_bytes())?;

        let summary = FinalizeSummary {
            written: run.written.len(),
            kept,
            deleted,
        };
        tracing::info!(
            written = summary.written,
            kept = summary.kept,
            deleted = summary.deleted.len(),
            "write cache finalized"
        );
        Ok(summary)
    }

    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Table key for `path`: relative to the root, `/`-separated. `path`
    /// may be given relative to the root or with the root as its prefix.
    fn key(&self, path: &Path) -> Option<String> {
        relative_key(path.strip_prefix(&self.root).unwrap_or(path))
    }

    fn checked_key(&self, path: &Path) -> Option<String> {
        let key = self.key(path);
        if key.is_none() {
            tracing::warn!(path = %path.display(), "ignoring path outside the output root");
        }
        key
    }
}

/// `/`-joined form of a relative path made only of plain names. Returns
/// `None` for absolute paths, `..`, empty paths and non-UTF-8 names.
fn relative_key(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

fn parse_table(contents: &str) -> BTreeMap<String, String> {
    let mut table = BTreeMap::new();
    for (n, line) in contents.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        match line.split_once(' ') {
            Some((hash, path))
                if !hash.is_empty() && relative_key(Path::new(path)).as_deref() == Some(path) =>
            {
                table.insert(path.to_string(), hash.to_string());
            }
            _ => tracing::warn!(line = n + 1, "skipping malformed cache line"),
        }
    }
    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs a first generation that writes `paths`, then returns a fresh
    /// cache for the second run.
    fn seeded(root: &Path, paths: &[&str]) -> WriteCache {
        let cache = WriteCache::open(root, &CacheConfig::default()).unwrap();
        for path in paths {
            cache
                .write_if_changed(Path::new(path), path.as_bytes(), &format!("h-{path}"))
                .unwrap();
        }
        cache.finalize().unwrap();
        WriteCache::open(root, &CacheConfig::default()).unwrap()
    }

    #[test]
    fn test_table_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WriteCache::open(dir.path(), &CacheConfig::default()).unwrap();
        cache.record_write(Path::new("b/two.json"), "bbb");
        cache.record_write(Path::new("a.json"), "aaa");
        cache.finalize().unwrap();

        let table = std::fs::read_to_string(dir.path().join(".cache/hashes")).unwrap();
        assert_eq!(table, "aaa a.json\nbbb b/two.json\n");
    }

    #[test]
    fn test_previous_hash() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded(dir.path(), &["A", "data/B"]);
        assert_eq!(cache.previous_hash(Path::new("A")), Some("h-A"));
        assert_eq!(cache.previous_hash(&dir.path().join("data/B")), Some("h-data/B"));
        assert_eq!(cache.previous_hash(Path::new("C")), None);
    }

    #[test]
    fn test_kept_path_survives_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded(dir.path(), &["A", "B", "C"]);
        cache.record_write(Path::new("A"), "h-A");
        cache.record_write(Path::new("B"), "h-B");
        cache.mark_keep(Path::new("C"));
        let summary = cache.finalize().unwrap();

        assert!(summary.deleted.is_empty());
        assert_eq!(summary.kept, 1);
        for name in ["A", "B", "C"] {
            assert!(dir.path().join(name).exists(), "{name} deleted");
        }
        let next = WriteCache::open(dir.path(), &CacheConfig::default()).unwrap();
        assert_eq!(next.previous_hash(Path::new("C")), Some("h-C"));
    }

    #[test]
    fn test_unrecorded_path_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded(dir.path(), &["A", "B", "C"]);
        cache.record_write(Path::new("A"), "h-A");
        cache.record_write(Path::new("B"), "h-B");
        let summary = cache.finalize().unwrap();

        assert_eq!(summary.deleted, vec!["C".to_string()]);
        assert!(!dir.path().join("C").exists());
        assert!(dir.path().join("A").exists());
    }

    #[test]
    fn test_write_if_changed_skips_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded(dir.path(), &["A"]);
        assert!(!cache.write_if_changed(Path::new("A"), b"ignored", "h-A").unwrap());
        assert_eq!(std::fs::read(dir.path().join("A")).unwrap(), b"A");
        assert!(cache.write_if_changed(Path::new("A"), b"new", "h-A2").unwrap());
        assert_eq!(std::fs::read(dir.path().join("A")).unwrap(), b"new");
    }

    #[test]
    fn test_missing_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let cache = seeded(dir.path(), &["A"]);
        std::fs::remove_file(dir.path().join("A")).unwrap();
        assert!(cache.write_if_changed(Path::new("A"), b"A", "h-A").unwrap());
        assert!(dir.path().join("A").exists());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let table = parse_table("abc one.json\nbroken\n\nfff dir/two words.json\n");
        assert_eq!(table.len(), 2);
        assert_eq!(table["dir/two words.json"], "fff");
    }

    #[test]
    fn test_escaping_table_lines_ignored() {
        let table = parse_table("abc ../victim.txt\nabc /abs/path\nabc ./a\nabc a//b\nabc ok/c\n");
        assert_eq!(table.keys().collect::<Vec<_>>(), ["ok/c"]);
    }

    #[test]
    fn test_finalize_stays_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        let victim = dir.path().join("victim.txt");
        std::fs::write(&victim, b"keep me").unwrap();
        std::fs::create_dir_all(root.join(".cache")).unwrap();
        std::fs::write(
            root.join(".cache/hashes"),
            format!("abc ../victim.txt\nabc {}\n", victim.display()),
        )
        .unwrap();

        let cache = WriteCache::open(&root, &CacheConfig::default()).unwrap();
        let summary = cache.finalize().unwrap();
        assert!(summary.deleted.is_empty());
        assert!(victim.exists());
    }

    #[test]
    fn test_open_rejects_escaping_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = CacheConfig {
            dir_name: "..".to_string(),
            ..CacheConfig::default()
        };
        assert!(matches!(
            WriteCache::open(dir.path(), &config),
            Err(PersistError::Config(_))
        ));
    }

    #[test]
    fn test_paths_outside_root_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("out");
        let cache = WriteCache::open(&root, &CacheConfig::default()).unwrap();
        let outside = dir.path().join("elsewhere/x");

        cache.record_write(&outside, "h");
        cache.record_write(Path::new("../x"), "h");
        cache.mark_keep(Path::new("../x"));
        assert!(matches!(
            cache.write_if_changed(&outside, b"x", "h"),
            Err(PersistError::OutsideRoot { .. })
        ));
        assert!(!outside.exists());

        cache.record_write(&root.join("inside/y"), "h");
        assert_eq!(cache.finalize().unwrap().written, 1);
        let table = std::fs::read_to_string(root.join(".cache/hashes")).unwrap();
        assert_eq!(table, "h inside/y\n");
    }

    #[test]
    fn test_concurrent_recording() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WriteCache::open(dir.path(), &CacheConfig::default()).unwrap();
        std::thread::scope(|scope| {
            for t in 0..4 {
                let cache = &cache;
                scope.spawn(move || {
                    for i in 0..50 {
                        cache.record_write(Path::new(&format!("t{t}/f{i}")), "h");
                    }
                });
            }
        });
        assert_eq!(cache.finalize().unwrap().written, 200);
    }
}
