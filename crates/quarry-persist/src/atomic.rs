use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::PersistError;

/// Writes `bytes` to `path` through a temporary file in the same directory,
/// so readers see either the old or the new contents.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(PersistError::io(dir))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(PersistError::io(dir))?;
    tmp.write_all(bytes).map_err(PersistError::io(tmp.path()))?;
    tmp.persist(path)
        .map_err(|e| PersistError::io(path)(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/file.txt");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"two");
        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }
}
