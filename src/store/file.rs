//! File-system collection store: one file per key.
//!
//! Keys map to `<root>/<key>.pathgraph.json`. Keys must be plain file stems:
//! no path separators, no leading dot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{CollectionStore, StoreError};

const EXTENSION: &str = ".pathgraph.json";

/// Store backed by a directory.
#[derive(Debug, Clone)]
pub struct FileCollectionStore {
    root: PathBuf,
}

impl FileCollectionStore {
    /// Use `root` as the store directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && !key.contains('\0');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}{EXTENSION}")))
    }
}

impl CollectionStore for FileCollectionStore {
    fn load(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(key.to_string()),
            _ => StoreError::Io(e),
        })
    }

    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        // Write beside the target, then rename over it.
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, &path)?;
        tracing::debug!(key, path = %path.display(), bytes = bytes.len(), "Saved collection blob");
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(key) = name.to_str().and_then(|n| n.strip_suffix(EXTENSION)) {
                keys.push(key.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCollectionStore::open(dir.path()).unwrap();
        store.save("arena", b"{}").unwrap();
        assert_eq!(store.load("arena").unwrap(), b"{}");
        assert!(dir.path().join("arena.pathgraph.json").exists());
    }

    #[test]
    fn test_keys_ignore_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCollectionStore::open(dir.path()).unwrap();
        store.save("b", b"1").unwrap();
        store.save("a", b"2").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_missing_and_invalid_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCollectionStore::open(dir.path()).unwrap();
        assert!(matches!(store.load("ghost"), Err(StoreError::NotFound(_))));
        assert!(matches!(store.load("../escape"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(store.save("", b""), Err(StoreError::InvalidKey(_))));
    }
}
