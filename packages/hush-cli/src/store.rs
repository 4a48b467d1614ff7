//! File-backed key-value store.
//!
//! Each key maps to one file under the data directory (`keys/alice` becomes
//! `<root>/keys/alice.json`). Writes go to a temporary sibling first and are
//! renamed into place, so a reader sees either the old or the new value.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use hush_core::storage::KeyValueStore;
use hush_core::{Error, Result};

const EXTENSION: &str = "json";

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| Error::StorageWriteError(e.to_string()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let segments: Vec<&str> = key.split('/').collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == ".." || s.contains('\\'))
        {
            return Err(Error::Internal(format!("invalid storage key '{}'", key)));
        }

        let mut path = self.root.clone();
        if let Some((last, dirs)) = segments.split_last() {
            path.extend(dirs);
            path.push(format!("{}.{}", last, EXTENSION));
        }
        Ok(path)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::StorageReadError(e.to_string())),
        }
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let write_err = |e: std::io::Error| Error::StorageWriteError(e.to_string());

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(format!(".tmp-{}", std::process::id()));
        let tmp = PathBuf::from(tmp);
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(value.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        drop(file);

        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            write_err(e)
        })
    }

    fn delete(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::StorageWriteError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get("keys/alice").unwrap(), None);
        store.put("keys/alice", "{\"a\":1}").unwrap();
        assert_eq!(store.get("keys/alice").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(dir.path().join("keys").join("alice.json").exists());

        store.put("keys/alice", "{\"a\":2}").unwrap();
        assert_eq!(store.get("keys/alice").unwrap().as_deref(), Some("{\"a\":2}"));

        assert!(store.delete("keys/alice").unwrap());
        assert!(!store.delete("keys/alice").unwrap());
    }

    #[test]
    fn test_no_temp_files_left() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put("verification/bob/k1", "{}").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path().join("verification").join("bob"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["k1.json".to_string()]);
    }

    #[test]
    fn test_dotted_user_ids_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put("keys/alice.smith", "1").unwrap();
        store.put("keys/alice", "2").unwrap();
        assert_eq!(store.get("keys/alice.smith").unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("keys/alice").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_rejects_path_escape() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(store.put("../outside", "x").is_err());
        assert!(store.get("keys//alice").is_err());
    }
}
