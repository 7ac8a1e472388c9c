// Хранилище обычных записей (контакты, сообщения, профиль)

use crate::utils::error::{MessengerError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// General-purpose key/value storage. `put` replaces the whole value
/// atomically; `remove` of an absent key is not an error.
pub trait RecordStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Файловое хранилище: один файл на ключ, запись через temp + rename
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            MessengerError::StorageError(format!("Failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');
        if !valid {
            return Err(MessengerError::StorageError(format!(
                "Invalid record key: {}",
                key
            )));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(MessengerError::StorageError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");

        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value)?;
            file.sync_all()?;
            fs::rename(&tmp, &path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&tmp);
            MessengerError::StorageError(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MessengerError::StorageError(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();

        assert!(store.get("contacts").unwrap().is_none());
        store.put("contacts", b"[1]").unwrap();
        store.put("contacts", b"[1,2]").unwrap();
        assert_eq!(store.get("contacts").unwrap().unwrap(), b"[1,2]");
        assert!(!dir.path().join("contacts.json.tmp").exists());

        store.remove("contacts").unwrap();
        store.remove("contacts").unwrap();
        assert!(store.get("contacts").unwrap().is_none());
    }

    #[test]
    fn test_file_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::open(dir.path()).unwrap();
        assert!(store.put("../escape", b"x").is_err());
        assert!(store.get(".hidden").is_err());
    }
}
