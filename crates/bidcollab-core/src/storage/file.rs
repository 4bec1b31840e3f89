use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::APP_NAME;

use super::{DurableStorage, Result, StorageError};

/// Storage file name in the config directory
const STORAGE_FILE: &str = "storage.json";

type Entries = BTreeMap<String, String>;

/// Flat JSON object on disk. Every call re-reads the file so that two
/// processes sharing it see each other's writes.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    /// `~/.config/bidcollab/storage.json` (platform equivalent elsewhere)
    pub fn in_config_dir() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or(StorageError::NoDirectory("config"))?;
        Ok(Self::new(config_dir.join(APP_NAME).join(STORAGE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Entries> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Entries to start a write from. A corrupt file is replaced rather than
    /// blocking every future write.
    fn entries_for_write(&self) -> Result<Entries> {
        match self.read_entries() {
            Ok(entries) => Ok(entries),
            Err(StorageError::Corrupt(e)) => {
                warn!(path = ?self.path, error = %e, "Discarding corrupt storage file");
                Ok(Entries::new())
            }
            Err(e) => Err(e),
        }
    }

    fn write_entries(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries_for_write()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)?;
        debug!(key, path = ?self.path, "Stored key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let mut entries = self.entries_for_write()?;
        if entries.remove(key).is_none() && !self.path.exists() {
            return Ok(());
        }
        if entries.is_empty() {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_entries(&entries)?;
        }
        debug!(key, path = ?self.path, "Removed key");
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage_in(dir: &tempfile::TempDir) -> FileStorage {
        FileStorage::new(dir.path().join("nested").join(STORAGE_FILE))
    }

    #[test]
    fn test_get_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        assert_eq!(storage.get("token").unwrap(), None);
    }

    #[test]
    fn test_set_creates_parent_and_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.set("token", "abc123").unwrap();
        storage.set("username", "alice").unwrap();

        let reopened = storage_in(&dir);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc123"));
        assert_eq!(reopened.get("username").unwrap().as_deref(), Some("alice"));
    }

    #[test]
    fn test_set_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.set("token", "old").unwrap();
        storage.set("token", "new").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn test_remove_last_key_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.set("token", "abc").unwrap();
        storage.set("username", "alice").unwrap();

        storage.remove("token").unwrap();
        assert!(storage.path().exists());
        assert_eq!(storage.get("username").unwrap().as_deref(), Some("alice"));

        storage.remove("username").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        storage.remove("token").unwrap();
        storage.remove("token").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_corrupt_file_reports_error_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage_in(&dir);
        std::fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        std::fs::write(storage.path(), "{not json").unwrap();

        assert!(matches!(storage.get("token"), Err(StorageError::Corrupt(_))));
    }

    #[test]
    fn test_corrupt_file_is_replaced_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = storage_in(&dir);
        std::fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        std::fs::write(storage.path(), "[1, 2").unwrap();

        storage.set("token", "fresh").unwrap();
        assert_eq!(storage.get("token").unwrap().as_deref(), Some("fresh"));
    }
}
