//! Durable key-value storage for session state.
//!
//! This module provides the `DurableStorage` trait and three backends:
//! - `FileStorage`: a flat JSON object in the user's config directory
//! - `KeyringStorage`: one OS keychain entry per key
//! - `MemoryStorage`: process-local, nothing survives a restart

mod file;
mod keychain;
mod memory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub use self::file::FileStorage;
pub use self::keychain::KeyringStorage;
pub use self::memory::MemoryStorage;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("Could not find {0} directory")]
    NoDirectory(&'static str),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A string-keyed, string-valued store that survives process restarts
/// (unless `is_persistent` says otherwise).
pub trait DurableStorage: Send {
    /// Read a key. A missing key is `Ok(None)`, never an error.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a key, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key succeeds.
    fn remove(&mut self, key: &str) -> Result<()>;

    fn is_persistent(&self) -> bool;
}

impl<T: DurableStorage + ?Sized> DurableStorage for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn is_persistent(&self) -> bool {
        (**self).is_persistent()
    }
}

/// Which storage backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::File => "file",
            StorageBackend::Keyring => "keyring",
            StorageBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

/// Open the requested backend.
///
/// A keyring that cannot be reached falls back to the file backend, and a
/// missing config directory falls back to memory, so this never fails.
pub fn open(backend: StorageBackend) -> Box<dyn DurableStorage> {
    if backend == StorageBackend::Keyring {
        match KeyringStorage::new() {
            Ok(storage) => return Box::new(storage),
            Err(e) => {
                warn!(error = %e, "Keyring unavailable, falling back to file storage");
            }
        }
    }

    if backend != StorageBackend::Memory {
        match FileStorage::in_config_dir() {
            Ok(storage) => return Box::new(storage),
            Err(e) => {
                warn!(error = %e, "File storage unavailable, session will not persist");
            }
        }
    }

    Box::new(MemoryStorage::new())
}
