//! Patient store
//!
//! The whole collection is the unit of persistence: every operation loads
//! the file, works on an in-memory copy, and (for writes) saves the whole
//! collection back. A single `RwLock` serializes writers so that concurrent
//! read-modify-write sequences cannot overwrite each other.

mod persistence;
pub use persistence::PersistenceManager;

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

use crate::config::StorageConfig;
use crate::patient::PatientRecord;

/// Identifier -> stored record. Ordered so listings and sort ties are stable.
pub type Collection = BTreeMap<String, PatientRecord>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug)]
pub struct PatientStore {
    persistence: PersistenceManager,
    lock: RwLock<()>,
}

impl PatientStore {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let persistence = PersistenceManager::new(&config.path)?;
        log::info!("Patient store at {}", persistence.path().display());

        Ok(PatientStore {
            persistence,
            lock: RwLock::new(()),
        })
    }

    /// Run `f` against a freshly loaded snapshot of the collection.
    pub fn read<T>(&self, f: impl FnOnce(&Collection) -> T) -> Result<T, StorageError> {
        let _guard = self.lock.read().map_err(|_| StorageError::LockPoisoned)?;
        let collection = self.persistence.load()?;
        Ok(f(&collection))
    }

    /// Load, apply `f`, and save, all under the exclusive lock.
    ///
    /// Nothing is written when `f` fails.
    pub fn update<T, E>(&self, f: impl FnOnce(&mut Collection) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let _guard = self.lock.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut collection = self.persistence.load()?;

        let result = f(&mut collection)?;

        self.persistence.save(&collection)?;
        Ok(result)
    }
}
