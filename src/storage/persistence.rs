use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use super::{Collection, StorageError};

/// Reads and writes the whole patient collection as one JSON document.
#[derive(Debug)]
pub struct PersistenceManager {
    path: PathBuf,
}

impl PersistenceManager {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        // Create the parent directory if it doesn't exist
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        Ok(PersistenceManager { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the collection. A file that does not exist yet is an empty store.
    pub fn load(&self) -> Result<Collection, StorageError> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Collection::new()),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .map_err(|e| StorageError::io(&self.path, e))?;

        if buffer.iter().all(u8::is_ascii_whitespace) {
            return Ok(Collection::new());
        }

        let collection = serde_json::from_slice(&buffer)?;
        Ok(collection)
    }

    /// Replace the file with `collection`.
    pub fn save(&self, collection: &Collection) -> Result<(), StorageError> {
        let serialized = serde_json::to_vec_pretty(collection)?;

        // Write to a temporary file first
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;

        file.write_all(&serialized)
            .map_err(|e| StorageError::io(&temp_path, e))?;

        // Ensure data is flushed to disk
        file.sync_all().map_err(|e| StorageError::io(&temp_path, e))?;

        // Rename over the target so readers never see a partial file
        fs::rename(&temp_path, &self.path).map_err(|e| StorageError::io(&self.path, e))?;

        Ok(())
    }
}
