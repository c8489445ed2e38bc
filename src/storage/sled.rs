//! Sled-backed storage backend

use super::{Storage, StorageError};
use std::path::Path;
use tracing::info;

impl From<sled::Error> for StorageError {
    fn from(e: sled::Error) -> Self {
        StorageError::Backend(Box::new(e))
    }
}

/// Embedded sled database storing values as UTF-8 bytes
///
/// Every insert is followed by a flush, so a crash loses at most the write
/// in flight.
#[derive(Clone)]
pub struct SledStorage {
    db: sled::Db,
}

impl SledStorage {
    /// Open (or create) a sled database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, e.g. because it is
    /// locked by another process.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path.as_ref())?;
        info!("Opened sled database at: {}", path.as_ref().display());
        Ok(Self { db })
    }

    /// Wrap an already open database handle
    pub fn from_db(db: sled::Db) -> Self {
        Self { db }
    }
}

impl Storage for SledStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(key.as_bytes())? {
            Some(raw) => Ok(Some(String::from_utf8(raw.to_vec())?)),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let temp = tempdir().unwrap();
        let storage = SledStorage::open(temp.path().join("kv.sled")).unwrap();

        assert_eq!(storage.get("theme").unwrap(), None);

        storage.set("theme", "\"dark\"").unwrap();
        assert_eq!(storage.get("theme").unwrap(), Some("\"dark\"".to_string()));
    }

    #[test]
    fn test_overwrite_replaces_value() {
        let temp = tempdir().unwrap();
        let storage = SledStorage::open(temp.path().join("kv.sled")).unwrap();

        storage.set("count", "1").unwrap();
        storage.set("count", "2").unwrap();
        assert_eq!(storage.get("count").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn test_from_db_shares_the_tree() {
        let temp = tempdir().unwrap();
        let db = sled::open(temp.path().join("kv.sled")).unwrap();

        let storage = SledStorage::from_db(db.clone());
        storage.set("k", "v").unwrap();

        assert_eq!(db.get(b"k").unwrap().map(|v| v.to_vec()), Some(b"v".to_vec()));
    }
}
