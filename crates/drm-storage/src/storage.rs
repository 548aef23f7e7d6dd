use std::path::Path;

use crate::errors::{Result, StorageError};

/// Durable, crash-safe key/value façade backed by `sled`.
///
/// `sled::Db::open` already enforces one process per directory via an
/// advisory lock file; we surface a lock conflict as `AlreadyOpen` rather
/// than a raw database error.
pub struct KvStore {
    db: sled::Db,
}

impl KvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| match &e {
            sled::Error::Io(io) if io.to_string().to_lowercase().contains("lock") => {
                StorageError::AlreadyOpen(path.display().to_string())
            }
            _ => StorageError::Database(e),
        })?;
        Ok(Self { db })
    }

    /// Atomic at key granularity; flushes so the write survives a crash.
    pub fn save(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|ivec| ivec.to_vec()))
    }

    /// Iterate all values whose key starts with `prefix`.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.db
            .scan_prefix(prefix)
            .map(|entry| entry.map(|(k, v)| (k.to_vec(), v.to_vec())))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StorageError::from)
    }

    pub fn close(self) {
        // dropping `self.db` flushes and releases sled's directory lock.
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        store.save(b"k", b"v").unwrap();
        assert_eq!(store.load(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        assert_eq!(store.load(b"missing").unwrap(), None);
    }

    #[test]
    fn scan_prefix_finds_matching_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        store.save(b"block-aa", b"1").unwrap();
        store.save(b"block-bb", b"2").unwrap();
        store.save(b"latest-block", b"aa").unwrap();

        let mut entries = store.scan_prefix(b"block-").unwrap();
        entries.sort();
        assert_eq!(entries.len(), 2);
    }
}
