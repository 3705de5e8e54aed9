//! # KoinDB — Persistent Object Store
//!
//! The sled-backed [`ObjectStore`]. Every [`Space`] maps to its own sled
//! tree, named after the space, so one contract's keys can never shadow
//! another's:
//!
//! | Tree          | Key               | Value                     |
//! |---------------|-------------------|---------------------------|
//! | `<space>`     | object key bytes  | opaque bytes (contract)   |
//!
//! Single-key writes are atomic. Durability is explicit: call
//! [`KoinDB::flush`] once a logical operation has finished writing.

use sled::Db;
use std::path::Path;

use super::{ObjectStore, Space, StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or managing the database.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// KoinDB
// ---------------------------------------------------------------------------

/// Persistent object store on top of sled.
///
/// # Thread Safety
///
/// sled trees support lock-free concurrent reads and serialized writes, and
/// `Db` is reference-counted internally. `KoinDB` is cheap to clone and can
/// be shared across threads without external synchronization.
#[derive(Debug, Clone)]
pub struct KoinDB {
    db: Db,
}

impl KoinDB {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Create a temporary database that is removed when dropped.
    pub fn open_temporary() -> DbResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn tree(&self, space: &Space) -> DbResult<sled::Tree> {
        Ok(self.db.open_tree(space.as_bytes())?)
    }

    /// Number of objects stored in `space`.
    pub fn object_count(&self, space: &Space) -> DbResult<usize> {
        Ok(self.tree(space)?.len())
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl ObjectStore for KoinDB {
    fn get(&self, space: &Space, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let tree = self.tree(space)?;
        let value = tree.get(key).map_err(DbError::from)?;
        Ok(value.map(|ivec| ivec.to_vec()))
    }

    fn put(&self, space: &Space, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let tree = self.tree(space)?;
        tree.insert(key, value).map_err(DbError::from)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
