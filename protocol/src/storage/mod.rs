//! # Storage Module
//!
//! The object store contracts read and write through. It is deliberately
//! dumb: namespaced keys in, opaque bytes out. Typed records, defaults for
//! missing entries, and serialization belong to the contract that owns the
//! space.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs    — ObjectStore trait, Space, StoreError
//! memory.rs — In-memory store (tests, embedding)
//! db.rs     — sled-backed persistent store, one tree per space
//! ```
//!
//! ## Consistency
//!
//! Each `put` is atomic for its single key. There is no multi-key commit:
//! a caller writing two keys must be prepared for the first write to land
//! and the second to fail. Callers are expected to serialize mutating
//! operations against the same store.

pub mod db;
pub mod memory;

use std::fmt;
use std::sync::Arc;

pub use db::{DbError, KoinDB};
pub use memory::MemoryStore;

/// Errors surfaced by an [`ObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A namespace within the object store, owned by a single contract.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Space(Vec<u8>);

impl Space {
    pub fn new(name: impl Into<Vec<u8>>) -> Self {
        Self(name.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Space({})", String::from_utf8_lossy(&self.0))
    }
}

/// Namespaced key-value store.
///
/// Both operations take `&self`; implementations provide their own interior
/// synchronization so a store can be shared behind an `Arc`.
pub trait ObjectStore: Send + Sync {
    /// Read the object at `key`. `Ok(None)` means the key was never written.
    fn get(&self, space: &Space, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Write (insert or overwrite) the object at `key`.
    fn put(&self, space: &Space, key: &[u8], value: &[u8]) -> StoreResult<()>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn get(&self, space: &Space, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(space, key)
    }

    fn put(&self, space: &Space, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(space, key, value)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn get(&self, space: &Space, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        (**self).get(space, key)
    }

    fn put(&self, space: &Space, key: &[u8], value: &[u8]) -> StoreResult<()> {
        (**self).put(space, key, value)
    }
}
