//! In-memory [`ObjectStore`].
//!
//! Clones share the same underlying map, so a test can hand one clone to a
//! contract and keep another to inspect what was written.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ObjectStore, Space, StoreResult};

type Objects = BTreeMap<(Space, Vec<u8>), Vec<u8>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<RwLock<Objects>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects across all spaces.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Number of objects stored in `space`.
    pub fn count_in(&self, space: &Space) -> usize {
        self.objects
            .read()
            .keys()
            .filter(|(s, _)| s == space)
            .count()
    }
}

impl ObjectStore for MemoryStore {
    fn get(&self, space: &Space, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .read()
            .get(&(space.clone(), key.to_vec()))
            .cloned())
    }

    fn put(&self, space: &Space, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.objects
            .write()
            .insert((space.clone(), key.to_vec()), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get(&Space::new("koin"), b"alice").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn spaces_are_isolated() {
        let store = MemoryStore::new();
        let a = Space::new("a");
        let b = Space::new("b");

        store.put(&a, b"key", b"one").unwrap();
        store.put(&b, b"key", b"two").unwrap();

        assert_eq!(store.get(&a, b"key").unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get(&b, b"key").unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.count_in(&a), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let handle = store.clone();
        let space = Space::new("koin");

        store.put(&space, b"k", b"v").unwrap();
        assert_eq!(handle.get(&space, b"k").unwrap(), Some(b"v".to_vec()));

        handle.put(&space, b"k", b"w").unwrap();
        assert_eq!(store.get(&space, b"k").unwrap(), Some(b"w".to_vec()));
    }
}
