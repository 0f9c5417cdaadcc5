use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::{KvPair, Store, StoreIter, WriteOptions};
use crate::error::Result;

/// A simple in-memory ordered store, mapping keys to their contents.
///
/// Grounded on `MemoryObjectDB` (teacher's `db/ostorage/memory_object_db.rs`),
/// but keyed by ordered byte strings rather than content hashes so that
/// [`Store::new_iter`] can serve the bounded prefix scans the schema needs.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8], _opts: WriteOptions) -> Result<()> {
        self.map.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8], _opts: WriteOptions) -> Result<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn new_iter<'a>(&'a self, lower_bound: &[u8], upper_bound: &[u8]) -> Result<StoreIter<'a>> {
        let pairs: Vec<KvPair> = self
            .map
            .read()
            .range(lower_bound.to_vec()..upper_bound.to_vec())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(pairs.into_iter().map(Ok)))
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_delete_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get(b"a").unwrap().is_none());
        store.set(b"a", b"1", WriteOptions::default()).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a", WriteOptions::default()).unwrap();
        assert!(store.get(b"a").unwrap().is_none());
    }

    #[test]
    fn bounded_iteration_is_ascending() {
        let store = MemoryStore::new();
        for k in [b"a:1", b"a:2", b"a:3", b"b:1"] {
            store.set(k, b"v", WriteOptions::default()).unwrap();
        }
        let got: Vec<_> = store
            .new_iter(b"a:", b"a;")
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(got, vec![b"a:1".to_vec(), b"a:2".to_vec(), b"a:3".to_vec()]);
    }
}
