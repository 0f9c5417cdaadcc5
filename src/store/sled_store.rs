use std::path::Path;

use sled::Mode::HighThroughput;

use super::{Store, StoreIter, WriteOptions};
use crate::error::Result;

/// An on-disk ordered store backed by `sled`.
///
/// Grounded on `SledObjectDB` (teacher's `db/ostorage/sled_object_db.rs`);
/// unlike the teacher's hash-addressed blob store, `sled::Tree` is already
/// key-ordered, so `new_iter` is a thin wrapper over `Tree::range` rather
/// than needing a secondary index.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    pub fn open(path: impl AsRef<Path>, cache_size: Option<u64>) -> Result<Self> {
        let mut config = sled::Config::default().path(path).mode(HighThroughput);
        if let Some(cache_size) = cache_size {
            config = config.cache_capacity(cache_size);
        }
        let db = config.open()?;
        log::debug!("opened sled store at {:?}", db.was_recovered());
        Ok(Self { db })
    }
}

impl Store for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&self, key: &[u8], value: &[u8], opts: WriteOptions) -> Result<()> {
        self.db.insert(key, value)?;
        if opts.sync {
            self.db.flush()?;
        }
        Ok(())
    }

    fn delete(&self, key: &[u8], opts: WriteOptions) -> Result<()> {
        self.db.remove(key)?;
        if opts.sync {
            self.db.flush()?;
        }
        Ok(())
    }

    fn new_iter<'a>(&'a self, lower_bound: &[u8], upper_bound: &[u8]) -> Result<StoreIter<'a>> {
        let iter = self
            .db
            .range(lower_bound.to_vec()..upper_bound.to_vec())
            .map(|entry| entry.map(|(k, v)| (k.to_vec(), v.to_vec())).map_err(Into::into));
        Ok(Box::new(iter))
    }

    fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_DB_DIR_PREFIX: &str = "tower_kv_sled_test";

    fn setup() -> (SledStore, TempDir) {
        let tmp_dir = TempDir::with_prefix(TEST_DB_DIR_PREFIX).unwrap();
        let store = SledStore::open(tmp_dir.path(), None).unwrap();
        (store, tmp_dir)
    }

    #[test]
    fn get_set_delete_roundtrip() {
        let (store, _tmp) = setup();
        assert!(store.get(b"a").unwrap().is_none());
        store.set(b"a", b"1", WriteOptions { sync: true }).unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a", WriteOptions::default()).unwrap();
        assert!(store.get(b"a").unwrap().is_none());
    }

    #[test]
    fn bounded_iteration_is_ascending() {
        let (store, _tmp) = setup();
        for k in [b"a:1".as_slice(), b"a:2", b"a:3", b"b:1"] {
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
