//! The public façade (spec §2, §4.3–§4.10). Owns the store handle, the
//! [`KeyLocker`] and the TTL reaper task, exactly as the teacher's
//! `RelationalDB` (`crates/core/src/db/relational_db.rs`) owns its
//! datastore, durability worker and metrics queue.

pub mod bloom;
pub mod list;
pub mod map;
pub mod scalar;
pub mod set;
pub mod timeseries;
pub mod ttl;

use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::codec::frame::{DataFrame, FrameType};
use crate::codec::schema;
use crate::config::{Backend, Config};
use crate::error::Result;
use crate::locker::{KeyGuard, KeyLocker};
use crate::store::memory::MemoryStore;
use crate::store::sled_store::SledStore;
use crate::store::{Store, WriteOptions};
use crate::time::CachedClock;

/// The typed-value façade over an ordered byte-key store (spec §1).
///
/// Every public call acquires the affected key's lock, reads the base-key
/// frame, validates its type tag, mutates, writes back, and releases the
/// lock (spec §2's data flow). `Operator` is safe for concurrent use from
/// many threads; the only suspension points are store I/O and `KeyLocker`
/// contention (spec §5).
pub struct Operator {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) locker: Arc<KeyLocker>,
    pub(crate) clock: Arc<CachedClock>,
    pub(crate) config: Config,
    shutdown_tx: watch::Sender<bool>,
    background: SyncMutex<Vec<JoinHandle<()>>>,
}

impl Operator {
    /// Construct an `Operator` and start its cached clock and TTL reaper.
    /// Must be called from within a running Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        let store: Arc<dyn Store> = match config.fs {
            Backend::InMemory => Arc::new(MemoryStore::new()),
            Backend::OnDisk => Arc::new(SledStore::open(&config.path, config.cache_size)?),
        };

        let (clock, clock_handle) = CachedClock::start(config.ttl_precision);
        let clock = Arc::new(clock);
        let locker = Arc::new(KeyLocker::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reaper_handle = ttl::spawn_reaper(store.clone(), locker.clone(), clock.clone(), config.clone(), shutdown_rx);

        let operator = Self {
            store,
            locker,
            clock,
            config,
            shutdown_tx,
            background: SyncMutex::new(vec![clock_handle, reaper_handle]),
        };

        Ok(operator)
    }

    /// Cached wall-clock reading (spec §4.9: `SetTTL` takes an absolute
    /// expiry, so callers need "now" to compute one). Refreshed by a
    /// background task at `min(1s, ttl_precision)`; never drifts more than
    /// that.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Stop the background clock and reaper tasks and close the store.
    /// Mirrors the teacher's ticker-stop-on-close discipline (spec §5,
    /// "The reaper loop terminates when its ticker is stopped during
    /// Operator close").
    pub fn close(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(true);
        for handle in self.background.lock().drain(..) {
            handle.abort();
        }
        self.store.close()
    }

    pub(crate) fn lock_base(&self, key: &str) -> KeyGuard<'_> {
        self.locker.lock(&schema::base(key))
    }

    pub(crate) fn read_frame(&self, key: &[u8]) -> Result<Option<DataFrame>> {
        match self.store.get(key)? {
            None => Ok(None),
            Some(bytes) => {
                let (frame, _) = DataFrame::decode(&bytes)?;
                Ok(Some(frame))
            }
        }
    }

    pub(crate) fn write_frame(&self, key: &[u8], frame: &DataFrame) -> Result<()> {
        self.store.set(key, &frame.encode_to_vec(), WriteOptions::default())
    }

    pub(crate) fn delete_key(&self, key: &[u8]) -> Result<()> {
        self.store.delete(key, WriteOptions::default())
    }

    /// Deletes `key` using the type-aware deleter (spec §4.9, §4.10):
    /// containers clean up their children, scalars are a plain point
    /// delete. Assumes the caller already holds `key`'s lock.
    pub(crate) fn delete_typed_locked(&self, key: &str) -> Result<()> {
        let base_key = schema::base(key);
        let frame = match self.read_frame(&base_key)? {
            Some(frame) => frame,
            None => return Ok(()),
        };
        match frame.frame_type() {
            FrameType::List => self.list_delete_locked(key),
            FrameType::Set => self.set_delete_locked(key),
            FrameType::Map => self.map_delete_locked(key),
            FrameType::Timeseries => self.ts_delete_locked(key),
            FrameType::BloomFilter => self.bloom_delete_locked(key),
            _ => self.delete_key(&base_key),
        }
    }

    /// Best-effort deletion of every sub-key tagged `marker` under `base`.
    /// Bounded ordered prefix iteration, point delete per child; partial
    /// failure is tolerated and logged, never aborts the overall delete
    /// (spec §4.10, §7).
    pub(crate) fn delete_children(&self, lower: &[u8], upper: &[u8]) -> Result<()> {
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = self.store.new_iter(lower, upper)?.collect::<Result<Vec<_>>>()?;
        for (child_key, _) in pairs {
            if let Err(err) = self.delete_key(&child_key) {
                warn!(key = %String::from_utf8_lossy(&child_key), error = %err, "failed to delete child record, continuing");
            }
        }
        Ok(())
    }
}
