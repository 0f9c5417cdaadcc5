//! The ordered byte-level store this crate consumes as an external collaborator
//! (spec §1). Callers only ever see [`Store`]; the actual engine (in-memory or
//! `sled`-backed) is chosen at construction time via [`crate::config::Backend`].

pub mod memory;
pub mod sled_store;

use crate::error::Result;

/// Options accepted by mutating calls. `sync` requests the backend flush the
/// write to stable storage before returning; the in-memory backend ignores it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteOptions {
    pub sync: bool,
}

/// A single (key, value) pair yielded by [`Store::new_iter`].
pub type KvPair = (Vec<u8>, Vec<u8>);

/// An ascending stream of key-value pairs bounded to the range passed to
/// [`Store::new_iter`]. Each item may fail independently (e.g. a corrupt
/// on-disk page), matching `sled`'s own iterator contract.
pub type StoreIter<'a> = Box<dyn Iterator<Item = Result<KvPair>> + 'a>;

/// The minimal ordered key-value contract the core needs from its backing
/// engine: point get/set/delete and ascending bounded-range iteration.
pub trait Store: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn set(&self, key: &[u8], value: &[u8], opts: WriteOptions) -> Result<()>;
    fn delete(&self, key: &[u8], opts: WriteOptions) -> Result<()>;

    /// Ascending iteration over `[lower_bound, upper_bound)`.
    fn new_iter<'a>(&'a self, lower_bound: &[u8], upper_bound: &[u8]) -> Result<StoreIter<'a>>;

    fn close(&self) -> Result<()>;
}
