//! BloomFilter (dedup variant, spec §4.8): despite the name this is
//! exact-match deduplication with per-item overhead, not a probabilistic
//! filter — the stored slot vector is recomputed and compared byte-for-byte
//! on `Contains`, so it never produces a false positive. Preserved as
//! specified; see `DESIGN.md` for why this isn't "fixed" to be a real
//! Bloom filter.

use crate::codec::frame::DataFrame;
use crate::codec::schema;
use crate::error::{ContainerError, Error, Result};

use super::Operator;

const GOLDEN_RATIO: u64 = 0x9e3779b97f4a7c15;
const SLOT_MODULUS: u64 = 1_000_000;

fn fnv64a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// `slots` positions, each a big-endian `u32` (spec §3/§4.8's child-record
/// layout); every position is already reduced `% SLOT_MODULUS` so it fits.
fn slot_vector(item: &str, salt: &str, slots: u32) -> Vec<u8> {
    let mut seed = item.as_bytes().to_vec();
    seed.extend_from_slice(salt.as_bytes());
    let base = fnv64a(&seed);
    let mut out = Vec::with_capacity(slots as usize * 4);
    for i in 0..slots as u64 {
        let position = base.wrapping_add(GOLDEN_RATIO.wrapping_mul(i)) % SLOT_MODULUS;
        out.extend((position as u32).to_be_bytes());
    }
    out
}

impl Operator {
    /// `slots` is clamped to `{3,4,5}` (default 3).
    pub fn bloom_create(&self, base: &str, slots: u32) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_some() {
            return Err(ContainerError::AlreadyExists(base.to_string()).into());
        }
        let slots = slots.clamp(3, 5);
        let salt = uuid::Uuid::now_v7().to_string();
        self.write_frame(&base_key, &DataFrame::bloom_meta(base, slots, &salt, 0))
    }

    pub fn bloom_exists(&self, base: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        Ok(self.read_frame(&schema::base(base))?.is_some())
    }

    pub fn bloom_delete(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        self.bloom_delete_locked(base)
    }

    pub(crate) fn bloom_delete_locked(&self, base: &str) -> Result<()> {
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_none() {
            return Ok(());
        }
        let (lower, upper) = schema::bloom_item_bounds(base);
        self.delete_children(&lower, &upper)?;
        self.delete_key(&base_key)
    }

    pub fn bloom_clear(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.bloom_meta_locked(base, &base_key)?;
        let (lower, upper) = schema::bloom_item_bounds(base);
        self.delete_children(&lower, &upper)?;
        let expiry = self.read_frame(&base_key)?.and_then(|f| f.expires_at());
        let next = DataFrame::bloom_meta(base, meta.slots, &meta.salt, 0).with_expiry(expiry);
        self.write_frame(&base_key, &next)
    }

    pub fn bloom_add(&self, base: &str, item: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.bloom_meta_locked(base, &base_key)?;
        let item_key = schema::bloom_item(base, item);
        let vector = slot_vector(item, &meta.salt, meta.slots);
        self.write_frame(&item_key, &DataFrame::binary(vector))?;
        let next = DataFrame::bloom_meta(base, meta.slots, &meta.salt, meta.count + 1)
            .with_expiry(self.read_frame(&base_key)?.and_then(|f| f.expires_at()));
        self.write_frame(&base_key, &next)
    }

    /// Recomputes the slot vector for `item` and compares it byte-for-byte
    /// against what's stored; exact-match dedup, not probabilistic membership.
    pub fn bloom_contains(&self, base: &str, item: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        let meta = self.bloom_meta(base)?;
        let stored = self.read_frame(&schema::bloom_item(base, item))?;
        match stored {
            None => Ok(false),
            Some(frame) => {
                let expected = slot_vector(item, &meta.salt, meta.slots);
                Ok(frame.as_binary()? == expected.as_slice())
            }
        }
    }

    pub fn bloom_count(&self, base: &str) -> Result<u64> {
        let _guard = self.lock_base(base);
        Ok(self.bloom_meta(base)?.count)
    }

    fn bloom_meta(&self, base: &str) -> Result<crate::codec::frame::BloomMeta> {
        self.read_frame(&schema::base(base))?
            .ok_or_else(|| Error::NotFound(base.to_string()))?
            .as_bloom_meta()
    }

    fn bloom_meta_locked(&self, base: &str, base_key: &[u8]) -> Result<crate::codec::frame::BloomMeta> {
        self.read_frame(base_key)?
            .ok_or_else(|| Error::NotFound(base.to_string()))?
            .as_bloom_meta()
    }
}
