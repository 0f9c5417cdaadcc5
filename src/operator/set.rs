//! Set: an unordered collection of string members (spec §4.5). Members
//! are strings only; callers coerce other primitives to their string
//! form before calling in, a deliberate fidelity loss the spec calls out
//! explicitly.

use crate::codec::frame::DataFrame;
use crate::codec::schema;
use crate::error::{ContainerError, Result};

use super::Operator;

impl Operator {
    pub fn set_create(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_some() {
            return Err(ContainerError::AlreadyExists(base.to_string()).into());
        }
        self.write_frame(&base_key, &DataFrame::set_meta(base, 0))
    }

    pub fn set_exists(&self, base: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        Ok(self.read_frame(&schema::base(base))?.is_some())
    }

    pub fn set_delete(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        self.set_delete_locked(base)
    }

    pub(crate) fn set_delete_locked(&self, base: &str) -> Result<()> {
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_none() {
            return Ok(());
        }
        let (lower, upper) = schema::set_item_bounds(base);
        self.delete_children(&lower, &upper)?;
        self.delete_key(&base_key)
    }

    pub fn set_clear(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let (lower, upper) = schema::set_item_bounds(base);
        self.delete_children(&lower, &upper)?;
        let expiry = self.read_frame(&base_key)?.and_then(|f| f.expires_at());
        self.write_frame(&base_key, &DataFrame::set_meta(base, 0).with_expiry(expiry))
    }

    /// Adds `member`; no-op if already present. Returns the new cardinality.
    pub fn set_add(&self, base: &str, member: &str) -> Result<u64> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.set_meta_locked(base, &base_key)?;
        let item_key = schema::set_item(base, member);
        if self.read_frame(&item_key)?.is_some() {
            return Ok(meta.count);
        }
        self.write_frame(&item_key, &DataFrame::null())?;
        let next_count = meta.count + 1;
        let next = DataFrame::set_meta(base, next_count).with_expiry(self.read_frame(&base_key)?.and_then(|f| f.expires_at()));
        self.write_frame(&base_key, &next)?;
        Ok(next_count)
    }

    /// Removes `member` if present. Returns the new cardinality.
    pub fn set_remove(&self, base: &str, member: &str) -> Result<u64> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.set_meta_locked(base, &base_key)?;
        let item_key = schema::set_item(base, member);
        if self.read_frame(&item_key)?.is_none() {
            return Ok(meta.count);
        }
        self.delete_key(&item_key)?;
        let next_count = meta.count.saturating_sub(1);
        let next = DataFrame::set_meta(base, next_count).with_expiry(self.read_frame(&base_key)?.and_then(|f| f.expires_at()));
        self.write_frame(&base_key, &next)?;
        Ok(next_count)
    }

    pub fn set_contains(&self, base: &str, member: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        Ok(self.read_frame(&schema::set_item(base, member))?.is_some())
    }

    pub fn set_cardinality(&self, base: &str) -> Result<u64> {
        let _guard = self.lock_base(base);
        Ok(self.set_meta(base)?.count)
    }

    pub fn set_members(&self, base: &str) -> Result<Vec<String>> {
        let _guard = self.lock_base(base);
        let (lower, upper) = schema::set_item_bounds(base);
        let prefix_len = lower.len();
        let mut members = Vec::new();
        for pair in self.store.new_iter(&lower, &upper)? {
            let (key, _) = pair?;
            members.push(String::from_utf8_lossy(&key[prefix_len..]).into_owned());
        }
        Ok(members)
    }

    fn set_meta(&self, base: &str) -> Result<crate::codec::frame::CountMeta> {
        self.read_frame(&schema::base(base))?
            .ok_or_else(|| crate::error::Error::NotFound(base.to_string()))?
            .as_set_meta()
    }

    fn set_meta_locked(&self, base: &str, base_key: &[u8]) -> Result<crate::codec::frame::CountMeta> {
        self.read_frame(base_key)?
            .ok_or_else(|| crate::error::Error::NotFound(base.to_string()))?
            .as_set_meta()
    }
}
