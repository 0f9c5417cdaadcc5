//! List: a doubly-extensible sequence addressed by `head..=tail` (spec
//! §4.4). Grounded on the teacher's `table_iter` bounded prefix scan
//! pattern (`crates/core/src/db/datastore/locking_tx_datastore`) applied
//! to the spec's own index-by-absolute-position scheme; deliberately
//! does *not* reuse that scan for `Range`/`Trim`/`Get` — the spec is
//! explicit that list indices are point gets off `head`, never a scan.

use crate::codec::frame::{DataFrame, ListMeta};
use crate::codec::primitive::PrimitiveData;
use crate::codec::schema;
use crate::error::{ContainerError, Error, Result};

use super::Operator;

impl Operator {
    pub fn list_create(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_some() {
            return Err(ContainerError::AlreadyExists(base.to_string()).into());
        }
        self.write_frame(&base_key, &DataFrame::list_meta(base, 0, -1, 0))
    }

    pub fn list_exists(&self, base: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        Ok(self.read_frame(&schema::base(base))?.is_some())
    }

    pub fn list_delete(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        self.list_delete_locked(base)
    }

    /// Assumes the caller already holds `base`'s lock (used by the TTL
    /// reaper, which validates expiry and deletes under one lock hold).
    pub(crate) fn list_delete_locked(&self, base: &str) -> Result<()> {
        let base_key = schema::base(base);
        let meta = match self.read_frame(&base_key)? {
            Some(frame) => frame.as_list_meta()?,
            None => return Ok(()),
        };
        for index in meta.head..=meta.tail {
            let _ = self.delete_key(&schema::list_item(base, index));
        }
        self.delete_key(&base_key)
    }

    pub fn list_length(&self, base: &str) -> Result<i64> {
        let _guard = self.lock_base(base);
        Ok(self.list_meta(base)?.length)
    }

    pub fn list_push_left(&self, base: &str, v: PrimitiveData) -> Result<i64> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.list_meta_locked(base, &base_key)?;
        if meta.length >= i64::MAX - 1 {
            return Err(ContainerError::InvalidArgument("list is at maximum length".to_string()).into());
        }
        let new_head = meta.head - 1;
        self.write_frame(&schema::list_item(base, new_head), &v.to_frame())?;
        let next = DataFrame::list_meta(base, new_head, meta.tail, meta.length + 1).with_expiry(self.expires_at(&base_key)?);
        self.write_frame(&base_key, &next)?;
        Ok(meta.length + 1)
    }

    pub fn list_push_right(&self, base: &str, v: PrimitiveData) -> Result<i64> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.list_meta_locked(base, &base_key)?;
        if meta.length >= i64::MAX - 1 {
            return Err(ContainerError::InvalidArgument("list is at maximum length".to_string()).into());
        }
        let new_tail = meta.tail + 1;
        self.write_frame(&schema::list_item(base, new_tail), &v.to_frame())?;
        let next = DataFrame::list_meta(base, meta.head, new_tail, meta.length + 1).with_expiry(self.expires_at(&base_key)?);
        self.write_frame(&base_key, &next)?;
        Ok(meta.length + 1)
    }

    pub fn list_pop_left(&self, base: &str) -> Result<PrimitiveData> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.list_meta_locked(base, &base_key)?;
        if meta.length == 0 {
            return Err(ContainerError::Empty(base.to_string()).into());
        }
        let item_key = schema::list_item(base, meta.head);
        let value = self
            .read_frame(&item_key)?
            .ok_or_else(|| ContainerError::Empty(base.to_string()))?;
        self.delete_key(&item_key)?;
        let next =
            DataFrame::list_meta(base, meta.head + 1, meta.tail, meta.length - 1).with_expiry(self.expires_at(&base_key)?);
        self.write_frame(&base_key, &next)?;
        PrimitiveData::from_frame(&value)
    }

    pub fn list_pop_right(&self, base: &str) -> Result<PrimitiveData> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.list_meta_locked(base, &base_key)?;
        if meta.length == 0 {
            return Err(ContainerError::Empty(base.to_string()).into());
        }
        let item_key = schema::list_item(base, meta.tail);
        let value = self
            .read_frame(&item_key)?
            .ok_or_else(|| ContainerError::Empty(base.to_string()))?;
        self.delete_key(&item_key)?;
        let next =
            DataFrame::list_meta(base, meta.head, meta.tail - 1, meta.length - 1).with_expiry(self.expires_at(&base_key)?);
        self.write_frame(&base_key, &next)?;
        PrimitiveData::from_frame(&value)
    }

    /// Negative indices count from the tail (`-1` == last element).
    pub fn list_get(&self, base: &str, index: i64) -> Result<PrimitiveData> {
        let _guard = self.lock_base(base);
        let meta = self.list_meta(base)?;
        let absolute = self.resolve_index(base, &meta, index)?;
        let frame = self
            .read_frame(&schema::list_item(base, absolute))?
            .ok_or_else(|| ContainerError::IndexOutOfRange {
                key: base.to_string(),
                index,
                head: meta.head,
                tail: meta.tail,
            })?;
        PrimitiveData::from_frame(&frame)
    }

    pub fn list_set(&self, base: &str, index: i64, v: PrimitiveData) -> Result<()> {
        let _guard = self.lock_base(base);
        let meta = self.list_meta(base)?;
        let absolute = self.resolve_index(base, &meta, index)?;
        self.write_frame(&schema::list_item(base, absolute), &v.to_frame())
    }

    /// Inclusive both ends; negative indices are relative to length; out of
    /// range clamps into `[0, length-1]`; `start > end` yields empty.
    pub fn list_range(&self, base: &str, start: i64, end: i64) -> Result<Vec<PrimitiveData>> {
        let _guard = self.lock_base(base);
        let meta = self.list_meta(base)?;
        let (start, end) = match self.clamp_range(&meta, start, end) {
            Some(bounds) => bounds,
            None => return Ok(Vec::new()),
        };
        let mut out = Vec::with_capacity((end - start + 1) as usize);
        for offset in start..=end {
            let frame = self.read_frame(&schema::list_item(base, meta.head + offset))?;
            if let Some(frame) = frame {
                out.push(PrimitiveData::from_frame(&frame)?);
            }
        }
        Ok(out)
    }

    /// Keeps `[start..=end]` after normalization, deletes every other child,
    /// rebases `head`/`tail`. Out-of-range normalization yields an empty list.
    pub fn list_trim(&self, base: &str, start: i64, end: i64) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.list_meta_locked(base, &base_key)?;
        let bounds = self.clamp_range(&meta, start, end);

        let (keep_start, keep_end) = match bounds {
            Some(bounds) => bounds,
            None => {
                for index in meta.head..=meta.tail {
                    let _ = self.delete_key(&schema::list_item(base, index));
                }
                let next = DataFrame::list_meta(base, 0, -1, 0).with_expiry(self.expires_at(&base_key)?);
                self.write_frame(&base_key, &next)?;
                return Ok(());
            }
        };

        for offset in 0..(meta.tail - meta.head + 1) {
            if offset < keep_start || offset > keep_end {
                let _ = self.delete_key(&schema::list_item(base, meta.head + offset));
            }
        }
        let new_head = meta.head + keep_start;
        let new_tail = meta.head + keep_end;
        let new_length = new_tail - new_head + 1;
        let next = DataFrame::list_meta(base, new_head, new_tail, new_length).with_expiry(self.expires_at(&base_key)?);
        self.write_frame(&base_key, &next)
    }

    /// Atomically returns all members and deletes the list. Used directly
    /// by the TTL reaper to drain a bucket's candidate keys (spec §4.9).
    pub fn list_get_all_and_delete(&self, base: &str) -> Result<Vec<PrimitiveData>> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = match self.read_frame(&base_key)? {
            Some(frame) => frame.as_list_meta()?,
            None => return Ok(Vec::new()),
        };
        let mut out = Vec::with_capacity((meta.tail - meta.head + 1).max(0) as usize);
        for index in meta.head..=meta.tail {
            let item_key = schema::list_item(base, index);
            if let Some(frame) = self.read_frame(&item_key)? {
                out.push(PrimitiveData::from_frame(&frame)?);
            }
            let _ = self.delete_key(&item_key);
        }
        self.delete_key(&base_key)?;
        Ok(out)
    }

    fn list_meta(&self, base: &str) -> Result<ListMeta> {
        self.read_frame(&schema::base(base))?
            .ok_or_else(|| Error::NotFound(base.to_string()))?
            .as_list_meta()
    }

    fn list_meta_locked(&self, base: &str, base_key: &[u8]) -> Result<ListMeta> {
        self.read_frame(base_key)?
            .ok_or_else(|| Error::NotFound(base.to_string()))?
            .as_list_meta()
    }

    fn expires_at(&self, base_key: &[u8]) -> Result<Option<i64>> {
        Ok(self.read_frame(base_key)?.and_then(|f| f.expires_at()))
    }

    fn resolve_index(&self, base: &str, meta: &ListMeta, index: i64) -> Result<i64> {
        let absolute = if index < 0 { meta.tail + index + 1 } else { meta.head + index };
        if absolute < meta.head || absolute > meta.tail {
            return Err(ContainerError::IndexOutOfRange {
                key: base.to_string(),
                index,
                head: meta.head,
                tail: meta.tail,
            }
            .into());
        }
        Ok(absolute)
    }

    /// Normalizes `start`/`end` (possibly negative, relative to `length`)
    /// into `[0, length-1]` offsets from `head`. Returns `None` if the
    /// normalized range is empty.
    fn clamp_range(&self, meta: &ListMeta, start: i64, end: i64) -> Option<(i64, i64)> {
        if meta.length == 0 {
            return None;
        }
        let normalize = |i: i64| -> i64 {
            if i < 0 {
                meta.length + i
            } else {
                i
            }
        };
        let start = normalize(start).max(0);
        let end = normalize(end).min(meta.length - 1);
        if start > end {
            return None;
        }
        Some((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn op() -> Operator {
        Operator::new(Config::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn push_pop_and_length_scenario_b() {
        let op = op();
        op.list_create("L").unwrap();
        assert_eq!(op.list_push_right("L", PrimitiveData::Int(1)).unwrap(), 1);
        assert_eq!(op.list_push_right("L", PrimitiveData::Int(2)).unwrap(), 2);
        assert_eq!(op.list_push_left("L", PrimitiveData::Int(0)).unwrap(), 3);
        assert_eq!(op.list_length("L").unwrap(), 3);
        assert_eq!(op.list_range("L", 0, -1).unwrap(), vec![
            PrimitiveData::Int(0),
            PrimitiveData::Int(1),
            PrimitiveData::Int(2)
        ]);
        assert_eq!(op.list_pop_left("L").unwrap(), PrimitiveData::Int(0));
        assert_eq!(op.list_pop_right("L").unwrap(), PrimitiveData::Int(2));
        assert_eq!(op.list_length("L").unwrap(), 1);
    }

    #[tokio::test]
    async fn negative_index_addresses_from_tail() {
        let op = op();
        op.list_create("L").unwrap();
        op.list_push_right("L", PrimitiveData::Int(10)).unwrap();
        op.list_push_right("L", PrimitiveData::Int(20)).unwrap();
        assert_eq!(op.list_get("L", -1).unwrap(), PrimitiveData::Int(20));
        assert!(op.list_get("L", 5).is_err());
    }

    #[tokio::test]
    async fn trim_keeps_inclusive_range() {
        let op = op();
        op.list_create("L").unwrap();
        for i in 0..5 {
            op.list_push_right("L", PrimitiveData::Int(i)).unwrap();
        }
        op.list_trim("L", 1, 3).unwrap();
        assert_eq!(
            op.list_range("L", 0, -1).unwrap(),
            vec![PrimitiveData::Int(1), PrimitiveData::Int(2), PrimitiveData::Int(3)]
        );
    }

    #[tokio::test]
    async fn get_all_and_delete_drains_and_removes() {
        let op = op();
        op.list_create("L").unwrap();
        op.list_push_right("L", PrimitiveData::Int(1)).unwrap();
        op.list_push_right("L", PrimitiveData::Int(2)).unwrap();
        let drained = op.list_get_all_and_delete("L").unwrap();
        assert_eq!(drained, vec![PrimitiveData::Int(1), PrimitiveData::Int(2)]);
        assert!(!op.list_exists("L").unwrap());
    }
}
