//! Map: symmetric to [`super::set`] but each child stores a scalar
//! `DataFrame` value rather than a presence marker (spec §4.6).

use crate::codec::frame::DataFrame;
use crate::codec::primitive::PrimitiveData;
use crate::codec::schema;
use crate::error::{ContainerError, Error, Result};

use super::Operator;

impl Operator {
    pub fn map_create(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_some() {
            return Err(ContainerError::AlreadyExists(base.to_string()).into());
        }
        self.write_frame(&base_key, &DataFrame::map_meta(base, 0))
    }

    pub fn map_exists(&self, base: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        Ok(self.read_frame(&schema::base(base))?.is_some())
    }

    pub fn map_delete(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        self.map_delete_locked(base)
    }

    pub(crate) fn map_delete_locked(&self, base: &str) -> Result<()> {
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_none() {
            return Ok(());
        }
        let (lower, upper) = schema::map_item_bounds(base);
        self.delete_children(&lower, &upper)?;
        self.delete_key(&base_key)
    }

    pub fn map_clear(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let (lower, upper) = schema::map_item_bounds(base);
        self.delete_children(&lower, &upper)?;
        let expiry = self.read_frame(&base_key)?.and_then(|f| f.expires_at());
        self.write_frame(&base_key, &DataFrame::map_meta(base, 0).with_expiry(expiry))
    }

    /// Creates or overwrites `field`. New fields increment the map's count.
    pub fn map_set_key(&self, base: &str, field: &str, v: PrimitiveData) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.map_meta_locked(base, &base_key)?;
        let item_key = schema::map_item(base, field);
        let is_new = self.read_frame(&item_key)?.is_none();
        self.write_frame(&item_key, &v.to_frame())?;
        if is_new {
            let next = DataFrame::map_meta(base, meta.count + 1).with_expiry(meta_expiry(self, &base_key)?);
            self.write_frame(&base_key, &next)?;
        }
        Ok(())
    }

    pub fn map_get_key(&self, base: &str, field: &str) -> Result<PrimitiveData> {
        let _guard = self.lock_base(base);
        let frame = self
            .read_frame(&schema::map_item(base, field))?
            .ok_or_else(|| Error::NotFound(format!("{base}:{field}")))?;
        PrimitiveData::from_frame(&frame)
    }

    pub fn map_delete_key(&self, base: &str, field: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        let meta = self.map_meta_locked(base, &base_key)?;
        let item_key = schema::map_item(base, field);
        if self.read_frame(&item_key)?.is_none() {
            return Ok(());
        }
        self.delete_key(&item_key)?;
        let next = DataFrame::map_meta(base, meta.count.saturating_sub(1)).with_expiry(meta_expiry(self, &base_key)?);
        self.write_frame(&base_key, &next)
    }

    pub fn map_keys(&self, base: &str) -> Result<Vec<String>> {
        let _guard = self.lock_base(base);
        let (lower, upper) = schema::map_item_bounds(base);
        let prefix_len = lower.len();
        let mut keys = Vec::new();
        for pair in self.store.new_iter(&lower, &upper)? {
            let (key, _) = pair?;
            keys.push(String::from_utf8_lossy(&key[prefix_len..]).into_owned());
        }
        Ok(keys)
    }

    pub fn map_values(&self, base: &str) -> Result<Vec<PrimitiveData>> {
        let _guard = self.lock_base(base);
        let (lower, upper) = schema::map_item_bounds(base);
        let mut values = Vec::new();
        for pair in self.store.new_iter(&lower, &upper)? {
            let (_, bytes) = pair?;
            let (frame, _) = DataFrame::decode(&bytes)?;
            values.push(PrimitiveData::from_frame(&frame)?);
        }
        Ok(values)
    }

    pub fn map_length(&self, base: &str) -> Result<u64> {
        let _guard = self.lock_base(base);
        Ok(self
            .read_frame(&schema::base(base))?
            .ok_or_else(|| Error::NotFound(base.to_string()))?
            .as_map_meta()?
            .count)
    }

    fn map_meta_locked(&self, base: &str, base_key: &[u8]) -> Result<crate::codec::frame::CountMeta> {
        self.read_frame(base_key)?
            .ok_or_else(|| Error::NotFound(base.to_string()))?
            .as_map_meta()
    }
}

fn meta_expiry(op: &Operator, base_key: &[u8]) -> Result<Option<i64>> {
    Ok(op.read_frame(base_key)?.and_then(|f| f.expires_at()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn op() -> Operator {
        Operator::new(Config::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn set_get_and_count_fields() {
        let op = op();
        op.map_create("M").unwrap();
        op.map_set_key("M", "a", PrimitiveData::Int(1)).unwrap();
        op.map_set_key("M", "b", PrimitiveData::String("x".to_string())).unwrap();
        assert_eq!(op.map_length("M").unwrap(), 2);
        assert_eq!(op.map_get_key("M", "a").unwrap(), PrimitiveData::Int(1));

        // overwrite does not bump the count
        op.map_set_key("M", "a", PrimitiveData::Int(2)).unwrap();
        assert_eq!(op.map_length("M").unwrap(), 2);
        assert_eq!(op.map_get_key("M", "a").unwrap(), PrimitiveData::Int(2));
    }

    #[tokio::test]
    async fn delete_key_decrements_count() {
        let op = op();
        op.map_create("M").unwrap();
        op.map_set_key("M", "a", PrimitiveData::Bool(true)).unwrap();
        op.map_delete_key("M", "a").unwrap();
        assert_eq!(op.map_length("M").unwrap(), 0);
        assert!(op.map_get_key("M", "a").is_err());
    }

    #[tokio::test]
    async fn keys_and_values_reflect_contents() {
        let op = op();
        op.map_create("M").unwrap();
        op.map_set_key("M", "a", PrimitiveData::Int(1)).unwrap();
        op.map_set_key("M", "b", PrimitiveData::Int(2)).unwrap();
        let mut keys = op.map_keys("M").unwrap();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
        let mut values = op.map_values("M").unwrap();
        values.sort_by_key(|v| v.to_string());
        assert_eq!(values, vec![PrimitiveData::Int(1), PrimitiveData::Int(2)]);
    }
}
