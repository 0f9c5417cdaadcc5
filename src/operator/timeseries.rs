//! TimeSeries: an append-mostly sequence of scalar points ordered by a
//! nanosecond timestamp (spec §4.7). `Delete` removes metadata only —
//! orphaned points are left behind, an Open Question the spec preserves
//! as-is (see `DESIGN.md`).

use std::collections::BTreeMap;

use tracing::warn;

use crate::codec::frame::DataFrame;
use crate::codec::primitive::PrimitiveData;
use crate::codec::schema;
use crate::error::{ContainerError, Error, Result};

use super::Operator;

impl Operator {
    pub fn ts_create(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        let base_key = schema::base(base);
        if self.read_frame(&base_key)?.is_some() {
            return Err(ContainerError::AlreadyExists(base.to_string()).into());
        }
        self.write_frame(&base_key, &DataFrame::timeseries_meta(base))
    }

    pub fn ts_exists(&self, base: &str) -> Result<bool> {
        let _guard = self.lock_base(base);
        Ok(self.read_frame(&schema::base(base))?.is_some())
    }

    /// Removes the metadata frame only; existing points at `base:{:ts:}:*`
    /// are not scanned or deleted (spec §9 Open Question, preserved as-is).
    pub fn ts_delete(&self, base: &str) -> Result<()> {
        let _guard = self.lock_base(base);
        self.ts_delete_locked(base)
    }

    pub(crate) fn ts_delete_locked(&self, base: &str) -> Result<()> {
        warn!(base, "deleting timeseries metadata; any existing points are left orphaned");
        self.delete_key(&schema::base(base))
    }

    pub fn ts_add_point(&self, base: &str, ts_nanos: u64, v: PrimitiveData) -> Result<()> {
        let _guard = self.lock_base(base);
        self.read_frame(&schema::base(base))?
            .ok_or_else(|| Error::NotFound(base.to_string()))?;
        self.write_frame(&schema::ts_point(base, ts_nanos), &v.to_frame())
    }

    pub fn ts_get_point(&self, base: &str, ts_nanos: u64) -> Result<PrimitiveData> {
        let _guard = self.lock_base(base);
        let frame = self
            .read_frame(&schema::ts_point(base, ts_nanos))?
            .ok_or_else(|| Error::NotFound(format!("{base}@{ts_nanos}")))?;
        PrimitiveData::from_frame(&frame)
    }

    pub fn ts_delete_point(&self, base: &str, ts_nanos: u64) -> Result<()> {
        let _guard = self.lock_base(base);
        self.delete_key(&schema::ts_point(base, ts_nanos))
    }

    /// Ordered prefix iteration bounded by `[base:{:ts:}:, base:{:ts:}:\xff]`,
    /// filtered to `[start_ts, end_ts]` inclusive. Points are visited in
    /// ascending timestamp order (the big-endian key encoding preserves
    /// numeric order), though the returned container is an unordered map.
    pub fn ts_range(&self, base: &str, start_ts: u64, end_ts: u64) -> Result<BTreeMap<u64, PrimitiveData>> {
        let _guard = self.lock_base(base);
        let (lower, upper) = schema::ts_range_bounds(base);
        let prefix_len = lower.len();
        let mut out = BTreeMap::new();
        for pair in self.store.new_iter(&lower, &upper)? {
            let (key, bytes) = pair?;
            if key.len() < prefix_len + 8 {
                continue;
            }
            let ts = u64::from_be_bytes(key[prefix_len..prefix_len + 8].try_into().unwrap());
            if ts < start_ts || ts > end_ts {
                continue;
            }
            let (frame, _) = DataFrame::decode(&bytes)?;
            out.insert(ts, PrimitiveData::from_frame(&frame)?);
        }
        Ok(out)
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
    async fn add_and_range_scenario_d() {
        let op = op();
        op.ts_create("T").unwrap();
        op.ts_add_point("T", 100, PrimitiveData::Float(1.0)).unwrap();
        op.ts_add_point("T", 200, PrimitiveData::Float(2.0)).unwrap();
        op.ts_add_point("T", 300, PrimitiveData::Float(3.0)).unwrap();
        let points = op.ts_range("T", 150, 250).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[&200], PrimitiveData::Float(2.0));
    }

    #[tokio::test]
    async fn get_and_delete_point() {
        let op = op();
        op.ts_create("T").unwrap();
        op.ts_add_point("T", 5, PrimitiveData::Int(9)).unwrap();
        assert_eq!(op.ts_get_point("T", 5).unwrap(), PrimitiveData::Int(9));
        op.ts_delete_point("T", 5).unwrap();
        assert!(op.ts_get_point("T", 5).is_err());
    }

    #[tokio::test]
    async fn delete_only_removes_metadata() {
        let op = op();
        op.ts_create("T").unwrap();
        op.ts_add_point("T", 5, PrimitiveData::Int(9)).unwrap();
        op.ts_delete("T").unwrap();
        assert!(!op.ts_exists("T").unwrap());
        // the orphaned point is still directly readable, per the Open Question.
        assert!(op
            .read_frame(&schema::ts_point("T", 5))
            .unwrap()
            .is_some());
    }
}
