//! Scalar operations (spec §4.3): every scalar type exposes `Set`/`Get`,
//! arithmetic or comparison ops appropriate to its kind, and a
//! compare-and-set family, all executing under the base-key lock.

use num_bigint::BigInt;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::codec::frame::DataFrame;
use crate::codec::schema;
use crate::error::{ContainerError, Error, Result};

use super::Operator;

impl Operator {
    fn get_scalar(&self, key: &str) -> Result<DataFrame> {
        let _guard = self.lock_base(key);
        self.read_frame(&schema::base(key))?
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn set_scalar(&self, key: &str, frame: DataFrame) -> Result<()> {
        let _guard = self.lock_base(key);
        self.write_frame(&schema::base(key), &frame)
    }

    /// Read-modify-write the frame at `key` under its lock, preserving its
    /// `expires_at` across the mutation (arithmetic/bitwise ops mutate a
    /// value in place; they never implicitly clear a pending TTL).
    fn update_scalar(&self, key: &str, f: impl FnOnce(DataFrame) -> Result<DataFrame>) -> Result<DataFrame> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        let current = self
            .read_frame(&base_key)?
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        let expiry = current.expires_at();
        let next = f(current)?.with_expiry(expiry);
        self.write_frame(&base_key, &next)?;
        Ok(next)
    }

    /// As [`Operator::update_scalar`], but also returns the frame as it was
    /// before the mutation (used by `Swap`).
    fn update_scalar_with_old(
        &self,
        key: &str,
        f: impl FnOnce(DataFrame) -> Result<DataFrame>,
    ) -> Result<(DataFrame, DataFrame)> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        let current = self
            .read_frame(&base_key)?
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        let expiry = current.expires_at();
        let old = current.clone();
        let next = f(current)?.with_expiry(expiry);
        self.write_frame(&base_key, &next)?;
        Ok((old, next))
    }

    /// `SetIfNil`: set only if the key is absent or currently `Null`.
    /// Returns the final stored value's frame.
    fn set_if_nil(&self, key: &str, frame: DataFrame) -> Result<DataFrame> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        match self.read_frame(&base_key)? {
            None => {
                self.write_frame(&base_key, &frame)?;
                Ok(frame)
            }
            Some(cur) if cur.is_null() => {
                let next = frame.with_expiry(cur.expires_at());
                self.write_frame(&base_key, &next)?;
                Ok(next)
            }
            Some(cur) => Ok(cur),
        }
    }

    // ---- Bool --------------------------------------------------------------

    pub fn set_bool(&self, key: &str, v: bool) -> Result<()> {
        self.set_scalar(key, DataFrame::bool(v))
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get_scalar(key)?.as_bool()
    }

    pub fn swap_bool(&self, key: &str, v: bool) -> Result<bool> {
        self.update_scalar_with_old(key, |_| Ok(DataFrame::bool(v)))?.0.as_bool()
    }

    pub fn set_bool_if_nil(&self, key: &str, v: bool) -> Result<bool> {
        self.set_if_nil(key, DataFrame::bool(v))?.as_bool()
    }

    // ---- String (code-point indexed, spec §4.3) -----------------------------

    pub fn set_string(&self, key: &str, v: impl Into<String>) -> Result<()> {
        self.set_scalar(key, DataFrame::string(v.into()))
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get_scalar(key)?.as_string().map(str::to_owned)
    }

    pub fn append_string(&self, key: &str, suffix: &str) -> Result<String> {
        self.update_scalar(key, |cur| {
            let mut s = cur.as_string()?.to_owned();
            s.push_str(suffix);
            Ok(DataFrame::string(s))
        })?
        .as_string()
        .map(str::to_owned)
    }

    pub fn prepend_string(&self, key: &str, prefix: &str) -> Result<String> {
        self.update_scalar(key, |cur| {
            let mut s = prefix.to_owned();
            s.push_str(cur.as_string()?);
            Ok(DataFrame::string(s))
        })?
        .as_string()
        .map(str::to_owned)
    }

    pub fn replace_string(&self, key: &str, from: &str, to: &str) -> Result<String> {
        self.update_scalar(key, |cur| Ok(DataFrame::string(cur.as_string()?.replace(from, to))))?
            .as_string()
            .map(str::to_owned)
    }

    pub fn upper_string(&self, key: &str) -> Result<String> {
        self.update_scalar(key, |cur| Ok(DataFrame::string(cur.as_string()?.to_uppercase())))?
            .as_string()
            .map(str::to_owned)
    }

    pub fn lower_string(&self, key: &str) -> Result<String> {
        self.update_scalar(key, |cur| Ok(DataFrame::string(cur.as_string()?.to_lowercase())))?
            .as_string()
            .map(str::to_owned)
    }

    pub fn string_contains(&self, key: &str, needle: &str) -> Result<bool> {
        Ok(self.get_scalar(key)?.as_string()?.contains(needle))
    }

    pub fn string_starts_with(&self, key: &str, prefix: &str) -> Result<bool> {
        Ok(self.get_scalar(key)?.as_string()?.starts_with(prefix))
    }

    pub fn string_ends_with(&self, key: &str, suffix: &str) -> Result<bool> {
        Ok(self.get_scalar(key)?.as_string()?.ends_with(suffix))
    }

    /// Number of Unicode scalar values, not bytes.
    pub fn string_length(&self, key: &str) -> Result<usize> {
        Ok(self.get_scalar(key)?.as_string()?.chars().count())
    }

    /// `start` must be in `[0, len)`; `len_chars` may exceed the remaining
    /// characters, in which case the result is truncated (mirrors the
    /// truncation rule spec §4.3 states explicitly for `Binary::Substring`).
    pub fn substring_string(&self, key: &str, start: usize, len_chars: usize) -> Result<String> {
        let value = self.get_scalar(key)?.as_string()?.to_owned();
        let total = value.chars().count();
        if start >= total && !(start == 0 && total == 0) {
            return Err(ContainerError::InvalidArgument(format!(
                "start {start} out of range for string of length {total}"
            ))
            .into());
        }
        Ok(value.chars().skip(start).take(len_chars).collect())
    }

    pub fn set_string_if_nil(&self, key: &str, v: impl Into<String>) -> Result<String> {
        self.set_if_nil(key, DataFrame::string(v.into()))?.as_string().map(str::to_owned)
    }

    pub fn set_string_if_greater(&self, key: &str, v: impl Into<String>) -> Result<String> {
        self.cas_string(key, v.into(), |v, cur| v > cur)
    }

    pub fn set_string_if_less(&self, key: &str, v: impl Into<String>) -> Result<String> {
        self.cas_string(key, v.into(), |v, cur| v < cur)
    }

    pub fn set_string_if_equal(&self, key: &str, v: impl Into<String>) -> Result<String> {
        self.cas_string(key, v.into(), |v, cur| v == cur)
    }

    fn cas_string(&self, key: &str, v: String, accept: impl FnOnce(&str, &str) -> bool) -> Result<String> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        match self.read_frame(&base_key)? {
            None => {
                self.write_frame(&base_key, &DataFrame::string(v.clone()))?;
                Ok(v)
            }
            Some(cur) => {
                let cur_v = cur.as_string()?.to_owned();
                if accept(&v, &cur_v) {
                    let next = DataFrame::string(v.clone()).with_expiry(cur.expires_at());
                    self.write_frame(&base_key, &next)?;
                    Ok(v)
                } else {
                    Ok(cur_v)
                }
            }
        }
    }

    pub fn swap_string(&self, key: &str, v: impl Into<String>) -> Result<String> {
        let v = v.into();
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::string(v)))?
            .0
            .as_string()
            .map(str::to_owned)
    }

    // ---- Binary --------------------------------------------------------------

    pub fn set_binary(&self, key: &str, v: Vec<u8>) -> Result<()> {
        self.set_scalar(key, DataFrame::binary(v))
    }

    pub fn get_binary(&self, key: &str) -> Result<Vec<u8>> {
        self.get_scalar(key)?.as_binary().map(<[u8]>::to_vec)
    }

    pub fn append_binary(&self, key: &str, suffix: &[u8]) -> Result<Vec<u8>> {
        self.update_scalar(key, |cur| {
            let mut v = cur.as_binary()?.to_vec();
            v.extend_from_slice(suffix);
            Ok(DataFrame::binary(v))
        })?
        .as_binary()
        .map(<[u8]>::to_vec)
    }

    pub fn prepend_binary(&self, key: &str, prefix: &[u8]) -> Result<Vec<u8>> {
        self.update_scalar(key, |cur| {
            let mut v = prefix.to_vec();
            v.extend_from_slice(cur.as_binary()?);
            Ok(DataFrame::binary(v))
        })?
        .as_binary()
        .map(<[u8]>::to_vec)
    }

    pub fn binary_length(&self, key: &str) -> Result<usize> {
        Ok(self.get_scalar(key)?.as_binary()?.len())
    }

    pub fn substring_binary(&self, key: &str, start: usize, len: usize) -> Result<Vec<u8>> {
        let value = self.get_scalar(key)?.as_binary()?.to_vec();
        if start >= value.len() && !value.is_empty() {
            return Err(ContainerError::InvalidArgument(format!(
                "start {start} out of range for binary of length {}",
                value.len()
            ))
            .into());
        }
        let end = (start + len).min(value.len());
        Ok(value[start.min(value.len())..end].to_vec())
    }

    pub fn binary_equal(&self, key: &str, other: &[u8]) -> Result<bool> {
        Ok(self.get_scalar(key)?.as_binary()? == other)
    }

    pub fn binary_compare(&self, key: &str, other: &[u8]) -> Result<std::cmp::Ordering> {
        Ok(self.get_scalar(key)?.as_binary()?.cmp(other))
    }

    pub fn binary_contains(&self, key: &str, needle: &[u8]) -> Result<bool> {
        let value = self.get_scalar(key)?.as_binary()?.to_vec();
        Ok(contains_subslice(&value, needle))
    }

    pub fn binary_index(&self, key: &str, needle: &[u8]) -> Result<Option<usize>> {
        let value = self.get_scalar(key)?.as_binary()?.to_vec();
        Ok(find_subslice(&value, needle))
    }

    pub fn reverse_binary(&self, key: &str) -> Result<Vec<u8>> {
        self.update_scalar(key, |cur| {
            let mut v = cur.as_binary()?.to_vec();
            v.reverse();
            Ok(DataFrame::binary(v))
        })?
        .as_binary()
        .map(<[u8]>::to_vec)
    }

    pub fn set_binary_if_nil(&self, key: &str, v: Vec<u8>) -> Result<Vec<u8>> {
        self.set_if_nil(key, DataFrame::binary(v))?.as_binary().map(<[u8]>::to_vec)
    }

    pub fn swap_binary(&self, key: &str, v: Vec<u8>) -> Result<Vec<u8>> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::binary(v)))?
            .0
            .as_binary()
            .map(<[u8]>::to_vec)
    }

    // ---- Int -------------------------------------------------------------

    pub fn set_int(&self, key: &str, v: i64) -> Result<()> {
        self.set_scalar(key, DataFrame::int(v))
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get_scalar(key)?.as_int()
    }

    pub fn add_int(&self, key: &str, delta: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_add(delta))))?
            .as_int()
    }

    pub fn sub_int(&self, key: &str, delta: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_sub(delta))))?
            .as_int()
    }

    pub fn mul_int(&self, key: &str, factor: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_mul(factor))))?
            .as_int()
    }

    pub fn div_int(&self, key: &str, divisor: i64) -> Result<i64> {
        if divisor == 0 {
            return Err(Error::DivByZero("div_int"));
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_div(divisor))))?
            .as_int()
    }

    pub fn mod_int(&self, key: &str, divisor: i64) -> Result<i64> {
        if divisor == 0 {
            return Err(Error::DivByZero("mod_int"));
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_rem(divisor))))?
            .as_int()
    }

    pub fn neg_int(&self, key: &str) -> Result<i64> {
        self.update_scalar(key, |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_neg())))?.as_int()
    }

    pub fn abs_int(&self, key: &str) -> Result<i64> {
        self.update_scalar(key, |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_abs())))?.as_int()
    }

    pub fn and_int(&self, key: &str, mask: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()? & mask)))?.as_int()
    }

    pub fn or_int(&self, key: &str, mask: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()? | mask)))?.as_int()
    }

    pub fn xor_int(&self, key: &str, mask: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()? ^ mask)))?.as_int()
    }

    /// Shift amounts are bounded to `[0, 63]` (spec §4.3).
    pub fn shl_int(&self, key: &str, amount: u32) -> Result<i64> {
        if amount > 63 {
            return Err(ContainerError::InvalidArgument(format!("shift amount {amount} out of [0, 63]")).into());
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_shl(amount))))?
            .as_int()
    }

    pub fn shr_int(&self, key: &str, amount: u32) -> Result<i64> {
        if amount > 63 {
            return Err(ContainerError::InvalidArgument(format!("shift amount {amount} out of [0, 63]")).into());
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::int(cur.as_int()?.wrapping_shr(amount))))?
            .as_int()
    }

    pub fn swap_int(&self, key: &str, v: i64) -> Result<i64> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::int(v)))?.0.as_int()
    }

    pub fn set_int_if_nil(&self, key: &str, v: i64) -> Result<i64> {
        self.set_if_nil(key, DataFrame::int(v))?.as_int()
    }

    pub fn set_int_if_greater(&self, key: &str, v: i64) -> Result<i64> {
        self.cas_int(key, v, |v, cur| v > cur)
    }

    pub fn set_int_if_less(&self, key: &str, v: i64) -> Result<i64> {
        self.cas_int(key, v, |v, cur| v < cur)
    }

    pub fn set_int_if_equal(&self, key: &str, v: i64) -> Result<i64> {
        self.cas_int(key, v, |v, cur| v == cur)
    }

    fn cas_int(&self, key: &str, v: i64, accept: impl FnOnce(i64, i64) -> bool) -> Result<i64> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        match self.read_frame(&base_key)? {
            None => {
                self.write_frame(&base_key, &DataFrame::int(v))?;
                Ok(v)
            }
            Some(cur) => {
                let cur_v = cur.as_int()?;
                if accept(v, cur_v) {
                    let next = DataFrame::int(v).with_expiry(cur.expires_at());
                    self.write_frame(&base_key, &next)?;
                    Ok(v)
                } else {
                    Ok(cur_v)
                }
            }
        }
    }

    // ---- Float -------------------------------------------------------------

    pub fn set_float(&self, key: &str, v: f64) -> Result<()> {
        self.set_scalar(key, DataFrame::float(v))
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get_scalar(key)?.as_float()
    }

    pub fn add_float(&self, key: &str, delta: f64) -> Result<f64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::float(cur.as_float()? + delta)))?
            .as_float()
    }

    pub fn sub_float(&self, key: &str, delta: f64) -> Result<f64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::float(cur.as_float()? - delta)))?
            .as_float()
    }

    pub fn mul_float(&self, key: &str, factor: f64) -> Result<f64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::float(cur.as_float()? * factor)))?
            .as_float()
    }

    pub fn div_float(&self, key: &str, divisor: f64) -> Result<f64> {
        if divisor == 0.0 {
            return Err(Error::DivByZero("div_float"));
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::float(cur.as_float()? / divisor)))?
            .as_float()
    }

    pub fn mod_float(&self, key: &str, divisor: f64) -> Result<f64> {
        if divisor == 0.0 {
            return Err(Error::DivByZero("mod_float"));
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::float(cur.as_float()? % divisor)))?
            .as_float()
    }

    pub fn neg_float(&self, key: &str) -> Result<f64> {
        self.update_scalar(key, |cur| Ok(DataFrame::float(-cur.as_float()?)))?.as_float()
    }

    pub fn abs_float(&self, key: &str) -> Result<f64> {
        self.update_scalar(key, |cur| Ok(DataFrame::float(cur.as_float()?.abs())))?.as_float()
    }

    pub fn swap_float(&self, key: &str, v: f64) -> Result<f64> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::float(v)))?.0.as_float()
    }

    pub fn set_float_if_nil(&self, key: &str, v: f64) -> Result<f64> {
        self.set_if_nil(key, DataFrame::float(v))?.as_float()
    }

    pub fn set_float_if_greater(&self, key: &str, v: f64) -> Result<f64> {
        self.cas_float(key, v, |v, cur| v > cur)
    }

    pub fn set_float_if_less(&self, key: &str, v: f64) -> Result<f64> {
        self.cas_float(key, v, |v, cur| v < cur)
    }

    pub fn set_float_if_equal(&self, key: &str, v: f64) -> Result<f64> {
        self.cas_float(key, v, |v, cur| v == cur)
    }

    fn cas_float(&self, key: &str, v: f64, accept: impl FnOnce(f64, f64) -> bool) -> Result<f64> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        match self.read_frame(&base_key)? {
            None => {
                self.write_frame(&base_key, &DataFrame::float(v))?;
                Ok(v)
            }
            Some(cur) => {
                let cur_v = cur.as_float()?;
                if accept(v, cur_v) {
                    let next = DataFrame::float(v).with_expiry(cur.expires_at());
                    self.write_frame(&base_key, &next)?;
                    Ok(v)
                } else {
                    Ok(cur_v)
                }
            }
        }
    }

    // ---- BigInt ------------------------------------------------------------

    pub fn set_bigint(&self, key: &str, v: &BigInt) -> Result<()> {
        self.set_scalar(key, DataFrame::bigint(v))
    }

    pub fn get_bigint(&self, key: &str) -> Result<BigInt> {
        self.get_scalar(key)?.as_bigint()
    }

    pub fn add_bigint(&self, key: &str, delta: &BigInt) -> Result<BigInt> {
        self.update_scalar(key, |cur| Ok(DataFrame::bigint(&(cur.as_bigint()? + delta))))?
            .as_bigint()
    }

    pub fn sub_bigint(&self, key: &str, delta: &BigInt) -> Result<BigInt> {
        self.update_scalar(key, |cur| Ok(DataFrame::bigint(&(cur.as_bigint()? - delta))))?
            .as_bigint()
    }

    pub fn mul_bigint(&self, key: &str, factor: &BigInt) -> Result<BigInt> {
        self.update_scalar(key, |cur| Ok(DataFrame::bigint(&(cur.as_bigint()? * factor))))?
            .as_bigint()
    }

    pub fn div_bigint(&self, key: &str, divisor: &BigInt) -> Result<BigInt> {
        if divisor == &BigInt::from(0) {
            return Err(Error::DivByZero("div_bigint"));
        }
        self.update_scalar(key, |cur| Ok(DataFrame::bigint(&(cur.as_bigint()? / divisor))))?
            .as_bigint()
    }

    pub fn mod_bigint(&self, key: &str, divisor: &BigInt) -> Result<BigInt> {
        if divisor == &BigInt::from(0) {
            return Err(Error::DivByZero("mod_bigint"));
        }
        self.update_scalar(key, |cur| Ok(DataFrame::bigint(&(cur.as_bigint()? % divisor))))?
            .as_bigint()
    }

    pub fn neg_bigint(&self, key: &str) -> Result<BigInt> {
        self.update_scalar(key, |cur| Ok(DataFrame::bigint(&(-cur.as_bigint()?))))?.as_bigint()
    }

    pub fn abs_bigint(&self, key: &str) -> Result<BigInt> {
        use num_bigint::Sign;
        self.update_scalar(key, |cur| {
            let v = cur.as_bigint()?;
            let (_, magnitude) = v.to_bytes_be();
            Ok(DataFrame::bigint(&BigInt::from_bytes_be(Sign::Plus, &magnitude)))
        })?
        .as_bigint()
    }

    pub fn swap_bigint(&self, key: &str, v: &BigInt) -> Result<BigInt> {
        let v = v.clone();
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::bigint(&v)))?.0.as_bigint()
    }

    pub fn set_bigint_if_nil(&self, key: &str, v: &BigInt) -> Result<BigInt> {
        self.set_if_nil(key, DataFrame::bigint(v))?.as_bigint()
    }

    // ---- Decimal (no arithmetic per spec §4.3; Set/Get/Swap/SetIfNil only) -

    pub fn set_decimal(&self, key: &str, v: Decimal) -> Result<()> {
        self.set_scalar(key, DataFrame::decimal(v))
    }

    pub fn get_decimal(&self, key: &str) -> Result<Decimal> {
        self.get_scalar(key)?.as_decimal()
    }

    pub fn swap_decimal(&self, key: &str, v: Decimal) -> Result<Decimal> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::decimal(v)))?.0.as_decimal()
    }

    pub fn set_decimal_if_nil(&self, key: &str, v: Decimal) -> Result<Decimal> {
        self.set_if_nil(key, DataFrame::decimal(v))?.as_decimal()
    }

    // ---- Timestamp / Duration ------------------------------------------------

    pub fn set_timestamp(&self, key: &str, nanos: i64) -> Result<()> {
        self.set_scalar(key, DataFrame::timestamp(nanos))
    }

    pub fn get_timestamp(&self, key: &str) -> Result<i64> {
        self.get_scalar(key)?.as_timestamp()
    }

    pub fn swap_timestamp(&self, key: &str, nanos: i64) -> Result<i64> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::timestamp(nanos)))?.0.as_timestamp()
    }

    pub fn set_timestamp_if_nil(&self, key: &str, nanos: i64) -> Result<i64> {
        self.set_if_nil(key, DataFrame::timestamp(nanos))?.as_timestamp()
    }

    pub fn set_duration(&self, key: &str, nanos: i64) -> Result<()> {
        self.set_scalar(key, DataFrame::duration(nanos))
    }

    pub fn get_duration(&self, key: &str) -> Result<i64> {
        self.get_scalar(key)?.as_duration()
    }

    pub fn add_duration(&self, key: &str, delta_nanos: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_add(delta_nanos))))?
            .as_duration()
    }

    pub fn sub_duration(&self, key: &str, delta_nanos: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_sub(delta_nanos))))?
            .as_duration()
    }

    pub fn mul_duration(&self, key: &str, factor: i64) -> Result<i64> {
        self.update_scalar(key, move |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_mul(factor))))?
            .as_duration()
    }

    pub fn div_duration(&self, key: &str, divisor: i64) -> Result<i64> {
        if divisor == 0 {
            return Err(Error::DivByZero("div_duration"));
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_div(divisor))))?
            .as_duration()
    }

    pub fn mod_duration(&self, key: &str, divisor: i64) -> Result<i64> {
        if divisor == 0 {
            return Err(Error::DivByZero("mod_duration"));
        }
        self.update_scalar(key, move |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_rem(divisor))))?
            .as_duration()
    }

    pub fn neg_duration(&self, key: &str) -> Result<i64> {
        self.update_scalar(key, |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_neg())))?
            .as_duration()
    }

    pub fn abs_duration(&self, key: &str) -> Result<i64> {
        self.update_scalar(key, |cur| Ok(DataFrame::duration(cur.as_duration()?.wrapping_abs())))?
            .as_duration()
    }

    pub fn swap_duration(&self, key: &str, nanos: i64) -> Result<i64> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::duration(nanos)))?.0.as_duration()
    }

    pub fn set_duration_if_nil(&self, key: &str, nanos: i64) -> Result<i64> {
        self.set_if_nil(key, DataFrame::duration(nanos))?.as_duration()
    }

    // ---- UUID ----------------------------------------------------------------

    /// Issues a time-ordered v7 UUID and stores it (spec §4.3).
    pub fn generate_uuid(&self, key: &str) -> Result<Uuid> {
        let id = Uuid::now_v7();
        self.set_scalar(key, DataFrame::uuid(id))?;
        Ok(id)
    }

    pub fn set_uuid(&self, key: &str, v: Uuid) -> Result<()> {
        self.set_scalar(key, DataFrame::uuid(v))
    }

    pub fn get_uuid(&self, key: &str) -> Result<Uuid> {
        self.get_scalar(key)?.as_uuid()
    }

    /// "Validate" means non-nil (spec §4.3): the key exists, holds a UUID
    /// frame, and that UUID is not the all-zero nil UUID.
    pub fn validate_uuid(&self, key: &str) -> Result<bool> {
        Ok(!self.get_scalar(key)?.as_uuid()?.is_nil())
    }

    pub fn swap_uuid(&self, key: &str, v: Uuid) -> Result<Uuid> {
        self.update_scalar_with_old(key, move |_| Ok(DataFrame::uuid(v)))?.0.as_uuid()
    }

    pub fn set_uuid_if_nil(&self, key: &str, v: Uuid) -> Result<Uuid> {
        self.set_if_nil(key, DataFrame::uuid(v))?.as_uuid()
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    find_subslice(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn op() -> Operator {
        Operator::new(Config::in_memory()).unwrap()
    }

    #[tokio::test]
    async fn int_arithmetic_scenario_a() {
        let op = op();
        op.set_int("x", 10).unwrap();
        assert_eq!(op.add_int("x", 5).unwrap(), 15);
        assert_eq!(op.mul_int("x", 3).unwrap(), 45);
        assert_eq!(op.mod_int("x", 7).unwrap(), 3);
        assert!(matches!(op.div_int("x", 0), Err(Error::DivByZero(_))));
    }

    #[tokio::test]
    async fn type_stickiness_is_enforced() {
        let op = op();
        op.set_int("x", 1).unwrap();
        assert!(op.get_string("x").is_err());
    }

    #[tokio::test]
    async fn string_ops_use_codepoint_indexing() {
        let op = op();
        op.set_string("s", "héllo").unwrap();
        assert_eq!(op.string_length("s").unwrap(), 5);
        assert_eq!(op.substring_string("s", 1, 2).unwrap(), "él");
    }

    #[tokio::test]
    async fn cas_set_if_greater() {
        let op = op();
        op.set_int("x", 10).unwrap();
        assert_eq!(op.set_int_if_greater("x", 5).unwrap(), 10);
        assert_eq!(op.set_int_if_greater("x", 20).unwrap(), 20);
    }

    #[tokio::test]
    async fn swap_returns_previous_value() {
        let op = op();
        op.set_int("x", 1).unwrap();
        assert_eq!(op.swap_int("x", 2).unwrap(), 1);
        assert_eq!(op.get_int("x").unwrap(), 2);
    }
}
