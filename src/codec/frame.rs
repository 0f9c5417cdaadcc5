//! The tagged value container and its binary codec (spec §4.1).
//!
//! The manual `encode`/`decode`/`encoded_len` shape is grounded on
//! `Write::{encode,decode,encoded_len}` in the teacher's
//! `crates/core/src/db/messages/write.rs`.

use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Error, FrameError, Result, TypeMismatchErr};

/// One of the value kinds a [`DataFrame`] may hold (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Null = 0,
    Int = 1,
    Float = 2,
    Bool = 3,
    String = 4,
    Binary = 5,
    Timestamp = 6,
    Duration = 7,
    Uuid = 8,
    BigInt = 9,
    Decimal = 10,
    List = 11,
    Set = 12,
    Map = 13,
    Timeseries = 14,
    BloomFilter = 15,
    RoaringBitmap = 16,
    RoaringBitmap64 = 17,
    Shamir = 18,
}

impl FrameType {
    pub fn from_u8(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => FrameType::Null,
            1 => FrameType::Int,
            2 => FrameType::Float,
            3 => FrameType::Bool,
            4 => FrameType::String,
            5 => FrameType::Binary,
            6 => FrameType::Timestamp,
            7 => FrameType::Duration,
            8 => FrameType::Uuid,
            9 => FrameType::BigInt,
            10 => FrameType::Decimal,
            11 => FrameType::List,
            12 => FrameType::Set,
            13 => FrameType::Map,
            14 => FrameType::Timeseries,
            15 => FrameType::BloomFilter,
            16 => FrameType::RoaringBitmap,
            17 => FrameType::RoaringBitmap64,
            18 => FrameType::Shamir,
            other => return Err(FrameError::UnknownTypeTag(other).into()),
        })
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameType::Null => "Null",
            FrameType::Int => "Int",
            FrameType::Float => "Float",
            FrameType::Bool => "Bool",
            FrameType::String => "String",
            FrameType::Binary => "Binary",
            FrameType::Timestamp => "Timestamp",
            FrameType::Duration => "Duration",
            FrameType::Uuid => "UUID",
            FrameType::BigInt => "BigInt",
            FrameType::Decimal => "Decimal",
            FrameType::List => "List",
            FrameType::Set => "Set",
            FrameType::Map => "Map",
            FrameType::Timeseries => "Timeseries",
            FrameType::BloomFilter => "BloomFilter",
            FrameType::RoaringBitmap => "RoaringBitmap",
            FrameType::RoaringBitmap64 => "RoaringBitmap64",
            FrameType::Shamir => "Shamir",
        }
    }
}

/// A tagged value with an optional expiry, the unit the store persists at
/// every key (spec §3). `expires_at` is nanoseconds since the Unix epoch;
/// `None` serializes to `0`, matching the "zero means no expiration"
/// invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    frame_type: FrameType,
    payload: Vec<u8>,
    expires_at: Option<i64>,
}

const HEADER_LEN: usize = 1 + 8;

impl DataFrame {
    pub fn new(frame_type: FrameType, payload: Vec<u8>) -> Self {
        Self {
            frame_type,
            payload,
            expires_at: None,
        }
    }

    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.expires_at
    }

    pub fn with_expiry(mut self, expires_at: Option<i64>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn set_expiry(&mut self, expires_at: Option<i64>) {
        self.expires_at = expires_at;
    }

    pub fn null() -> Self {
        Self::new(FrameType::Null, Vec::new())
    }

    pub fn is_null(&self) -> bool {
        self.frame_type == FrameType::Null
    }

    // ---- constructors -----------------------------------------------------

    pub fn int(v: i64) -> Self {
        Self::new(FrameType::Int, v.to_be_bytes().to_vec())
    }

    pub fn float(v: f64) -> Self {
        Self::new(FrameType::Float, v.to_bits().to_be_bytes().to_vec())
    }

    pub fn bool(v: bool) -> Self {
        Self::new(FrameType::Bool, vec![if v { 0x01 } else { 0x00 }])
    }

    pub fn string(v: impl Into<String>) -> Self {
        Self::new(FrameType::String, v.into().into_bytes())
    }

    pub fn binary(v: Vec<u8>) -> Self {
        Self::new(FrameType::Binary, v)
    }

    pub fn timestamp(nanos: i64) -> Self {
        Self::new(FrameType::Timestamp, nanos.to_be_bytes().to_vec())
    }

    pub fn duration(nanos: i64) -> Self {
        Self::new(FrameType::Duration, nanos.to_be_bytes().to_vec())
    }

    pub fn uuid(v: Uuid) -> Self {
        Self::new(FrameType::Uuid, v.as_bytes().to_vec())
    }

    pub fn bigint(v: &BigInt) -> Self {
        let (sign, magnitude) = v.to_bytes_be();
        let mut payload = Vec::with_capacity(1 + magnitude.len());
        payload.push(if sign == Sign::Minus { 0x01 } else { 0x00 });
        payload.extend(magnitude);
        Self::new(FrameType::BigInt, payload)
    }

    pub fn decimal(v: Decimal) -> Self {
        let coefficient = BigInt::from(v.mantissa()).to_signed_bytes_be();
        let scale = v.scale();
        let mut payload = Vec::with_capacity(4 + coefficient.len() + 4);
        payload.extend((coefficient.len() as u32).to_be_bytes());
        payload.extend(&coefficient);
        payload.extend(scale.to_be_bytes());
        Self::new(FrameType::Decimal, payload)
    }

    pub fn roaring_bitmap(v: &roaring::RoaringBitmap) -> Result<Self> {
        let mut payload = Vec::new();
        v.serialize_into(&mut payload)?;
        Ok(Self::new(FrameType::RoaringBitmap, payload))
    }

    pub fn roaring_bitmap64(v: &roaring::RoaringTreemap) -> Result<Self> {
        let mut payload = Vec::new();
        v.serialize_into(&mut payload)?;
        Ok(Self::new(FrameType::RoaringBitmap64, payload))
    }

    pub fn shamir(payload: Vec<u8>) -> Self {
        Self::new(FrameType::Shamir, payload)
    }

    pub fn list_meta(prefix: &str, head: i64, tail: i64, length: i64) -> Self {
        let mut payload = Vec::with_capacity(24 + prefix.len());
        payload.extend(head.to_be_bytes());
        payload.extend(tail.to_be_bytes());
        payload.extend(length.to_be_bytes());
        payload.extend(prefix.as_bytes());
        Self::new(FrameType::List, payload)
    }

    pub fn set_meta(prefix: &str, count: u64) -> Self {
        Self::new(FrameType::Set, count_and_prefix(count, prefix))
    }

    pub fn map_meta(prefix: &str, count: u64) -> Self {
        Self::new(FrameType::Map, count_and_prefix(count, prefix))
    }

    pub fn timeseries_meta(prefix: &str) -> Self {
        Self::new(FrameType::Timeseries, prefix.as_bytes().to_vec())
    }

    /// `slots` is clamped by the caller to `[3, 5]`; `salt` is truncated or
    /// zero-padded to exactly 15 bytes to match the legacy fixed layout
    /// (spec §4.1, flagged in §9 as an Open Question to preserve as-is).
    pub fn bloom_meta(prefix: &str, slots: u32, salt: &str, count: u64) -> Self {
        let mut salt_bytes = [0u8; 15];
        let src = salt.as_bytes();
        let n = src.len().min(15);
        salt_bytes[..n].copy_from_slice(&src[..n]);

        let mut payload = Vec::with_capacity(4 + 15 + 1 + 8 + prefix.len());
        payload.extend(slots.to_be_bytes());
        payload.extend(salt_bytes);
        payload.push(b':');
        payload.extend(count.to_be_bytes());
        payload.extend(prefix.as_bytes());
        Self::new(FrameType::BloomFilter, payload)
    }

    // ---- accessors ----------------------------------------------------------

    fn expect(&self, expected: FrameType) -> Result<()> {
        if self.frame_type != expected {
            return Err(Error::TypeMismatch(TypeMismatchErr {
                expected: expected.name(),
                found: self.frame_type.name(),
            }));
        }
        Ok(())
    }

    pub fn as_int(&self) -> Result<i64> {
        self.expect(FrameType::Int)?;
        Ok(i64::from_be_bytes(read_fixed(&self.payload, "as_int", self.frame_type)?))
    }

    pub fn as_float(&self) -> Result<f64> {
        self.expect(FrameType::Float)?;
        let bits = u64::from_be_bytes(read_fixed(&self.payload, "as_float", self.frame_type)?);
        Ok(f64::from_bits(bits))
    }

    pub fn as_bool(&self) -> Result<bool> {
        self.expect(FrameType::Bool)?;
        self.payload.first().map(|b| *b != 0).ok_or_else(|| {
            FrameError::CorruptFrame {
                op: "as_bool",
                type_tag: Some(self.frame_type.to_u8()),
                expected: 1,
                found: 0,
            }
            .into()
        })
    }

    pub fn as_string(&self) -> Result<&str> {
        self.expect(FrameType::String)?;
        std::str::from_utf8(&self.payload).map_err(|_| {
            FrameError::CorruptFrame {
                op: "as_string",
                type_tag: Some(self.frame_type.to_u8()),
                expected: self.payload.len(),
                found: self.payload.len(),
            }
            .into()
        })
    }

    pub fn as_binary(&self) -> Result<&[u8]> {
        self.expect(FrameType::Binary)?;
        Ok(&self.payload)
    }

    pub fn as_timestamp(&self) -> Result<i64> {
        self.expect(FrameType::Timestamp)?;
        Ok(i64::from_be_bytes(read_fixed(&self.payload, "as_timestamp", self.frame_type)?))
    }

    pub fn as_duration(&self) -> Result<i64> {
        self.expect(FrameType::Duration)?;
        Ok(i64::from_be_bytes(read_fixed(&self.payload, "as_duration", self.frame_type)?))
    }

    pub fn as_uuid(&self) -> Result<Uuid> {
        self.expect(FrameType::Uuid)?;
        let bytes: [u8; 16] = read_fixed(&self.payload, "as_uuid", self.frame_type)?;
        Ok(Uuid::from_bytes(bytes))
    }

    pub fn as_bigint(&self) -> Result<BigInt> {
        self.expect(FrameType::BigInt)?;
        if self.payload.is_empty() {
            return Err(FrameError::CorruptFrame {
                op: "as_bigint",
                type_tag: Some(self.frame_type.to_u8()),
                expected: 1,
                found: 0,
            }
            .into());
        }
        let sign = if self.payload[0] == 0x01 { Sign::Minus } else { Sign::Plus };
        Ok(BigInt::from_bytes_be(sign, &self.payload[1..]))
    }

    pub fn as_decimal(&self) -> Result<Decimal> {
        self.expect(FrameType::Decimal)?;
        let mut cursor = &self.payload[..];
        let coefficient_len = read_u32(&mut cursor, "as_decimal", self.frame_type)? as usize;
        if cursor.len() < coefficient_len + 4 {
            return Err(FrameError::CorruptFrame {
                op: "as_decimal",
                type_tag: Some(self.frame_type.to_u8()),
                expected: coefficient_len + 4,
                found: cursor.len(),
            }
            .into());
        }
        let coefficient_bytes = &cursor[..coefficient_len];
        cursor = &cursor[coefficient_len..];
        let coefficient = BigInt::from_signed_bytes_be(coefficient_bytes);
        let scale = read_u32(&mut cursor, "as_decimal", self.frame_type)?;
        let mantissa: i128 = coefficient.to_i128().ok_or_else(|| FrameError::CorruptFrame {
            op: "as_decimal",
            type_tag: Some(self.frame_type.to_u8()),
            expected: 16,
            found: coefficient_len,
        })?;
        Ok(Decimal::from_i128_with_scale(mantissa, scale))
    }

    pub fn as_roaring_bitmap(&self) -> Result<roaring::RoaringBitmap> {
        self.expect(FrameType::RoaringBitmap)?;
        roaring::RoaringBitmap::deserialize_from(&self.payload[..]).map_err(|_| {
            FrameError::CorruptFrame {
                op: "as_roaring_bitmap",
                type_tag: Some(self.frame_type.to_u8()),
                expected: self.payload.len(),
                found: self.payload.len(),
            }
            .into()
        })
    }

    pub fn as_roaring_bitmap64(&self) -> Result<roaring::RoaringTreemap> {
        self.expect(FrameType::RoaringBitmap64)?;
        roaring::RoaringTreemap::deserialize_from(&self.payload[..]).map_err(|_| {
            FrameError::CorruptFrame {
                op: "as_roaring_bitmap64",
                type_tag: Some(self.frame_type.to_u8()),
                expected: self.payload.len(),
                found: self.payload.len(),
            }
            .into()
        })
    }

    pub fn as_shamir(&self) -> Result<&[u8]> {
        self.expect(FrameType::Shamir)?;
        Ok(&self.payload)
    }

    pub fn as_list_meta(&self) -> Result<ListMeta> {
        self.expect(FrameType::List)?;
        if self.payload.len() < 24 {
            return Err(FrameError::CorruptFrame {
                op: "as_list_meta",
                type_tag: Some(self.frame_type.to_u8()),
                expected: 24,
                found: self.payload.len(),
            }
            .into());
        }
        let head = i64::from_be_bytes(self.payload[0..8].try_into().unwrap());
        let tail = i64::from_be_bytes(self.payload[8..16].try_into().unwrap());
        let length = i64::from_be_bytes(self.payload[16..24].try_into().unwrap());
        let prefix = String::from_utf8_lossy(&self.payload[24..]).into_owned();
        Ok(ListMeta { prefix, head, tail, length })
    }

    pub fn as_set_meta(&self) -> Result<CountMeta> {
        self.expect(FrameType::Set)?;
        self.read_count_meta("as_set_meta")
    }

    pub fn as_map_meta(&self) -> Result<CountMeta> {
        self.expect(FrameType::Map)?;
        self.read_count_meta("as_map_meta")
    }

    fn read_count_meta(&self, op: &'static str) -> Result<CountMeta> {
        if self.payload.len() < 8 {
            return Err(FrameError::CorruptFrame {
                op,
                type_tag: Some(self.frame_type.to_u8()),
                expected: 8,
                found: self.payload.len(),
            }
            .into());
        }
        let count = u64::from_be_bytes(self.payload[0..8].try_into().unwrap());
        let prefix = String::from_utf8_lossy(&self.payload[8..]).into_owned();
        Ok(CountMeta { prefix, count })
    }

    pub fn as_timeseries_meta(&self) -> Result<TimeseriesMeta> {
        self.expect(FrameType::Timeseries)?;
        Ok(TimeseriesMeta {
            prefix: String::from_utf8_lossy(&self.payload).into_owned(),
        })
    }

    pub fn as_bloom_meta(&self) -> Result<BloomMeta> {
        self.expect(FrameType::BloomFilter)?;
        if self.payload.len() < 4 + 15 + 1 + 8 {
            return Err(FrameError::CorruptFrame {
                op: "as_bloom_meta",
                type_tag: Some(self.frame_type.to_u8()),
                expected: 4 + 15 + 1 + 8,
                found: self.payload.len(),
            }
            .into());
        }
        let slots = u32::from_be_bytes(self.payload[0..4].try_into().unwrap());
        let salt_bytes = &self.payload[4..19];
        let salt_len = salt_bytes.iter().position(|b| *b == 0).unwrap_or(salt_bytes.len());
        let salt = String::from_utf8_lossy(&salt_bytes[..salt_len]).into_owned();
        // byte 19 is the literal `:` separator.
        let count = u64::from_be_bytes(self.payload[20..28].try_into().unwrap());
        let prefix = String::from_utf8_lossy(&self.payload[28..]).into_owned();
        Ok(BloomMeta { prefix, slots, salt, count })
    }

    // ---- wire codec ---------------------------------------------------------

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len()
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        buf.push(self.frame_type.to_u8());
        buf.extend(self.expires_at.unwrap_or(0).to_be_bytes());
        buf.extend_from_slice(&self.payload);
    }

    pub fn encode_to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::CorruptFrame {
                op: "decode",
                type_tag: bytes.first().copied(),
                expected: HEADER_LEN,
                found: bytes.len(),
            }
            .into());
        }
        let frame_type = FrameType::from_u8(bytes[0])?;
        let expires_at_raw = i64::from_be_bytes(bytes[1..9].try_into().unwrap());
        let expires_at = if expires_at_raw == 0 { None } else { Some(expires_at_raw) };
        let payload = bytes[HEADER_LEN..].to_vec();
        let len = bytes.len();
        Ok((
            Self {
                frame_type,
                payload,
                expires_at,
            },
            len,
        ))
    }
}

fn count_and_prefix(count: u64, prefix: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8 + prefix.len());
    payload.extend(count.to_be_bytes());
    payload.extend(prefix.as_bytes());
    payload
}

fn read_fixed<const N: usize>(payload: &[u8], op: &'static str, type_tag: FrameType) -> Result<[u8; N]> {
    if payload.len() < N {
        return Err(FrameError::CorruptFrame {
            op,
            type_tag: Some(type_tag.to_u8()),
            expected: N,
            found: payload.len(),
        }
        .into());
    }
    Ok(payload[..N].try_into().unwrap())
}

fn read_u32(cursor: &mut &[u8], op: &'static str, type_tag: FrameType) -> Result<u32> {
    if cursor.len() < 4 {
        return Err(FrameError::CorruptFrame {
            op,
            type_tag: Some(type_tag.to_u8()),
            expected: 4,
            found: cursor.len(),
        }
        .into());
    }
    let v = u32::from_be_bytes(cursor[..4].try_into().unwrap());
    *cursor = &cursor[4..];
    Ok(v)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMeta {
    pub prefix: String,
    pub head: i64,
    pub tail: i64,
    pub length: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountMeta {
    pub prefix: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeseriesMeta {
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomMeta {
    pub prefix: String,
    pub slots: u32,
    pub salt: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn int_roundtrip() {
        let frame = DataFrame::int(42);
        let (decoded, n) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
        assert_eq!(n, frame.encoded_len());
        assert_eq!(decoded.as_int().unwrap(), 42);
        assert_eq!(decoded, frame);
    }

    #[test]
    fn list_meta_wire_layout() {
        let frame = DataFrame::list_meta("L", -1, 0, 2);
        let bytes = frame.encode_to_vec();
        let payload = &bytes[9..];
        assert_eq!(&payload[0..8], &(-1i64).to_be_bytes());
        assert_eq!(&payload[8..16], &0i64.to_be_bytes());
        assert_eq!(&payload[16..24], &2i64.to_be_bytes());
        assert_eq!(&payload[24..], b"L");
    }

    #[test]
    fn type_stickiness() {
        let frame = DataFrame::int(1);
        assert!(frame.as_string().is_err());
    }

    #[test]
    fn expiry_roundtrip() {
        let frame = DataFrame::string("hi").with_expiry(Some(123));
        let (decoded, _) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
        assert_eq!(decoded.expires_at(), Some(123));

        let frame = DataFrame::string("hi");
        let (decoded, _) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
        assert_eq!(decoded.expires_at(), None);
    }

    #[test]
    fn bigint_roundtrip_negative() {
        let v = BigInt::from(-123456789i64);
        let frame = DataFrame::bigint(&v);
        let (decoded, _) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
        assert_eq!(decoded.as_bigint().unwrap(), v);
    }

    #[test]
    fn decimal_roundtrip() {
        let v = Decimal::new(-31415, 4);
        let frame = DataFrame::decimal(v);
        let (decoded, _) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
        assert_eq!(decoded.as_decimal().unwrap(), v);
    }

    #[test]
    fn bloom_meta_roundtrip() {
        let frame = DataFrame::bloom_meta("B", 3, "s", 7);
        let (decoded, _) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
        let meta = decoded.as_bloom_meta().unwrap();
        assert_eq!(meta.prefix, "B");
        assert_eq!(meta.slots, 3);
        assert_eq!(meta.salt, "s");
        assert_eq!(meta.count, 7);
    }

    proptest! {
        /// Every scalar frame this module can construct survives an
        /// encode/decode cycle unchanged (spec §8 invariant: codec round-trip).
        #[test]
        fn scalar_frames_round_trip(
            i: i64,
            f: f64,
            b: bool,
            s in "\\PC*",
            bin: Vec<u8>,
            expires_at: Option<i64>,
        ) {
            for frame in [
                DataFrame::int(i),
                DataFrame::float(f),
                DataFrame::bool(b),
                DataFrame::string(s.clone()),
                DataFrame::binary(bin.clone()),
            ] {
                let frame = frame.with_expiry(expires_at.filter(|e| *e != 0));
                let (decoded, n) = DataFrame::decode(&frame.encode_to_vec()).unwrap();
                prop_assert_eq!(n, frame.encoded_len());
                prop_assert_eq!(decoded, frame);
            }
        }
    }
}
