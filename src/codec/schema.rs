//! Pure functions producing canonical byte keys for logical entities
//! (spec §4, §6). No teacher file builds a flat byte-key namespace this
//! way (SpacetimeDB addresses rows by typed IDs); this module generalizes
//! the key-namespacing shape used throughout `crates/core/src/db`
//! (stable prefix + type marker + suffix) to the spec's five structure
//! kinds.

pub const LIST_MARKER: &str = "{:list:}";
pub const SET_MARKER: &str = "{:set:}";
pub const MAP_MARKER: &str = "{:map:}";
pub const TS_MARKER: &str = "{:ts:}";
pub const BLOOM_MARKER: &str = "{:bloom:}";

pub const TTL_BUCKET_PREFIX: &str = "__system__:__ttl_list__:";

/// The user-visible logical key, used verbatim as the storage key for
/// scalars and as the metadata key for containers.
pub fn base(key: &str) -> Vec<u8> {
    key.as_bytes().to_vec()
}

/// List element key: `<base> ":" "{:list:}" ":" <be_u64(index as u64)>`.
pub fn list_item(base: &str, index: i64) -> Vec<u8> {
    let mut out = sub_key_prefix(base, LIST_MARKER);
    out.extend((index as u64).to_be_bytes());
    out
}

/// Lower/upper bounds for a bounded scan over every `list_item` sub-key of
/// `base`. The spec explicitly forbids relying on this ordering for
/// `Range`/`Trim` (index keys don't order negatives correctly), but the
/// bounds are still useful for `Delete`'s best-effort cleanup pass.
pub fn list_item_bounds(base: &str) -> (Vec<u8>, Vec<u8>) {
    marker_bounds(base, LIST_MARKER)
}

/// Set member key: `<base> ":" "{:set:}" ":" <utf8 member bytes>`.
pub fn set_item(base: &str, member: &str) -> Vec<u8> {
    let mut out = sub_key_prefix(base, SET_MARKER);
    out.extend(member.as_bytes());
    out
}

pub fn set_item_bounds(base: &str) -> (Vec<u8>, Vec<u8>) {
    marker_bounds(base, SET_MARKER)
}

/// Map field key: `<base> ":" "{:map:}" ":" <utf8 field bytes>`.
pub fn map_item(base: &str, field: &str) -> Vec<u8> {
    let mut out = sub_key_prefix(base, MAP_MARKER);
    out.extend(field.as_bytes());
    out
}

pub fn map_item_bounds(base: &str) -> (Vec<u8>, Vec<u8>) {
    marker_bounds(base, MAP_MARKER)
}

/// TimeSeries point key: `<base> ":" "{:ts:}" ":" <be_u64(ts_unix_nanos)>`.
/// Big-endian encoding of a non-negative nanosecond timestamp preserves
/// numeric order as lexicographic order (spec invariant 9), which is why
/// `Range` can use an ordered prefix scan here, unlike list items.
pub fn ts_point(base: &str, ts_nanos: u64) -> Vec<u8> {
    let mut out = sub_key_prefix(base, TS_MARKER);
    out.extend(ts_nanos.to_be_bytes());
    out
}

/// `[base:{:ts:}:, base:{:ts:}:\xff]` — ordered prefix scan bounds.
pub fn ts_range_bounds(base: &str) -> (Vec<u8>, Vec<u8>) {
    marker_bounds(base, TS_MARKER)
}

/// Bloom filter item key: `<base> ":" "{:bloom:}" ":" <utf8 item bytes>`.
pub fn bloom_item(base: &str, item: &str) -> Vec<u8> {
    let mut out = sub_key_prefix(base, BLOOM_MARKER);
    out.extend(item.as_bytes());
    out
}

pub fn bloom_item_bounds(base: &str) -> (Vec<u8>, Vec<u8>) {
    marker_bounds(base, BLOOM_MARKER)
}

/// `"__system__:__ttl_list__:" <decimal-ascii bucket_ms>`.
pub fn ttl_bucket(bucket_ms: i64) -> String {
    format!("{TTL_BUCKET_PREFIX}{bucket_ms}")
}

fn sub_key_prefix(base: &str, marker: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(base.len() + marker.len() + 2);
    out.extend(base.as_bytes());
    out.push(b':');
    out.extend(marker.as_bytes());
    out.push(b':');
    out
}

/// Bounds for a prefix scan over every sub-key of `base` tagged with
/// `marker`: `[<base>:<marker>:, <base>:<marker>:\xff]` (spec §4.10).
fn marker_bounds(base: &str, marker: &str) -> (Vec<u8>, Vec<u8>) {
    let lower = sub_key_prefix(base, marker);
    let mut upper = lower.clone();
    upper.push(0xff);
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_point_orders_lexicographically_with_numeric_order() {
        let a = ts_point("T", 10);
        let b = ts_point("T", 20);
        assert!(a < b);
    }

    #[test]
    fn bounds_are_exclusive_of_other_bases() {
        let (lo, hi) = set_item_bounds("base");
        let other = set_item("basee", "m");
        // "basee" sorts after "base:{:set:}:\xff"? No: "basee" < "base:{:set:}:..."
        // because ':' (0x3a) < 'e' (0x65); confirm the bound excludes a
        // differently-prefixed base rather than relying on that fact blindly.
        let mine = set_item("base", "m");
        assert!(mine >= lo && mine < hi);
        assert!(other < lo || other >= hi);
    }
}
