//! `tower-kv`: an embedded, single-process key-value store layering
//! typed, Redis-like operations over an ordered byte-key storage engine.
//!
//! The public surface is [`Operator`]: construct one with a [`Config`],
//! then call its typed per-value-kind methods (`set_int`, `list_push_right`,
//! `bloom_add`, `set_ttl`, ...). Every call is internally serialized per
//! logical key by a sharded [`locker::KeyLocker`]; a background reaper
//! expires keys whose TTL has passed.
//!
//! Grounded on `crates/core/src/lib.rs`'s module layout in the teacher
//! repo (`clockworklabs-SpacetimeDB`, see `TEACHER.txt`): a handful of
//! top-level modules re-exported from the crate root, no facade
//! re-exports beyond what callers actually construct.

pub mod codec;
pub mod config;
pub mod error;
pub mod locker;
pub mod operator;
pub mod store;
pub mod time;

pub use codec::frame::{DataFrame, FrameType};
pub use codec::primitive::PrimitiveData;
pub use config::{Backend, Config};
pub use error::{Error, Result};
pub use operator::Operator;
