use std::path::PathBuf;
use std::time::Duration;

/// Backing engine selector (spec §6 `fs`). Grounded on the shape of
/// `crates/core/src/config.rs`: a plain struct, a `Default` impl, no
/// TOML/file parsing layer — that belongs to packaging, which is out of
/// scope for this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    OnDisk,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::InMemory
    }
}

/// Construction options for [`crate::operator::Operator`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory (on-disk backend) or a descriptive label (in-memory backend).
    pub path: PathBuf,
    pub fs: Backend,
    pub cache_size: Option<u64>,
    pub mem_table_size: Option<u64>,
    pub bytes_per_sync: Option<u64>,
    /// How often the TTL reaper ticks. Defaults to the spec's 60s; a test
    /// may shrink this so expiry scenarios don't need to sleep a full minute.
    pub ttl_precision: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tower-kv"),
            fs: Backend::InMemory,
            cache_size: None,
            mem_table_size: None,
            bytes_per_sync: None,
            ttl_precision: Duration::from_millis(60_000),
        }
    }
}

impl Config {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn on_disk(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fs: Backend::OnDisk,
            ..Self::default()
        }
    }
}
