//! Cached `Now()` and TTL bucket math (spec §4.9).
//!
//! Grounded on the teacher's background-actor shape
//! (`crates/core/src/db/durability.rs`'s `DurabilityWorkerActor`: a
//! `tokio::spawn`ed loop owned by the constructing façade) applied to a
//! clock refresh — at most once a second, faster if `ttl_precision` is
//! sub-second — instead of a transaction-durability queue.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

/// One minute, in milliseconds — the spec's fixed TTL bucketing constant.
pub const TTL_PRECISION_MS: i64 = 60_000;

/// A process-level atomically-updated instant, refreshed at most once a
/// second (faster when `ttl_precision` is sub-second) so hot paths
/// (`SetTTL`, the reaper) avoid a syscall per call. Acceptable skew is
/// <= the refresh interval (spec §9).
pub struct CachedClock {
    millis: Arc<AtomicI64>,
}

impl CachedClock {
    /// Start the background refresh task, ticking at
    /// `min(1s, refresh_interval)`. Must be called from within a running
    /// Tokio runtime, matching `DurabilityWorker::new`'s assumption that its
    /// owner already runs on Tokio.
    ///
    /// `refresh_interval` is normally `ttl_precision`: a reaper polling more
    /// often than the clock refreshes would see a frozen `now_millis()` for
    /// its entire window and never observe a key crossing into an
    /// already-drained bucket.
    pub fn start(refresh_interval: Duration) -> (Self, tokio::task::JoinHandle<()>) {
        let millis = Arc::new(AtomicI64::new(Utc::now().timestamp_millis()));
        let tick_every = refresh_interval.min(Duration::from_secs(1)).max(Duration::from_millis(1));
        let handle = {
            let millis = millis.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(tick_every);
                loop {
                    ticker.tick().await;
                    millis.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
                }
            })
        };
        (Self { millis }, handle)
    }

    /// Current wall-clock time, in milliseconds since the Unix epoch.
    pub fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::Relaxed)
    }
}

/// `floor_bucket(t) = t_ms - (t_ms mod ttl_precision)`.
pub fn floor_bucket(t_ms: i64, precision_ms: i64) -> i64 {
    t_ms - t_ms.rem_euclid(precision_ms)
}

/// `ceil_bucket(t) = t_ms + ((ttl_precision - t_ms mod ttl_precision) mod ttl_precision)`.
pub fn ceil_bucket(t_ms: i64, precision_ms: i64) -> i64 {
    t_ms + (precision_ms - t_ms.rem_euclid(precision_ms)).rem_euclid(precision_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_and_ceil_on_exact_bucket_boundary() {
        assert_eq!(floor_bucket(60_000, TTL_PRECISION_MS), 60_000);
        assert_eq!(ceil_bucket(60_000, TTL_PRECISION_MS), 60_000);
    }

    #[test]
    fn floor_and_ceil_mid_bucket() {
        assert_eq!(floor_bucket(90_000, TTL_PRECISION_MS), 60_000);
        assert_eq!(ceil_bucket(90_000, TTL_PRECISION_MS), 120_000);
    }

    #[tokio::test]
    async fn cached_clock_reflects_wall_clock_within_a_second() {
        let (clock, handle) = CachedClock::start(Duration::from_secs(1));
        let now = Utc::now().timestamp_millis();
        assert!((clock.now_millis() - now).abs() < 1_500);
        handle.abort();
    }

    #[tokio::test]
    async fn cached_clock_refresh_cadence_tracks_sub_second_precision() {
        let (clock, handle) = CachedClock::start(Duration::from_millis(20));
        let before = clock.now_millis();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(clock.now_millis() > before);
        handle.abort();
    }
}
