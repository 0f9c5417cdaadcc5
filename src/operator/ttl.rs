//! `SetTTL`/`RemoveTTL` and the background reaper (spec §4.9). Grounded
//! on the teacher's `DurabilityWorkerActor` shape
//! (`crates/core/src/db/durability.rs`): a `tokio::spawn`ed loop, owned
//! by the constructing façade, that ticks on its own interval and exits
//! when told to shut down — applied here to expiring keys in coarse
//! time buckets instead of flushing a commit log.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::codec::primitive::PrimitiveData;
use crate::codec::schema;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::locker::KeyLocker;
use crate::store::Store;
use crate::time::{ceil_bucket, floor_bucket};

use super::Operator;

impl Operator {
    pub(crate) fn from_parts(store: Arc<dyn Store>, locker: Arc<KeyLocker>, clock: Arc<crate::time::CachedClock>, config: Config) -> Self {
        let (shutdown_tx, _shutdown_rx) = watch::channel(false);
        Self {
            store,
            locker,
            clock,
            config,
            shutdown_tx,
            background: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// No-op if `expire_at <= now`. Otherwise stamps `expires_at` on the
    /// frame at `key` and registers `key` in the TTL bucket for
    /// `ceil_bucket(expire_at)`, creating that bucket list if absent.
    pub fn set_ttl(&self, key: &str, expire_at: i64) -> Result<()> {
        let now = self.clock.now_millis();
        if expire_at <= now {
            return Ok(());
        }
        {
            let _guard = self.lock_base(key);
            let base_key = schema::base(key);
            let mut frame = self
                .read_frame(&base_key)?
                .ok_or_else(|| Error::NotFound(key.to_string()))?;
            frame.set_expiry(Some(expire_at));
            self.write_frame(&base_key, &frame)?;
        }
        let precision_ms = self.config.ttl_precision.as_millis() as i64;
        let bucket = schema::ttl_bucket(ceil_bucket(expire_at, precision_ms));
        self.push_ttl_candidate(&bucket, key)
    }

    /// Clears `expires_at` on `key`'s frame. Does not eagerly remove `key`
    /// from whatever TTL bucket it's registered in; the reaper revalidates.
    pub fn remove_ttl(&self, key: &str) -> Result<()> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        let mut frame = self
            .read_frame(&base_key)?
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        frame.set_expiry(None);
        self.write_frame(&base_key, &frame)
    }

    fn push_ttl_candidate(&self, bucket: &str, key: &str) -> Result<()> {
        if let Err(err) = self.list_create(bucket) {
            if !matches!(&err, Error::Container(crate::error::ContainerError::AlreadyExists(_))) {
                return Err(err);
            }
        }
        self.list_push_right(bucket, PrimitiveData::String(key.to_string())).map(|_| ())
    }

    /// One reaper sweep: drains the bucket for `floor_bucket(now)` and
    /// revalidates + deletes each candidate whose expiry has truly passed.
    /// At-least-once: a key may appear in multiple buckets, or be polled
    /// after its TTL was cleared; revalidation under the key's own lock
    /// prevents a spurious delete in either case.
    pub(crate) fn reap_tick(&self) -> Result<()> {
        let precision_ms = self.config.ttl_precision.as_millis() as i64;
        let now = self.clock.now_millis();
        let bucket = schema::ttl_bucket(floor_bucket(now, precision_ms));
        let candidates = self.list_get_all_and_delete(&bucket)?;

        for candidate in candidates {
            let key = match candidate {
                PrimitiveData::String(s) => s,
                other => {
                    warn!(value = %other, "ttl bucket contained a non-string candidate, skipping");
                    continue;
                }
            };
            if let Err(err) = self.reap_one(&key, now) {
                warn!(key = %key, error = %err, "failed to reap candidate key, leaving it for the next sweep");
            }
        }
        Ok(())
    }

    fn reap_one(&self, key: &str, now: i64) -> Result<()> {
        let _guard = self.lock_base(key);
        let base_key = schema::base(key);
        let frame = match self.read_frame(&base_key)? {
            Some(frame) => frame,
            None => return Ok(()),
        };
        match frame.expires_at() {
            Some(expires_at) if expires_at <= now => self.delete_typed_locked(key),
            _ => Ok(()),
        }
    }
}

/// Starts the background reaper loop. Ticks every `config.ttl_precision`
/// and exits as soon as `shutdown_rx` observes `true`, mirroring the
/// teacher's durability worker's select-on-shutdown-channel shape.
pub(crate) fn spawn_reaper(
    store: Arc<dyn Store>,
    locker: Arc<KeyLocker>,
    clock: Arc<crate::time::CachedClock>,
    config: Config,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let precision = config.ttl_precision;
    let reaper_op = Operator::from_parts(store, locker, clock, config);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(precision);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = reaper_op.reap_tick() {
                        warn!(error = %err, "ttl reaper tick failed, will retry next interval");
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::time::Duration;

    fn op_with_fast_ttl() -> Operator {
        let mut config = Config::in_memory();
        config.ttl_precision = Duration::from_millis(50);
        Operator::new(config).unwrap()
    }

    #[tokio::test]
    async fn ttl_expiry_scenario_e() {
        let op = op_with_fast_ttl();
        op.set_string("k", "v").unwrap();
        let now = op.clock.now_millis();
        op.set_ttl("k", now + 10).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        op.reap_tick().unwrap();
        assert!(op.get_string("k").is_err());
    }

    #[tokio::test]
    async fn remove_ttl_prevents_reaping_invariant_11() {
        let op = op_with_fast_ttl();
        op.set_string("k", "v").unwrap();
        let now = op.clock.now_millis();
        op.set_ttl("k", now + 10).unwrap();
        op.remove_ttl("k").unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        op.reap_tick().unwrap();
        assert_eq!(op.get_string("k").unwrap(), "v");
    }

    #[tokio::test]
    async fn set_ttl_in_the_past_is_a_silent_no_op() {
        let op = op_with_fast_ttl();
        op.set_string("k", "v").unwrap();
        let now = op.clock.now_millis();
        op.set_ttl("k", now - 1000).unwrap();
        assert_eq!(op.get_string("k").unwrap(), "v");
    }
}
