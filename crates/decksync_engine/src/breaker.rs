//! Circuit breaker for detected backend schema drift.

use crate::error::SyncResult;
use crate::local::LocalStore;
use decksync_core::{BreakerRecord, Collection, UnixMillis, UserId};
use std::time::Duration;
use tracing::warn;

/// Persists and consults the per-(user, collection) blocked flag.
///
/// The breaker trips when an entire pulled page fails schema validation
/// (the signature of backend schema drift) and short-circuits passes until
/// it expires. A successful pass never renews it.
pub struct CircuitBreaker<'a, S: LocalStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: LocalStore + ?Sized> CircuitBreaker<'a, S> {
    /// Creates a breaker over the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The unexpired breaker record for this key, if any.
    pub async fn blocked(
        &self,
        user: &UserId,
        collection: Collection,
        now: UnixMillis,
    ) -> SyncResult<Option<BreakerRecord>> {
        let record = self.store.breaker(user, collection).await?;
        Ok(record.filter(|r| !r.is_expired(now)))
    }

    /// Trips the breaker for `ttl` starting at `now`.
    pub async fn trip(
        &self,
        user: &UserId,
        collection: Collection,
        reason: impl Into<String>,
        ttl: Duration,
        now: UnixMillis,
    ) -> SyncResult<()> {
        let reason = reason.into();
        warn!(
            user = %user,
            collection = %collection,
            reason = %reason,
            ttl_ms = ttl.as_millis() as i64,
            "tripping circuit breaker"
        );
        self.store
            .set_breaker(
                user,
                collection,
                BreakerRecord::new(reason, now, ttl.as_millis() as i64),
            )
            .await
    }
}
