//! Core type definitions for decksync.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A client-assigned instant as milliseconds since the Unix epoch.
///
/// Local storage always uses this numeric form; the remote wire form is an
/// ISO-8601 string and the adapters convert between the two.
pub type UnixMillis = i64;

/// The reserved owner of shared seed content.
///
/// Records with this owner are visible to every user and read-only on every
/// client: they are never counted as dirty and never pushed.
const SHARED_OWNER: &str = "system";

/// Opaque, globally unique identifier for a synced record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wraps an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for the user that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an existing user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reserved shared/system sentinel owner.
    #[must_use]
    pub fn shared() -> Self {
        Self(SHARED_OWNER.to_string())
    }

    /// Returns true if this is the shared sentinel owner.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.0 == SHARED_OWNER
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two synced entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Study-set documents.
    Documents,
    /// Attempt-result records.
    AttemptResults,
}

impl Collection {
    /// Stable name used for state keys and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Collection::Documents => "documents",
            Collection::AttemptResults => "attempt_results",
        }
    }

    /// Both collections, in sync order (parents before children).
    #[must_use]
    pub const fn all() -> [Collection; 2] {
        [Collection::Documents, Collection::AttemptResults]
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull progress watermark for one (user, collection).
///
/// Ordered by update-time first and id second, so records sharing a
/// timestamp are neither skipped nor re-delivered indefinitely. The
/// persisted value is monotonically non-decreasing.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SyncCursor {
    /// Update-time of the last record seen.
    pub watermark_time: UnixMillis,
    /// Id of the last record seen, tie-breaking equal timestamps.
    pub watermark_id: String,
}

impl SyncCursor {
    /// Creates a cursor at the given composite key.
    pub fn new(watermark_time: UnixMillis, watermark_id: impl Into<String>) -> Self {
        Self {
            watermark_time,
            watermark_id: watermark_id.into(),
        }
    }

    /// The zero cursor, before any record has been pulled.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Returns the later of two cursors.
    #[must_use]
    pub fn latest(self, other: Self) -> Self {
        if other > self {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for SyncCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.watermark_time, self.watermark_id)
    }
}

/// Circuit-breaker state for one (user, collection).
///
/// Created when an entire pulled page fails schema validation. Never renewed
/// by a successful pass; it expires naturally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerRecord {
    /// Why the breaker was tripped.
    pub reason: String,
    /// When the breaker was tripped.
    pub blocked_at: UnixMillis,
    /// How long the block lasts, in milliseconds.
    pub ttl_ms: i64,
}

impl BreakerRecord {
    /// Creates a new breaker record.
    pub fn new(reason: impl Into<String>, blocked_at: UnixMillis, ttl_ms: i64) -> Self {
        Self {
            reason: reason.into(),
            blocked_at,
            ttl_ms,
        }
    }

    /// The instant at which the block lapses.
    #[must_use]
    pub fn expires_at(&self) -> UnixMillis {
        self.blocked_at.saturating_add(self.ttl_ms)
    }

    /// Returns true if the block has lapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: UnixMillis) -> bool {
        now >= self.expires_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_owner_sentinel() {
        assert!(UserId::shared().is_shared());
        assert!(!UserId::new("alice").is_shared());
    }

    #[test]
    fn record_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn collection_names() {
        assert_eq!(Collection::Documents.as_str(), "documents");
        assert_eq!(Collection::AttemptResults.as_str(), "attempt_results");
        assert_eq!(Collection::all()[0], Collection::Documents);
    }

    #[test]
    fn cursor_ordering_is_time_then_id() {
        let a = SyncCursor::new(100, "a");
        let b = SyncCursor::new(100, "b");
        let c = SyncCursor::new(105, "a");

        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.clone().latest(c.clone()), c);
        assert_eq!(c.clone().latest(a), c);
    }

    #[test]
    fn zero_cursor_precedes_everything() {
        assert!(SyncCursor::zero() < SyncCursor::new(1, ""));
    }

    #[test]
    fn breaker_expiry() {
        let one_hour = 3_600_000;
        let record = BreakerRecord::new("schema drift", 1_000, 6 * one_hour);

        assert!(!record.is_expired(1_000 + one_hour));
        assert!(record.is_expired(1_000 + 7 * one_hour));
        assert_eq!(record.expires_at(), 1_000 + 6 * one_hour);
    }
}
