//! Remote store seam.

use crate::clock::now_ms;
use crate::error::{SyncError, SyncResult};
use crate::telemetry::ConnectionClass;
use async_trait::async_trait;
use decksync_core::{RecordId, SyncCursor, UserId};
use decksync_protocol::{to_wire_time, WireAttempt, WireDocument};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// Typed access to the backend's query/upsert/soft-delete API.
///
/// All requests are scoped to an authenticated session; the engine verifies
/// that the session identity matches the owner it syncs for and treats a
/// mismatch as fatal.
///
/// List pages are returned as raw JSON records on purpose: the backend
/// schema can drift, so the pull phase validates each record individually
/// rather than trusting the adapter to deserialize a whole page.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// The identity the current session authenticates as, if any.
    async fn authenticated_user(&self) -> SyncResult<Option<UserId>>;

    /// Coarse quality of the current connection, for telemetry only.
    fn connection_class(&self) -> ConnectionClass;

    /// Documents strictly after `after`, ordered by (update-time asc,
    /// id asc), filtered to `owner` plus the shared sentinel owner.
    async fn list_documents(
        &self,
        owner: &UserId,
        after: &SyncCursor,
        limit: usize,
    ) -> SyncResult<Vec<Value>>;

    /// Inserts or replaces documents, idempotent by id.
    async fn upsert_documents(&self, records: &[WireDocument]) -> SyncResult<()>;

    /// Sets a tombstone timestamp on the given documents. Unknown ids are
    /// ignored.
    async fn soft_delete_documents(&self, owner: &UserId, ids: &[RecordId]) -> SyncResult<()>;

    /// Attempt-results strictly after `after`, ordered and filtered like
    /// [`Self::list_documents`].
    async fn list_attempts(
        &self,
        owner: &UserId,
        after: &SyncCursor,
        limit: usize,
    ) -> SyncResult<Vec<Value>>;

    /// Inserts or replaces attempt-results, idempotent by id.
    async fn upsert_attempts(&self, records: &[WireAttempt]) -> SyncResult<()>;

    /// Sets a tombstone timestamp on the given attempt-results. Unknown ids
    /// are ignored.
    async fn soft_delete_attempts(&self, owner: &UserId, ids: &[RecordId]) -> SyncResult<()>;
}

/// An in-memory [`RemoteStore`] with scriptable failures.
///
/// Holds raw JSON records so tests can inject malformed data and exercise
/// the pull phase's validation and circuit-breaking behavior.
#[derive(Debug, Default)]
pub struct MockRemote {
    inner: RwLock<MockInner>,
}

#[derive(Debug, Default)]
struct MockInner {
    session: Option<UserId>,
    class: ConnectionClass,
    documents: HashMap<String, Value>,
    attempts: HashMap<String, Value>,
    document_upsert_calls: u64,
    attempt_upsert_calls: u64,
    list_calls: u64,
    skip_before_document_failures: u32,
    fail_document_upserts: u32,
    fail_attempt_upserts: u32,
    fail_lists: u32,
}

impl MockRemote {
    /// Creates an empty mock with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty mock authenticated as `user`.
    #[must_use]
    pub fn with_session(user: UserId) -> Self {
        let mock = Self::default();
        mock.set_session(Some(user));
        mock
    }

    /// Sets or clears the authenticated session.
    pub fn set_session(&self, user: Option<UserId>) {
        self.inner.write().session = user;
    }

    /// Sets the reported connection class.
    pub fn set_connection_class(&self, class: ConnectionClass) {
        self.inner.write().class = class;
    }

    /// Stores a raw document record, bypassing upsert accounting.
    pub fn inject_document(&self, record: Value) {
        let id = record_id_of(&record);
        self.inner.write().documents.insert(id, record);
    }

    /// Stores a raw attempt record, bypassing upsert accounting.
    pub fn inject_attempt(&self, record: Value) {
        let id = record_id_of(&record);
        self.inner.write().attempts.insert(id, record);
    }

    /// Fails the next `count` document upsert calls.
    pub fn fail_next_document_upserts(&self, count: u32) {
        self.inner.write().fail_document_upserts = count;
    }

    /// Lets `skip` document upsert calls succeed, then fails `count`.
    pub fn fail_document_upserts_after(&self, skip: u32, count: u32) {
        let mut inner = self.inner.write();
        inner.skip_before_document_failures = skip;
        inner.fail_document_upserts = count;
    }

    /// Fails the next `count` attempt upsert calls.
    pub fn fail_next_attempt_upserts(&self, count: u32) {
        self.inner.write().fail_attempt_upserts = count;
    }

    /// Fails the next `count` list calls (both collections).
    pub fn fail_next_lists(&self, count: u32) {
        self.inner.write().fail_lists = count;
    }

    /// Number of stored document records.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.inner.read().documents.len()
    }

    /// Number of stored attempt records.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.inner.read().attempts.len()
    }

    /// A stored document record by id.
    #[must_use]
    pub fn document(&self, id: &str) -> Option<Value> {
        self.inner.read().documents.get(id).cloned()
    }

    /// A stored attempt record by id.
    #[must_use]
    pub fn attempt(&self, id: &str) -> Option<Value> {
        self.inner.read().attempts.get(id).cloned()
    }

    /// How many document upsert calls have been made.
    #[must_use]
    pub fn document_upsert_calls(&self) -> u64 {
        self.inner.read().document_upsert_calls
    }

    /// How many attempt upsert calls have been made.
    #[must_use]
    pub fn attempt_upsert_calls(&self) -> u64 {
        self.inner.read().attempt_upsert_calls
    }

    /// How many list calls have been made, across both collections.
    #[must_use]
    pub fn list_calls(&self) -> u64 {
        self.inner.read().list_calls
    }
}

fn record_id_of(record: &Value) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Best-effort (update-time, id) key of a raw record; unparseable parts
/// sort to the epoch.
fn record_key(record: &Value) -> SyncCursor {
    let time = record
        .get("updated_at")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<chrono::DateTime<chrono::Utc>>().ok())
        .map(|ts| ts.timestamp_millis())
        .unwrap_or(0);
    SyncCursor::new(time, record_id_of(record))
}

fn visible_to(record: &Value, owner: &UserId) -> bool {
    match record.get("owner").and_then(Value::as_str) {
        Some(o) => o == owner.as_str() || UserId::new(o).is_shared(),
        None => false,
    }
}

fn list_page(
    records: &HashMap<String, Value>,
    owner: &UserId,
    after: &SyncCursor,
    limit: usize,
) -> Vec<Value> {
    let mut page: Vec<(SyncCursor, Value)> = records
        .values()
        .filter(|record| visible_to(record, owner))
        .map(|record| (record_key(record), record.clone()))
        .filter(|(key, _)| key > after)
        .collect();
    page.sort_by(|a, b| a.0.cmp(&b.0));
    page.truncate(limit);
    page.into_iter().map(|(_, record)| record).collect()
}

fn stamp_deleted(record: &mut Value, now_iso: &Value) {
    if let Some(map) = record.as_object_mut() {
        map.insert("deleted_at".into(), now_iso.clone());
        map.insert("updated_at".into(), now_iso.clone());
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn authenticated_user(&self) -> SyncResult<Option<UserId>> {
        Ok(self.inner.read().session.clone())
    }

    fn connection_class(&self) -> ConnectionClass {
        self.inner.read().class
    }

    async fn list_documents(
        &self,
        owner: &UserId,
        after: &SyncCursor,
        limit: usize,
    ) -> SyncResult<Vec<Value>> {
        let mut inner = self.inner.write();
        inner.list_calls += 1;
        if inner.fail_lists > 0 {
            inner.fail_lists -= 1;
            return Err(SyncError::remote_retryable("injected list failure"));
        }
        Ok(list_page(&inner.documents, owner, after, limit))
    }

    async fn upsert_documents(&self, records: &[WireDocument]) -> SyncResult<()> {
        let mut inner = self.inner.write();
        inner.document_upsert_calls += 1;
        if inner.skip_before_document_failures > 0 {
            inner.skip_before_document_failures -= 1;
        } else if inner.fail_document_upserts > 0 {
            inner.fail_document_upserts -= 1;
            return Err(SyncError::remote_retryable("injected upsert failure"));
        }
        for record in records {
            let raw = serde_json::to_value(record)
                .map_err(|e| SyncError::remote_fatal(e.to_string()))?;
            inner.documents.insert(record.id.clone(), raw);
        }
        Ok(())
    }

    async fn soft_delete_documents(&self, _owner: &UserId, ids: &[RecordId]) -> SyncResult<()> {
        let now_iso = serde_json::to_value(to_wire_time(now_ms()))
            .map_err(|e| SyncError::remote_fatal(e.to_string()))?;
        let mut inner = self.inner.write();
        for id in ids {
            if let Some(record) = inner.documents.get_mut(id.as_str()) {
                stamp_deleted(record, &now_iso);
            }
        }
        Ok(())
    }

    async fn list_attempts(
        &self,
        owner: &UserId,
        after: &SyncCursor,
        limit: usize,
    ) -> SyncResult<Vec<Value>> {
        let mut inner = self.inner.write();
        inner.list_calls += 1;
        if inner.fail_lists > 0 {
            inner.fail_lists -= 1;
            return Err(SyncError::remote_retryable("injected list failure"));
        }
        Ok(list_page(&inner.attempts, owner, after, limit))
    }

    async fn upsert_attempts(&self, records: &[WireAttempt]) -> SyncResult<()> {
        let mut inner = self.inner.write();
        inner.attempt_upsert_calls += 1;
        if inner.fail_attempt_upserts > 0 {
            inner.fail_attempt_upserts -= 1;
            return Err(SyncError::remote_retryable("injected upsert failure"));
        }
        for record in records {
            let raw = serde_json::to_value(record)
                .map_err(|e| SyncError::remote_fatal(e.to_string()))?;
            inner.attempts.insert(record.id.clone(), raw);
        }
        Ok(())
    }

    async fn soft_delete_attempts(&self, _owner: &UserId, ids: &[RecordId]) -> SyncResult<()> {
        let now_iso = serde_json::to_value(to_wire_time(now_ms()))
            .map_err(|e| SyncError::remote_fatal(e.to_string()))?;
        let mut inner = self.inner.write();
        for id in ids {
            if let Some(record) = inner.attempts.get_mut(id.as_str()) {
                stamp_deleted(record, &now_iso);
            }
        }
        Ok(())
    }
}
