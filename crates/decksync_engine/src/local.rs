//! Local store seam.

use crate::error::SyncResult;
use async_trait::async_trait;
use decksync_core::{
    AttemptResult, BreakerRecord, Collection, Document, RecordId, SyncCursor, UserId,
};

/// Typed access to the embedded client database.
///
/// The local store is the single source of truth for what still needs
/// pushing: the dirty predicate is always recomputed from current state,
/// never cached across passes.
///
/// Implementations back two record collections (documents and
/// attempt-results) plus small per-(user, collection) sync-state records,
/// and must make the `commit_pulled_*` methods atomic: a pull batch's record
/// writes and its cursor advance commit together or not at all.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Fetches one document by id.
    async fn document(&self, id: &RecordId) -> SyncResult<Option<Document>>;

    /// Fetches a set of documents by id. Missing ids are skipped.
    async fn documents_by_ids(&self, ids: &[RecordId]) -> SyncResult<Vec<Document>>;

    /// All documents belonging to an owner.
    async fn documents_by_owner(&self, owner: &UserId) -> SyncResult<Vec<Document>>;

    /// Documents of an owner whose version has advanced past the last
    /// synced version, ordered by (updated_at, id).
    async fn dirty_documents(&self, owner: &UserId) -> SyncResult<Vec<Document>>;

    /// Inserts or replaces documents by id.
    async fn upsert_documents(&self, docs: &[Document]) -> SyncResult<()>;

    /// Removes a document record entirely (tombstone purge).
    async fn delete_document(&self, id: &RecordId) -> SyncResult<()>;

    /// Fetches one attempt-result by id.
    async fn attempt(&self, id: &RecordId) -> SyncResult<Option<AttemptResult>>;

    /// All attempt-results belonging to an owner.
    async fn attempts_by_owner(&self, owner: &UserId) -> SyncResult<Vec<AttemptResult>>;

    /// Attempt-results of an owner not yet confirmed by the remote store,
    /// ordered by (taken_at, id).
    async fn unsynced_attempts(&self, owner: &UserId) -> SyncResult<Vec<AttemptResult>>;

    /// Inserts or replaces attempt-results by id.
    async fn upsert_attempts(&self, attempts: &[AttemptResult]) -> SyncResult<()>;

    /// Removes an attempt-result record entirely (tombstone purge).
    async fn delete_attempt(&self, id: &RecordId) -> SyncResult<()>;

    /// The persisted pull cursor, if any.
    async fn cursor(&self, user: &UserId, collection: Collection)
        -> SyncResult<Option<SyncCursor>>;

    /// Persists a pull cursor.
    async fn set_cursor(
        &self,
        user: &UserId,
        collection: Collection,
        cursor: SyncCursor,
    ) -> SyncResult<()>;

    /// The persisted circuit-breaker record, if any.
    async fn breaker(
        &self,
        user: &UserId,
        collection: Collection,
    ) -> SyncResult<Option<BreakerRecord>>;

    /// Persists a circuit-breaker record.
    async fn set_breaker(
        &self,
        user: &UserId,
        collection: Collection,
        record: BreakerRecord,
    ) -> SyncResult<()>;

    /// Whether the one-time backfill has completed.
    async fn backfill_done(&self, user: &UserId, collection: Collection) -> SyncResult<bool>;

    /// Marks the one-time backfill as completed.
    async fn set_backfill_done(&self, user: &UserId, collection: Collection) -> SyncResult<()>;

    /// Atomically persists a pull batch: upserts `winners`, purges
    /// `purged`, and advances the documents cursor, in one transaction.
    async fn commit_pulled_documents(
        &self,
        user: &UserId,
        winners: &[Document],
        purged: &[RecordId],
        cursor: SyncCursor,
    ) -> SyncResult<()>;

    /// Atomically persists a pull batch of attempt-results and advances the
    /// attempt-results cursor, in one transaction.
    async fn commit_pulled_attempts(
        &self,
        user: &UserId,
        records: &[AttemptResult],
        purged: &[RecordId],
        cursor: SyncCursor,
    ) -> SyncResult<()>;
}
