//! In-memory local store.

use crate::error::SyncResult;
use crate::local::LocalStore;
use async_trait::async_trait;
use decksync_core::{
    AttemptResult, BreakerRecord, Collection, Document, RecordId, SyncCursor, UserId,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

type StateKey = (String, Collection);

/// An in-memory [`LocalStore`].
///
/// Suitable for unit tests, integration tests and ephemeral clients that do
/// not need persistence. Thread-safe; the `commit_pulled_*` methods take a
/// single write lock so a batch and its cursor advance are observed
/// together.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<RecordId, Document>,
    attempts: HashMap<RecordId, AttemptResult>,
    cursors: HashMap<StateKey, SyncCursor>,
    breakers: HashMap<StateKey, BreakerRecord>,
    backfilled: HashSet<StateKey>,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of document records currently held.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.inner.read().documents.len()
    }

    /// Number of attempt-result records currently held.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.inner.read().attempts.len()
    }
}

fn state_key(user: &UserId, collection: Collection) -> StateKey {
    (user.as_str().to_string(), collection)
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn document(&self, id: &RecordId) -> SyncResult<Option<Document>> {
        Ok(self.inner.read().documents.get(id).cloned())
    }

    async fn documents_by_ids(&self, ids: &[RecordId]) -> SyncResult<Vec<Document>> {
        let inner = self.inner.read();
        Ok(ids
            .iter()
            .filter_map(|id| inner.documents.get(id).cloned())
            .collect())
    }

    async fn documents_by_owner(&self, owner: &UserId) -> SyncResult<Vec<Document>> {
        let inner = self.inner.read();
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|doc| &doc.owner == owner)
            .cloned()
            .collect();
        docs.sort_by(|a, b| (a.updated_at, &a.id).cmp(&(b.updated_at, &b.id)));
        Ok(docs)
    }

    async fn dirty_documents(&self, owner: &UserId) -> SyncResult<Vec<Document>> {
        let inner = self.inner.read();
        let mut docs: Vec<Document> = inner
            .documents
            .values()
            .filter(|doc| &doc.owner == owner && doc.is_dirty())
            .cloned()
            .collect();
        docs.sort_by(|a, b| (a.updated_at, &a.id).cmp(&(b.updated_at, &b.id)));
        Ok(docs)
    }

    async fn upsert_documents(&self, docs: &[Document]) -> SyncResult<()> {
        let mut inner = self.inner.write();
        for doc in docs {
            inner.documents.insert(doc.id.clone(), doc.clone());
        }
        Ok(())
    }

    async fn delete_document(&self, id: &RecordId) -> SyncResult<()> {
        self.inner.write().documents.remove(id);
        Ok(())
    }

    async fn attempt(&self, id: &RecordId) -> SyncResult<Option<AttemptResult>> {
        Ok(self.inner.read().attempts.get(id).cloned())
    }

    async fn attempts_by_owner(&self, owner: &UserId) -> SyncResult<Vec<AttemptResult>> {
        let inner = self.inner.read();
        let mut attempts: Vec<AttemptResult> = inner
            .attempts
            .values()
            .filter(|attempt| &attempt.owner == owner)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| (a.taken_at, &a.id).cmp(&(b.taken_at, &b.id)));
        Ok(attempts)
    }

    async fn unsynced_attempts(&self, owner: &UserId) -> SyncResult<Vec<AttemptResult>> {
        let inner = self.inner.read();
        let mut attempts: Vec<AttemptResult> = inner
            .attempts
            .values()
            .filter(|attempt| &attempt.owner == owner && !attempt.synced)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| (a.taken_at, &a.id).cmp(&(b.taken_at, &b.id)));
        Ok(attempts)
    }

    async fn upsert_attempts(&self, attempts: &[AttemptResult]) -> SyncResult<()> {
        let mut inner = self.inner.write();
        for attempt in attempts {
            inner.attempts.insert(attempt.id.clone(), attempt.clone());
        }
        Ok(())
    }

    async fn delete_attempt(&self, id: &RecordId) -> SyncResult<()> {
        self.inner.write().attempts.remove(id);
        Ok(())
    }

    async fn cursor(
        &self,
        user: &UserId,
        collection: Collection,
    ) -> SyncResult<Option<SyncCursor>> {
        Ok(self
            .inner
            .read()
            .cursors
            .get(&state_key(user, collection))
            .cloned())
    }

    async fn set_cursor(
        &self,
        user: &UserId,
        collection: Collection,
        cursor: SyncCursor,
    ) -> SyncResult<()> {
        let mut inner = self.inner.write();
        let key = state_key(user, collection);
        let merged = match inner.cursors.get(&key) {
            // The persisted cursor never regresses.
            Some(current) => current.clone().latest(cursor),
            None => cursor,
        };
        inner.cursors.insert(key, merged);
        Ok(())
    }

    async fn breaker(
        &self,
        user: &UserId,
        collection: Collection,
    ) -> SyncResult<Option<BreakerRecord>> {
        Ok(self
            .inner
            .read()
            .breakers
            .get(&state_key(user, collection))
            .cloned())
    }

    async fn set_breaker(
        &self,
        user: &UserId,
        collection: Collection,
        record: BreakerRecord,
    ) -> SyncResult<()> {
        self.inner
            .write()
            .breakers
            .insert(state_key(user, collection), record);
        Ok(())
    }

    async fn backfill_done(&self, user: &UserId, collection: Collection) -> SyncResult<bool> {
        Ok(self
            .inner
            .read()
            .backfilled
            .contains(&state_key(user, collection)))
    }

    async fn set_backfill_done(&self, user: &UserId, collection: Collection) -> SyncResult<()> {
        self.inner.write().backfilled.insert(state_key(user, collection));
        Ok(())
    }

    async fn commit_pulled_documents(
        &self,
        user: &UserId,
        winners: &[Document],
        purged: &[RecordId],
        cursor: SyncCursor,
    ) -> SyncResult<()> {
        let mut inner = self.inner.write();
        for doc in winners {
            inner.documents.insert(doc.id.clone(), doc.clone());
        }
        for id in purged {
            inner.documents.remove(id);
        }
        let key = state_key(user, Collection::Documents);
        let merged = match inner.cursors.get(&key) {
            Some(current) => current.clone().latest(cursor),
            None => cursor,
        };
        inner.cursors.insert(key, merged);
        Ok(())
    }

    async fn commit_pulled_attempts(
        &self,
        user: &UserId,
        records: &[AttemptResult],
        purged: &[RecordId],
        cursor: SyncCursor,
    ) -> SyncResult<()> {
        let mut inner = self.inner.write();
        for attempt in records {
            inner.attempts.insert(attempt.id.clone(), attempt.clone());
        }
        for id in purged {
            inner.attempts.remove(id);
        }
        let key = state_key(user, Collection::AttemptResults);
        let merged = match inner.cursors.get(&key) {
            Some(current) => current.clone().latest(cursor),
            None => cursor,
        };
        inner.cursors.insert(key, merged);
        Ok(())
    }
}
