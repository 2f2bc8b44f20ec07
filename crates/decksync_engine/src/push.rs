//! Push phase: upload dirty local records.

use crate::clock::now_ms;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::local::LocalStore;
use crate::remote::RemoteStore;
use decksync_core::{AttemptResult, RecordId, UserId};
use decksync_protocol::{WireAttempt, WireDocument};
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

/// What one push phase accomplished.
#[derive(Debug, Default)]
pub(crate) struct PushOutcome {
    /// Records confirmed by the remote store this phase.
    pub pushed: u64,
    /// Attempt-results left dirty because their parent document is not yet
    /// confirmed synced.
    pub deferred_children: u64,
    /// True when no dirty work remained within the budget.
    pub drained: bool,
}

/// Uploads dirty documents: live records via idempotent upsert, tombstones
/// via remote soft-delete followed by local purge.
///
/// Sync metadata is written for exactly the records of each confirmed
/// batch, so a later batch failure cannot falsely mark earlier batches.
pub(crate) async fn push_documents<L, R>(
    local: &L,
    remote: &R,
    user: &UserId,
    config: &SyncConfig,
    deadline: Instant,
) -> SyncResult<PushOutcome>
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let dirty = local.dirty_documents(user).await?;
    let (tombstones, live): (Vec<_>, Vec<_>) =
        dirty.into_iter().partition(|doc| doc.is_tombstone());

    let mut outcome = PushOutcome::default();

    for batch in live.chunks(config.push_batch_size) {
        if Instant::now() >= deadline {
            return Ok(outcome);
        }
        let wire: Vec<WireDocument> = batch.iter().map(WireDocument::from_local).collect();
        remote.upsert_documents(&wire).await?;

        let now = now_ms();
        let mut confirmed = batch.to_vec();
        for doc in &mut confirmed {
            doc.mark_synced(now);
        }
        local.upsert_documents(&confirmed).await?;
        outcome.pushed += confirmed.len() as u64;
    }

    for batch in tombstones.chunks(config.push_batch_size) {
        if Instant::now() >= deadline {
            return Ok(outcome);
        }
        let ids: Vec<RecordId> = batch.iter().map(|doc| doc.id.clone()).collect();
        remote.soft_delete_documents(user, &ids).await?;
        // Both sides have observed the tombstone now; purge it locally.
        for id in &ids {
            local.delete_document(id).await?;
        }
        outcome.pushed += ids.len() as u64;
    }

    outcome.drained = true;
    Ok(outcome)
}

/// Uploads unsynced attempt-results.
///
/// Live records are gated on their parent document being confirmed synced;
/// gated-out children stay dirty and are counted so the pass reports
/// incomplete. Tombstones carry no foreign-key risk and are soft-deleted
/// unconditionally.
pub(crate) async fn push_attempts<L, R>(
    local: &L,
    remote: &R,
    user: &UserId,
    config: &SyncConfig,
    deadline: Instant,
) -> SyncResult<PushOutcome>
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let unsynced = local.unsynced_attempts(user).await?;
    let (tombstones, live): (Vec<_>, Vec<_>) =
        unsynced.into_iter().partition(|a| a.is_tombstone());

    let synced_parents = synced_parent_ids(local, &live).await?;
    let (eligible, deferred): (Vec<_>, Vec<_>) = live
        .into_iter()
        .partition(|a| synced_parents.contains(&a.document_id));

    let mut outcome = PushOutcome {
        deferred_children: deferred.len() as u64,
        ..PushOutcome::default()
    };
    if !deferred.is_empty() {
        debug!(
            user = %user,
            deferred = deferred.len(),
            "deferring attempt-results whose parent document is not yet synced"
        );
    }

    for batch in eligible.chunks(config.push_batch_size) {
        if Instant::now() >= deadline {
            return Ok(outcome);
        }
        let wire: Vec<WireAttempt> = batch.iter().map(WireAttempt::from_local).collect();
        remote.upsert_attempts(&wire).await?;

        let mut confirmed = batch.to_vec();
        for attempt in &mut confirmed {
            attempt.mark_synced();
        }
        local.upsert_attempts(&confirmed).await?;
        outcome.pushed += confirmed.len() as u64;
    }

    for batch in tombstones.chunks(config.push_batch_size) {
        if Instant::now() >= deadline {
            return Ok(outcome);
        }
        let ids: Vec<RecordId> = batch.iter().map(|a| a.id.clone()).collect();
        remote.soft_delete_attempts(user, &ids).await?;
        for id in &ids {
            local.delete_attempt(id).await?;
        }
        outcome.pushed += ids.len() as u64;
    }

    outcome.drained = true;
    Ok(outcome)
}

/// Ids of the referenced documents that are confirmed synced remotely.
pub(crate) async fn synced_parent_ids<L: LocalStore + ?Sized>(
    local: &L,
    attempts: &[AttemptResult],
) -> SyncResult<HashSet<RecordId>> {
    let parent_ids: Vec<RecordId> = attempts
        .iter()
        .map(|a| a.document_id.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let parents = local.documents_by_ids(&parent_ids).await?;
    Ok(parents
        .into_iter()
        .filter(|doc| doc.last_synced_at.is_some())
        .map(|doc| doc.id)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::remote::MockRemote;
    use decksync_core::{Document, DocumentContent, StudyItem};
    use std::time::Duration;

    fn deadline() -> Instant {
        Instant::now() + Duration::from_secs(60)
    }

    fn doc(owner: &str, title: &str, now: i64) -> Document {
        Document::new(
            UserId::new(owner),
            DocumentContent {
                title: title.into(),
                description: String::new(),
                tags: vec![],
                items: vec![StudyItem {
                    term: "aqua".into(),
                    definition: "water".into(),
                }],
            },
            now,
        )
        .unwrap()
    }

    fn attempt(owner: &str, document_id: &RecordId, taken_at: i64) -> AttemptResult {
        AttemptResult::new(
            UserId::new(owner),
            document_id.clone(),
            8,
            10,
            30_000,
            vec![],
            taken_at,
        )
    }

    #[tokio::test]
    async fn push_marks_confirmed_records_clean() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        let d = doc("alice", "Latin", 100);
        store.upsert_documents(&[d.clone()]).await.unwrap();

        let config = SyncConfig::new();
        let outcome = push_documents(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert_eq!(outcome.pushed, 1);
        assert!(outcome.drained);
        assert_eq!(remote.document_count(), 1);
        let stored = store.document(&d.id).await.unwrap().unwrap();
        assert!(!stored.is_dirty());
        assert_eq!(stored.last_synced_version, 1);
    }

    #[tokio::test]
    async fn re_push_after_unconfirmed_success_is_idempotent() {
        // Simulate a crash between remote upsert and local metadata write:
        // the record is still dirty on the next pass and is pushed again.
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        let d = doc("alice", "Latin", 100);
        store.upsert_documents(&[d.clone()]).await.unwrap();

        let config = SyncConfig::new();
        push_documents(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();
        let snapshot = remote.document(d.id.as_str()).unwrap();

        // Force the record dirty again without changing it.
        let mut stale = store.document(&d.id).await.unwrap().unwrap();
        stale.last_synced_version = 0;
        stale.last_synced_at = None;
        store.upsert_documents(&[stale]).await.unwrap();

        push_documents(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert_eq!(remote.document_count(), 1);
        assert_eq!(remote.document(d.id.as_str()).unwrap(), snapshot);
    }

    #[tokio::test]
    async fn batch_failure_keeps_earlier_batches_confirmed() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        let a = doc("alice", "A", 100);
        let b = doc("alice", "B", 200);
        let c = doc("alice", "C", 300);
        store
            .upsert_documents(&[a.clone(), b.clone(), c.clone()])
            .await
            .unwrap();

        // Batch size 1; batches run in (updated_at, id) order, so the
        // first batch (doc A) succeeds and the second (doc B) fails.
        remote.fail_document_upserts_after(1, 1);
        let config = SyncConfig::new().with_push_batch_size(1);

        let result = push_documents(&store, &remote, &user, &config, deadline()).await;
        assert!(result.is_err());

        // A is confirmed and stays clean; B and C remain dirty.
        assert!(!store.document(&a.id).await.unwrap().unwrap().is_dirty());
        let dirty = store.dirty_documents(&user).await.unwrap();
        let dirty_ids: Vec<&RecordId> = dirty.iter().map(|d| &d.id).collect();
        assert_eq!(dirty_ids, vec![&b.id, &c.id]);
        assert_eq!(remote.document_count(), 1);
    }

    #[tokio::test]
    async fn unsynced_parent_defers_child() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        let parent = doc("alice", "Latin", 100);
        let child = attempt("alice", &parent.id, 150);
        store.upsert_documents(&[parent.clone()]).await.unwrap();
        store.upsert_attempts(&[child.clone()]).await.unwrap();

        let config = SyncConfig::new();
        let outcome = push_attempts(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert_eq!(outcome.pushed, 0);
        assert_eq!(outcome.deferred_children, 1);
        assert_eq!(remote.attempt_count(), 0);

        // Once the parent is confirmed synced, the next pass includes it.
        let mut synced_parent = parent;
        synced_parent.mark_synced(200);
        store.upsert_documents(&[synced_parent]).await.unwrap();

        let outcome = push_attempts(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();
        assert_eq!(outcome.pushed, 1);
        assert_eq!(outcome.deferred_children, 0);
        assert_eq!(remote.attempt_count(), 1);
        assert!(store.attempt(&child.id).await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn tombstone_is_soft_deleted_remotely_and_purged_locally() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        let mut d = doc("alice", "Latin", 100);
        store.upsert_documents(&[d.clone()]).await.unwrap();

        let config = SyncConfig::new();
        push_documents(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        // Delete locally; the tombstone is dirty again.
        let mut stored = store.document(&d.id).await.unwrap().unwrap();
        stored.soft_delete(400).unwrap();
        d = stored.clone();
        store.upsert_documents(&[stored]).await.unwrap();

        push_documents(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert!(store.document(&d.id).await.unwrap().is_none());
        let remote_record = remote.document(d.id.as_str()).unwrap();
        assert!(remote_record
            .get("deleted_at")
            .and_then(serde_json::Value::as_str)
            .is_some());
    }

    #[tokio::test]
    async fn shared_seed_content_is_never_pushed() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");

        // A pulled seed document: shared owner, clean.
        let mut seed = doc("alice", "Seed", 100);
        seed.owner = UserId::shared();
        store.upsert_documents(&[seed]).await.unwrap();

        let config = SyncConfig::new();
        let outcome = push_documents(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert_eq!(outcome.pushed, 0);
        assert_eq!(remote.document_count(), 0);
    }

    #[tokio::test]
    async fn exhausted_budget_stops_between_batches() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        store
            .upsert_documents(&[doc("alice", "A", 100), doc("alice", "B", 200)])
            .await
            .unwrap();

        let config = SyncConfig::new().with_push_batch_size(1);
        let expired = Instant::now() - Duration::from_millis(1);
        let outcome = push_documents(&store, &remote, &user, &config, expired)
            .await
            .unwrap();

        assert_eq!(outcome.pushed, 0);
        assert!(!outcome.drained);
    }
}
