//! One-time backfill of pre-existing local-only records.
//!
//! The first time a user's client gains connectivity, records created
//! before sync existed are uploaded wholesale. Each collection is gated by
//! a persisted done flag: a batch failure halts without setting it (the
//! next pass retries), full success sets it, and it is never re-run after
//! that — later local-only records are handled by the normal push phase.

use crate::clock::now_ms;
use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::local::LocalStore;
use crate::push::synced_parent_ids;
use crate::remote::RemoteStore;
use decksync_core::{Collection, UserId};
use decksync_protocol::{WireAttempt, WireDocument};
use std::time::Instant;
use tracing::info;

/// What one backfill run accomplished.
#[derive(Debug, Default)]
pub(crate) struct BackfillReport {
    /// Records uploaded this run.
    pub uploaded: u64,
    /// False when the time budget expired before both collections were
    /// flagged done.
    pub completed: bool,
}

/// Runs the backfill for both collections, documents first.
pub(crate) async fn run<L, R>(
    local: &L,
    remote: &R,
    user: &UserId,
    config: &SyncConfig,
    deadline: Instant,
) -> SyncResult<BackfillReport>
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let mut report = BackfillReport {
        uploaded: 0,
        completed: false,
    };

    if !local.backfill_done(user, Collection::Documents).await? {
        let pending: Vec<_> = local
            .documents_by_owner(user)
            .await?
            .into_iter()
            .filter(|doc| !doc.is_tombstone() && doc.last_synced_at.is_none())
            .collect();

        for batch in pending.chunks(config.backfill_batch_size) {
            if Instant::now() >= deadline {
                return Ok(report);
            }
            let wire: Vec<WireDocument> = batch.iter().map(WireDocument::from_local).collect();
            remote.upsert_documents(&wire).await?;

            let now = now_ms();
            let mut confirmed = batch.to_vec();
            for doc in &mut confirmed {
                doc.mark_synced(now);
            }
            local.upsert_documents(&confirmed).await?;
            report.uploaded += confirmed.len() as u64;
        }
        local.set_backfill_done(user, Collection::Documents).await?;
        info!(user = %user, collection = %Collection::Documents, "backfill complete");
    }

    if !local.backfill_done(user, Collection::AttemptResults).await? {
        let pending: Vec<_> = local
            .attempts_by_owner(user)
            .await?
            .into_iter()
            .filter(|a| !a.synced && !a.is_tombstone())
            .collect();

        // Attempts whose parent is not yet synced are left for the push
        // phase; they do not hold the done flag hostage.
        let synced_parents = synced_parent_ids(local, &pending).await?;
        let eligible: Vec<_> = pending
            .into_iter()
            .filter(|a| synced_parents.contains(&a.document_id))
            .collect();

        for batch in eligible.chunks(config.backfill_batch_size) {
            if Instant::now() >= deadline {
                return Ok(report);
            }
            let wire: Vec<WireAttempt> = batch.iter().map(WireAttempt::from_local).collect();
            remote.upsert_attempts(&wire).await?;

            let mut confirmed = batch.to_vec();
            for attempt in &mut confirmed {
                attempt.mark_synced();
            }
            local.upsert_attempts(&confirmed).await?;
            report.uploaded += confirmed.len() as u64;
        }
        local
            .set_backfill_done(user, Collection::AttemptResults)
            .await?;
        info!(user = %user, collection = %Collection::AttemptResults, "backfill complete");
    }

    report.completed = true;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::remote::MockRemote;
    use decksync_core::{AttemptResult, Document, DocumentContent, RecordId, StudyItem};
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
    async fn backfill_uploads_and_sets_done_flags() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        let d = doc("alice", "Latin", 100);
        let a = attempt("alice", &d.id, 150);
        store.upsert_documents(&[d.clone()]).await.unwrap();
        store.upsert_attempts(&[a.clone()]).await.unwrap();

        let config = SyncConfig::new();
        let report = run(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert!(report.completed);
        assert_eq!(report.uploaded, 2);
        assert_eq!(remote.document_count(), 1);
        assert_eq!(remote.attempt_count(), 1);
        assert!(store
            .backfill_done(&user, Collection::Documents)
            .await
            .unwrap());
        assert!(store
            .backfill_done(&user, Collection::AttemptResults)
            .await
            .unwrap());
        // Uploaded records are marked synced so the push phase sees them
        // clean.
        assert!(store.dirty_documents(&user).await.unwrap().is_empty());
        assert!(store.unsynced_attempts(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_failure_halts_without_done_flag() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        store
            .upsert_documents(&[doc("alice", "A", 100), doc("alice", "B", 200)])
            .await
            .unwrap();

        remote.fail_document_upserts_after(1, 1);
        let config = SyncConfig::new().with_backfill_batch_size(1);

        let result = run(&store, &remote, &user, &config, deadline()).await;
        assert!(result.is_err());
        assert!(!store
            .backfill_done(&user, Collection::Documents)
            .await
            .unwrap());

        // Retry on the next pass finishes only the remainder.
        let report = run(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();
        assert!(report.completed);
        assert_eq!(report.uploaded, 1);
        assert_eq!(remote.document_count(), 2);
    }

    #[tokio::test]
    async fn backfill_never_reruns_after_success() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");

        let config = SyncConfig::new();
        run(&store, &remote, &user, &config, deadline()).await.unwrap();

        // A record created afterwards is a matter for the push phase.
        store
            .upsert_documents(&[doc("alice", "Later", 500)])
            .await
            .unwrap();
        let report = run(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert_eq!(report.uploaded, 0);
        assert_eq!(remote.document_count(), 0);
    }

    #[tokio::test]
    async fn orphaned_attempts_do_not_block_the_flag() {
        let store = MemoryStore::new();
        let remote = MockRemote::new();
        let user = UserId::new("alice");
        // Attempt referencing a document that never synced.
        let parent = doc("alice", "Latin", 100);
        store.upsert_documents(&[parent.clone()]).await.unwrap();
        store
            .upsert_attempts(&[attempt("alice", &RecordId::new("gone"), 150)])
            .await
            .unwrap();

        let config = SyncConfig::new();
        let report = run(&store, &remote, &user, &config, deadline())
            .await
            .unwrap();

        assert!(report.completed);
        assert!(store
            .backfill_done(&user, Collection::AttemptResults)
            .await
            .unwrap());
        assert_eq!(remote.attempt_count(), 0);
    }
}
