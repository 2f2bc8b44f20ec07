//! Pull phase: fetch, validate and reconcile remote changes.

use crate::breaker::CircuitBreaker;
use crate::clock::now_ms;
use crate::config::SyncConfig;
use crate::cursor::CursorManager;
use crate::error::SyncResult;
use crate::local::LocalStore;
use crate::remote::RemoteStore;
use decksync_core::{AttemptResult, Collection, Document, RecordId, SyncCursor, UserId};
use decksync_protocol::{resolve, validate_attempt, validate_document, Validated, Winner};
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::warn;

/// What one pull phase accomplished.
#[derive(Debug, Default)]
pub(crate) struct PullOutcome {
    /// Remote-win records persisted or purged locally.
    pub applied: u64,
    /// Records skipped because they failed schema validation.
    pub invalid: u64,
    /// True when a whole page failed validation and the breaker tripped.
    pub tripped: bool,
    /// True when the remote reported no further pages within the budget.
    pub drained: bool,
}

fn merge_key(current: Option<SyncCursor>, candidate: SyncCursor) -> Option<SyncCursor> {
    Some(match current {
        Some(key) => key.latest(candidate),
        None => candidate,
    })
}

/// Pulls document changes strictly after the persisted cursor.
///
/// Each page is validated record by record. A page with some invalid
/// records is routine bad data: the bad records are skipped and the cursor
/// still advances past them. A non-empty page with zero valid records
/// signals backend schema drift: the breaker trips and the cursor stays
/// put so the same page is inspected again once the block lapses.
pub(crate) async fn pull_documents<L, R>(
    local: &L,
    remote: &R,
    user: &UserId,
    config: &SyncConfig,
    deadline: Instant,
) -> SyncResult<PullOutcome>
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let cursors = CursorManager::new(local);
    let breaker = CircuitBreaker::new(local);
    let mut outcome = PullOutcome::default();

    loop {
        let cursor = cursors.get(user, Collection::Documents).await?;
        let page = remote
            .list_documents(user, &cursor, config.pull_page_size)
            .await?;
        if page.is_empty() {
            outcome.drained = true;
            break;
        }

        let mut valid = Vec::new();
        let mut page_key: Option<SyncCursor> = None;
        let mut invalid_count = 0u64;
        for raw in &page {
            match validate_document(raw) {
                Validated::Valid(wire) => {
                    page_key = merge_key(page_key, wire.sort_key());
                    valid.push(wire);
                }
                Validated::Invalid(bad) => {
                    invalid_count += 1;
                    warn!(
                        user = %user,
                        collection = %Collection::Documents,
                        id = bad.id.as_deref().unwrap_or("<unknown>"),
                        reason = %bad.reason,
                        "skipping invalid pulled record"
                    );
                    if let Some(key) = bad.key {
                        page_key = merge_key(page_key, key);
                    }
                }
            }
        }

        if valid.is_empty() {
            breaker
                .trip(
                    user,
                    Collection::Documents,
                    format!("all {} records in pulled page failed validation", page.len()),
                    config.breaker_ttl,
                    now_ms(),
                )
                .await?;
            outcome.tripped = true;
            break;
        }
        outcome.invalid += invalid_count;

        let ids: Vec<RecordId> = valid
            .iter()
            .map(|wire| RecordId::new(wire.id.clone()))
            .collect();
        let existing: HashMap<RecordId, Document> = local
            .documents_by_ids(&ids)
            .await?
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();

        let now = now_ms();
        let mut winners: Vec<Document> = Vec::new();
        let mut purged: Vec<RecordId> = Vec::new();
        for wire in valid {
            let incoming = wire.into_local();
            let held = existing.get(&incoming.id);
            let resolution = resolve(held, incoming);
            if resolution.ambiguous_tie {
                warn!(
                    user = %user,
                    id = %resolution.merged.id,
                    "conflict tie could not be discriminated; remote wins"
                );
            }
            match resolution.winner {
                Winner::Local => {}
                Winner::Remote => {
                    let mut merged = resolution.merged;
                    if merged.is_tombstone() {
                        // Both sides have observed the tombstone; purge the
                        // local copy. A tombstone for a record never held
                        // locally is a no-op.
                        if held.is_some() {
                            purged.push(merged.id.clone());
                        }
                    } else {
                        merged.mark_synced(now);
                        winners.push(merged);
                    }
                }
            }
        }

        let short_page = page.len() < config.pull_page_size;
        let target = match page_key {
            Some(key) => cursor.clone().latest(key),
            None => cursor.clone(),
        };
        outcome.applied += (winners.len() + purged.len()) as u64;
        local
            .commit_pulled_documents(user, &winners, &purged, target)
            .await?;

        if short_page {
            outcome.drained = true;
            break;
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    Ok(outcome)
}

/// Pulls attempt-result changes strictly after the persisted cursor.
///
/// Attempt payloads are immutable, so reconciliation is simple: an id we
/// already hold keeps the local copy, a remote tombstone purges it, and
/// anything else is inserted as a confirmed record.
pub(crate) async fn pull_attempts<L, R>(
    local: &L,
    remote: &R,
    user: &UserId,
    config: &SyncConfig,
    deadline: Instant,
) -> SyncResult<PullOutcome>
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let cursors = CursorManager::new(local);
    let breaker = CircuitBreaker::new(local);
    let mut outcome = PullOutcome::default();

    loop {
        let cursor = cursors.get(user, Collection::AttemptResults).await?;
        let page = remote
            .list_attempts(user, &cursor, config.pull_page_size)
            .await?;
        if page.is_empty() {
            outcome.drained = true;
            break;
        }

        let mut valid = Vec::new();
        let mut page_key: Option<SyncCursor> = None;
        let mut invalid_count = 0u64;
        for raw in &page {
            match validate_attempt(raw) {
                Validated::Valid(wire) => {
                    page_key = merge_key(page_key, wire.sort_key());
                    valid.push(wire);
                }
                Validated::Invalid(bad) => {
                    invalid_count += 1;
                    warn!(
                        user = %user,
                        collection = %Collection::AttemptResults,
                        id = bad.id.as_deref().unwrap_or("<unknown>"),
                        reason = %bad.reason,
                        "skipping invalid pulled record"
                    );
                    if let Some(key) = bad.key {
                        page_key = merge_key(page_key, key);
                    }
                }
            }
        }

        if valid.is_empty() {
            breaker
                .trip(
                    user,
                    Collection::AttemptResults,
                    format!("all {} records in pulled page failed validation", page.len()),
                    config.breaker_ttl,
                    now_ms(),
                )
                .await?;
            outcome.tripped = true;
            break;
        }
        outcome.invalid += invalid_count;

        let ids: Vec<RecordId> = valid
            .iter()
            .map(|wire| RecordId::new(wire.id.clone()))
            .collect();
        let mut held_ids: HashSet<RecordId> = HashSet::new();
        for id in &ids {
            if local.attempt(id).await?.is_some() {
                held_ids.insert(id.clone());
            }
        }

        let mut inserted: Vec<AttemptResult> = Vec::new();
        let mut purged: Vec<RecordId> = Vec::new();
        for wire in valid {
            let mut incoming = wire.into_local();
            let held = held_ids.contains(&incoming.id);
            if incoming.is_tombstone() {
                if held {
                    purged.push(incoming.id.clone());
                }
            } else if !held {
                incoming.mark_synced();
                inserted.push(incoming);
            }
        }

        let short_page = page.len() < config.pull_page_size;
        let target = match page_key {
            Some(key) => cursor.clone().latest(key),
            None => cursor.clone(),
        };
        outcome.applied += (inserted.len() + purged.len()) as u64;
        local
            .commit_pulled_attempts(user, &inserted, &purged, target)
            .await?;

        if short_page {
            outcome.drained = true;
            break;
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    Ok(outcome)
}
