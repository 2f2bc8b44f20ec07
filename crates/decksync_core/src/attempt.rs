//! The attempt-result record.

use crate::types::{RecordId, UnixMillis, UserId};
use serde::{Deserialize, Serialize};

/// One answer given during an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptAnswer {
    /// Index of the study item answered.
    pub item_index: u32,
    /// What the user entered.
    pub response: String,
    /// Whether the response was accepted.
    pub correct: bool,
}

/// A record of one completed study attempt.
///
/// The payload is immutable once written; only the local `synced` flag and
/// the tombstone change afterwards. An attempt may only be pushed once its
/// referenced document has been observed as synced remotely, since parent
/// and child are pushed in independent passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    /// Opaque, globally unique identity.
    pub id: RecordId,
    /// Owning user.
    pub owner: UserId,
    /// The document this attempt was taken against.
    pub document_id: RecordId,
    /// Number of correct answers.
    pub score: u32,
    /// Number of items in the attempt.
    pub total: u32,
    /// Wall-clock duration of the attempt.
    pub duration_ms: u64,
    /// Per-item answers.
    pub answers: Vec<AttemptAnswer>,
    /// When the attempt was taken (client-assigned).
    pub taken_at: UnixMillis,
    /// Whether the remote store has confirmed this record. Local-only.
    pub synced: bool,
    /// Soft-delete tombstone instant, if deleted.
    pub deleted_at: Option<UnixMillis>,
}

impl AttemptResult {
    /// Creates a fresh, unsynced attempt record.
    pub fn new(
        owner: UserId,
        document_id: RecordId,
        score: u32,
        total: u32,
        duration_ms: u64,
        answers: Vec<AttemptAnswer>,
        taken_at: UnixMillis,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            owner,
            document_id,
            score,
            total,
            duration_ms,
            answers,
            taken_at,
            synced: false,
            deleted_at: None,
        }
    }

    /// Returns true if this record is a soft-delete tombstone.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Records a remote confirmation.
    pub fn mark_synced(&mut self) {
        self.synced = true;
    }

    /// Soft-deletes the attempt. Clears the synced flag so the tombstone is
    /// propagated on the next pass.
    pub fn soft_delete(&mut self, now: UnixMillis) {
        self.deleted_at = Some(now);
        self.synced = false;
    }
}
