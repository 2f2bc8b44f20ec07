//! The study-set document record.

use crate::error::{CoreError, CoreResult};
use crate::hash::content_hash;
use crate::types::{RecordId, UnixMillis, UserId};
use serde::{Deserialize, Serialize};

/// A single prompt/answer pair inside a study set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyItem {
    /// The prompt side.
    pub term: String,
    /// The answer side.
    pub definition: String,
}

/// The mutable, content-bearing subset of a document.
///
/// This is exactly the part covered by the content hash; metadata and sync
/// state are excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// User-assigned tags.
    pub tags: Vec<String>,
    /// The study items, in author order.
    pub items: Vec<StudyItem>,
}

/// A user-owned study-set record subject to sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Opaque, globally unique identity.
    pub id: RecordId,
    /// Owning user, or the shared sentinel for seed content.
    pub owner: UserId,
    /// Mutable content.
    pub content: DocumentContent,
    /// Monotonic edit counter, bumped only by local edits, never by sync.
    pub version: i64,
    /// Hash of `content`, recomputed on every local edit and carried
    /// opaquely through sync.
    pub content_hash: Option<String>,
    /// Creation instant (client-assigned).
    pub created_at: UnixMillis,
    /// Last edit instant (client-assigned).
    pub updated_at: UnixMillis,
    /// Soft-delete tombstone instant, if deleted.
    pub deleted_at: Option<UnixMillis>,
    /// Version last confirmed by the remote store. Local-only.
    pub last_synced_version: i64,
    /// Instant of the last remote confirmation. Local-only.
    pub last_synced_at: Option<UnixMillis>,
}

impl Document {
    /// Creates a fresh local document at version 1.
    pub fn new(owner: UserId, content: DocumentContent, now: UnixMillis) -> CoreResult<Self> {
        let hash = content_hash(&content)?;
        Ok(Self {
            id: RecordId::generate(),
            owner,
            content,
            version: 1,
            content_hash: Some(hash),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            last_synced_version: 0,
            last_synced_at: None,
        })
    }

    /// A document is clean (no push needed) iff its last synced version is
    /// its current version.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.last_synced_version != self.version
    }

    /// Returns true if this record is a soft-delete tombstone.
    #[must_use]
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Replaces the content with a local edit: bumps the version, recomputes
    /// the content hash and touches `updated_at`.
    ///
    /// Fails for shared seed content, which is read-only.
    pub fn apply_edit(&mut self, content: DocumentContent, now: UnixMillis) -> CoreResult<()> {
        self.check_mutable()?;
        self.content_hash = Some(content_hash(&content)?);
        self.content = content;
        self.version += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Soft-deletes the document. The tombstone is itself an edit and keeps
    /// participating in sync until both sides have observed it.
    pub fn soft_delete(&mut self, now: UnixMillis) -> CoreResult<()> {
        self.check_mutable()?;
        self.deleted_at = Some(now);
        self.version += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Records a remote confirmation of the current version.
    pub fn mark_synced(&mut self, now: UnixMillis) {
        self.last_synced_version = self.version;
        self.last_synced_at = Some(now);
    }

    fn check_mutable(&self) -> CoreResult<()> {
        if self.owner.is_shared() {
            return Err(CoreError::SharedOwnerMutation {
                id: self.id.to_string(),
            });
        }
        Ok(())
    }
}
