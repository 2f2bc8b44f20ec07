//! Remote record shapes.
//!
//! The remote backend serializes timestamps as ISO-8601 strings; local
//! storage uses numeric instants. Only this module and the adapters built on
//! it see both forms.

use chrono::{DateTime, TimeZone, Utc};
use decksync_core::{
    AttemptAnswer, AttemptResult, Document, DocumentContent, RecordId, StudyItem, SyncCursor,
    UnixMillis, UserId,
};
use serde::{Deserialize, Serialize};

/// Converts a local instant into the remote wire form.
#[must_use]
pub fn to_wire_time(ms: UnixMillis) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Converts a remote instant into the local numeric form.
#[must_use]
pub fn from_wire_time(ts: DateTime<Utc>) -> UnixMillis {
    ts.timestamp_millis()
}

/// A study item as the backend stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireItem {
    /// The prompt side.
    pub term: String,
    /// The answer side.
    pub definition: String,
}

/// A study-set document as the backend stores it.
///
/// Carries every field of the local record except the local-only sync
/// metadata, which is never transmitted as authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireDocument {
    /// Record identity.
    pub id: String,
    /// Owning user, or the shared sentinel.
    pub owner: String,
    /// Display title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// User-assigned tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Study items, in author order.
    #[serde(default)]
    pub items: Vec<WireItem>,
    /// Monotonic edit counter.
    pub version: i64,
    /// Content hash, carried opaquely.
    #[serde(default)]
    pub content_hash: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last edit instant; pull ordering is (updated_at asc, id asc).
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone instant.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WireDocument {
    /// Builds the wire form of a local document.
    #[must_use]
    pub fn from_local(doc: &Document) -> Self {
        Self {
            id: doc.id.to_string(),
            owner: doc.owner.to_string(),
            title: doc.content.title.clone(),
            description: doc.content.description.clone(),
            tags: doc.content.tags.clone(),
            items: doc
                .content
                .items
                .iter()
                .map(|item| WireItem {
                    term: item.term.clone(),
                    definition: item.definition.clone(),
                })
                .collect(),
            version: doc.version,
            content_hash: doc.content_hash.clone(),
            created_at: to_wire_time(doc.created_at),
            updated_at: to_wire_time(doc.updated_at),
            deleted_at: doc.deleted_at.map(to_wire_time),
        }
    }

    /// Maps this record into the local form.
    ///
    /// Sync metadata is left unset; the caller decides whether the record
    /// won reconciliation and stamps it accordingly.
    #[must_use]
    pub fn into_local(self) -> Document {
        Document {
            id: RecordId::new(self.id),
            owner: UserId::new(self.owner),
            content: DocumentContent {
                title: self.title,
                description: self.description,
                tags: self.tags,
                items: self
                    .items
                    .into_iter()
                    .map(|item| StudyItem {
                        term: item.term,
                        definition: item.definition,
                    })
                    .collect(),
            },
            version: self.version,
            content_hash: self.content_hash,
            created_at: from_wire_time(self.created_at),
            updated_at: from_wire_time(self.updated_at),
            deleted_at: self.deleted_at.map(from_wire_time),
            last_synced_version: 0,
            last_synced_at: None,
        }
    }

    /// The pull-ordering key of this record.
    #[must_use]
    pub fn sort_key(&self) -> SyncCursor {
        SyncCursor::new(from_wire_time(self.updated_at), self.id.clone())
    }
}

/// One answer inside a wire attempt record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAnswer {
    /// Index of the study item answered.
    pub item_index: u32,
    /// What the user entered.
    pub response: String,
    /// Whether the response was accepted.
    pub correct: bool,
}

/// An attempt-result record as the backend stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireAttempt {
    /// Record identity.
    pub id: String,
    /// Owning user.
    pub owner: String,
    /// The document the attempt was taken against.
    pub document_id: String,
    /// Number of correct answers.
    pub score: u32,
    /// Number of items in the attempt.
    pub total: u32,
    /// Wall-clock duration of the attempt.
    pub duration_ms: u64,
    /// Per-item answers.
    #[serde(default)]
    pub answers: Vec<WireAnswer>,
    /// When the attempt was taken.
    pub taken_at: DateTime<Utc>,
    /// Last change instant; pull ordering is (updated_at asc, id asc).
    pub updated_at: DateTime<Utc>,
    /// Soft-delete tombstone instant.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WireAttempt {
    /// Builds the wire form of a local attempt record.
    #[must_use]
    pub fn from_local(attempt: &AttemptResult) -> Self {
        // The payload is immutable, so the last change is either the
        // tombstone or the attempt itself.
        let updated_at = attempt.deleted_at.unwrap_or(attempt.taken_at);
        Self {
            id: attempt.id.to_string(),
            owner: attempt.owner.to_string(),
            document_id: attempt.document_id.to_string(),
            score: attempt.score,
            total: attempt.total,
            duration_ms: attempt.duration_ms,
            answers: attempt
                .answers
                .iter()
                .map(|a| WireAnswer {
                    item_index: a.item_index,
                    response: a.response.clone(),
                    correct: a.correct,
                })
                .collect(),
            taken_at: to_wire_time(attempt.taken_at),
            updated_at: to_wire_time(updated_at),
            deleted_at: attempt.deleted_at.map(to_wire_time),
        }
    }

    /// Maps this record into the local form.
    ///
    /// The `synced` flag is left unset; the caller stamps it on persist.
    #[must_use]
    pub fn into_local(self) -> AttemptResult {
        AttemptResult {
            id: RecordId::new(self.id),
            owner: UserId::new(self.owner),
            document_id: RecordId::new(self.document_id),
            score: self.score,
            total: self.total,
            duration_ms: self.duration_ms,
            answers: self
                .answers
                .into_iter()
                .map(|a| AttemptAnswer {
                    item_index: a.item_index,
                    response: a.response,
                    correct: a.correct,
                })
                .collect(),
            taken_at: from_wire_time(self.taken_at),
            synced: false,
            deleted_at: self.deleted_at.map(from_wire_time),
        }
    }

    /// The pull-ordering key of this record.
    #[must_use]
    pub fn sort_key(&self) -> SyncCursor {
        SyncCursor::new(from_wire_time(self.updated_at), self.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksync_core::UserId;

    fn local_document() -> Document {
        let content = DocumentContent {
            title: "Latin roots".into(),
            description: "Common roots".into(),
            tags: vec!["latin".into()],
            items: vec![StudyItem {
                term: "aqua".into(),
                definition: "water".into(),
            }],
        };
        Document::new(UserId::new("alice"), content, 1_700_000_000_000).unwrap()
    }

    #[test]
    fn document_local_wire_local() {
        let doc = local_document();
        let wire = WireDocument::from_local(&doc);
        let back = wire.into_local();

        assert_eq!(back.id, doc.id);
        assert_eq!(back.owner, doc.owner);
        assert_eq!(back.content, doc.content);
        assert_eq!(back.version, doc.version);
        assert_eq!(back.content_hash, doc.content_hash);
        assert_eq!(back.updated_at, doc.updated_at);
        // Sync metadata never crosses the wire.
        assert_eq!(back.last_synced_version, 0);
        assert_eq!(back.last_synced_at, None);
    }

    #[test]
    fn wire_timestamps_are_iso8601() {
        let doc = local_document();
        let wire = WireDocument::from_local(&doc);

        let json = serde_json::to_value(&wire).unwrap();
        let updated = json.get("updated_at").and_then(|v| v.as_str()).unwrap();
        assert!(updated.starts_with("2023-11-14T"));
        assert!(updated.ends_with('Z'));
    }

    #[test]
    fn wire_time_roundtrip() {
        let ms = 1_700_000_123_456;
        assert_eq!(from_wire_time(to_wire_time(ms)), ms);
    }

    #[test]
    fn attempt_updated_at_follows_tombstone() {
        let mut attempt = AttemptResult::new(
            UserId::new("alice"),
            RecordId::new("doc-1"),
            7,
            10,
            30_000,
            vec![],
            1_000,
        );
        assert_eq!(
            WireAttempt::from_local(&attempt).sort_key().watermark_time,
            1_000
        );

        attempt.soft_delete(2_000);
        assert_eq!(
            WireAttempt::from_local(&attempt).sort_key().watermark_time,
            2_000
        );
    }

    #[test]
    fn document_sort_key_uses_updated_at_then_id() {
        let doc = local_document();
        let wire = WireDocument::from_local(&doc);
        let key = wire.sort_key();

        assert_eq!(key.watermark_time, doc.updated_at);
        assert_eq!(key.watermark_id, doc.id.to_string());
    }
}
