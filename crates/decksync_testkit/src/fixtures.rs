//! Record fixtures.

use decksync_core::{
    AttemptAnswer, AttemptResult, Document, DocumentContent, RecordId, StudyItem, UnixMillis,
    UserId,
};
use serde_json::{json, Value};

/// A fresh (dirty) document owned by `owner`.
pub fn document(owner: &str, title: &str, now: UnixMillis) -> Document {
    Document::new(
        UserId::new(owner),
        content(title),
        now,
    )
    .expect("fixture content always hashes")
}

/// A document that has already been confirmed by the remote store.
pub fn synced_document(owner: &str, title: &str, now: UnixMillis) -> Document {
    let mut doc = document(owner, title, now);
    doc.mark_synced(now);
    doc
}

/// Minimal study-set content.
pub fn content(title: &str) -> DocumentContent {
    DocumentContent {
        title: title.into(),
        description: format!("{title} description"),
        tags: vec!["fixture".into()],
        items: vec![
            StudyItem {
                term: "aqua".into(),
                definition: "water".into(),
            },
            StudyItem {
                term: "terra".into(),
                definition: "earth".into(),
            },
        ],
    }
}

/// A fresh (unsynced) attempt against `document_id`.
pub fn attempt(owner: &str, document_id: &RecordId, taken_at: UnixMillis) -> AttemptResult {
    AttemptResult::new(
        UserId::new(owner),
        document_id.clone(),
        1,
        2,
        30_000,
        vec![AttemptAnswer {
            item_index: 0,
            response: "water".into(),
            correct: true,
        }],
        taken_at,
    )
}

/// A raw document record in the remote wire shape.
pub fn wire_document_value(id: &str, owner: &str, version: i64, updated_at: &str) -> Value {
    json!({
        "id": id,
        "owner": owner,
        "title": format!("title {id}"),
        "description": "",
        "tags": [],
        "items": [{"term": "aqua", "definition": "water"}],
        "version": version,
        "content_hash": format!("hash-{id}-{version}"),
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": updated_at,
        "deleted_at": null
    })
}

/// A raw attempt record in the remote wire shape.
pub fn wire_attempt_value(id: &str, owner: &str, document_id: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "owner": owner,
        "document_id": document_id,
        "score": 1,
        "total": 2,
        "duration_ms": 30000,
        "answers": [],
        "taken_at": updated_at,
        "updated_at": updated_at,
        "deleted_at": null
    })
}

/// A record carrying only its key fields: enough to recover a cursor key,
/// not enough to pass schema validation.
pub fn malformed_record(id: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "owner": "alice",
        "updated_at": updated_at
    })
}
