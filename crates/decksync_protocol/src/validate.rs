//! Schema validation for pulled records.
//!
//! The remote adapter hands pulled pages to the engine as raw JSON values;
//! each record is validated here into either a typed wire record or a tagged
//! failure. A failure still tries to recover the record's (updated_at, id)
//! key so the pull cursor can advance past it.

use crate::wire::{WireAttempt, WireDocument};
use chrono::{DateTime, Utc};
use decksync_core::SyncCursor;
use serde_json::Value;

/// Outcome of validating one pulled record.
#[derive(Debug, Clone)]
pub enum Validated<T> {
    /// The record matched the collection schema.
    Valid(T),
    /// The record did not match; carries whatever could be recovered.
    Invalid(InvalidRecord),
}

impl<T> Validated<T> {
    /// Returns true for the `Valid` variant.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Validated::Valid(_))
    }
}

/// A record that failed schema validation.
#[derive(Debug, Clone)]
pub struct InvalidRecord {
    /// The record id, if one could be recovered.
    pub id: Option<String>,
    /// The (updated_at, id) key, if both parts could be recovered.
    pub key: Option<SyncCursor>,
    /// Why validation failed.
    pub reason: String,
}

/// Validates one raw record against the documents schema.
#[must_use]
pub fn validate_document(raw: &Value) -> Validated<WireDocument> {
    match serde_json::from_value::<WireDocument>(raw.clone()) {
        Ok(doc) => match document_invariants(&doc) {
            None => Validated::Valid(doc),
            Some(reason) => Validated::Invalid(invalid(raw, reason)),
        },
        Err(err) => Validated::Invalid(invalid(raw, err.to_string())),
    }
}

/// Validates one raw record against the attempt-results schema.
#[must_use]
pub fn validate_attempt(raw: &Value) -> Validated<WireAttempt> {
    match serde_json::from_value::<WireAttempt>(raw.clone()) {
        Ok(attempt) => match attempt_invariants(&attempt) {
            None => Validated::Valid(attempt),
            Some(reason) => Validated::Invalid(invalid(raw, reason)),
        },
        Err(err) => Validated::Invalid(invalid(raw, err.to_string())),
    }
}

fn document_invariants(doc: &WireDocument) -> Option<String> {
    if doc.id.is_empty() {
        return Some("empty id".into());
    }
    if doc.owner.is_empty() {
        return Some("empty owner".into());
    }
    if doc.version < 1 {
        return Some(format!("version {} out of range", doc.version));
    }
    None
}

fn attempt_invariants(attempt: &WireAttempt) -> Option<String> {
    if attempt.id.is_empty() {
        return Some("empty id".into());
    }
    if attempt.owner.is_empty() {
        return Some("empty owner".into());
    }
    if attempt.document_id.is_empty() {
        return Some("empty document_id".into());
    }
    if attempt.score > attempt.total {
        return Some(format!(
            "score {} exceeds total {}",
            attempt.score, attempt.total
        ));
    }
    None
}

fn invalid(raw: &Value, reason: String) -> InvalidRecord {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let key = match (&id, recover_time(raw)) {
        (Some(id), Some(time)) => Some(SyncCursor::new(time, id.clone())),
        _ => None,
    };

    InvalidRecord { id, key, reason }
}

fn recover_time(raw: &Value) -> Option<i64> {
    raw.get("updated_at")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .map(|ts| ts.timestamp_millis())
}
