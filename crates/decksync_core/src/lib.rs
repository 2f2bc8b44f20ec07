//! # Decksync Core
//!
//! Data model for the decksync reconciliation engine.
//!
//! This crate provides:
//! - Record and owner identifiers
//! - The `Document` (study set) and `AttemptResult` record types
//! - Sync cursor and circuit-breaker state records
//! - Canonical content hashing for change detection
//!
//! This is a pure data crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attempt;
mod document;
mod error;
pub mod hash;
mod types;

pub use attempt::{AttemptAnswer, AttemptResult};
pub use document::{Document, DocumentContent, StudyItem};
pub use error::{CoreError, CoreResult};
pub use types::{BreakerRecord, Collection, RecordId, SyncCursor, UnixMillis, UserId};
