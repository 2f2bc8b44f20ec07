//! # Decksync Protocol
//!
//! Wire record shapes and reconciliation rules for decksync.
//!
//! This crate provides:
//! - `WireDocument` / `WireAttempt` remote record shapes (ISO-8601
//!   timestamps) and their conversions to and from the local numeric form
//! - A schema-validating deserializer producing a typed record or a tagged
//!   failure per pulled record
//! - The pure conflict resolver deciding whether the local or remote
//!   variant of a document wins
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod conflict;
mod validate;
mod wire;

pub use conflict::{resolve, Resolution, Winner};
pub use validate::{validate_attempt, validate_document, InvalidRecord, Validated};
pub use wire::{from_wire_time, to_wire_time, WireAnswer, WireAttempt, WireDocument, WireItem};
