//! # Decksync Testkit
//!
//! Test utilities for decksync.
//!
//! This crate provides:
//! - Record fixtures (documents, attempts, raw wire records)
//! - Property-based generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use decksync_testkit::fixtures;
//!
//! let doc = fixtures::document("alice", "Latin roots", 1_000);
//! assert!(doc.is_dirty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
