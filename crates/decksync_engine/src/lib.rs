//! # Decksync Engine
//!
//! Bidirectional sync engine keeping a per-user collection of study-set
//! documents and attempt-result records consistent between a local embedded
//! store and a shared remote backend.
//!
//! This crate provides:
//! - The sync orchestrator state machine
//!   (idle → guarding → backfilling → pushing → pulling)
//! - Cursor management with a (update-time, id) watermark
//! - A circuit breaker for detected backend schema drift
//! - A cross-instance concurrency guard
//! - Local and remote store seams with in-memory implementations
//!
//! ## Architecture
//!
//! A pass is invoked by the host (on load, on reconnect, on a timer) for one
//! user. It acquires the concurrency guard, consults the circuit breaker,
//! runs the one-time backfill, then pushes dirty local records and pulls
//! remote changes until both phases drain or the wall-clock budget expires.
//! Progress (cursors, per-record sync flags) is persisted incrementally, so
//! an interrupted pass resumes where it left off.
//!
//! ## Key Invariants
//!
//! - A record is clean iff its last synced version equals its version
//! - Pushes are idempotent upserts keyed by record id (at-least-once safe)
//! - The pull cursor never regresses
//! - An attempt-result is pushed only after its parent document has been
//!   observed as synced remotely
//! - The host always receives a structured outcome, never an error

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backfill;
mod breaker;
mod clock;
mod config;
mod cursor;
mod engine;
mod error;
mod lease;
mod local;
mod memory;
mod pull;
mod push;
mod remote;
mod telemetry;

pub use breaker::CircuitBreaker;
pub use config::SyncConfig;
pub use cursor::CursorManager;
pub use engine::{SyncEngine, SyncOutcome, SyncReport, SyncState, SyncStats};
pub use error::{SyncError, SyncResult};
pub use lease::{LeaseGuard, ProcessLease, SyncLease};
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use remote::{MockRemote, RemoteStore};
pub use telemetry::{ConnectionClass, SlowPassThresholds};
