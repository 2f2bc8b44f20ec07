//! Sync orchestrator state machine.

use crate::backfill;
use crate::breaker::CircuitBreaker;
use crate::clock::now_ms;
use crate::config::SyncConfig;
use crate::lease::{ProcessLease, SyncLease};
use crate::local::LocalStore;
use crate::pull;
use crate::push;
use crate::remote::RemoteStore;
use crate::telemetry;
use decksync_core::{Collection, UserId};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// The current state of a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No pass is running.
    Idle,
    /// Acquiring the concurrency guard and checking preconditions.
    Guarding,
    /// The pass was short-circuited by an unexpired circuit breaker.
    Blocked,
    /// Running the one-time backfill.
    Backfilling,
    /// Uploading dirty local records.
    Pushing,
    /// Fetching and reconciling remote changes.
    Pulling,
}

/// Terminal outcome of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Both phases drained within budget with no residual work.
    Complete,
    /// Budget exhausted, a transient error occurred, or records were
    /// skipped for foreign-key or validation reasons. Safe to retry later.
    Incomplete,
    /// No valid session, breaker tripped earlier, or the guard was
    /// unavailable. Nothing was attempted.
    Skipped,
    /// The authenticated session does not match the requested owner.
    /// Fatal; not retried without re-authentication.
    Failed,
}

/// Structured result of one sync pass.
///
/// This is the only thing the host ever receives: errors never escape the
/// orchestrator boundary.
#[derive(Debug, Clone)]
pub struct SyncReport {
    /// Terminal outcome.
    pub outcome: SyncOutcome,
    /// Records uploaded by the one-time backfill.
    pub backfilled: u64,
    /// Records confirmed by the push phase.
    pub pushed: u64,
    /// Records applied (persisted or purged) by the pull phase.
    pub pulled: u64,
    /// Pulled records skipped for failing schema validation.
    pub invalid_records: u64,
    /// Attempt-results deferred because their parent is not yet synced.
    pub deferred_children: u64,
    /// Whether this pass tripped a circuit breaker.
    pub breaker_tripped: bool,
    /// Wall-clock duration of the pass.
    pub duration: Duration,
    /// Whether the pass exceeded the slow-pass threshold for the detected
    /// connection class. Observational only.
    pub slow: bool,
    /// Skip reason or first error encountered, for diagnostics.
    pub detail: Option<String>,
}

impl SyncReport {
    fn empty() -> Self {
        Self {
            outcome: SyncOutcome::Complete,
            backfilled: 0,
            pushed: 0,
            pulled: 0,
            invalid_records: 0,
            deferred_children: 0,
            breaker_tripped: false,
            duration: Duration::ZERO,
            slow: false,
            detail: None,
        }
    }

    fn skipped(mut self, reason: impl Into<String>) -> Self {
        self.outcome = SyncOutcome::Skipped;
        self.detail = Some(reason.into());
        self
    }

    fn failed(mut self, reason: impl Into<String>) -> Self {
        self.outcome = SyncOutcome::Failed;
        self.detail = Some(reason.into());
        self
    }

    fn incomplete(mut self, reason: impl Into<String>) -> Self {
        self.outcome = SyncOutcome::Incomplete;
        self.detail = Some(reason.into());
        self
    }
}

/// Statistics accumulated across passes.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total passes started.
    pub passes: u64,
    /// Passes that finished complete.
    pub completed: u64,
    /// Passes that finished incomplete.
    pub incomplete: u64,
    /// Passes that were skipped.
    pub skipped: u64,
    /// Passes that failed fatally.
    pub failed: u64,
    /// Total records pushed.
    pub records_pushed: u64,
    /// Total records pulled.
    pub records_pulled: u64,
    /// Total circuit-breaker trips.
    pub breaker_trips: u64,
    /// Outcome of the most recent pass.
    pub last_outcome: Option<SyncOutcome>,
    /// Detail of the most recent pass.
    pub last_detail: Option<String>,
}

/// Drives full sync passes for a local/remote store pair.
///
/// A pass runs backfill, push and pull for one user across both
/// collections, checking the wall-clock budget between batches. Invoke it
/// from the host on load, on reconnect and on a timer; overlapping
/// invocations are skipped via the concurrency guard.
pub struct SyncEngine<L: LocalStore, R: RemoteStore> {
    config: SyncConfig,
    local: Arc<L>,
    remote: Arc<R>,
    lease: Arc<dyn SyncLease>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<L: LocalStore, R: RemoteStore> SyncEngine<L, R> {
    /// Creates a new engine with the process-local concurrency guard.
    pub fn new(config: SyncConfig, local: L, remote: R) -> Self {
        Self::with_shared(config, Arc::new(local), Arc::new(remote))
    }

    /// Creates an engine over shared store handles, e.g. a remote adapter
    /// shared by several engines in tests.
    pub fn with_shared(config: SyncConfig, local: Arc<L>, remote: Arc<R>) -> Self {
        let lease = Arc::new(ProcessLease::new(config.lease_timeout));
        Self {
            config,
            local,
            remote,
            lease,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Replaces the concurrency guard, e.g. with a cross-instance lease.
    #[must_use]
    pub fn with_lease(mut self, lease: Arc<dyn SyncLease>) -> Self {
        self.lease = lease;
        self
    }

    /// The local store.
    pub fn local(&self) -> &Arc<L> {
        &self.local
    }

    /// The remote store.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// The current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Statistics accumulated across passes.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Runs one full sync pass for `user`.
    ///
    /// Never returns an error: every failure mode is folded into the
    /// report's outcome per the error taxonomy.
    pub async fn sync(&self, user: &UserId) -> SyncReport {
        let start = Instant::now();
        let deadline = start + self.config.time_budget;
        let report = SyncReport::empty();

        if user.is_shared() {
            return self.finish(
                start,
                report.failed("the shared sentinel owner cannot run a sync pass"),
            );
        }

        // Guard: at most one pass per (user, collection), across instances.
        self.set_state(SyncState::Guarding);
        let Some(_documents_lease) = self.lease.try_acquire(user, Collection::Documents) else {
            return self.finish(start, report.skipped("documents pass already running"));
        };
        let Some(_attempts_lease) = self.lease.try_acquire(user, Collection::AttemptResults)
        else {
            return self.finish(start, report.skipped("attempt-results pass already running"));
        };

        // Breaker: consulted before any network call.
        let breaker = CircuitBreaker::new(self.local.as_ref());
        let now = now_ms();
        for collection in Collection::all() {
            match breaker.blocked(user, collection, now).await {
                Ok(Some(record)) => {
                    self.set_state(SyncState::Blocked);
                    return self.finish(
                        start,
                        report.skipped(format!("{collection} blocked: {}", record.reason)),
                    );
                }
                Ok(None) => {}
                Err(err) => return self.finish(start, report.incomplete(err.to_string())),
            }
        }

        // Session identity must match the requested owner.
        match self.remote.authenticated_user().await {
            Ok(Some(session)) if &session == user => {}
            Ok(Some(session)) => {
                error!(user = %user, session = %session, "session identity mismatch");
                return self.finish(
                    start,
                    report.failed(format!(
                        "authenticated session {session} does not match owner {user}"
                    )),
                );
            }
            Ok(None) => return self.finish(start, report.skipped("no authenticated session")),
            Err(err) => return self.finish(start, report.incomplete(err.to_string())),
        }

        self.run_phases(user, deadline, start, report).await
    }

    async fn run_phases(
        &self,
        user: &UserId,
        deadline: Instant,
        start: Instant,
        mut report: SyncReport,
    ) -> SyncReport {
        let local = self.local.as_ref();
        let remote = self.remote.as_ref();

        // Backfill.
        self.set_state(SyncState::Backfilling);
        let mut drained = true;
        match backfill::run(local, remote, user, &self.config, deadline).await {
            Ok(outcome) => {
                report.backfilled = outcome.uploaded;
                drained &= outcome.completed;
            }
            Err(err) => {
                warn!(user = %user, error = %err, "backfill halted");
                return self.finish(start, report.incomplete(err.to_string()));
            }
        }

        let mut first_error: Option<String> = None;

        // Push: documents before attempt-results, so parents sync first.
        self.set_state(SyncState::Pushing);
        match push::push_documents(local, remote, user, &self.config, deadline).await {
            Ok(outcome) => {
                report.pushed += outcome.pushed;
                drained &= outcome.drained;

                match push::push_attempts(local, remote, user, &self.config, deadline).await {
                    Ok(outcome) => {
                        report.pushed += outcome.pushed;
                        report.deferred_children = outcome.deferred_children;
                        drained &= outcome.drained;
                    }
                    Err(err) => {
                        warn!(user = %user, error = %err, "attempt push aborted");
                        first_error.get_or_insert(err.to_string());
                        drained = false;
                    }
                }
            }
            Err(err) => {
                // Abort the push phase but still attempt the pull: the two
                // directions are independent.
                warn!(user = %user, error = %err, "document push aborted");
                first_error.get_or_insert(err.to_string());
                drained = false;
            }
        }

        // Pull.
        self.set_state(SyncState::Pulling);
        match pull::pull_documents(local, remote, user, &self.config, deadline).await {
            Ok(outcome) => {
                report.pulled += outcome.applied;
                report.invalid_records += outcome.invalid;
                report.breaker_tripped |= outcome.tripped;
                drained &= outcome.drained;
            }
            Err(err) => {
                warn!(user = %user, error = %err, "document pull aborted");
                first_error.get_or_insert(err.to_string());
                drained = false;
            }
        }
        match pull::pull_attempts(local, remote, user, &self.config, deadline).await {
            Ok(outcome) => {
                report.pulled += outcome.applied;
                report.invalid_records += outcome.invalid;
                report.breaker_tripped |= outcome.tripped;
                drained &= outcome.drained;
            }
            Err(err) => {
                warn!(user = %user, error = %err, "attempt pull aborted");
                first_error.get_or_insert(err.to_string());
                drained = false;
            }
        }

        let clean = first_error.is_none()
            && drained
            && !report.breaker_tripped
            && report.invalid_records == 0
            && report.deferred_children == 0;
        report.outcome = if clean {
            SyncOutcome::Complete
        } else {
            SyncOutcome::Incomplete
        };
        report.detail = first_error;

        self.finish(start, report)
    }

    fn finish(&self, start: Instant, mut report: SyncReport) -> SyncReport {
        report.duration = start.elapsed();
        report.slow = telemetry::is_slow_pass(
            report.duration,
            self.remote.connection_class(),
            &self.config.slow_pass,
        );
        if report.slow {
            warn!(
                duration_ms = report.duration.as_millis() as u64,
                class = ?self.remote.connection_class(),
                "slow sync pass"
            );
        }
        info!(
            outcome = ?report.outcome,
            backfilled = report.backfilled,
            pushed = report.pushed,
            pulled = report.pulled,
            invalid = report.invalid_records,
            deferred = report.deferred_children,
            duration_ms = report.duration.as_millis() as u64,
            detail = report.detail.as_deref().unwrap_or(""),
            "sync pass finished"
        );

        {
            let mut stats = self.stats.write();
            stats.passes += 1;
            match report.outcome {
                SyncOutcome::Complete => stats.completed += 1,
                SyncOutcome::Incomplete => stats.incomplete += 1,
                SyncOutcome::Skipped => stats.skipped += 1,
                SyncOutcome::Failed => stats.failed += 1,
            }
            stats.records_pushed += report.pushed;
            stats.records_pulled += report.pulled;
            if report.breaker_tripped {
                stats.breaker_trips += 1;
            }
            stats.last_outcome = Some(report.outcome);
            stats.last_detail = report.detail.clone();
        }

        self.set_state(SyncState::Idle);
        report
    }
}
