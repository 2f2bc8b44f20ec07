//! Cross-instance concurrency guard.
//!
//! At most one sync pass runs per (user, collection) across all instances
//! of the same client installation. Acquisition is non-blocking: a pass
//! that cannot take the lease is skipped, not queued — sync is lossless
//! because progress lives in durable storage, not in the lock holder.

use decksync_core::{Collection, UserId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A named, non-blocking mutual-exclusion lease.
///
/// Hosts with a cross-instance primitive (a web lock, a lease row in the
/// shared durable store checked via compare-and-swap) implement this trait
/// over it; [`ProcessLease`] is the conservative process-local fallback.
pub trait SyncLease: Send + Sync {
    /// Attempts to take the lease for (user, collection).
    ///
    /// Returns `None` without blocking if another holder has it. The
    /// returned guard releases the lease on drop.
    fn try_acquire(&self, user: &UserId, collection: Collection) -> Option<LeaseGuard>;
}

/// Releases a held lease when dropped.
pub struct LeaseGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LeaseGuard {
    /// Wraps a release action.
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard").finish_non_exhaustive()
    }
}

type LeaseKey = (String, Collection);

#[derive(Debug, Clone, Copy)]
struct Holder {
    acquired_at: Instant,
    token: u64,
}

/// Process-local lease registry.
///
/// Holders older than the timeout are treated as abandoned and can be
/// taken over, so a crashed pass cannot block sync forever.
pub struct ProcessLease {
    held: Arc<Mutex<HashMap<LeaseKey, Holder>>>,
    timeout: Duration,
    next_token: AtomicU64,
}

impl ProcessLease {
    /// Creates a registry with the given abandoned-after threshold.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Arc::new(Mutex::new(HashMap::new())),
            timeout,
            next_token: AtomicU64::new(1),
        }
    }
}

impl Default for ProcessLease {
    fn default() -> Self {
        Self::new(Duration::from_secs(90))
    }
}

impl SyncLease for ProcessLease {
    fn try_acquire(&self, user: &UserId, collection: Collection) -> Option<LeaseGuard> {
        let key: LeaseKey = (user.as_str().to_string(), collection);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        {
            let mut held = self.held.lock();
            if let Some(holder) = held.get(&key) {
                if holder.acquired_at.elapsed() < self.timeout {
                    return None;
                }
                // Abandoned holder; take over.
            }
            held.insert(
                key.clone(),
                Holder {
                    acquired_at: Instant::now(),
                    token,
                },
            );
        }

        let registry = Arc::clone(&self.held);
        Some(LeaseGuard::new(move || {
            let mut held = registry.lock();
            if held.get(&key).map(|h| h.token) == Some(token) {
                held.remove(&key);
            }
        }))
    }
}
