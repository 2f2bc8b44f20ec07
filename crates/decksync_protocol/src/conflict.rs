//! Whole-record conflict resolution.
//!
//! Sync conflicts are resolved at record granularity; document internals are
//! never merged. The resolver is a pure function so every device reaches the
//! same verdict from the same pair of records.

use decksync_core::Document;

/// Which side of a conflict won.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The local record is kept.
    Local,
    /// The remote record replaces the local one.
    Remote,
}

/// The resolver's verdict for one document.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Which side won.
    pub winner: Winner,
    /// The record to persist. Callers set sync metadata on it.
    pub merged: Document,
    /// True when versions, delete state and hashes all failed to
    /// discriminate and the timestamps tied. Remote wins deterministically,
    /// but callers should log the ambiguity.
    pub ambiguous_tie: bool,
}

/// Decides whether the local or remote variant of a document wins.
///
/// Decision order, first match wins:
/// 1. no local copy → remote
/// 2. higher `version` → that side (version is the causal marker)
/// 3. equal version, differing delete state → the deleted variant
/// 4. equal version, matching content hashes → local (no real change)
/// 5. only one side carries a hash → that side
/// 6. otherwise the later `updated_at`; a tie goes to remote and is
///    flagged ambiguous
pub fn resolve(local: Option<&Document>, remote: Document) -> Resolution {
    let Some(local) = local else {
        return remote_wins(remote);
    };

    if local.version != remote.version {
        return if local.version > remote.version {
            local_wins(local)
        } else {
            remote_wins(remote)
        };
    }

    match (local.is_tombstone(), remote.is_tombstone()) {
        (true, false) => return local_wins(local),
        (false, true) => return remote_wins(remote),
        _ => {}
    }

    match (&local.content_hash, &remote.content_hash) {
        (Some(ours), Some(theirs)) if ours == theirs => local_wins(local),
        (Some(_), None) => local_wins(local),
        (None, Some(_)) => remote_wins(remote),
        _ => {
            // Hashes differ, or neither side carries one.
            if local.updated_at > remote.updated_at {
                local_wins(local)
            } else if remote.updated_at > local.updated_at {
                remote_wins(remote)
            } else {
                Resolution {
                    winner: Winner::Remote,
                    merged: remote,
                    ambiguous_tie: true,
                }
            }
        }
    }
}

fn local_wins(local: &Document) -> Resolution {
    Resolution {
        winner: Winner::Local,
        merged: local.clone(),
        ambiguous_tie: false,
    }
}

fn remote_wins(remote: Document) -> Resolution {
    Resolution {
        winner: Winner::Remote,
        merged: remote,
        ambiguous_tie: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decksync_core::{DocumentContent, RecordId, UnixMillis, UserId};
    use proptest::prelude::*;

    fn doc(
        version: i64,
        hash: Option<&str>,
        deleted: bool,
        updated_at: UnixMillis,
    ) -> Document {
        Document {
            id: RecordId::new("d1"),
            owner: UserId::new("alice"),
            content: DocumentContent {
                title: "t".into(),
                description: String::new(),
                tags: vec![],
                items: vec![],
            },
            version,
            content_hash: hash.map(str::to_string),
            created_at: 0,
            updated_at,
            deleted_at: deleted.then_some(updated_at),
            last_synced_version: 0,
            last_synced_at: None,
        }
    }

    #[test]
    fn absent_local_means_remote_wins() {
        let resolution = resolve(None, doc(1, Some("h"), false, 10));
        assert_eq!(resolution.winner, Winner::Remote);
        assert!(!resolution.ambiguous_tie);
    }

    #[test]
    fn higher_version_wins_outright() {
        // Local is newer despite an older timestamp.
        let local = doc(3, Some("a"), false, 10);
        let remote = doc(2, Some("b"), false, 999);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Local);

        let local = doc(2, Some("a"), false, 999);
        let remote = doc(3, Some("b"), false, 10);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Remote);
    }

    #[test]
    fn tombstone_wins_at_equal_version() {
        let local = doc(2, Some("a"), true, 10);
        let remote = doc(2, Some("b"), false, 999);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Local);

        let local = doc(2, Some("a"), false, 999);
        let remote = doc(2, Some("b"), true, 10);
        let resolution = resolve(Some(&local), remote);
        assert_eq!(resolution.winner, Winner::Remote);
        assert!(resolution.merged.is_tombstone());
    }

    #[test]
    fn matching_hashes_keep_local() {
        // Same id, version 3, hash "h1", neither deleted.
        let local = doc(3, Some("h1"), false, 100);
        let remote = doc(3, Some("h1"), false, 200);

        let resolution = resolve(Some(&local), remote);
        assert_eq!(resolution.winner, Winner::Local);
        assert!(!resolution.ambiguous_tie);
    }

    #[test]
    fn lone_hash_wins() {
        let local = doc(2, Some("a"), false, 10);
        let remote = doc(2, None, false, 999);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Local);

        let local = doc(2, None, false, 999);
        let remote = doc(2, Some("b"), false, 10);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Remote);
    }

    #[test]
    fn differing_hashes_fall_back_to_updated_at() {
        let local = doc(2, Some("a"), false, 500);
        let remote = doc(2, Some("b"), false, 400);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Local);

        let local = doc(2, Some("a"), false, 400);
        let remote = doc(2, Some("b"), false, 500);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Remote);
    }

    #[test]
    fn full_tie_goes_to_remote_and_is_flagged() {
        let local = doc(2, Some("a"), false, 400);
        let remote = doc(2, Some("b"), false, 400);

        let resolution = resolve(Some(&local), remote);
        assert_eq!(resolution.winner, Winner::Remote);
        assert!(resolution.ambiguous_tie);
    }

    #[test]
    fn both_hashes_absent_compare_timestamps() {
        let local = doc(2, None, false, 500);
        let remote = doc(2, None, false, 400);
        assert_eq!(resolve(Some(&local), remote).winner, Winner::Local);
    }

    proptest! {
        #[test]
        fn version_dominates_everything(
            local_version in 2i64..100,
            delta in 1i64..50,
            local_time in 0i64..1_000_000,
            remote_time in 0i64..1_000_000,
            local_deleted in any::<bool>(),
            remote_deleted in any::<bool>(),
        ) {
            let remote_version = local_version - delta.min(local_version - 1);
            let local = doc(local_version, Some("a"), local_deleted, local_time);
            let remote = doc(remote_version, Some("b"), remote_deleted, remote_time);

            prop_assert_eq!(resolve(Some(&local), remote).winner, Winner::Local);
        }

        #[test]
        fn tombstone_precedence_at_equal_version(
            version in 1i64..100,
            local_time in 0i64..1_000_000,
            remote_time in 0i64..1_000_000,
            deleted_side in any::<bool>(),
        ) {
            let local = doc(version, Some("a"), deleted_side, local_time);
            let remote = doc(version, Some("b"), !deleted_side, remote_time);

            let expected = if deleted_side { Winner::Local } else { Winner::Remote };
            prop_assert_eq!(resolve(Some(&local), remote).winner, expected);
        }

        #[test]
        fn resolver_is_deterministic(
            version in 1i64..10,
            time_a in 0i64..100,
            time_b in 0i64..100,
        ) {
            let local = doc(version, Some("a"), false, time_a);
            let remote = doc(version, Some("b"), false, time_b);

            let first = resolve(Some(&local), remote.clone());
            let second = resolve(Some(&local), remote);
            prop_assert_eq!(first.winner, second.winner);
            prop_assert_eq!(first.ambiguous_tie, second.ambiguous_tie);
        }
    }
}
