//! Pull-cursor management.

use crate::error::SyncResult;
use crate::local::LocalStore;
use decksync_core::{Collection, SyncCursor, UserId};
use tracing::warn;

/// Reads and advances the per-(user, collection) pull cursor.
///
/// Callers advance past both valid and invalid-but-seen records so a bad
/// record cannot stall sync; the persisted cursor never regresses.
pub struct CursorManager<'a, S: LocalStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: LocalStore + ?Sized> CursorManager<'a, S> {
    /// Creates a manager over the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// The current cursor, or the zero cursor before any pull.
    pub async fn get(&self, user: &UserId, collection: Collection) -> SyncResult<SyncCursor> {
        Ok(self
            .store
            .cursor(user, collection)
            .await?
            .unwrap_or_else(SyncCursor::zero))
    }

    /// Advances the cursor to `target`.
    ///
    /// `target` is expected to be at or past the current cursor; a
    /// regressing call is clamped and logged rather than persisted.
    pub async fn advance(
        &self,
        user: &UserId,
        collection: Collection,
        target: SyncCursor,
    ) -> SyncResult<SyncCursor> {
        let current = self.get(user, collection).await?;
        if target < current {
            warn!(
                user = %user,
                collection = %collection,
                current = %current,
                target = %target,
                "cursor advance would regress; keeping current"
            );
            return Ok(current);
        }
        self.store
            .set_cursor(user, collection, target.clone())
            .await?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn get_defaults_to_zero() {
        let store = MemoryStore::new();
        let manager = CursorManager::new(&store);
        let cursor = manager
            .get(&UserId::new("alice"), Collection::Documents)
            .await
            .unwrap();
        assert_eq!(cursor, SyncCursor::zero());
    }

    #[tokio::test]
    async fn advance_persists_and_returns_target() {
        let store = MemoryStore::new();
        let manager = CursorManager::new(&store);
        let user = UserId::new("alice");
        let target = SyncCursor::new(105, "C");

        let advanced = manager
            .advance(&user, Collection::Documents, target.clone())
            .await
            .unwrap();

        assert_eq!(advanced, target);
        assert_eq!(
            manager.get(&user, Collection::Documents).await.unwrap(),
            target
        );
    }

    #[tokio::test]
    async fn regressing_advance_is_clamped() {
        let store = MemoryStore::new();
        let manager = CursorManager::new(&store);
        let user = UserId::new("alice");

        manager
            .advance(&user, Collection::Documents, SyncCursor::new(100, "A"))
            .await
            .unwrap();
        let kept = manager
            .advance(&user, Collection::Documents, SyncCursor::new(50, "Z"))
            .await
            .unwrap();

        assert_eq!(kept, SyncCursor::new(100, "A"));
    }

    #[tokio::test]
    async fn equal_timestamp_advances_on_id() {
        let store = MemoryStore::new();
        let manager = CursorManager::new(&store);
        let user = UserId::new("alice");

        manager
            .advance(&user, Collection::Documents, SyncCursor::new(100, "A"))
            .await
            .unwrap();
        let advanced = manager
            .advance(&user, Collection::Documents, SyncCursor::new(100, "B"))
            .await
            .unwrap();

        assert_eq!(advanced, SyncCursor::new(100, "B"));
    }
}
