use crate::models::EntityId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// One reader/writer lock per repository.
///
/// Mutations (commit, delete, sync, attach) hold the write side for their
/// whole duration; history reads share the read side. Locks for different
/// entities never contend.
///
/// Only entities with a live guard or a pending waiter keep an entry; the
/// rest are pruned on the next acquisition.
#[derive(Default)]
pub struct RepoLocks {
    locks: Mutex<HashMap<EntityId, Weak<RwLock<()>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, entity: &EntityId) -> Arc<RwLock<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(entity).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(RwLock::new(()));
        locks.insert(entity.clone(), Arc::downgrade(&lock));
        lock
    }

    pub async fn write(&self, entity: &EntityId) -> OwnedRwLockWriteGuard<()> {
        self.lock_for(entity).write_owned().await
    }

    pub async fn read(&self, entity: &EntityId) -> OwnedRwLockReadGuard<()> {
        self.lock_for(entity).read_owned().await
    }

    /// Entities whose lock is currently held or awaited.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.retain(|_, lock| lock.strong_count() > 0);
        locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_writer_excludes_readers_of_same_entity() {
        let locks = RepoLocks::new();
        let doc = EntityId::project("doc1").unwrap();

        let guard = locks.write(&doc).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.read(&doc)).await;
        assert!(blocked.is_err());

        drop(guard);
        let _reader = locks.read(&doc).await;
        let _second = locks.read(&doc).await;
    }

    #[tokio::test]
    async fn test_entities_do_not_contend() {
        let locks = RepoLocks::new();
        let a = EntityId::project("a").unwrap();
        let b = EntityId::model("a").unwrap();

        let _a = locks.write(&a).await;
        let other = tokio::time::timeout(Duration::from_millis(50), locks.write(&b)).await;
        assert!(other.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_locks_are_pruned() {
        let locks = RepoLocks::new();

        for i in 0..200 {
            let entity = EntityId::project(format!("doc{}", i)).unwrap();
            let _guard = locks.read(&entity).await;
        }
        assert_eq!(locks.len(), 0);

        let doc = EntityId::project("doc1").unwrap();
        let held = locks.write(&doc).await;
        let waiting = tokio::spawn({
            let lock = locks.lock_for(&doc);
            async move { lock.read_owned().await }
        });
        assert_eq!(locks.len(), 1);

        drop(held);
        let reader = waiting.await.unwrap();
        assert_eq!(locks.len(), 1);
        drop(reader);
        assert_eq!(locks.len(), 0);
    }
}
