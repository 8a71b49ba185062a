use crate::domain::UserId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-user async mutexes.
///
/// Holding the guard across load, oracle lookups, compute and save makes the
/// whole sequence one critical section per user, so two concurrent requests
/// from the same user cannot overwrite each other's result.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user`'s wallet.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the DashMap shard is not held across the await.
        let mutex = self.locks.entry(user).or_default().clone();
        mutex.lock_owned().await
    }

    /// Number of users that have ever been locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
