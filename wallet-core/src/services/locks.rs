//! Per-account async locks
//!
//! Serializes in-process mutations of the same account. Pairs are always
//! locked in ascending id order, so two transfers running in opposite
//! directions between the same accounts cannot deadlock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Entries are pruned once the table grows past this many accounts
const PRUNE_THRESHOLD: usize = 1024;

/// Holds both account locks of a transfer until dropped
pub struct PairGuard {
    _first: OwnedMutexGuard<()>,
    _second: OwnedMutexGuard<()>,
}

#[derive(Default)]
pub struct AccountLocks {
    table: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: Uuid) -> Arc<AsyncMutex<()>> {
        // The table holds no invariants a panic could break
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if table.len() > PRUNE_THRESHOLD {
            // Only the table itself references an idle lock
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        Arc::clone(table.entry(id).or_default())
    }

    /// Lock two distinct accounts
    pub async fn lock_pair(&self, a: Uuid, b: Uuid) -> PairGuard {
        debug_assert_ne!(a, b, "lock_pair needs two distinct accounts");
        let (first, second) = if a < b { (a, b) } else { (b, a) };

        let first = self.entry(first).lock_owned().await;
        let second = self.entry(second).lock_owned().await;

        PairGuard {
            _first: first,
            _second: second,
        }
    }

    /// Number of accounts with a lock entry
    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_pair_excludes_overlapping_pair() {
        let locks = Arc::new(AccountLocks::new());
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let guard = locks.lock_pair(a, b).await;

        // (b, c) shares b and must wait
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock_pair(c, b).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_opposite_order_does_not_deadlock() {
        let locks = Arc::new(AccountLocks::new());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let mut handles = Vec::new();
        for i in 0..20 {
            let locks = Arc::clone(&locks);
            handles.push(tokio::spawn(async move {
                let _g = if i % 2 == 0 {
                    locks.lock_pair(a, b).await
                } else {
                    locks.lock_pair(b, a).await
                };
                tokio::task::yield_now().await;
            }));
        }

        for handle in handles {
            tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .expect("no deadlock")
                .unwrap();
        }
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_disjoint_pairs_run_together() {
        let locks = AccountLocks::new();
        let _first = locks.lock_pair(Uuid::new_v4(), Uuid::new_v4()).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.lock_pair(Uuid::new_v4(), Uuid::new_v4()),
        )
        .await;
        assert!(second.is_ok());
    }
}
