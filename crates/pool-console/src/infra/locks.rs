use {
    alloy::primitives::Address,
    dashmap::DashMap,
    std::sync::Arc,
    tokio::sync::{Mutex, OwnedMutexGuard},
};

type Pair = (Address, Address);

/// Serializes writes that touch the same `(pool, token)` pair. Writes to
/// different pairs proceed concurrently. A pair's entry only lives while
/// somebody holds or waits for its lock.
#[derive(Clone, Default)]
pub struct PairLocks {
    locks: Arc<DashMap<Pair, Arc<Mutex<()>>>>,
}

impl PairLocks {
    /// Waits until no other holder writes to the pair. The pair stays locked
    /// until the returned guard is dropped.
    pub async fn lock(&self, pool: Address, token: Address) -> PairGuard {
        let pair = (pool, token);
        let lock = self.locks.entry(pair).or_default().clone();
        PairGuard {
            guard: Some(lock.lock_owned().await),
            locks: self.locks.clone(),
            pair,
        }
    }
}

pub struct PairGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<Pair, Arc<Mutex<()>>>>,
    pair: Pair,
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map refers to the lock once nobody holds or waits for it.
        self.locks
            .remove_if(&self.pair, |_, lock| Arc::strong_count(lock) == 1);
    }
}
