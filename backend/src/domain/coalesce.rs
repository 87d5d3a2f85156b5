//! Keyed in-flight request registry.
//!
//! Concurrent callers asking for the same key while a load is running share
//! that load's result instead of starting their own. The first caller (the
//! leader) registers a shared future; later callers clone and await it. The
//! registration is removed once the leader finishes or is dropped, so the
//! next caller after completion starts a fresh load.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

type InFlight<K, V> = Arc<Mutex<HashMap<K, Shared<BoxFuture<'static, V>>>>>;

/// Deduplicates concurrent loads per key.
pub struct RequestCoalescer<K, V>
where
    V: Clone,
{
    in_flight: InFlight<K, V>,
}

impl<K, V> Default for RequestCoalescer<K, V>
where
    V: Clone,
{
    fn default() -> Self {
        Self {
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> RequestCoalescer<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `load` for `key`, or join the load already running for it.
    ///
    /// `load` is only invoked by the leader.
    ///
    /// # Examples
    /// ```
    /// use seckill::domain::RequestCoalescer;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let coalescer = RequestCoalescer::<&'static str, u32>::new();
    /// let value = coalescer.run("answer", || async { 42 }).await;
    /// assert_eq!(value, 42);
    /// # });
    /// ```
    pub async fn run<F, Fut>(&self, key: K, load: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let (shared, _leader) = {
            let mut in_flight = lock(&self.in_flight);
            match in_flight.get(&key) {
                Some(shared) => (shared.clone(), None),
                None => {
                    let shared = load().boxed().shared();
                    in_flight.insert(key.clone(), shared.clone());
                    let guard = LeaderGuard {
                        in_flight: Arc::clone(&self.in_flight),
                        key,
                    };
                    (shared, Some(guard))
                }
            }
        };
        shared.await
    }

    /// Number of keys with a load in progress.
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

fn lock<K, V>(
    in_flight: &InFlight<K, V>,
) -> MutexGuard<'_, HashMap<K, Shared<BoxFuture<'static, V>>>>
where
    V: Clone,
{
    // The map stays structurally valid if a holder panicked.
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the leader's registration when the leader completes or is dropped.
struct LeaderGuard<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    in_flight: InFlight<K, V>,
    key: K,
}

impl<K, V> Drop for LeaderGuard<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn drop(&mut self) {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        in_flight.remove(&self.key);
    }
}
