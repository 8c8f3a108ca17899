//! In-memory query cache with staleness, expiry and in-flight de-duplication.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::api::NetworkError;

use super::entry::CacheEntry;
use super::key::QueryKey;

/// Outcome of a single fetch.
pub type FetchResult<T> = Result<T, NetworkError>;

/// Handle to an in-flight fetch. Every clone resolves to the same outcome.
pub type SharedFetch<T> = Shared<BoxFuture<'static, FetchResult<T>>>;

/// Freshness windows for cached entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
  /// After this age an entry is still served but refetched
  pub stale_time: Duration,
  /// After this age an entry is evicted
  pub expiry_time: Duration,
}

impl Default for CachePolicy {
  fn default() -> Self {
    Self {
      stale_time: Duration::from_secs(60),
      expiry_time: Duration::from_secs(5 * 60),
    }
  }
}

struct StoreState<T> {
  entries: HashMap<QueryKey, CacheEntry<T>>,
  in_flight: HashMap<QueryKey, SharedFetch<T>>,
}

/// Session-scoped keyed store of query results.
///
/// Cloning the store yields another handle to the same entries.
pub struct CacheStore<T> {
  state: Arc<Mutex<StoreState<T>>>,
  policy: CachePolicy,
}

impl<T> Clone for CacheStore<T> {
  fn clone(&self) -> Self {
    Self {
      state: Arc::clone(&self.state),
      policy: self.policy,
    }
  }
}

impl<T: Clone + Send + Sync + 'static> CacheStore<T> {
  pub fn new(policy: CachePolicy) -> Self {
    Self {
      state: Arc::new(Mutex::new(StoreState {
        entries: HashMap::new(),
        in_flight: HashMap::new(),
      })),
      policy,
    }
  }

  pub fn policy(&self) -> CachePolicy {
    self.policy
  }

  fn lock(&self) -> MutexGuard<'_, StoreState<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Entry for `key`, stale or not.
  pub fn get(&self, key: &QueryKey) -> Option<CacheEntry<T>> {
    self.lock().entries.get(key).cloned()
  }

  /// Store `entry` under `key`, replacing whatever was there.
  pub fn set(&self, key: QueryKey, entry: CacheEntry<T>) {
    self.lock().entries.insert(key, entry);
  }

  /// Whether `entry` is older than the stale window.
  pub fn is_stale(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
    entry.age(now) > self.policy.stale_time
  }

  /// A successful entry inside the stale window.
  pub fn is_fresh(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
    entry.is_success() && !self.is_stale(entry, now)
  }

  /// Remove the entry for `key` if it is past the stale window.
  ///
  /// Returns whether an entry was removed. Entries with a fetch in flight
  /// are left alone.
  pub fn invalidate_if_stale(&self, key: &QueryKey, now: Instant) -> bool {
    let mut state = self.lock();
    if state.in_flight.contains_key(key) {
      return false;
    }

    let stale = match state.entries.get(key) {
      Some(entry) => self.is_stale(entry, now),
      None => false,
    };

    if stale {
      state.entries.remove(key);
      debug!(%key, "invalidated stale entry");
    }
    stale
  }

  /// Drop every entry older than the expiry window. Returns how many were
  /// removed.
  pub fn evict_expired(&self, now: Instant) -> usize {
    let mut guard = self.lock();
    let StoreState { entries, in_flight } = &mut *guard;
    let expiry = self.policy.expiry_time;

    let before = entries.len();
    entries.retain(|key, entry| in_flight.contains_key(key) || entry.age(now) <= expiry);
    let evicted = before - entries.len();

    if evicted > 0 {
      debug!(evicted, remaining = entries.len(), "evicted expired entries");
    }
    evicted
  }

  /// Join the in-flight fetch for `key`, or start one with `producer`.
  ///
  /// The fetch runs on its own task and writes its outcome into the store
  /// when it finishes, whether or not anyone is still waiting. `producer`
  /// is only called when no fetch for `key` is in flight. Must be called
  /// from within a tokio runtime.
  pub fn dedupe<F, Fut>(&self, key: &QueryKey, producer: F) -> SharedFetch<T>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = FetchResult<T>> + Send + 'static,
  {
    let mut state = self.lock();

    if let Some(fetch) = state.in_flight.get(key) {
      debug!(%key, "joining in-flight fetch");
      return fetch.clone();
    }

    let now = Instant::now();
    let pending = CacheEntry::pending(key.clone(), state.entries.get(key), now);
    state.entries.insert(key.clone(), pending);

    let request = producer();
    let store = self.clone();
    let task_key = key.clone();
    // The lock is held until the slot is registered, so `complete` cannot
    // run before the slot exists.
    let handle = tokio::spawn(async move {
      let result = request.await;
      store.complete(&task_key, &result);
      result
    });

    let store = self.clone();
    let join_key = key.clone();
    let fetch = async move {
      match handle.await {
        Ok(result) => result,
        Err(e) => {
          let error = NetworkError::Transport(format!("fetch task failed: {}", e));
          let result = Err(error);
          store.complete(&join_key, &result);
          result
        }
      }
    }
    .boxed()
    .shared();

    state.in_flight.insert(key.clone(), fetch.clone());
    debug!(%key, "started fetch");
    fetch
  }

  /// Write the terminal entry for a finished fetch and free its slot.
  fn complete(&self, key: &QueryKey, result: &FetchResult<T>) {
    let now = Instant::now();
    let entry = match result {
      Ok(data) => CacheEntry::success(key.clone(), data.clone(), now),
      Err(error) => {
        warn!(%key, %error, "fetch failed");
        CacheEntry::failure(key.clone(), error.clone(), now)
      }
    };

    let mut state = self.lock();
    state.in_flight.remove(key);
    state.entries.insert(key.clone(), entry);
  }

  /// Whether a fetch for `key` is running.
  pub fn is_in_flight(&self, key: &QueryKey) -> bool {
    self.lock().in_flight.contains_key(key)
  }

  /// Number of running fetches.
  pub fn in_flight(&self) -> usize {
    self.lock().in_flight.len()
  }

  pub fn len(&self) -> usize {
    self.lock().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().entries.is_empty()
  }

  /// Drop all entries. Running fetches keep their slot and still write
  /// their result when they finish.
  pub fn clear(&self) {
    self.lock().entries.clear();
  }
}

impl<T: Clone + Send + Sync + 'static> Default for CacheStore<T> {
  fn default() -> Self {
    Self::new(CachePolicy::default())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn key(page: u32) -> QueryKey {
    QueryKey::new("characters", page)
  }

  fn store() -> CacheStore<String> {
    CacheStore::new(CachePolicy::default())
  }

  #[test]
  fn test_get_missing() {
    assert!(store().get(&key(1)).is_none());
  }

  #[test]
  fn test_set_overwrites() {
    let store = store();
    let now = Instant::now();
    store.set(key(1), CacheEntry::success(key(1), "old".to_string(), now));
    store.set(key(1), CacheEntry::success(key(1), "new".to_string(), now));

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(&key(1)).unwrap().data.as_deref(), Some("new"));
  }

  #[test]
  fn test_stale_entry_still_returned_until_invalidated() {
    let store = store();
    let then = Instant::now();
    store.set(key(1), CacheEntry::success(key(1), "page".to_string(), then));

    let later = then + Duration::from_secs(61);
    let entry = store.get(&key(1)).unwrap();
    assert!(store.is_stale(&entry, later));
    assert!(!store.is_fresh(&entry, later));

    assert!(store.invalidate_if_stale(&key(1), later));
    assert!(store.get(&key(1)).is_none());
  }

  #[test]
  fn test_invalidate_keeps_fresh_entry() {
    let store = store();
    let then = Instant::now();
    store.set(key(1), CacheEntry::success(key(1), "page".to_string(), then));

    assert!(!store.invalidate_if_stale(&key(1), then + Duration::from_secs(30)));
    assert!(store.get(&key(1)).is_some());
    assert!(!store.invalidate_if_stale(&key(2), then));
  }

  #[test]
  fn test_evict_expired() {
    let store = store();
    let then = Instant::now();
    store.set(key(1), CacheEntry::success(key(1), "old".to_string(), then));
    store.set(
      key(2),
      CacheEntry::success(key(2), "recent".to_string(), then + Duration::from_secs(200)),
    );

    let now = then + Duration::from_secs(301);
    assert_eq!(store.evict_expired(now), 1);
    assert!(store.get(&key(1)).is_none());
    assert!(store.get(&key(2)).is_some());
  }

  #[test]
  fn test_stale_but_unexpired_survives_eviction() {
    let store = store();
    let then = Instant::now();
    store.set(key(1), CacheEntry::success(key(1), "page".to_string(), then));

    assert_eq!(store.evict_expired(then + Duration::from_secs(120)), 0);
    assert!(store.get(&key(1)).is_some());
  }

  #[tokio::test]
  async fn test_dedupe_single_fetch_for_concurrent_callers() {
    let store = store();
    let calls = Arc::new(AtomicU32::new(0));

    let producer = |calls: Arc<AtomicU32>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, NetworkError>("page three".to_string())
      }
    };

    let first = store.dedupe(&key(3), producer(calls.clone()));
    let second = store.dedupe(&key(3), producer(calls.clone()));
    assert!(store.is_in_flight(&key(3)));
    assert!(store.get(&key(3)).unwrap().is_pending());

    let (a, b) = tokio::join!(first, second);
    assert_eq!(a, Ok("page three".to_string()));
    assert_eq!(a, b);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert_eq!(store.in_flight(), 0);
    assert!(store.get(&key(3)).unwrap().is_success());
  }

  #[tokio::test]
  async fn test_dedupe_different_keys_fetch_separately() {
    let store = store();
    let calls = Arc::new(AtomicU32::new(0));

    let c1 = calls.clone();
    let one = store.dedupe(&key(1), move || async move {
      c1.fetch_add(1, Ordering::SeqCst);
      Ok("one".to_string())
    });
    let c2 = calls.clone();
    let two = store.dedupe(&key(2), move || async move {
      c2.fetch_add(1, Ordering::SeqCst);
      Ok("two".to_string())
    });

    let (one, two) = tokio::join!(one, two);
    assert_eq!(one.unwrap(), "one");
    assert_eq!(two.unwrap(), "two");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_dedupe_writes_error_entry() {
    let store = store();
    let result = store
      .dedupe(&key(5), || async {
        Err(NetworkError::Status {
          status: 404,
          message: "There is nothing here".to_string(),
        })
      })
      .await;

    assert!(result.is_err());
    let entry = store.get(&key(5)).unwrap();
    assert!(entry.is_error());
    assert!(entry.data.is_none());
    assert_eq!(entry.error, result.err());
  }

  #[tokio::test]
  async fn test_dedupe_completes_without_waiters() {
    let store = store();
    drop(store.dedupe(&key(1), || async { Ok("detached".to_string()) }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let entry = store.get(&key(1)).unwrap();
    assert!(entry.is_success());
    assert_eq!(entry.data.as_deref(), Some("detached"));
  }

  #[tokio::test]
  async fn test_refetch_keeps_stale_data_while_pending() {
    let store = store();
    let then = Instant::now();
    store.set(key(1), CacheEntry::success(key(1), "v1".to_string(), then));

    let fetch = store.dedupe(&key(1), || async {
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok("v2".to_string())
    });

    let pending = store.get(&key(1)).unwrap();
    assert!(pending.is_pending());
    assert_eq!(pending.data.as_deref(), Some("v1"));

    // In-flight entries are never evicted or invalidated
    let far = then + Duration::from_secs(3600);
    assert_eq!(store.evict_expired(far), 0);
    assert!(!store.invalidate_if_stale(&key(1), far));

    assert_eq!(fetch.await.unwrap(), "v2");
    assert_eq!(store.get(&key(1)).unwrap().data.as_deref(), Some("v2"));
  }

  #[tokio::test]
  async fn test_clear_keeps_running_fetch_joinable() {
    let store = store();
    let calls = Arc::new(AtomicU32::new(0));
    let producer = |calls: Arc<AtomicU32>| {
      move || async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, NetworkError>("slow".to_string())
      }
    };

    let first = store.dedupe(&key(1), producer(calls.clone()));
    store.clear();
    assert!(store.is_empty());
    assert!(store.is_in_flight(&key(1)));

    let second = store.dedupe(&key(1), producer(calls.clone()));
    let (a, b) = tokio::join!(first, second);
    assert_eq!(a, b);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.in_flight(), 0);
    assert!(store.get(&key(1)).unwrap().is_success());
  }

  #[tokio::test]
  async fn test_clone_shares_entries() {
    let store = store();
    let other = store.clone();
    other.set(
      key(1),
      CacheEntry::success(key(1), "shared".to_string(), Instant::now()),
    );
    assert_eq!(store.len(), 1);

    store.clear();
    assert!(other.is_empty());
  }
}
