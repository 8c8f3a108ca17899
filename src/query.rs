//! Keyed query coordinator on top of the cache store.
//!
//! Inspired by TanStack Query, `QueryCoordinator<T>` binds the currently
//! observed `QueryKey` to a `CacheStore<T>`, starts fetches when data is
//! missing or stale, and exposes loading/error/data state to the UI.
//!
//! # Example
//!
//! ```ignore
//! let mut query = QueryCoordinator::new(store, move |key: &QueryKey| {
//!     let client = client.clone();
//!     let page = key.page;
//!     async move { client.fetch_page(page).await }
//! });
//!
//! // Whenever the page changes
//! query.observe(QueryKey::new("characters", page));
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//!
//! // In render
//! let state = query.state();
//! if state.is_loading() { render_spinner() }
//! else if let Some(e) = state.error() { render_error(e) }
//! else if let Some(data) = state.data() { render_data(data) }
//! ```

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::NetworkError;
use crate::cache::{CacheEntry, CacheStore, FetchResult, QueryKey};

/// What the presentation layer sees for the observed key.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
  /// No data to show yet; a fetch is running
  pub is_loading: bool,
  /// A fetch is running, with or without data on screen
  pub is_fetching: bool,
  pub error: Option<NetworkError>,
  pub data: Option<T>,
  /// When the shown data was fetched
  pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Default for QueryState<T> {
  fn default() -> Self {
    Self {
      is_loading: false,
      is_fetching: false,
      error: None,
      data: None,
      updated_at: None,
    }
  }
}

impl<T> QueryState<T> {
  fn loading() -> Self {
    Self {
      is_loading: true,
      is_fetching: true,
      ..Self::default()
    }
  }

  fn success(data: T, updated_at: DateTime<Utc>) -> Self {
    Self {
      data: Some(data),
      updated_at: Some(updated_at),
      ..Self::default()
    }
  }

  fn failed(error: NetworkError) -> Self {
    Self {
      error: Some(error),
      ..Self::default()
    }
  }

  pub fn is_loading(&self) -> bool {
    self.is_loading
  }

  pub fn is_fetching(&self) -> bool {
    self.is_fetching
  }

  pub fn is_success(&self) -> bool {
    self.data.is_some() && self.error.is_none()
  }

  pub fn is_error(&self) -> bool {
    self.error.is_some()
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn error(&self) -> Option<&NetworkError> {
    self.error.as_ref()
  }
}

/// A factory that creates the fetch future for a key
type QueryFn<T> = Arc<dyn Fn(&QueryKey) -> BoxFuture<'static, FetchResult<T>> + Send + Sync>;

/// A finished fetch, delivered back to the coordinator
struct Completion<T> {
  key: QueryKey,
  generation: u64,
  result: FetchResult<T>,
}

/// Drives fetches for the observed key and tracks its visible state.
///
/// Results arrive asynchronously over a channel; call `poll()` from the
/// event loop (or `settle()` to wait) to apply them. A result for a key that
/// is no longer observed is still cached by the store but not shown.
pub struct QueryCoordinator<T> {
  store: CacheStore<T>,
  query_fn: QueryFn<T>,
  observed: Option<QueryKey>,
  state: QueryState<T>,
  /// Latest fetch generation per key whose completion is still owed
  awaiting: HashMap<QueryKey, u64>,
  generation: u64,
  sender: mpsc::UnboundedSender<Completion<T>>,
  receiver: mpsc::UnboundedReceiver<Completion<T>>,
}

impl<T: Clone + Send + Sync + 'static> QueryCoordinator<T> {
  /// Create a coordinator over `store`.
  ///
  /// `fetcher` is called once per actual network fetch; concurrent requests
  /// for the same key share one call.
  pub fn new<F, Fut>(store: CacheStore<T>, fetcher: F) -> Self
  where
    F: Fn(&QueryKey) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<T>> + Send + 'static,
  {
    let (sender, receiver) = mpsc::unbounded_channel();
    Self {
      store,
      query_fn: Arc::new(move |key: &QueryKey| fetcher(key).boxed()),
      observed: None,
      state: QueryState::default(),
      awaiting: HashMap::new(),
      generation: 0,
      sender,
      receiver,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn observed(&self) -> Option<&QueryKey> {
    self.observed.as_ref()
  }

  pub fn store(&self) -> &CacheStore<T> {
    &self.store
  }

  /// Make `key` the observed key and evaluate it against the cache.
  ///
  /// - Fresh success entry: shown immediately, no fetch.
  /// - Entry with data that is stale (or already being refetched): data
  ///   stays visible while a background fetch runs.
  /// - Absent, failed or pending without data: loading, fetch started.
  pub fn observe(&mut self, key: QueryKey) -> &QueryState<T> {
    let now = Instant::now();
    self.store.evict_expired(now);

    if self.observed.as_ref() != Some(&key) {
      debug!(%key, "observing");
    }
    self.observed = Some(key.clone());

    match self.store.get(&key) {
      Some(entry) if self.store.is_fresh(&entry, now) => {
        debug!(%key, "cache hit");
        self.state = Self::from_entry(entry);
      }
      Some(CacheEntry {
        data: Some(data),
        updated_at,
        ..
      }) => {
        debug!(%key, "serving stale data while refetching");
        self.state = QueryState {
          is_fetching: true,
          ..QueryState::success(data, updated_at)
        };
        self.start_fetch(&key);
      }
      _ => {
        debug!(%key, "cache miss");
        self.state = QueryState::loading();
        self.start_fetch(&key);
      }
    }

    &self.state
  }

  /// Fetch the observed key again, keeping whatever is on screen.
  pub fn refetch(&mut self) {
    let Some(key) = self.observed.clone() else {
      return;
    };

    if self.state.data.is_none() {
      self.state = QueryState::loading();
    } else {
      self.state.is_fetching = true;
    }
    self.start_fetch(&key);
  }

  /// Drop the observed entry if it is stale and observe it again.
  ///
  /// Returns whether the entry was dropped; if so the state goes back to
  /// loading instead of showing the stale data.
  pub fn invalidate(&mut self) -> bool {
    let Some(key) = self.observed.clone() else {
      return false;
    };

    let removed = self.store.invalidate_if_stale(&key, Instant::now());
    if removed {
      self.observe(key);
    }
    removed
  }

  /// Apply any finished fetches without blocking.
  ///
  /// Returns `true` if the visible state changed. Call this in your event
  /// loop tick handler.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(done) = self.receiver.try_recv() {
      changed |= self.apply(done);
    }
    changed
  }

  /// Wait until the observed key has no fetch outstanding.
  pub async fn settle(&mut self) -> &QueryState<T> {
    while let Some(key) = self.observed.clone() {
      if !self.awaiting.contains_key(&key) {
        break;
      }
      match self.receiver.recv().await {
        Some(done) => {
          self.apply(done);
        }
        None => break,
      }
    }
    &self.state
  }

  /// Internal: join or start the fetch for `key` and forward its result
  ///
  /// The store decides whether a fetch is already running. Only the latest
  /// forward per key counts; earlier deliveries are dropped in `apply`.
  fn start_fetch(&mut self, key: &QueryKey) {
    self.generation += 1;
    let generation = self.generation;
    self.awaiting.insert(key.clone(), generation);

    let query_fn = Arc::clone(&self.query_fn);
    let fetch_key = key.clone();
    let fetch = self.store.dedupe(key, move || query_fn(&fetch_key));

    let sender = self.sender.clone();
    let key = key.clone();
    tokio::spawn(async move {
      let result = fetch.await;
      // Ignore send errors - the coordinator may have been dropped
      let _ = sender.send(Completion {
        key,
        generation,
        result,
      });
    });
  }

  /// Internal: apply one completion; returns whether visible state changed
  fn apply(&mut self, done: Completion<T>) -> bool {
    if self.awaiting.get(&done.key) != Some(&done.generation) {
      debug!(key = %done.key, generation = done.generation, "dropping outdated delivery");
      return false;
    }
    self.awaiting.remove(&done.key);

    if self.observed.as_ref() != Some(&done.key) {
      debug!(key = %done.key, "result for superseded key cached, not shown");
      return false;
    }

    self.state = match done.result {
      Ok(data) => {
        let updated_at = self
          .store
          .get(&done.key)
          .map(|e| e.updated_at)
          .unwrap_or_else(Utc::now);
        QueryState::success(data, updated_at)
      }
      Err(error) => QueryState::failed(error),
    };
    true
  }

  fn from_entry(entry: CacheEntry<T>) -> QueryState<T> {
    match (entry.data, entry.error) {
      (Some(data), _) => QueryState::success(data, entry.updated_at),
      (None, Some(error)) => QueryState::failed(error),
      (None, None) => QueryState::loading(),
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for QueryCoordinator<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCoordinator")
      .field("observed", &self.observed)
      .field("state", &self.state)
      .field("awaiting", &self.awaiting)
      .finish_non_exhaustive()
  }
}
