//! Cache entries and their lifecycle states.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

use crate::api::NetworkError;

use super::key::QueryKey;

/// Lifecycle state of a cache entry.
///
/// Entries move pending -> success or pending -> error. A refetch puts the
/// entry back into pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  Pending,
  Success,
  Error,
}

/// A cached query result.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
  pub key: QueryKey,
  pub status: EntryStatus,
  /// Payload. A pending entry keeps the payload of the success entry it
  /// replaced; an error entry never has one.
  pub data: Option<T>,
  pub error: Option<NetworkError>,
  /// When `data` was fetched, or when the request started if there is none
  pub fetched_at: Instant,
  /// Wall-clock time matching `fetched_at`, for display
  pub updated_at: DateTime<Utc>,
}

impl<T: Clone> CacheEntry<T> {
  /// Pending entry for a fetch starting at `now`.
  ///
  /// If the previous entry held data, that data and its timestamps are kept
  /// so readers can keep showing it while the refetch runs.
  pub fn pending(key: QueryKey, previous: Option<&CacheEntry<T>>, now: Instant) -> Self {
    match previous {
      Some(prev) if prev.data.is_some() => Self {
        key,
        status: EntryStatus::Pending,
        data: prev.data.clone(),
        error: None,
        fetched_at: prev.fetched_at,
        updated_at: prev.updated_at,
      },
      _ => Self {
        key,
        status: EntryStatus::Pending,
        data: None,
        error: None,
        fetched_at: now,
        updated_at: Utc::now(),
      },
    }
  }
}

impl<T> CacheEntry<T> {
  pub fn success(key: QueryKey, data: T, now: Instant) -> Self {
    Self {
      key,
      status: EntryStatus::Success,
      data: Some(data),
      error: None,
      fetched_at: now,
      updated_at: Utc::now(),
    }
  }

  pub fn failure(key: QueryKey, error: NetworkError, now: Instant) -> Self {
    Self {
      key,
      status: EntryStatus::Error,
      data: None,
      error: Some(error),
      fetched_at: now,
      updated_at: Utc::now(),
    }
  }

  /// Time elapsed since `fetched_at`.
  pub fn age(&self, now: Instant) -> Duration {
    now.saturating_duration_since(self.fetched_at)
  }

  pub fn is_pending(&self) -> bool {
    self.status == EntryStatus::Pending
  }

  pub fn is_success(&self) -> bool {
    self.status == EntryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == EntryStatus::Error
  }
}
