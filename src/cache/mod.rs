//! Session-scoped, in-memory cache for paged query results.
//!
//! This module provides a generic cache that:
//! - Keys entries by resource name + page number
//! - Serves stale entries while they are refetched in the background
//! - Evicts entries past a hard expiry window
//! - Collapses concurrent fetches for the same key into one request

mod entry;
mod key;
mod store;

pub use entry::{CacheEntry, EntryStatus};
pub use key::QueryKey;
pub use store::{CachePolicy, CacheStore, FetchResult, SharedFetch};
