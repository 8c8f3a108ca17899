//! Current page number and its transitions.

use crate::api::PageInfo;
use crate::cache::QueryKey;

/// Page cursor. The page number is always >= 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
  page: u32,
}

impl Default for Pagination {
  fn default() -> Self {
    Self { page: 1 }
  }
}

impl Pagination {
  pub fn new() -> Self {
    Self::default()
  }

  /// Start at `page`, clamped to 1.
  pub fn starting_at(page: u32) -> Self {
    Self { page: page.max(1) }
  }

  pub fn page(&self) -> u32 {
    self.page
  }

  /// Cache key for the current page of `resource`.
  pub fn query_key(&self, resource: &str) -> QueryKey {
    QueryKey::new(resource, self.page)
  }

  /// Advance one page, unconditionally.
  pub fn next(&mut self) {
    self.page = self.page.saturating_add(1);
  }

  /// Go back one page, never below 1.
  pub fn prev(&mut self) {
    self.page = self.page.saturating_sub(1).max(1);
  }

  /// Advance only if `info` (the current page's metadata) has a next page.
  ///
  /// Returns whether the page changed.
  pub fn go_to_next_page(&mut self, info: Option<&PageInfo>) -> bool {
    match info {
      Some(info) if info.has_next() => {
        self.next();
        true
      }
      _ => false,
    }
  }

  /// Go back only if `info` has a previous page.
  pub fn go_to_prev_page(&mut self, info: Option<&PageInfo>) -> bool {
    match info {
      Some(info) if info.has_prev() && self.page > 1 => {
        self.prev();
        true
      }
      _ => false,
    }
  }
}
