//! Character listing types.
//!
//! The `Api*` types mirror the remote JSON envelope and are only used for
//! deserialization; the rest of the crate works with the domain types.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::NetworkError;

// ============================================================================
// Domain types
// ============================================================================

/// A single character from the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Character {
  pub id: u64,
  pub name: String,
  pub status: String,
  pub species: String,
  /// Sub-species or variant, often empty
  pub kind: String,
  pub gender: String,
  pub origin: String,
  pub location: String,
  /// Avatar image URL
  pub image: String,
  /// Profile link
  pub url: String,
  pub created: Option<DateTime<Utc>>,
}

impl Character {
  /// One-line "status - species - gender" summary.
  pub fn summary(&self) -> String {
    format!("{} - {} - {}", self.status, self.species, self.gender)
  }
}

/// Pagination metadata exactly as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageInfo {
  /// Total number of characters across all pages
  pub count: u64,
  /// Total number of pages
  pub pages: u32,
  /// URL of the next page, if any
  pub next: Option<String>,
  /// URL of the previous page, if any
  pub prev: Option<String>,
}

impl PageInfo {
  pub fn has_next(&self) -> bool {
    self.next.is_some()
  }

  pub fn has_prev(&self) -> bool {
    self.prev.is_some()
  }

  pub fn total_pages(&self) -> u32 {
    self.pages
  }
}

/// One page of the listing: items plus pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterPage {
  pub results: Vec<Character>,
  pub info: PageInfo,
}

impl CharacterPage {
  /// Parse a page envelope from a response body.
  pub fn from_json(body: &str) -> Result<Self, NetworkError> {
    let page: ApiPage = serde_json::from_str(body)?;
    Ok(page.into())
  }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiPage {
  info: ApiInfo,
  results: Vec<ApiCharacter>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
  count: u64,
  pages: u32,
  next: Option<String>,
  prev: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiNamedRef {
  #[serde(default)]
  name: String,
}

#[derive(Debug, Deserialize)]
struct ApiCharacter {
  id: u64,
  name: String,
  #[serde(default)]
  status: String,
  #[serde(default)]
  species: String,
  #[serde(default, rename = "type")]
  kind: String,
  #[serde(default)]
  gender: String,
  origin: Option<ApiNamedRef>,
  location: Option<ApiNamedRef>,
  #[serde(default)]
  image: String,
  #[serde(default)]
  url: String,
  #[serde(default)]
  created: Option<DateTime<Utc>>,
}

/// Error body returned by the remote with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
  pub error: String,
}

impl From<ApiPage> for CharacterPage {
  fn from(page: ApiPage) -> Self {
    Self {
      results: page.results.into_iter().map(Character::from).collect(),
      info: PageInfo {
        count: page.info.count,
        pages: page.info.pages,
        next: page.info.next,
        prev: page.info.prev,
      },
    }
  }
}

impl From<ApiCharacter> for Character {
  fn from(c: ApiCharacter) -> Self {
    Self {
      id: c.id,
      name: c.name,
      status: c.status,
      species: c.species,
      kind: c.kind,
      gender: c.gender,
      origin: c.origin.map(|o| o.name).unwrap_or_default(),
      location: c.location.map(|l| l.name).unwrap_or_default(),
      image: c.image,
      url: c.url,
      created: c.created,
    }
  }
}
