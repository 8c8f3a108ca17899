use std::time::{Duration, Instant};

use color_eyre::{eyre::eyre, Result};
use reqwest::{Client, StatusCode};
use tracing::{info, warn};
use url::Url;

use crate::api::error::NetworkError;
use crate::api::types::{ApiErrorBody, CharacterPage};
use crate::config::ApiConfig;

/// HTTP client for the paginated character listing.
///
/// One call to `fetch_page` is exactly one outbound request. There is no
/// caching or retrying here.
#[derive(Debug, Clone)]
pub struct CharacterClient {
  client: Client,
  base_url: Url,
}

impl CharacterClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let base_url = Url::parse(&config.base_url)
      .map_err(|e| eyre!("Invalid API base URL '{}': {}", config.base_url, e))?;

    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client, base_url })
  }

  /// URL for a given page: the base URL with `page=<n>` appended.
  pub fn page_url(&self, page: u32) -> Url {
    let mut url = self.base_url.clone();
    url.query_pairs_mut().append_pair("page", &page.to_string());
    url
  }

  /// Fetch and parse one page.
  pub async fn fetch_page(&self, page: u32) -> Result<CharacterPage, NetworkError> {
    if page == 0 {
      return Err(NetworkError::InvalidRequest(
        "page numbers start at 1".to_string(),
      ));
    }

    let url = self.page_url(page);
    let started = Instant::now();

    let response = self.client.get(url.clone()).send().await.map_err(|e| {
      warn!(page, error = %e, "character request failed");
      NetworkError::from(e)
    })?;

    let status = response.status();
    let body = response.text().await?;

    info!(
      page,
      status = status.as_u16(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "fetched {}",
      url
    );

    if !status.is_success() {
      return Err(status_error(status, &body));
    }

    CharacterPage::from_json(&body)
  }
}

/// Build the error for a non-2xx response, preferring the remote's own
/// `{"error": ...}` text when present.
fn status_error(status: StatusCode, body: &str) -> NetworkError {
  let message = serde_json::from_str::<ApiErrorBody>(body)
    .map(|b| b.error)
    .unwrap_or_else(|_| {
      status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
    });

  NetworkError::Status {
    status: status.as_u16(),
    message,
  }
}
