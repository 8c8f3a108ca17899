use thiserror::Error;

/// Failure of a single page fetch.
///
/// This is the only error kind the query layer knows about. It is `Clone`
/// because one fetch outcome is handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
  /// Connection, TLS, timeout or body read failure
  #[error("Request failed: {0}")]
  Transport(String),

  /// Server answered with a non-2xx status
  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },

  /// Body could not be parsed as a page envelope
  #[error("Malformed response: {0}")]
  Malformed(String),

  /// Request was rejected before reaching the network
  #[error("Invalid request: {0}")]
  InvalidRequest(String),
}

impl NetworkError {
  /// Human-readable message shown in place of results.
  pub fn message(&self) -> String {
    self.to_string()
  }
}

impl From<reqwest::Error> for NetworkError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      NetworkError::Transport(format!("timed out: {}", err))
    } else {
      NetworkError::Transport(err.to_string())
    }
  }
}

impl From<serde_json::Error> for NetworkError {
  fn from(err: serde_json::Error) -> Self {
    NetworkError::Malformed(err.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_message_includes_code() {
    let err = NetworkError::Status {
      status: 404,
      message: "There is nothing here".to_string(),
    };
    assert_eq!(err.message(), "HTTP 404: There is nothing here");
  }

  #[test]
  fn test_malformed_from_serde() {
    let err: NetworkError = serde_json::from_str::<u32>("nope").unwrap_err().into();
    assert!(matches!(err, NetworkError::Malformed(_)));
    assert!(!err.message().is_empty());
  }
}
