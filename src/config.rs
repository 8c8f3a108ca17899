use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CachePolicy;

pub const DEFAULT_BASE_URL: &str = "https://rickandmortyapi.com/api/character";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Listing endpoint; `page=<n>` is appended to its query string
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Network-layer timeout for a single page request
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Age after which a page is refetched in the background
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Age after which a page is evicted outright
  #[serde(default = "default_expiry_secs")]
  pub expiry_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      expiry_secs: default_expiry_secs(),
    }
  }
}

impl CacheConfig {
  pub fn policy(&self) -> CachePolicy {
    CachePolicy {
      stale_time: Duration::from_secs(self.stale_secs),
      expiry_time: Duration::from_secs(self.expiry_secs),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Default filter directive; RUST_LOG takes precedence
  #[serde(default = "default_log_level")]
  pub level: String,
  /// Directory for rolling log files (default: <data_dir>/rmpager/logs)
  pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: default_log_level(),
      dir: None,
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_stale_secs() -> u64 {
  60
}

fn default_expiry_secs() -> u64 {
  300
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./rmpager.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/rmpager/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("rmpager.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("rmpager").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    if self.cache.expiry_secs < self.cache.stale_secs {
      return Err(eyre!(
        "cache.expiry_secs ({}) must not be shorter than cache.stale_secs ({})",
        self.cache.expiry_secs,
        self.cache.stale_secs
      ));
    }
    Ok(())
  }

  /// Directory for log files.
  pub fn log_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.log.dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("rmpager").join("logs"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use tempfile::TempDir;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.cache.policy(), CachePolicy::default());
    assert_eq!(config.log.level, "info");
  }

  #[test]
  fn test_partial_yaml_fills_defaults() {
    let config: Config = serde_yaml::from_str("cache:\n  stale_secs: 5\n").unwrap();
    assert_eq!(config.cache.stale_secs, 5);
    assert_eq!(config.cache.expiry_secs, 300);
    assert_eq!(config.api.timeout_secs, 10);
  }

  #[test]
  fn test_load_from_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(
      &path,
      "api:\n  base_url: http://localhost:9000/character\nlog:\n  level: debug\n",
    )
    .unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:9000/character");
    assert_eq!(config.log.level, "debug");
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.yaml");
    assert!(Config::load(Some(&missing)).is_err());
  }

  #[test]
  fn test_expiry_shorter_than_stale_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "cache:\n  stale_secs: 600\n  expiry_secs: 60\n").unwrap();
    assert!(Config::load(Some(&path)).is_err());
  }

  #[test]
  fn test_explicit_log_dir() {
    let mut config = Config::default();
    config.log.dir = Some(PathBuf::from("/tmp/rmpager-logs"));
    assert_eq!(config.log_dir().unwrap(), PathBuf::from("/tmp/rmpager-logs"));
  }
}
