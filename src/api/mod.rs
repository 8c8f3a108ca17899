//! Fetcher for the remote character listing.

pub mod client;
pub mod error;
pub mod types;

pub use client::CharacterClient;
pub use error::NetworkError;
pub use types::{Character, CharacterPage, PageInfo};
