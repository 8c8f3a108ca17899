//! rmpager library
//!
//! The paged query cache (fetcher, cache store, query coordinator and
//! pagination) plus the terminal UI built on it. Exposed as a library for
//! integration tests.

pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod event;
pub mod logging;
pub mod pagination;
pub mod query;
pub mod ui;
