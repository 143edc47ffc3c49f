//! # Seedling Common Library
//!
//! Shared code for Seedling services including:
//! - Error and result types
//! - Root folder and configuration file resolution
//! - Tracing subscriber setup
//! - SQLite pool initialization
//! - RFC 3339 timestamp parsing

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
