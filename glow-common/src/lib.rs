//! # Glow Common Library
//!
//! Shared code for the Glow analyzer client including:
//! - Error type used across crates
//! - Configuration loading and data folder resolution
//! - SQLite key-value settings store
//! - Event bus for workflow progress
//! - Time utilities

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
