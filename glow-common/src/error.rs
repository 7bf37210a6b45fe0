//! Errors shared by the glow crates
//!
//! Settings storage and config file handling both report through this type;
//! service-specific failures live in each crate's own error module.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite settings store
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data folder or config file access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config directory or TOML file unusable
    #[error("Configuration error: {0}")]
    Config(String),

    /// Stored value does not parse as the requested type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Value could not be serialized for storage
    #[error("Internal error: {0}")]
    Internal(String),
}
