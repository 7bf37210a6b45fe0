//! Database layer
//!
//! A single `settings` table backs every durable client-side value
//! (consent flags, one-time markers, theme, cached profile).

pub mod init;
pub mod settings;

pub use init::{init_database, init_memory_database};
pub use settings::{delete_setting, get_setting, set_setting};
