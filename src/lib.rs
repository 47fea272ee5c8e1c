// Account Store - Core Library
// Active-record account model over SQLite, used by the CLI and tests

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod fixtures;

// Re-export commonly used types
pub use config::{Config, DatabaseLocation};
pub use db::{Database, Table};
pub use entities::Account;
pub use error::{is_validation_error, DataValidationError};
pub use fixtures::{insert_accounts, load_accounts, parse_accounts};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
