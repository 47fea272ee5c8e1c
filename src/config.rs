// Runtime configuration, resolved from the environment

use anyhow::Result;
use std::path::PathBuf;

use crate::db::Database;

pub const DATABASE_URI_VAR: &str = "DATABASE_URI";
pub const DEFAULT_DATABASE_PATH: &str = "accounts.db";
const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseLocation,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match lookup(DATABASE_URI_VAR).filter(|v| !v.trim().is_empty()) {
            Some(uri) if uri == IN_MEMORY => DatabaseLocation::InMemory,
            Some(uri) => DatabaseLocation::File(PathBuf::from(uri.trim_start_matches("sqlite://"))),
            None => DatabaseLocation::File(PathBuf::from(DEFAULT_DATABASE_PATH)),
        };

        Config { database }
    }

    /// Open the configured database with every table created.
    pub fn open(&self) -> Result<Database> {
        let db = match &self.database {
            DatabaseLocation::File(path) => Database::open(path)?,
            DatabaseLocation::InMemory => Database::open_in_memory()?,
        };
        db.create_all()?;
        Ok(db)
    }
}
