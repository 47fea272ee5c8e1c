use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

/// A model persisted in its own table.
pub trait Table {
    /// Table name, used verbatim in SQL.
    const NAME: &'static str;

    /// `CREATE TABLE IF NOT EXISTS ...` statement for the table.
    const DDL: &'static str;
}

/// Database session: one SQLite connection plus schema helpers.
///
/// Statements run in autocommit mode, so every model operation is
/// committed as soon as it returns.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database file with WAL journaling.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        // Enable WAL mode for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Database { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Ok(Database { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create every model table that does not exist yet.
    pub fn create_all(&self) -> Result<()> {
        self.create_table::<crate::Account>()
    }

    pub fn create_table<T: Table>(&self) -> Result<()> {
        log::debug!("Creating table {}", T::NAME);
        self.conn
            .execute(T::DDL, [])
            .with_context(|| format!("Failed to create table {}", T::NAME))?;
        Ok(())
    }

    /// Delete every row of a model's table. Returns the number of rows removed.
    pub fn truncate<T: Table>(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute(&format!("DELETE FROM {}", T::NAME), [])
            .with_context(|| format!("Failed to truncate {}", T::NAME))?;
        Ok(removed)
    }

    pub fn count<T: Table>(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", T::NAME), [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows in {}", T::NAME))?;

        Ok(count)
    }
}
