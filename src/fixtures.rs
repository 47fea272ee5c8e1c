// Fixture loading - JSON arrays of account mappings

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::db::Database;
use crate::entities::Account;

/// Read a JSON array of account mappings (the shape `to_dict` produces).
pub fn load_accounts(path: &Path) -> Result<Vec<Account>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to open fixture file {}", path.display()))?;
    parse_accounts(&raw)
}

pub fn parse_accounts(raw: &str) -> Result<Vec<Account>> {
    let value: Value = serde_json::from_str(raw).context("Failed to parse account JSON")?;

    let items = match value {
        Value::Array(items) => items,
        other => bail!("Expected a JSON array of accounts, got {}", other),
    };

    let mut accounts = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let account = Account::try_from(item)
            .with_context(|| format!("Failed to deserialize account #{}", index))?;
        accounts.push(account);
    }

    Ok(accounts)
}

/// Create every account in order, assigning ids in place.
pub fn insert_accounts(db: &Database, accounts: &mut [Account]) -> Result<usize> {
    for account in accounts.iter_mut() {
        account.create(db)?;
    }

    log::info!("Inserted {} accounts", accounts.len());
    Ok(accounts.len())
}
