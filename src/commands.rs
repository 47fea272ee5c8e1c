// CLI actions over an open database; the binary only parses and prints

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::path::Path;

use crate::db::Database;
use crate::entities::Account;
use crate::fixtures::{insert_accounts, load_accounts};

pub fn parse_id(raw: &str) -> Result<i64> {
    raw.parse()
        .with_context(|| format!("Invalid account id: {}", raw))
}

pub fn find_or_fail(db: &Database, id: i64) -> Result<Account> {
    match Account::find(db, id)? {
        Some(account) => Ok(account),
        None => bail!("No account with id {}", id),
    }
}

/// Load a fixture file and create every account in it.
pub fn import(db: &Database, path: &Path) -> Result<usize> {
    let mut accounts = load_accounts(path)?;
    insert_accounts(db, &mut accounts)
}

pub fn rename(db: &Database, id: i64, name: &str) -> Result<Account> {
    let mut account = find_or_fail(db, id)?;
    account.from_dict(&json!({ "name": name }))?;
    account.update(db)?;
    Ok(account)
}

/// Returns the removed account, its id already cleared.
pub fn delete(db: &Database, id: i64) -> Result<Account> {
    let mut account = find_or_fail(db, id)?;
    account.delete(db)?;
    Ok(account)
}
