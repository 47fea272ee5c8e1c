// Account Entity - active record over the `accounts` table
//
// The in-memory record carries an optional id: None until `create` has
// inserted the row, Some(rowid) afterwards.

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::db::{Database, Table};
use crate::error::DataValidationError;

pub const NAME_MAX_LEN: usize = 64;
pub const EMAIL_MAX_LEN: usize = 64;
pub const PHONE_NUMBER_MAX_LEN: usize = 32;

const DATE_FORMAT: &str = "%Y-%m-%d";

const SELECT_COLUMNS: &str = "SELECT id, name, email, phone_number, disabled, date_joined FROM accounts";

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// Store-assigned identity, unset until persisted
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub disabled: bool,
    pub date_joined: NaiveDate,
}

impl Default for Account {
    fn default() -> Self {
        Account {
            id: None,
            name: String::new(),
            email: String::new(),
            phone_number: None,
            disabled: false,
            date_joined: Utc::now().date_naive(),
        }
    }
}

impl Table for Account {
    const NAME: &'static str = "accounts";

    const DDL: &'static str = "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone_number TEXT,
            disabled INTEGER NOT NULL DEFAULT 0,
            date_joined TEXT NOT NULL DEFAULT CURRENT_DATE
        )";
}

impl Account {
    /// Unsaved account with today's join date
    pub fn new(name: &str, email: &str) -> Self {
        Account {
            name: name.to_string(),
            email: email.to_string(),
            ..Account::default()
        }
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Insert this account as a new row and take the generated id.
    ///
    /// Any id already held is discarded first, so calling `create` on a
    /// loaded record inserts a copy rather than overwriting.
    pub fn create(&mut self, db: &Database) -> Result<()> {
        log::info!("Creating {}", self.name);
        self.id = None;

        let conn = db.connection();
        conn.execute(
            "INSERT INTO accounts (name, email, phone_number, disabled, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.name,
                self.email,
                self.phone_number,
                self.disabled,
                self.date_joined.format(DATE_FORMAT).to_string(),
            ],
        )
        .with_context(|| format!("Failed to insert account {}", self.name))?;

        self.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    /// Write the in-memory fields to the row with this account's id.
    pub fn update(&self, db: &Database) -> Result<()> {
        log::info!("Saving {}", self.name);
        let id = self
            .id
            .ok_or_else(|| DataValidationError::new("Update called with empty ID field"))?;

        let changed = db
            .connection()
            .execute(
                "UPDATE accounts
                 SET name = ?1, email = ?2, phone_number = ?3, disabled = ?4, date_joined = ?5
                 WHERE id = ?6",
                params![
                    self.name,
                    self.email,
                    self.phone_number,
                    self.disabled,
                    self.date_joined.format(DATE_FORMAT).to_string(),
                    id,
                ],
            )
            .with_context(|| format!("Failed to update account {}", id))?;

        if changed == 0 {
            return Err(DataValidationError::new(format!("Account with id {} not found", id)).into());
        }

        Ok(())
    }

    /// Remove this account's row and clear the in-memory id.
    ///
    /// A row that is already gone is not an error.
    pub fn delete(&mut self, db: &Database) -> Result<()> {
        log::info!("Deleting {}", self.name);
        let id = self
            .id
            .ok_or_else(|| DataValidationError::new("Delete called with empty ID field"))?;

        let removed = db
            .connection()
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete account {}", id))?;

        if removed == 0 {
            log::warn!("Account {} was already deleted", id);
        }

        self.id = None;
        Ok(())
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn find(db: &Database, id: i64) -> Result<Option<Account>> {
        let account = db
            .connection()
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                Account::from_row,
            )
            .optional()
            .with_context(|| format!("Failed to look up account {}", id))?;

        Ok(account)
    }

    /// Every persisted account, ordered by id
    pub fn all(db: &Database) -> Result<Vec<Account>> {
        let mut stmt = db
            .connection()
            .prepare(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .context("Failed to prepare account listing")?;

        let accounts = stmt
            .query_map([], Account::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read accounts")?;

        Ok(accounts)
    }

    pub fn find_by_name(db: &Database, name: &str) -> Result<Vec<Account>> {
        let mut stmt = db
            .connection()
            .prepare(&format!("{} WHERE name = ?1 ORDER BY id", SELECT_COLUMNS))
            .context("Failed to prepare account lookup by name")?;

        let accounts = stmt
            .query_map(params![name], Account::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to read accounts named {}", name))?;

        Ok(accounts)
    }

    pub fn count(db: &Database) -> Result<i64> {
        db.count::<Account>()
    }

    fn from_row(row: &Row) -> rusqlite::Result<Account> {
        let date_str: String = row.get(5)?;
        let date_joined = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            phone_number: row.get(3)?,
            disabled: row.get(4)?,
            date_joined,
        })
    }

    // ========================================================================
    // MAPPING CONVERSION
    // ========================================================================

    /// Mapping of every column, `id` included (null while unsaved)
    pub fn to_dict(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Overwrite the fields named in `data`.
    ///
    /// Keys that are absent keep their current value and `id` is ignored.
    /// Nothing is changed when any key is rejected.
    pub fn from_dict(&mut self, data: &Value) -> Result<(), DataValidationError> {
        if !data.is_object() {
            return Err(DataValidationError::new(format!(
                "Invalid account: expected an object, got {}",
                data
            )));
        }

        let patch = AccountPatch::deserialize(data)
            .map_err(|e| DataValidationError::new(format!("Invalid account: {}", e)))?;

        check_length("name", patch.name.as_deref(), NAME_MAX_LEN)?;
        check_length("email", patch.email.as_deref(), EMAIL_MAX_LEN)?;
        check_length(
            "phone_number",
            patch.phone_number.as_ref().and_then(|p| p.as_deref()),
            PHONE_NUMBER_MAX_LEN,
        )?;

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(phone_number) = patch.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(disabled) = patch.disabled {
            self.disabled = disabled;
        }
        if let Some(date_joined) = patch.date_joined {
            self.date_joined = date_joined;
        }

        Ok(())
    }
}

/// Fields accepted by `from_dict`; `None` means the key was absent.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct AccountPatch {
    #[serde(rename = "id")]
    _id: Option<IgnoredAny>,
    #[serde(default, deserialize_with = "present")]
    name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    email: Option<String>,
    /// `Some(None)` clears the number
    #[serde(default, deserialize_with = "present")]
    phone_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    disabled: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    date_joined: Option<NaiveDate>,
}

// A key that is present must hold a valid value; null only passes where T accepts it.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn check_length(key: &str, value: Option<&str>, max_len: usize) -> Result<(), DataValidationError> {
    match value {
        Some(text) if text.chars().count() > max_len => Err(DataValidationError::new(format!(
            "Invalid account: {} is longer than {} characters",
            key, max_len
        ))),
        _ => Ok(()),
    }
}

impl TryFrom<&Value> for Account {
    type Error = DataValidationError;

    fn try_from(data: &Value) -> Result<Self, Self::Error> {
        let mut account = Account::default();
        account.from_dict(data)?;
        Ok(account)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Account '{}'>", self.name)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_validation_error;
    use serde_json::json;

    const ACCOUNT_DATA: &str = include_str!("../../tests/fixtures/account_data.json");

    fn account_data() -> Vec<Value> {
        match serde_json::from_str::<Value>(ACCOUNT_DATA).unwrap() {
            Value::Array(items) => items,
            other => panic!("fixture is not an array: {}", other),
        }
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.create_all().unwrap();
        db
    }

    #[test]
    fn test_create_all_accounts() {
        let db = setup();
        let data = account_data();

        for item in &data {
            let mut account = Account::try_from(item).unwrap();
            account.create(&db).unwrap();
        }

        assert_eq!(Account::all(&db).unwrap().len(), data.len());
        assert_eq!(Account::count(&db).unwrap(), data.len() as i64);
    }

    #[test]
    fn test_create_an_account() {
        let db = setup();
        let data = account_data();

        let mut account = Account::try_from(&data[3]).unwrap();
        account.create(&db).unwrap();

        assert_eq!(Account::all(&db).unwrap().len(), 1);
    }

    #[test]
    fn test_create_assigns_distinct_ids() {
        let db = setup();
        let mut first = Account::new("Ada", "ada@example.com");
        let mut second = Account::new("Ada", "ada@example.com");
        assert_eq!(first.id, None);

        first.create(&db).unwrap();
        second.create(&db).unwrap();

        assert!(first.id.is_some());
        assert!(second.id.is_some());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_create_twice_inserts_copy() {
        let db = setup();
        let mut account = Account::new("Ada", "ada@example.com");
        account.create(&db).unwrap();
        let first_id = account.id;

        account.create(&db).unwrap();

        assert_ne!(account.id, first_id);
        assert_eq!(Account::count(&db).unwrap(), 2);
    }

    #[test]
    fn test_repr() {
        let mut account = Account::default();
        account.name = "Foo".to_string();
        assert_eq!(account.to_string(), "<Account 'Foo'>");
    }

    #[test]
    fn test_to_dict() {
        let data = account_data();
        let account = Account::try_from(&data[1]).unwrap();
        let result = account.to_dict();

        assert_eq!(result["id"], Value::Null);
        assert_eq!(result["name"], json!(account.name));
        assert_eq!(result["email"], json!(account.email));
        assert_eq!(result["phone_number"], json!(account.phone_number));
        assert_eq!(result["disabled"], json!(account.disabled));
        assert_eq!(result["date_joined"], data[1]["date_joined"]);
    }

    #[test]
    fn test_from_dict() {
        let data = account_data();
        let mut account = Account::default();
        account.from_dict(&data[0]).unwrap();

        assert_eq!(account.name, data[0]["name"].as_str().unwrap());
        assert_eq!(account.email, data[0]["email"].as_str().unwrap());
        assert_eq!(account.disabled, data[0]["disabled"].as_bool().unwrap());
    }

    #[test]
    fn test_dict_round_trip_preserves_fields() {
        let account = Account {
            id: Some(42),
            name: "Grace Hopper".to_string(),
            email: "grace@example.com".to_string(),
            phone_number: Some("555-0100".to_string()),
            disabled: true,
            date_joined: NaiveDate::from_ymd_opt(2019, 3, 14).unwrap(),
        };

        let mut copy = Account::default();
        copy.from_dict(&Value::Object(account.to_dict())).unwrap();

        assert_eq!(copy.name, account.name);
        assert_eq!(copy.email, account.email);
        assert_eq!(copy.phone_number, account.phone_number);
        assert_eq!(copy.disabled, account.disabled);
        assert_eq!(copy.date_joined, account.date_joined);
        // identity stays with the store
        assert_eq!(copy.id, None);
    }

    #[test]
    fn test_from_dict_partial_keeps_other_fields() {
        let mut account = Account::new("Ada", "ada@example.com");
        account.phone_number = Some("555-0101".to_string());

        account.from_dict(&json!({"name": "Ada Lovelace"})).unwrap();

        assert_eq!(account.name, "Ada Lovelace");
        assert_eq!(account.email, "ada@example.com");
        assert_eq!(account.phone_number.as_deref(), Some("555-0101"));
    }

    #[test]
    fn test_from_dict_null_phone_number_clears_it() {
        let mut account = Account::new("Ada", "ada@example.com");
        account.phone_number = Some("555-0101".to_string());

        account.from_dict(&json!({"phone_number": null})).unwrap();

        assert_eq!(account.phone_number, None);
    }

    #[test]
    fn test_from_dict_rejects_malformed_input() {
        let cases = vec![
            json!("not an object"),
            json!([1, 2, 3]),
            json!({"name": 7}),
            json!({"email": null}),
            json!({"disabled": "yes"}),
            json!({"date_joined": "14/03/2019"}),
            json!({"date_joined": 20190314}),
            json!({"nickname": "ada"}),
            json!({"name": "x".repeat(NAME_MAX_LEN + 1)}),
            json!({"email": "x".repeat(EMAIL_MAX_LEN + 1)}),
            json!({"phone_number": "9".repeat(PHONE_NUMBER_MAX_LEN + 1)}),
        ];

        for case in cases {
            let mut account = Account::default();
            assert!(account.from_dict(&case).is_err(), "accepted {}", case);
        }
    }

    #[test]
    fn test_from_dict_error_leaves_record_unchanged() {
        let mut account = Account::new("Ada", "ada@example.com");
        let before = account.clone();

        let err = account
            .from_dict(&json!({"name": "Changed", "disabled": "nope"}))
            .unwrap_err();

        assert!(err.message().contains("expected a boolean"));
        assert_eq!(account, before);
    }

    #[test]
    fn test_from_dict_length_limits_are_inclusive() {
        let mut account = Account::default();
        let email = "e".repeat(EMAIL_MAX_LEN);

        account
            .from_dict(&json!({"email": email, "phone_number": "5".repeat(PHONE_NUMBER_MAX_LEN)}))
            .unwrap();
        assert_eq!(account.email.len(), EMAIL_MAX_LEN);

        let err = account
            .from_dict(&json!({"email": "e".repeat(EMAIL_MAX_LEN + 1)}))
            .unwrap_err();
        assert!(err.message().contains("email"));
        assert_eq!(account.email, email);
    }

    #[test]
    fn test_to_dict_of_persisted_account() {
        let db = setup();
        let mut account = Account::new("Ada", "ada@example.com");
        account.date_joined = NaiveDate::from_ymd_opt(2021, 1, 9).unwrap();
        account.create(&db).unwrap();

        let result = account.to_dict();

        assert_eq!(result.len(), 6);
        assert_eq!(result["id"], json!(account.id.unwrap()));
        assert_eq!(result["phone_number"], Value::Null);
        assert_eq!(result["date_joined"], json!("2021-01-09"));

        let mut other = Account::new("Grace", "grace@example.com");
        other.from_dict(&Value::Object(result)).unwrap();
        assert_eq!(other.id, None);
        assert_eq!(other.name, "Ada");
    }

    #[test]
    fn test_create() {
        let db = setup();
        let data = account_data();
        let mut account = Account::try_from(&data[2]).unwrap();
        account.create(&db).unwrap();

        let found = Account::find(&db, account.id.unwrap()).unwrap();
        assert_eq!(found, Some(account));
    }

    #[test]
    fn test_find_missing_returns_none() {
        let db = setup();
        assert_eq!(Account::find(&db, 999).unwrap(), None);
    }

    #[test]
    fn test_update() {
        let db = setup();
        let mut data = account_data();
        let mut account = Account::try_from(&data[4]).unwrap();
        account.create(&db).unwrap();
        assert_eq!(account.name, data[4]["name"].as_str().unwrap());

        data[4]["name"] = json!("New Name");
        account.from_dict(&data[4]).unwrap();
        account.update(&db).unwrap();

        assert_eq!(account.name, "New Name");
        let found = Account::find(&db, account.id.unwrap()).unwrap().unwrap();
        assert_eq!(found.name, "New Name");
    }

    #[test]
    fn test_update_without_id() {
        let db = setup();
        let data = account_data();
        let account = Account::try_from(&data[0]).unwrap();

        let err = account.update(&db).unwrap_err();
        assert!(is_validation_error(&err));
    }

    #[test]
    fn test_update_missing_row_is_validation_error() {
        let db = setup();
        let mut account = Account::new("Ghost", "ghost@example.com");
        account.id = Some(12345);

        let err = account.update(&db).unwrap_err();
        assert!(is_validation_error(&err));
        assert_eq!(Account::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_delete() {
        let db = setup();
        let data = account_data();
        let mut account = Account::try_from(&data[5]).unwrap();
        account.create(&db).unwrap();
        assert_eq!(Account::all(&db).unwrap().len(), 1);

        account.delete(&db).unwrap();

        assert_eq!(Account::all(&db).unwrap().len(), 0);
        assert_eq!(account.id, None);
    }

    #[test]
    fn test_delete_reduces_count_by_one() {
        let db = setup();
        let mut accounts: Vec<Account> = account_data()
            .iter()
            .map(|item| Account::try_from(item).unwrap())
            .collect();
        for account in accounts.iter_mut() {
            account.create(&db).unwrap();
        }
        let before = Account::count(&db).unwrap();

        accounts[0].delete(&db).unwrap();

        assert_eq!(Account::count(&db).unwrap(), before - 1);
    }

    #[test]
    fn test_delete_already_absent_is_noop() {
        let db = setup();
        let mut account = Account::new("Ada", "ada@example.com");
        account.create(&db).unwrap();
        let mut stale = account.clone();

        account.delete(&db).unwrap();
        stale.delete(&db).unwrap();

        assert_eq!(Account::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_delete_without_id() {
        let db = setup();
        let mut account = Account::new("Ada", "ada@example.com");

        let err = account.delete(&db).unwrap_err();
        assert!(is_validation_error(&err));
    }

    #[test]
    fn test_all_ordered_by_id() {
        let db = setup();
        for name in ["Charlie", "Alice", "Bob"] {
            Account::new(name, "someone@example.com").create(&db).unwrap();
        }

        let names: Vec<String> = Account::all(&db).unwrap().into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["Charlie", "Alice", "Bob"]);
    }

    #[test]
    fn test_find_by_name() {
        let db = setup();
        Account::new("Ada", "ada@example.com").create(&db).unwrap();
        Account::new("Grace", "grace@example.com").create(&db).unwrap();
        Account::new("Ada", "ada.l@example.com").create(&db).unwrap();

        let found = Account::find_by_name(&db, "Ada").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a.name == "Ada"));
        assert!(Account::find_by_name(&db, "Linus").unwrap().is_empty());
    }
}
