// 👤 Account Entity - registered user + balance
//
// Identity: id (store-assigned, never changes) and username (unique)
// Values:   profile fields are fixed at registration, balance moves only
//           through the balance mutator
//
// The credential column is never read into `Account`; only the
// authenticator sees it through `credential_for`.

use crate::db::{is_constraint_violation, now_timestamp, parse_timestamp};
use crate::error::{BankError, Result};
use crate::money::Balance;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use serde::{Deserialize, Serialize};

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub date_of_birth: String,
    pub gender: String,
    pub username: String,
    pub balance: Balance,
    pub created_at: Option<DateTime<Utc>>,
}

const ACCOUNT_COLUMNS: &str = "id, name, dob, gender, username, balance, created_at";

impl Account {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let created_at: String = row.get(6)?;
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            date_of_birth: row.get(2)?,
            gender: row.get(3)?,
            username: row.get(4)?,
            balance: row.get(5)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

// ============================================================================
// REGISTRATION FORM
// ============================================================================

/// Everything the register form collects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Registration {
    pub name: String,
    #[serde(alias = "dob")]
    pub date_of_birth: String,
    pub gender: String,
    pub username: String,
    pub password: String,
    /// Optional repeat of the password; checked when present
    #[serde(default)]
    pub confirm: Option<String>,
}

impl Registration {
    pub fn new(
        name: &str,
        date_of_birth: &str,
        gender: &str,
        username: &str,
        password: &str,
    ) -> Self {
        Registration {
            name: name.to_string(),
            date_of_birth: date_of_birth.to_string(),
            gender: gender.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            confirm: None,
        }
    }

    pub fn with_confirm(mut self, confirm: &str) -> Self {
        self.confirm = Some(confirm.to_string());
        self
    }

    /// Form-level checks that need no database access
    pub fn validate(&self) -> Result<()> {
        if normalize_username(&self.username).is_empty() {
            return Err(BankError::Validation("Username is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(BankError::Validation("Password is required".to_string()));
        }
        if let Some(confirm) = &self.confirm {
            if confirm != &self.password {
                return Err(BankError::Validation("Passwords do not match".to_string()));
            }
        }
        Ok(())
    }
}

// ============================================================================
// ACCOUNT STORE
// ============================================================================

/// Usernames are stored and looked up without surrounding whitespace.
/// Every query below goes through this.
pub fn normalize_username(raw: &str) -> &str {
    raw.trim()
}

pub fn username_exists(conn: &Connection, username: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        [normalize_username(username)],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Insert a new account with a zero balance. Must run in a write transaction.
pub fn insert_account(tx: &Transaction<'_>, form: &Registration, credential: &str) -> Result<i64> {
    let result = tx.execute(
        "INSERT INTO users (name, dob, gender, username, password, balance, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            form.name,
            form.date_of_birth,
            form.gender,
            normalize_username(&form.username),
            credential,
            Balance::ZERO,
            now_timestamp(),
        ],
    );

    match result {
        Ok(_) => Ok(tx.last_insert_rowid()),
        Err(e) if is_constraint_violation(&e) => Err(BankError::DuplicateUsername),
        Err(e) => Err(e.into()),
    }
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", ACCOUNT_COLUMNS),
            [normalize_username(username)],
            Account::from_row,
        )
        .optional()?;
    Ok(account)
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", ACCOUNT_COLUMNS),
            [id],
            Account::from_row,
        )
        .optional()?;
    Ok(account)
}

/// All accounts ordered by id
pub fn all_accounts(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", ACCOUNT_COLUMNS))?;
    let accounts = stmt
        .query_map([], Account::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(accounts)
}

/// Read id + balance inside the caller's write transaction.
/// The IMMEDIATE lock held by `tx` keeps this value current until commit.
pub fn lock_balance(tx: &Transaction<'_>, username: &str) -> Result<(i64, Balance)> {
    tx.query_row(
        "SELECT id, balance FROM users WHERE username = ?1",
        [normalize_username(username)],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()?
    .ok_or(BankError::AccountNotFound)
}

pub fn store_balance(tx: &Transaction<'_>, account_id: i64, balance: Balance) -> Result<()> {
    let updated = tx.execute(
        "UPDATE users SET balance = ?1 WHERE id = ?2",
        params![balance, account_id],
    )?;
    if updated != 1 {
        return Err(BankError::AccountNotFound);
    }
    Ok(())
}

/// (id, stored credential) for the authenticator
pub fn credential_for(conn: &Connection, username: &str) -> Result<Option<(i64, String)>> {
    let row = conn
        .query_row(
            "SELECT id, password FROM users WHERE username = ?1",
            [normalize_username(username)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(row)
}

// ============================================================================
// TESTS
// ============================================================================
