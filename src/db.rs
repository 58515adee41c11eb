use crate::error::{BankError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time a writer waits for the database lock before giving up
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// How long a connection waits on a locked database (SQLITE_BUSY)
    pub busy_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Handle to the shared relational store.
///
/// Cheap to clone and safe to share across threads: it only carries the
/// database path. Each operation opens its own connection, so concurrent
/// handlers never share connection state and nothing is cached in-process.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
    options: StoreOptions,
}

impl Store {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let store = Store {
            path: path.as_ref().to_path_buf(),
            options,
        };

        let conn = store.connect()?;
        setup_database(&conn)?;

        tracing::info!(path = %store.path.display(), "store opened");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fresh connection with busy timeout and foreign keys enabled
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.options.busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(conn)
    }

    /// Run `f` inside one IMMEDIATE transaction.
    ///
    /// The write lock is taken at BEGIN, so every read made inside `f`
    /// (e.g. the balance check of a withdrawal) is serialized against all
    /// other writers. `f` returning `Err` drops the transaction, which rolls
    /// it back; a failed COMMIT rolls back as well.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let value = f(&tx)?;

        tx.commit().map_err(|e| {
            tracing::error!(error = %e, "commit failed, transaction rolled back");
            BankError::from(e)
        })?;

        Ok(value)
    }

    /// Run `f` against a plain connection (reads only)
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode so readers never block the single writer
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!(journal_mode = %mode, "journal mode set");

    // ==========================================================================
    // Users Table (one row per account, balance kept as decimal TEXT)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            dob TEXT NOT NULL,
            gender TEXT NOT NULL,
            username TEXT UNIQUE NOT NULL,
            password TEXT NOT NULL,
            balance TEXT NOT NULL DEFAULT '0',
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Transactions Table (append-only ledger)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference TEXT UNIQUE NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            type TEXT NOT NULL CHECK (type IN ('Deposit', 'Withdrawal')),
            amount TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_user ON transactions(user_id, id)",
        [],
    )?;

    Ok(())
}

/// Store-assigned timestamp. Fixed precision keeps TEXT ordering == time ordering.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// True when the error is a UNIQUE / CHECK / FK violation
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
