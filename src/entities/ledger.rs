// 📒 Ledger Entry - one immutable row per deposit or withdrawal
//
// Entries are only ever appended, inside the same write transaction that
// moves the balance. Sign lives in `kind`, the amount is always positive.

use crate::db::{now_timestamp, parse_timestamp};
use crate::error::{BankError, Result};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ENTRY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Deposit,
    Withdrawal,
}

impl EntryKind {
    /// Value stored in the `type` column
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "Deposit",
            EntryKind::Withdrawal => "Withdrawal",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Deposit" => Ok(EntryKind::Deposit),
            "Withdrawal" => Ok(EntryKind::Withdrawal),
            other => Err(BankError::StoreUnavailable(format!(
                "unknown ledger entry type: {}",
                other
            ))),
        }
    }
}

// ============================================================================
// LEDGER ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Insertion order (store-assigned)
    pub id: i64,

    /// Stable public reference shown on receipts
    pub reference: String,

    pub account_id: i64,
    pub kind: EntryKind,
    pub amount: Amount,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let kind: String = row.get(3)?;
        let timestamp: String = row.get(5)?;

        Ok(LedgerEntry {
            id: row.get(0)?,
            reference: row.get(1)?,
            account_id: row.get(2)?,
            kind: kind
                .parse()
                .map_err(|e: BankError| rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                ))?,
            amount: row.get(4)?,
            timestamp: parse_timestamp(&timestamp).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("bad timestamp: {}", timestamp).into(),
                )
            })?,
        })
    }

    /// Effect on the balance: +amount for deposits, -amount for withdrawals
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            EntryKind::Deposit => self.amount.value(),
            EntryKind::Withdrawal => -self.amount.value(),
        }
    }
}

// ============================================================================
// LEDGER STORE
// ============================================================================

/// Next timestamp, never earlier than the newest one already stored.
/// Writers are serialized, so this gives insertion-monotonic timestamps
/// even if the wall clock steps backwards.
fn next_timestamp(tx: &Transaction<'_>) -> Result<String> {
    let latest: Option<String> = tx
        .query_row(
            "SELECT timestamp FROM transactions ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let now = now_timestamp();
    Ok(match latest {
        Some(latest) if latest > now => latest,
        _ => now,
    })
}

/// Append one entry. Must run in the same transaction as the balance update.
pub fn append_entry(
    tx: &Transaction<'_>,
    account_id: i64,
    kind: EntryKind,
    amount: Amount,
) -> Result<LedgerEntry> {
    let reference = uuid::Uuid::new_v4().to_string();
    let timestamp = next_timestamp(tx)?;

    tx.execute(
        "INSERT INTO transactions (reference, user_id, type, amount, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![reference, account_id, kind.as_str(), amount, timestamp],
    )?;

    Ok(LedgerEntry {
        id: tx.last_insert_rowid(),
        reference,
        account_id,
        kind,
        amount,
        timestamp: parse_timestamp(&timestamp).unwrap_or_else(Utc::now),
    })
}

/// Entries for one account, most recent first. Empty when there are none.
pub fn entries_for(conn: &Connection, account_id: i64) -> Result<Vec<LedgerEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, reference, user_id, type, amount, timestamp
         FROM transactions
         WHERE user_id = ?1
         ORDER BY timestamp DESC, id DESC",
    )?;

    let entries = stmt
        .query_map([account_id], LedgerEntry::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(entries)
}

pub fn count_entries(conn: &Connection, account_id: i64) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
        [account_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Σ deposits − Σ withdrawals
pub fn net_total(entries: &[LedgerEntry]) -> Decimal {
    entries.iter().map(LedgerEntry::signed_amount).sum()
}
