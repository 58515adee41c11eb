// 🏦 Bank - the operations the web front end and CLI call
//
// register / authenticate / account lookup / deposit / withdraw / history.
// Holds only a store handle; clone it freely into handlers and threads.

use crate::credential::{hash_password, verify_or_dummy};
use crate::db::{Store, StoreOptions};
use crate::entities::account::{
    self, credential_for, find_by_id, find_by_username, insert_account, normalize_username,
    username_exists, Account, Registration,
};
use crate::entities::ledger::{self, entries_for, LedgerEntry};
use crate::error::{BankError, Result};
use crate::money::IntoAmount;
use crate::mutator::{BalanceMutator, Receipt};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Bank {
    store: Store,
    mutator: BalanceMutator,
}

/// Result of comparing a stored balance against its ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerCheck {
    pub username: String,
    pub balance: rust_decimal::Decimal,
    pub ledger_total: rust_decimal::Decimal,
    pub entries: usize,
}

impl LedgerCheck {
    pub fn is_consistent(&self) -> bool {
        self.balance == self.ledger_total
    }
}

impl Bank {
    pub fn new(store: Store) -> Self {
        Bank {
            mutator: BalanceMutator::new(store.clone()),
            store,
        }
    }

    pub fn open(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        Ok(Bank::new(Store::open(path, options)?))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ========================================================================
    // REGISTRATION & LOGIN
    // ========================================================================

    /// Create an account with balance 0 and an empty ledger
    pub fn register(&self, form: &Registration) -> Result<Account> {
        form.validate()?;
        let credential = hash_password(&form.password)?;
        let username = normalize_username(&form.username).to_string();

        let result = self.store.write(|tx| {
            if username_exists(tx, &username)? {
                return Err(BankError::DuplicateUsername);
            }
            let id = insert_account(tx, form, &credential)?;
            find_by_id(tx, id)?.ok_or(BankError::AccountNotFound)
        });

        match &result {
            Ok(account) => tracing::info!(username = %account.username, id = account.id, "account registered"),
            Err(e) => tracing::warn!(username = %username, error = %e, "registration rejected"),
        }
        result
    }

    /// Unknown user and wrong password produce the same error
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Account> {
        let stored = self.store.read(|conn| credential_for(conn, username))?;

        // An unknown user still pays for one hash verification
        let verified = verify_or_dummy(password, stored.as_ref().map(|(_, hash)| hash.as_str()));
        let id = match stored {
            Some((id, _)) if verified => id,
            _ => {
                tracing::warn!(username, "login failed");
                return Err(BankError::InvalidCredentials);
            }
        };

        let account = self
            .store
            .read(|conn| find_by_id(conn, id))?
            .ok_or(BankError::InvalidCredentials)?;
        tracing::info!(username, "login succeeded");
        Ok(account)
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn account(&self, username: &str) -> Result<Account> {
        self.store
            .read(|conn| find_by_username(conn, username))?
            .ok_or(BankError::AccountNotFound)
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        self.store.read(account::all_accounts)
    }

    /// Ledger entries, most recent first
    pub fn history(&self, username: &str) -> Result<Vec<LedgerEntry>> {
        self.store.read(|conn| {
            let account = find_by_username(conn, username)?.ok_or(BankError::AccountNotFound)?;
            entries_for(conn, account.id)
        })
    }

    /// Account and its history read in one snapshot
    pub fn statement(&self, username: &str) -> Result<(Account, Vec<LedgerEntry>)> {
        self.store.read(|conn| {
            let tx = conn.unchecked_transaction()?;
            let account = find_by_username(&tx, username)?.ok_or(BankError::AccountNotFound)?;
            let entries = entries_for(&tx, account.id)?;
            tx.finish()?;
            Ok((account, entries))
        })
    }

    /// Recompute Σ deposits − Σ withdrawals and compare with the stored balance
    pub fn verify_ledger(&self, username: &str) -> Result<LedgerCheck> {
        let (account, entries) = self.statement(username)?;
        Ok(LedgerCheck {
            username: account.username,
            balance: account.balance.value(),
            ledger_total: ledger::net_total(&entries),
            entries: entries.len(),
        })
    }

    // ========================================================================
    // BALANCE MUTATIONS
    // ========================================================================

    pub fn deposit(&self, username: &str, amount: impl IntoAmount) -> Result<Receipt> {
        self.mutator.deposit(username, amount)
    }

    pub fn withdraw(&self, username: &str, amount: impl IntoAmount) -> Result<Receipt> {
        self.mutator.withdraw(username, amount)
    }
}
