// ⚖️ Balance Mutator - the only code allowed to move a balance
//
// Deposit / Withdraw = one IMMEDIATE transaction that
//   1. reads the account row (and, for withdrawals, checks the balance)
//   2. writes the new balance
//   3. appends exactly one ledger entry
// Either all three commit or none do. The write lock is held from step 1
// until commit, so two withdrawals cannot both pass the check against the
// same stale balance.

use crate::db::Store;
use crate::entities::account::{lock_balance, store_balance};
use crate::entities::ledger::{append_entry, EntryKind, LedgerEntry};
use crate::error::{BankError, Result};
use crate::money::{Amount, Balance, IntoAmount};
use serde::Serialize;

/// Outcome of a committed mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub entry: LedgerEntry,
    pub balance: Balance,
}

#[derive(Debug, Clone)]
pub struct BalanceMutator {
    store: Store,
}

impl BalanceMutator {
    pub fn new(store: Store) -> Self {
        BalanceMutator { store }
    }

    pub fn deposit(&self, username: &str, amount: impl IntoAmount) -> Result<Receipt> {
        self.apply(username, EntryKind::Deposit, amount.into_amount())
    }

    pub fn withdraw(&self, username: &str, amount: impl IntoAmount) -> Result<Receipt> {
        self.apply(username, EntryKind::Withdrawal, amount.into_amount())
    }

    fn apply(&self, username: &str, kind: EntryKind, amount: Result<Amount>) -> Result<Receipt> {
        let result = amount.and_then(|amount| {
            self.store.write(|tx| {
                let (account_id, balance) = lock_balance(tx, username)?;

                let new_balance = match kind {
                    EntryKind::Deposit => balance.checked_add(amount)?,
                    EntryKind::Withdrawal => balance
                        .checked_sub(amount)
                        .ok_or(BankError::InsufficientFunds)?,
                };

                store_balance(tx, account_id, new_balance)?;
                let entry = append_entry(tx, account_id, kind, amount)?;

                Ok(Receipt {
                    entry,
                    balance: new_balance,
                })
            })
        });

        match &result {
            Ok(receipt) => tracing::info!(
                username,
                kind = %kind,
                amount = %receipt.entry.amount,
                balance = %receipt.balance,
                reference = %receipt.entry.reference,
                "balance updated"
            ),
            Err(BankError::StoreUnavailable(reason)) => tracing::error!(
                username,
                kind = %kind,
                reason = %reason,
                "mutation rolled back"
            ),
            Err(e) => tracing::warn!(username, kind = %kind, error = %e, "mutation rejected"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreOptions;
    use crate::entities::account::{find_by_username, insert_account, Registration};
    use crate::entities::ledger::{count_entries, entries_for};
    use rust_decimal_macros::dec;

    fn setup() -> (tempfile::TempDir, Store, BalanceMutator) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("bank.db"), StoreOptions::default()).unwrap();
        let form = Registration::new("Alan", "1912-06-23", "M", "alan", "pw");
        store.write(|tx| insert_account(tx, &form, "h")).unwrap();
        let mutator = BalanceMutator::new(store.clone());
        (dir, store, mutator)
    }

    fn balance_of(store: &Store, username: &str) -> rust_decimal::Decimal {
        store
            .read(|conn| find_by_username(conn, username))
            .unwrap()
            .unwrap()
            .balance
            .value()
    }

    #[test]
    fn test_deposit_then_withdraw() {
        let (_dir, store, mutator) = setup();

        let receipt = mutator.deposit("alan", "50").unwrap();
        assert_eq!(receipt.balance.value(), dec!(50));
        assert_eq!(receipt.entry.kind, EntryKind::Deposit);

        let receipt = mutator.withdraw("alan", 20.0).unwrap();
        assert_eq!(receipt.balance.value(), dec!(30));
        assert_eq!(receipt.entry.kind, EntryKind::Withdrawal);

        assert_eq!(balance_of(&store, "alan"), dec!(30));
    }

    #[test]
    fn test_insufficient_funds_changes_nothing() {
        let (_dir, store, mutator) = setup();
        mutator.deposit("alan", "30").unwrap();

        let result = mutator.withdraw("alan", "100");
        assert_eq!(result, Err(BankError::InsufficientFunds));

        assert_eq!(balance_of(&store, "alan"), dec!(30));
        let account = store.read(|conn| find_by_username(conn, "alan")).unwrap().unwrap();
        assert_eq!(store.read(|conn| count_entries(conn, account.id)).unwrap(), 1);
    }

    #[test]
    fn test_withdraw_exact_balance() {
        let (_dir, store, mutator) = setup();
        mutator.deposit("alan", "12.34").unwrap();

        let receipt = mutator.withdraw("alan", "12.34").unwrap();
        assert_eq!(receipt.balance, Balance::ZERO);
        assert_eq!(balance_of(&store, "alan"), dec!(0));
    }

    #[test]
    fn test_invalid_amounts_write_nothing() {
        let (_dir, store, mutator) = setup();

        for raw in ["0", "-10", "ten", ""] {
            assert_eq!(mutator.deposit("alan", raw), Err(BankError::InvalidAmount));
            assert_eq!(mutator.withdraw("alan", raw), Err(BankError::InvalidAmount));
        }
        assert_eq!(mutator.deposit("alan", f64::NAN), Err(BankError::InvalidAmount));

        let account = store.read(|conn| find_by_username(conn, "alan")).unwrap().unwrap();
        assert_eq!(account.balance, Balance::ZERO);
        assert!(store.read(|conn| entries_for(conn, account.id)).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_account() {
        let (_dir, _store, mutator) = setup();
        assert_eq!(mutator.deposit("ghost", "5"), Err(BankError::AccountNotFound));
        assert_eq!(mutator.withdraw("ghost", "5"), Err(BankError::AccountNotFound));
    }

    #[test]
    fn test_store_failure_rolls_back_balance() {
        let (_dir, store, mutator) = setup();
        mutator.deposit("alan", "10").unwrap();

        // Make every ledger insert fail after the balance update ran
        store
            .read(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_entries BEFORE INSERT ON transactions
                     BEGIN SELECT RAISE(ABORT, 'ledger offline'); END;",
                )?;
                Ok(())
            })
            .unwrap();

        let result = mutator.deposit("alan", "5");
        assert!(matches!(result, Err(BankError::StoreUnavailable(_))));
        assert_eq!(balance_of(&store, "alan"), dec!(10), "balance update must roll back");

        let result = mutator.withdraw("alan", "5");
        assert!(matches!(result, Err(BankError::StoreUnavailable(_))));
        assert_eq!(balance_of(&store, "alan"), dec!(10));
    }
}
