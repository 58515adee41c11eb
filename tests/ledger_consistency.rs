use bankapp::{Bank, BankError, EntryKind, Registration, StoreOptions};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Arc, Barrier};
use std::thread;

// ============================================================================
// HELPERS
// ============================================================================

fn create_test_bank() -> (tempfile::TempDir, Bank) {
    let dir = tempfile::tempdir().unwrap();
    let bank = Bank::open(dir.path().join("bank.db"), StoreOptions::default()).unwrap();
    (dir, bank)
}

fn register(bank: &Bank, username: &str) {
    let form = Registration::new("Test User", "1999-09-09", "Other", username, "password");
    bank.register(&form).unwrap();
}

fn balance(bank: &Bank, username: &str) -> Decimal {
    bank.account(username).unwrap().balance.value()
}

// ============================================================================
// SEQUENTIAL PROPERTIES
// ============================================================================

#[test]
fn test_scenario_deposit_withdraw_overdraw() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "carol");

    assert_eq!(balance(&bank, "carol"), dec!(0));

    bank.deposit("carol", "50").unwrap();
    assert_eq!(balance(&bank, "carol"), dec!(50));

    bank.withdraw("carol", "20").unwrap();
    assert_eq!(balance(&bank, "carol"), dec!(30));

    assert_eq!(bank.withdraw("carol", "100"), Err(BankError::InsufficientFunds));
    assert_eq!(balance(&bank, "carol"), dec!(30));
    assert_eq!(bank.history("carol").unwrap().len(), 2);
}

#[test]
fn test_balance_equals_net_ledger_after_mixed_sequence() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "dave");

    let deposits = ["10.50", "200", "0.05", "75.25", "14.20"];
    let withdrawals = ["5", "100.75", "0.05", "60"];

    let mut expected = Decimal::ZERO;
    let mut operations = 0;

    for (i, raw) in deposits.iter().enumerate() {
        bank.deposit("dave", *raw).unwrap();
        expected += raw.parse::<Decimal>().unwrap();
        operations += 1;

        if let Some(w) = withdrawals.get(i) {
            bank.withdraw("dave", *w).unwrap();
            expected -= w.parse::<Decimal>().unwrap();
            operations += 1;
        }
    }

    assert_eq!(balance(&bank, "dave"), expected);
    assert_eq!(bank.history("dave").unwrap().len(), operations);

    let check = bank.verify_ledger("dave").unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.ledger_total, expected);
}

#[test]
fn test_invalid_amounts_create_no_entries() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "erin");
    bank.deposit("erin", "10").unwrap();

    for raw in ["0", "-1", "-0.50", "abc", "", "1.2.3", "0.004", "0.0000000000000000000000000001"] {
        assert_eq!(bank.deposit("erin", raw), Err(BankError::InvalidAmount), "deposit {:?}", raw);
        assert_eq!(bank.withdraw("erin", raw), Err(BankError::InvalidAmount), "withdraw {:?}", raw);
    }

    assert_eq!(balance(&bank, "erin"), dec!(10));
    assert_eq!(bank.history("erin").unwrap().len(), 1);
}

#[test]
fn test_history_reverse_chronological() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "frank");

    bank.deposit("frank", "100").unwrap();
    bank.withdraw("frank", "30").unwrap();

    let history = bank.history("frank").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].kind, EntryKind::Withdrawal);
    assert_eq!(history[0].amount.value(), dec!(30));
    assert_eq!(history[1].kind, EntryKind::Deposit);
    assert_eq!(history[1].amount.value(), dec!(100));
    assert!(history[0].timestamp >= history[1].timestamp);
}

#[test]
fn test_duplicate_registration_always_rejected() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "gina");
    let original = bank.account("gina").unwrap();

    for _ in 0..3 {
        let again = Registration::new("Someone Else", "2001-01-01", "Male", "gina", "other");
        assert_eq!(bank.register(&again), Err(BankError::DuplicateUsername));
    }

    assert_eq!(bank.account("gina").unwrap(), original);
    assert_eq!(bank.accounts().unwrap().len(), 1);
}

#[test]
fn test_accounts_are_isolated() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "hal");
    register(&bank, "ivy");

    bank.deposit("hal", "40").unwrap();
    assert_eq!(bank.withdraw("ivy", "1"), Err(BankError::InsufficientFunds));

    assert_eq!(balance(&bank, "hal"), dec!(40));
    assert_eq!(balance(&bank, "ivy"), dec!(0));
    assert!(bank.history("ivy").unwrap().is_empty());
}

// ============================================================================
// CONCURRENCY
// ============================================================================

/// N withdrawals of A against B with N*A > B: exactly floor(B/A) succeed
#[test]
fn test_concurrent_withdrawals_never_overdraw() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "judy");
    bank.deposit("judy", "100").unwrap();

    let threads = 10;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let bank = bank.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                bank.withdraw("judy", "30")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    let insufficient = results
        .iter()
        .filter(|r| matches!(r, Err(BankError::InsufficientFunds)))
        .count();

    assert_eq!(successes, 3, "floor(100 / 30) withdrawals must succeed");
    assert_eq!(insufficient, threads - 3, "all others fail with insufficient funds");
    assert_eq!(balance(&bank, "judy"), dec!(10));

    let check = bank.verify_ledger("judy").unwrap();
    assert!(check.is_consistent());
    assert_eq!(check.entries, 4);
}

#[test]
fn test_concurrent_deposits_lose_no_updates() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "kim");

    let threads = 8;
    let per_thread = 5;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let bank = bank.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..per_thread {
                    bank.deposit("kim", "1.25").unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = dec!(1.25) * Decimal::from(threads * per_thread);
    assert_eq!(balance(&bank, "kim"), expected);
    assert_eq!(bank.history("kim").unwrap().len(), threads * per_thread);
    assert!(bank.verify_ledger("kim").unwrap().is_consistent());
}

#[test]
fn test_concurrent_mixed_operations_keep_invariant() {
    let (_dir, bank) = create_test_bank();
    register(&bank, "lee");
    bank.deposit("lee", "20").unwrap();

    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let bank = bank.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..5 {
                    if i % 2 == 0 {
                        bank.deposit("lee", "3").unwrap();
                    } else {
                        match bank.withdraw("lee", "7") {
                            Ok(receipt) => assert!(receipt.balance.value() >= Decimal::ZERO),
                            Err(BankError::InsufficientFunds) => {}
                            Err(e) => panic!("unexpected error: {}", e),
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let check = bank.verify_ledger("lee").unwrap();
    assert!(check.is_consistent(), "balance {} vs ledger {}", check.balance, check.ledger_total);
    assert!(check.balance >= Decimal::ZERO);
}
