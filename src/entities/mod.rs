// Entity Models
// - Account: registered user, profile and balance (users table)
// - LedgerEntry: immutable deposit/withdrawal record (transactions table)

pub mod account;
pub mod ledger;

pub use account::{Account, Registration};
pub use ledger::{EntryKind, LedgerEntry};
