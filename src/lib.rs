// Bank App - Core Library
// Exposes all modules for use in the admin CLI, the web server, and tests

pub mod error;
pub mod money;
pub mod db;
pub mod entities;
pub mod credential;
pub mod mutator;   // Balance Mutator - deposit / withdraw
pub mod bank;
pub mod session;
pub mod config;
pub mod logging;
pub mod export;
pub mod render;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use error::{BankError, Result};
pub use money::{Amount, Balance, IntoAmount};
pub use db::{setup_database, Store, StoreOptions};
pub use entities::{Account, EntryKind, LedgerEntry, Registration};
pub use mutator::{BalanceMutator, Receipt};
pub use bank::{Bank, LedgerCheck};
pub use session::SessionKeys;
pub use export::write_history_csv;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
