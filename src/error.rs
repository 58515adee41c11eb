// ⚠️ Error taxonomy for every bank operation
// Each variant is terminal for one attempt and leaves the data unchanged.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    /// Amount did not parse, or was zero / negative / not finite
    #[error("invalid amount")]
    InvalidAmount,

    /// Withdrawal larger than the current balance
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("username already exists")]
    DuplicateUsername,

    /// Unknown user or wrong password (deliberately the same message)
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account not found")]
    AccountNotFound,

    /// Form-level validation (empty username, password mismatch, ...)
    #[error("{0}")]
    Validation(String),

    /// Connection, lock, constraint or commit failure in the store.
    /// Any partial work has been rolled back.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Password hashing or session signing failed
    #[error("credential failure: {0}")]
    Credential(String),
}

impl BankError {
    /// Errors a user can fix by changing their input.
    /// Everything else is shown as an opaque failure.
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, BankError::StoreUnavailable(_) | BankError::Credential(_))
    }

    /// Short message suitable for a form or redirect
    pub fn user_message(&self) -> String {
        match self {
            BankError::InvalidAmount => "Invalid amount".to_string(),
            BankError::InsufficientFunds => "Insufficient funds".to_string(),
            BankError::DuplicateUsername => "Username already exists".to_string(),
            BankError::InvalidCredentials => "Invalid credentials".to_string(),
            BankError::AccountNotFound => "Account not found".to_string(),
            BankError::Validation(msg) => msg.clone(),
            BankError::StoreUnavailable(_) => "Database error".to_string(),
            BankError::Credential(_) => "Internal error".to_string(),
        }
    }
}

impl From<rusqlite::Error> for BankError {
    fn from(err: rusqlite::Error) -> Self {
        BankError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BankError>;
