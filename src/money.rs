// 💵 Money types - exact decimals, never binary floats
//
// Amount  = what a single deposit/withdrawal moves (always > 0)
// Balance = what an account holds (always >= 0 once committed)
//
// Both persist as canonical decimal TEXT so SQLite never rounds them.

use crate::error::{BankError, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// AMOUNT
// ============================================================================

/// Smallest unit an amount may carry: cents
pub const MAX_SCALE: u32 = 2;

/// A finite, strictly positive decimal amount with at most two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Parse user input ("50", " 12.5 ", "1e2").
    /// Anything that is not a positive number is `InvalidAmount`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BankError::InvalidAmount);
        }

        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| BankError::InvalidAmount)?;

        Self::try_from(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = BankError;

    fn try_from(value: Decimal) -> Result<Self> {
        let value = value.normalize();
        if value.is_zero() || value.is_sign_negative() || value.scale() > MAX_SCALE {
            return Err(BankError::InvalidAmount);
        }
        Ok(Amount(value))
    }
}

impl TryFrom<f64> for Amount {
    type Error = BankError;

    fn try_from(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(BankError::InvalidAmount);
        }
        let decimal = Decimal::from_f64(value).ok_or(BankError::InvalidAmount)?;
        Self::try_from(decimal)
    }
}

/// Anything a caller may hand the balance mutator as an amount.
/// The mutator re-validates through this even if the caller already parsed.
pub trait IntoAmount {
    fn into_amount(self) -> Result<Amount>;
}

impl IntoAmount for Amount {
    fn into_amount(self) -> Result<Amount> {
        Amount::try_from(self.0)
    }
}

impl IntoAmount for Decimal {
    fn into_amount(self) -> Result<Amount> {
        Amount::try_from(self)
    }
}

impl IntoAmount for f64 {
    fn into_amount(self) -> Result<Amount> {
        Amount::try_from(self)
    }
}

impl IntoAmount for &str {
    fn into_amount(self) -> Result<Amount> {
        Amount::parse(self)
    }
}

impl IntoAmount for &String {
    fn into_amount(self) -> Result<Amount> {
        Amount::parse(self)
    }
}

impl IntoAmount for String {
    fn into_amount(self) -> Result<Amount> {
        Amount::parse(&self)
    }
}

impl FromStr for Amount {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ============================================================================
// BALANCE
// ============================================================================

/// Account balance; construction and arithmetic keep it non-negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Balance(Decimal);

impl Balance {
    pub const ZERO: Balance = Balance(Decimal::ZERO);

    pub fn new(value: Decimal) -> Option<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            None
        } else {
            Some(Balance(value.normalize()))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Overflow is reported as an invalid amount; nothing is written.
    pub fn checked_add(self, amount: Amount) -> Result<Balance> {
        self.0
            .checked_add(amount.0)
            .map(|v| Balance(v.normalize()))
            .ok_or(BankError::InvalidAmount)
    }

    /// `None` when the amount exceeds the balance
    pub fn checked_sub(self, amount: Amount) -> Option<Balance> {
        if amount.0 > self.0 {
            return None;
        }
        self.0.checked_sub(amount.0).map(|v| Balance(v.normalize()))
    }

    pub fn covers(&self, amount: Amount) -> bool {
        self.0 >= amount.0
    }
}

impl TryFrom<Decimal> for Balance {
    type Error = BankError;

    fn try_from(value: Decimal) -> Result<Self> {
        Balance::new(value).ok_or(BankError::InvalidAmount)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Decimal {
        amount.0
    }
}

impl From<Balance> for Decimal {
    fn from(balance: Balance) -> Decimal {
        balance.0
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// ============================================================================
// SQLITE MAPPING (decimal TEXT columns)
// ============================================================================

fn decimal_from_sql(value: ValueRef<'_>) -> FromSqlResult<Decimal> {
    match value {
        ValueRef::Text(_) => {
            let text = value.as_str()?;
            Decimal::from_str(text).map_err(|e| FromSqlError::Other(Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => Decimal::from_f64(f).ok_or(FromSqlError::InvalidType),
        _ => Err(FromSqlError::InvalidType),
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let decimal = decimal_from_sql(value)?;
        Amount::try_from(decimal).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Balance {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Balance {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let decimal = decimal_from_sql(value)?;
        Balance::new(decimal).ok_or(FromSqlError::OutOfRange(0))
    }
}
