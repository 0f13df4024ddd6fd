//! Error taxonomy shared by every ledger operation.
//!
//! Storage code works with `anyhow::Result` like the rest of the storage
//! layer; services translate those failures into [`LedgerError`] so callers
//! can tell a duplicate membership number from a broken database.

use thiserror::Error;

use crate::domain::calendar::DateConversionError;

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    StorageFailure(#[source] anyhow::Error),
}

impl LedgerError {
    /// Classify a storage-layer failure. Unique-constraint violations become
    /// `DuplicateId` carrying `id`; anything else is a `StorageFailure`.
    pub fn from_storage(err: anyhow::Error, id: &str) -> Self {
        if is_unique_violation(&err) {
            LedgerError::DuplicateId(id.to_string())
        } else {
            LedgerError::StorageFailure(err)
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound(_))
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(err: anyhow::Error) -> Self {
        LedgerError::StorageFailure(err)
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::StorageFailure(err.into())
    }
}

impl From<DateConversionError> for LedgerError {
    fn from(err: DateConversionError) -> Self {
        LedgerError::InvalidDate(err.input().to_string())
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
        _ => false,
    }
}

/// Parse an operator-typed amount. Amounts are whole or fractional currency
/// units and may not be negative.
pub fn parse_amount(raw: &str) -> LedgerResult<f64> {
    let trimmed = raw.trim().replace(',', "");
    let amount: f64 = trimmed
        .parse()
        .map_err(|_| LedgerError::InvalidAmount(raw.to_string()))?;
    validate_amount(amount)
}

pub fn validate_amount(amount: f64) -> LedgerResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(LedgerError::InvalidAmount(amount.to_string()));
    }
    Ok(amount)
}
