//! Core error types for the valuation engine.
//!
//! This module defines database-agnostic error types. Storage-specific
//! errors (from rusqlite) are converted to these types by the storage layer.

use chrono::{NaiveDate, ParseError as ChronoParseError};
use thiserror::Error;

/// Type alias for Result using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Recompute failed: {0}")]
    Recompute(#[from] RecomputeError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Database-agnostic error type for storage operations.
///
/// Uses `String` for all error details, allowing the storage layer to
/// convert rusqlite errors into this format.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open or configure the database connection.
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// A database query failed to execute.
    #[error("Database query failed: {0}")]
    QueryFailed(String),

    /// The requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A unique or check constraint was violated.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// A database transaction failed and was rolled back.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Errors raised by the transaction ledger and lot resolver.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// A sell requested more units than are open across all lots.
    /// The ledger is left untouched.
    #[error(
        "Insufficient open lots for {symbol}: requested {requested}, available {available}"
    )]
    InsufficientLots {
        symbol: String,
        requested: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    #[error("Transaction {0} not found")]
    TransactionNotFound(i64),

    /// Amendment rejected: the record is immutable in its current state.
    #[error("Amendment not allowed for transaction {id}: {reason}")]
    AmendNotAllowed { id: i64, reason: String },

    /// A designated lot id does not refer to an open buy lot of the symbol.
    #[error("Lot {lot_id} is not an open lot for {symbol}")]
    LotNotOpen { lot_id: i64, symbol: String },
}

/// Errors raised during valuation/history recomputation.
#[derive(Error, Debug)]
pub enum RecomputeError {
    /// No valuation row for the symbol on the date. Range recomputation
    /// reports missing closes as gaps instead of failing; point lookups
    /// raise this.
    #[error("Missing price data for {symbol} on {date}")]
    MissingPriceData { symbol: String, date: NaiveDate },

    /// The ledger moved past the recompute watermark while a symbol was
    /// being rebuilt, and retries were exhausted.
    #[error("Concurrent ledger mutation for {symbol} past watermark {watermark}")]
    Conflict { symbol: String, watermark: i64 },
}

/// Validation errors for user input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Field '{field}' must be positive, got {value}")]
    NonPositive {
        field: &'static str,
        value: rust_decimal::Decimal,
    },

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date: {0}")]
    DateParse(#[from] ChronoParseError),
}

// === From implementations for common error types ===

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}
