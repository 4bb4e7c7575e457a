//! Custom error types for the common library
//!
//! This module defines the error types shared by the geometry primitives and
//! the database layer.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// A stored row could not be turned back into a domain value
    #[error("Database row error: {0}")]
    Row(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Failure while decoding an encoded polyline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Input ended in the middle of a value or of a coordinate pair
    #[error("encoded path is truncated at byte {offset}")]
    Truncated { offset: usize },

    /// Byte outside the `'?'..='~'` alphabet
    #[error("invalid byte 0x{byte:02x} at offset {offset} in encoded path")]
    InvalidCharacter { offset: usize, byte: u8 },

    /// A single value needs more than 64 bits
    #[error("value starting before byte {offset} overflows 64 bits")]
    Overflow { offset: usize },
}

/// Failure while encoding a path into polyline form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Point is not finite, or its delta against the previous point is too large
    #[error("point {index} cannot be represented in an encoded path")]
    OutOfRange { index: usize },
}

/// A coordinate component could not be parsed into a finite number
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("{field} is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },

    #[error("{field} must be finite")]
    NotFinite { field: &'static str },
}
