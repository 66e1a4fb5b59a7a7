//! # Error Types
//!
//! Errors raised while constructing or decoding shared entities.

use thiserror::Error;

/// Errors produced when parsing a decimal coin amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// The string is empty.
    #[error("amount is empty")]
    Empty,

    /// The string is not a plain decimal number.
    #[error("amount '{0}' is not numeric")]
    NotNumeric(String),

    /// More fractional digits than the ledger precision supports.
    #[error("amount '{value}' has more than {max} decimal places")]
    TooPrecise { value: String, max: usize },

    /// The value does not fit the 256-bit base unit representation.
    #[error("amount '{0}' is out of range")]
    Overflow(String),
}

/// Errors produced when decoding a push key identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushKeyIdError {
    /// Missing the `pk` prefix.
    #[error("push key id must start with 'pk'")]
    MissingPrefix,

    /// Body is not 40 hex characters.
    #[error("push key id must carry 20 hex-encoded bytes")]
    InvalidBody,
}
