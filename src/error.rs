//! Error types for input validation.
//!
//! The packing engine itself never fails: degenerate input is reported through
//! `MixedPalletResult::warnings`. These errors are raised only when a request
//! is validated at the CLI or HTTP boundary.

use thiserror::Error;

/// Result type alias for pallet_stacker operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// A unit type has unusable dimensions, weight or identity.
    #[error("Invalid unit '{name}': {reason}")]
    InvalidUnit { name: String, reason: String },

    /// The pallet description is unusable.
    #[error("Invalid pallet: {0}")]
    InvalidPallet(String),

    /// Two unit types share the same id.
    #[error("Duplicate unit id '{0}'")]
    DuplicateUnitId(String),

    /// Packing configuration is out of range.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
