//! Error types for data validation in waypost-types.

use thiserror::Error;

/// Errors that can occur when validating or parsing waypost data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A time-of-day string or component was out of range.
    #[error("Invalid time of day: {0}")]
    InvalidTimeOfDay(String),

    /// A coordinate was non-finite or outside its valid range.
    #[error("Invalid {axis}: {value}")]
    InvalidCoordinate {
        /// Which coordinate was rejected ("latitude" or "longitude").
        axis: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Any other invalid value.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Result type alias using waypost-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
