//! Error types for model conversions

use thiserror::Error;

/// Result type for model conversions
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised when a wire value does not map onto a known variant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Log type outside the closed 1..=5 range
    #[error("Unknown log type: {0}")]
    UnknownLogType(i64),

    /// Token status outside the closed 1..=4 range
    #[error("Unknown token status: {0}")]
    UnknownTokenStatus(i64),

    /// Sort column the server does not recognise
    #[error("Unknown sort column: {0}")]
    UnknownSortColumn(String),

    /// Sort direction other than asc/desc
    #[error("Invalid sort order: {0} (expected asc or desc)")]
    InvalidSortOrder(String),

    /// Scope name other than admin/self
    #[error("Invalid scope: {0} (expected admin or self)")]
    InvalidScope(String),
}
