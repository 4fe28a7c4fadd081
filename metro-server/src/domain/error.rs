//! Domain error types.
//!
//! These errors represent validation failures in the domain layer. They are
//! distinct from HTTP/IO errors raised by the backend client.

/// Domain-level validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Line numbers must be positive and fit in 16 bits
    #[error("invalid line number: {0}")]
    InvalidLine(i64),

    /// Crowd level codes are 0, 1 or 2
    #[error("invalid crowd level code: {0}")]
    InvalidCrowdLevel(u8),
}
