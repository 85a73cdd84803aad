//! Alias validation errors

/// Reasons an alias candidate is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasError {
    /// Candidate is empty after trimming
    #[error("alias must not be empty")]
    Empty,

    /// Another node already uses the candidate
    #[error("alias '{0}' is already in use")]
    Duplicate(String),
}
