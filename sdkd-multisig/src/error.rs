//! Error types for SDKD secret sharing

/// Result type for multisig operations
pub type MultisigResult<T> = std::result::Result<T, MultisigError>;

/// Secret sharing error types
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Mismatched shares: expected {expected}-bit shares, found {found}-bit")]
    MismatchedShares { expected: u32, found: u32 },

    #[error("Malformed share: {0}")]
    MalformedShare(String),

    #[error("Division by zero in GF(2^{0})")]
    DivisionByZero(u32),
}
