//! Error types for the SDKD wallet

use sdkd_aws::AwsError;
use sdkd_core::{CoreError, TransportError};
use sdkd_multisig::MultisigError;
use std::fmt;

/// Result type for wallet operations
pub type WalletResult<T> = std::result::Result<T, WalletError>;

/// Wallet error types
#[derive(thiserror::Error, Debug)]
pub enum WalletError {
    #[error("Key error: {0}")]
    Core(#[from] CoreError),

    #[error("Secret sharing error: {0}")]
    Multisig(#[from] MultisigError),

    #[error("AWS error: {0}")]
    Aws(#[from] AwsError),

    #[error("Signature self-check failed: {0}")]
    SignatureSelfCheckFailed(String),

    #[error("Recovery set mismatch: {0}")]
    RecoverySetMismatch(String),

    #[error("Invalid recovery code: {0}")]
    InvalidRecoveryCode(String),

    #[error("Chain error: {0}")]
    Chain(String),

    #[error("Invalid transaction: {0}")]
    Validation(ValidationKind),

    #[error("Insufficient funds: required {required} wei, available {available} wei")]
    InsufficientFunds { required: u128, available: u128 },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Wallet is not activated")]
    NotActivated,

    #[error("Wallet activation is in progress")]
    ActivationInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transaction draft rejection reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationKind {
    BadAddress,
    BadValue,
    BadGasLimit,
    BadData,
}

impl ValidationKind {
    /// Numeric code reported to callers
    pub fn code(&self) -> u8 {
        match self {
            ValidationKind::BadValue => 0,
            ValidationKind::BadAddress => 5,
            ValidationKind::BadGasLimit => 8,
            ValidationKind::BadData => 9,
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ValidationKind::BadAddress => "invalid recipient address",
            ValidationKind::BadValue => "invalid value",
            ValidationKind::BadGasLimit => "invalid gas limit",
            ValidationKind::BadData => "invalid data hex",
        };
        write!(f, "{message} (code {})", self.code())
    }
}

impl From<ValidationKind> for WalletError {
    fn from(kind: ValidationKind) -> Self {
        WalletError::Validation(kind)
    }
}

impl WalletError {
    /// Cryptographic self-check failures; the operation must not continue
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WalletError::SignatureSelfCheckFailed(_) | WalletError::RecoverySetMismatch(_)
        )
    }

    /// Check if retrying the whole operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            WalletError::Network(_) => true,
            WalletError::Backend(_) => true,
            WalletError::ActivationInProgress => true,
            WalletError::Aws(AwsError::Transport(_)) => true,
            _ => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> WalletErrorCategory {
        match self {
            WalletError::Core(_) | WalletError::SignatureSelfCheckFailed(_) => {
                WalletErrorCategory::Crypto
            }
            WalletError::Multisig(_)
            | WalletError::RecoverySetMismatch(_)
            | WalletError::InvalidRecoveryCode(_) => WalletErrorCategory::Recovery,
            WalletError::Aws(_) => WalletErrorCategory::Mail,
            WalletError::Chain(_) | WalletError::InsufficientFunds { .. } => {
                WalletErrorCategory::Chain
            }
            WalletError::Validation(_) => WalletErrorCategory::Validation,
            WalletError::Network(_) => WalletErrorCategory::Network,
            WalletError::Backend(_) => WalletErrorCategory::Backend,
            WalletError::KeyStore(_) => WalletErrorCategory::KeyStore,
            WalletError::NotActivated | WalletError::ActivationInProgress => {
                WalletErrorCategory::State
            }
            WalletError::Configuration(_) | WalletError::Io(_) => {
                WalletErrorCategory::Configuration
            }
            WalletError::Serialization(_) => WalletErrorCategory::Serialization,
        }
    }
}

/// Wallet error categories for handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletErrorCategory {
    Crypto,
    Recovery,
    Mail,
    Chain,
    Validation,
    Network,
    Backend,
    KeyStore,
    State,
    Configuration,
    Serialization,
}
