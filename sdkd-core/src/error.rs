//! Error types for SDKD core operations

use thiserror::Error;

/// Result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Mnemonic error: {0}")]
    Mnemonic(String),

    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Failures of the HTTP transport collaborator
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Response decoding failed: {0}")]
    Decode(String),

    #[error("Request encoding failed: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}
