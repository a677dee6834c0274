//! Error types for AWS request signing and SES delivery

use sdkd_core::TransportError;

/// Result type for AWS operations
pub type AwsResult<T> = std::result::Result<T, AwsError>;

/// AWS error types
#[derive(thiserror::Error, Debug)]
pub enum AwsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("SES error: {0}")]
    Ses(#[from] SesError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Failures specific to the SES mail API
#[derive(thiserror::Error, Debug)]
pub enum SesError {
    #[error("SES rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid mail address: {0}")]
    InvalidAddress(String),
}

impl From<url::ParseError> for AwsError {
    fn from(err: url::ParseError) -> Self {
        AwsError::InvalidUrl(err.to_string())
    }
}
