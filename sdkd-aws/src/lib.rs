//! SDKD AWS - request signing and mail delivery
//!
//! Provides a bit-exact AWS Signature Version 4 signer and a small SES client
//! used to deliver recovery codes.

pub mod error;
pub mod ses;
pub mod signer;

pub use error::{AwsError, AwsResult, SesError};
pub use ses::{Attachment, RawEmail, SesMailer, DEFAULT_SES_REGION, SES_SERVICE};
pub use signer::{
    encode_uri_component, AwsSigner, SignableRequest, SignedHeaders, SigningConfig,
    TemporaryCredentials,
};
