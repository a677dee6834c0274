//! SDKD Core - key primitives for the SDKD wallet SDK
//!
//! This crate provides secp256k1 keys with Ethereum address derivation, the
//! BIP-39 mnemonic codec, and the HTTP transport seam shared by the other crates.

pub mod crypto;
pub mod error;
pub mod mnemonic;
pub mod security;
pub mod transport;

pub use crypto::{
    keccak256, personal_message_hash, strip_hex_prefix, Address, PrivateKey, PublicKey,
    RecoverableSignature, SignatureParts,
};
pub use error::{CoreError, CoreResult, TransportError};
pub use mnemonic::{
    entropy_to_mnemonic, mnemonic_to_entropy, private_key_from_mnemonic, private_key_to_mnemonic,
    MNEMONIC_WORD_COUNT,
};
pub use security::{constant_time_eq, SecureMemory};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

/// SDKD SDK version
pub const SDKD_VERSION: &str = env!("CARGO_PKG_VERSION");
