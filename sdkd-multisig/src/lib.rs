//! SDKD Multisig - threshold secret sharing for key recovery
//!
//! Implements Shamir's scheme over GF(2^b) with a compact string encoding for
//! shares, so a private key can be split between the user's mailbox and the
//! SDKD backend.

pub mod error;
pub mod field;
pub mod secret_sharing;
pub mod share;

pub use error::{MultisigError, MultisigResult};
pub use field::{GaloisField, DEFAULT_BITS, MAX_BITS, MIN_BITS};
pub use secret_sharing::SecretSharing;
pub use share::Share;
