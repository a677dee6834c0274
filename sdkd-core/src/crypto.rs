//! secp256k1 key primitives with Ethereum address derivation
//!
//! The private key is held in a fixed buffer that is wiped on drop. Signatures are
//! recoverable ECDSA with RFC 6979 nonces, so signing the same digest twice with the
//! same key yields the same signature.

use crate::{CoreError, CoreResult};
use rand::{rngs::OsRng, RngCore};
use secp256k1::ecdsa::{RecoverableSignature as SecpRecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey as SecpPublicKey, Secp256k1, SecretKey};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a raw private key in bytes
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Length of an address in bytes
pub const ADDRESS_LENGTH: usize = 20;

const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Keccak-256 digest
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash a message with the personal-message prefix.
///
/// The prefix keeps a challenge signature from ever being valid for a raw
/// transaction hash.
pub fn personal_message_hash(message: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(PERSONAL_MESSAGE_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message);
    hasher.finalize().into()
}

/// Strip an optional `0x` prefix
pub fn strip_hex_prefix(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// 32-byte secp256k1 secret scalar
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: [u8; PRIVATE_KEY_LENGTH],
}

impl PrivateKey {
    /// Generate a new key from the operating system CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; PRIVATE_KEY_LENGTH];
        loop {
            OsRng.fill_bytes(&mut bytes);
            // Rejection sampling: zero and values >= n are not valid scalars
            if SecretKey::from_slice(&bytes).is_ok() {
                let key = Self { bytes };
                bytes.zeroize();
                return key;
            }
        }
    }

    /// Build a key from raw bytes, rejecting anything that is not a valid scalar
    pub fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(CoreError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_LENGTH,
                bytes.len()
            )));
        }
        SecretKey::from_slice(bytes).map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))?;

        let mut key = [0u8; PRIVATE_KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Parse a hex encoded key, with or without `0x`
    pub fn from_hex(value: &str) -> CoreResult<Self> {
        let mut raw = hex::decode(strip_hex_prefix(value.trim()))?;
        let key = Self::from_bytes(&raw);
        raw.zeroize();
        key
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; PRIVATE_KEY_LENGTH] {
        &self.bytes
    }

    /// Lowercase hex of the key without prefix, kept behind a secret wrapper
    pub fn to_hex(&self) -> SecretString {
        SecretString::new(hex::encode(self.bytes))
    }

    /// Public key for this private key
    pub fn public_key(&self) -> CoreResult<PublicKey> {
        let secp = Secp256k1::new();
        let secret = self.secret_key()?;
        Ok(PublicKey::from_secp(&SecpPublicKey::from_secret_key(&secp, &secret)))
    }

    /// Address for this private key
    pub fn address(&self) -> CoreResult<Address> {
        Ok(self.public_key()?.address())
    }

    /// Sign a 32-byte digest
    pub fn sign_hash(&self, hash: &[u8; 32]) -> CoreResult<RecoverableSignature> {
        let secp = Secp256k1::new();
        let secret = self.secret_key()?;
        let message = Message::from_slice(hash).map_err(|e| CoreError::SigningFailed(e.to_string()))?;

        let signature = secp.sign_ecdsa_recoverable(&message, &secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        let recovery_id = u8::try_from(recovery_id.to_i32())
            .map_err(|e| CoreError::SigningFailed(e.to_string()))?;

        Ok(RecoverableSignature { r, s, recovery_id })
    }

    /// Sign a message using the personal-message hash
    pub fn sign_personal_message(&self, message: &[u8]) -> CoreResult<RecoverableSignature> {
        self.sign_hash(&personal_message_hash(message))
    }

    fn secret_key(&self) -> CoreResult<SecretKey> {
        SecretKey::from_slice(&self.bytes).map_err(|e| CoreError::InvalidPrivateKey(e.to_string()))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Uncompressed secp256k1 public key without the `0x04` tag
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey([u8; 64]);

impl PublicKey {
    fn from_secp(key: &SecpPublicKey) -> Self {
        let serialized = key.serialize_uncompressed();
        let mut bytes = [0u8; 64];
        bytes.copy_from_slice(&serialized[1..]);
        Self(bytes)
    }

    /// Raw 64 bytes
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Address derived from this key
    pub fn address(&self) -> Address {
        let hash = keccak256(&self.0);
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&hash[12..]);
        Address(bytes)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// Wrap raw address bytes
    pub fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// EIP-55 mixed-case rendering
    pub fn to_checksum_string(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak256(lower.as_bytes());

        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Whether a mixed-case string carries a correct EIP-55 checksum
    pub fn is_checksum_valid(value: &str) -> bool {
        match value.parse::<Address>() {
            Ok(address) => address.to_checksum_string() == value,
            Err(_) => false,
        }
    }
}

impl FromStr for Address {
    type Err = CoreError;

    /// Accepts `0x` followed by 40 hex digits in any case; no checksum check
    fn from_str(value: &str) -> CoreResult<Self> {
        let digits = value
            .strip_prefix("0x")
            .ok_or_else(|| CoreError::InvalidAddress(format!("missing 0x prefix: {value}")))?;
        if digits.len() != ADDRESS_LENGTH * 2 {
            return Err(CoreError::InvalidAddress(format!(
                "expected 40 hex digits, got {}",
                digits.len()
            )));
        }
        let raw = hex::decode(digits).map_err(|e| CoreError::InvalidAddress(e.to_string()))?;
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes.copy_from_slice(&raw);
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Recoverable ECDSA signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    /// Recovery id, 0 or 1
    pub recovery_id: u8,
}

impl RecoverableSignature {
    /// Legacy `v` value (27 or 28)
    pub fn v(&self) -> u8 {
        27 + self.recovery_id
    }

    /// Recover the signer's public key for a digest
    pub fn recover(&self, hash: &[u8; 32]) -> CoreResult<PublicKey> {
        let secp = Secp256k1::new();
        let recovery_id = RecoveryId::from_i32(i32::from(self.recovery_id))
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&self.r);
        compact[32..].copy_from_slice(&self.s);

        let signature = SecpRecoverableSignature::from_compact(&compact, recovery_id)
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        let message = Message::from_slice(hash).map_err(|e| CoreError::InvalidSignature(e.to_string()))?;

        let key = secp
            .recover_ecdsa(&message, &signature)
            .map_err(|e| CoreError::InvalidSignature(e.to_string()))?;
        Ok(PublicKey::from_secp(&key))
    }

    /// Hex wire form used by the backend
    pub fn to_parts(&self) -> SignatureParts {
        SignatureParts {
            r: hex::encode(self.r),
            s: hex::encode(self.s),
            v: format!("{:x}", self.v()),
        }
    }

    /// Parse the hex wire form
    pub fn from_parts(parts: &SignatureParts) -> CoreResult<Self> {
        let r = decode_word(&parts.r)?;
        let s = decode_word(&parts.s)?;
        let v = u8::from_str_radix(strip_hex_prefix(&parts.v), 16)
            .map_err(|e| CoreError::InvalidSignature(format!("bad v: {e}")))?;
        let recovery_id = match v {
            27 | 28 => v - 27,
            0 | 1 => v,
            _ => return Err(CoreError::InvalidSignature(format!("unsupported v: {v}"))),
        };
        Ok(Self { r, s, recovery_id })
    }
}

fn decode_word(value: &str) -> CoreResult<[u8; 32]> {
    let raw = hex::decode(strip_hex_prefix(value))?;
    if raw.len() != 32 {
        return Err(CoreError::InvalidSignature(format!(
            "expected 32 bytes, got {}",
            raw.len()
        )));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&raw);
    Ok(out)
}

/// `{r, s, v}` as hex strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureParts {
    pub r: String,
    pub s: String,
    pub v: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB3_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    #[test]
    fn test_known_address() {
        let key = PrivateKey::from_hex(WEB3_KEY).unwrap();
        let address = key.address().unwrap();
        assert_eq!(
            address.to_checksum_string(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
        assert_eq!(address.to_string(), "0x2c7536e3605d9c16a7a3d7b1898e529396a65c23");
    }

    #[test]
    fn test_address_is_deterministic() {
        let key = PrivateKey::generate();
        let a = key.address().unwrap();
        let b = key.address().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string().len(), 42);
        assert!(a.to_string().starts_with("0x"));
    }

    #[test]
    fn test_invalid_private_keys() {
        assert!(PrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
        assert!(PrivateKey::from_bytes(&[0xffu8; 32]).is_err());
        assert!(PrivateKey::from_hex("zz").is_err());
    }

    #[test]
    fn test_public_key_string() {
        let key = PrivateKey::from_hex(WEB3_KEY).unwrap();
        let public = key.public_key().unwrap().to_string();
        assert_eq!(public.len(), 2 + 128);
        assert!(public.starts_with("0x"));
    }

    #[test]
    fn test_personal_sign_recovers_signer() {
        let key = PrivateKey::generate();
        let signature = key.sign_personal_message(b"1a2b3c4d_user@example.com").unwrap();
        let hash = personal_message_hash(b"1a2b3c4d_user@example.com");
        let recovered = signature.recover(&hash).unwrap();
        assert_eq!(recovered.address(), key.address().unwrap());
        assert!(signature.v() == 27 || signature.v() == 28);
    }

    #[test]
    fn test_signing_is_deterministic() {
        let key = PrivateKey::from_hex(WEB3_KEY).unwrap();
        let a = key.sign_personal_message(b"hello").unwrap();
        let b = key.sign_personal_message(b"hello").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tampered_signature_changes_signer() {
        let key = PrivateKey::generate();
        let hash = personal_message_hash(b"payload");
        let mut signature = key.sign_hash(&hash).unwrap();
        signature.s[31] ^= 0x01;
        match signature.recover(&hash) {
            Ok(public) => assert_ne!(public.address(), key.address().unwrap()),
            Err(_) => {}
        }
    }

    #[test]
    fn test_signature_parts_round_trip() {
        let key = PrivateKey::generate();
        let signature = key.sign_personal_message(b"abc").unwrap();
        let parts = signature.to_parts();
        assert_eq!(parts.r.len(), 64);
        assert!(parts.v == "1b" || parts.v == "1c");
        assert_eq!(RecoverableSignature::from_parts(&parts).unwrap(), signature);
    }

    #[test]
    fn test_checksum_validation() {
        assert!(Address::is_checksum_valid("0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"));
        assert!(!Address::is_checksum_valid("0x2c7536e3605D9C16a7a3D7b1898e529396a65c23"));
        assert!("0x2c7536e3605d9c16a7a3d7b1898e529396a65c2".parse::<Address>().is_err());
        assert!("2c7536e3605d9c16a7a3d7b1898e529396a65c23".parse::<Address>().is_err());
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let key = PrivateKey::from_hex(WEB3_KEY).unwrap();
        let debug = format!("{:?}", key);
        assert!(!debug.contains("4c0883"));
    }
}
