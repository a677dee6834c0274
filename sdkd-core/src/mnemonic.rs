//! BIP-39 English mnemonic codec for 32-byte private keys
//!
//! A key maps to exactly 24 words. The phrase is returned behind [`SecretString`]
//! so it is never printed by accident.

use crate::security::SecureMemory;
use crate::{CoreError, CoreResult, PrivateKey};
use bip39::Mnemonic;
use secrecy::{ExposeSecret, SecretString};

/// Number of words for a 256-bit key
pub const MNEMONIC_WORD_COUNT: usize = 24;

/// Encode raw entropy as an English mnemonic
pub fn entropy_to_mnemonic(entropy: &[u8]) -> CoreResult<SecretString> {
    let mnemonic = Mnemonic::from_entropy(entropy).map_err(|e| CoreError::Mnemonic(e.to_string()))?;
    Ok(SecretString::new(mnemonic.to_string()))
}

/// Decode an English mnemonic back into its entropy.
///
/// Whitespace is collapsed and words are lower-cased before the checksum is verified.
pub fn mnemonic_to_entropy(phrase: &str) -> CoreResult<Vec<u8>> {
    let normalized = normalize(phrase);
    let mnemonic =
        Mnemonic::parse_normalized(&normalized).map_err(|e| CoreError::Mnemonic(e.to_string()))?;
    Ok(mnemonic.to_entropy())
}

/// 24-word phrase for a private key
pub fn private_key_to_mnemonic(key: &PrivateKey) -> CoreResult<SecretString> {
    entropy_to_mnemonic(key.as_bytes())
}

/// Private key from a 24-word phrase
pub fn private_key_from_mnemonic(phrase: &SecretString) -> CoreResult<PrivateKey> {
    let words = phrase.expose_secret().split_whitespace().count();
    if words != MNEMONIC_WORD_COUNT {
        return Err(CoreError::Mnemonic(format!(
            "expected {MNEMONIC_WORD_COUNT} words, got {words}"
        )));
    }

    let mut entropy = mnemonic_to_entropy(phrase.expose_secret())?;
    let key = PrivateKey::from_bytes(&entropy);
    SecureMemory::secure_clear(&mut entropy);
    key
}

fn normalize(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_entropy_vector() {
        let phrase = entropy_to_mnemonic(&[0u8; 32]).unwrap();
        let mut expected = vec!["abandon"; 23];
        expected.push("art");
        assert_eq!(phrase.expose_secret(), &expected.join(" "));
    }

    #[test]
    fn test_key_round_trip() {
        let key = PrivateKey::generate();
        let phrase = private_key_to_mnemonic(&key).unwrap();
        assert_eq!(phrase.expose_secret().split(' ').count(), MNEMONIC_WORD_COUNT);

        let restored = private_key_from_mnemonic(&phrase).unwrap();
        assert_eq!(restored.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_normalization() {
        let phrase = format!("  {}  ART ", vec!["Abandon"; 23].join("   "));
        assert_eq!(mnemonic_to_entropy(&phrase).unwrap(), vec![0u8; 32]);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let phrase = vec!["abandon"; 24].join(" ");
        assert!(mnemonic_to_entropy(&phrase).is_err());
    }

    #[test]
    fn test_wrong_word_count_rejected() {
        // 12 valid words decode to 16 bytes, which is not a key
        let twelve = SecretString::new(format!("{} about", vec!["abandon"; 11].join(" ")));
        assert!(matches!(
            private_key_from_mnemonic(&twelve),
            Err(CoreError::Mnemonic(_))
        ));
    }

    #[test]
    fn test_unknown_word_rejected() {
        let phrase = format!("{} notaword", vec!["abandon"; 23].join(" "));
        assert!(mnemonic_to_entropy(&phrase).is_err());
    }
}
