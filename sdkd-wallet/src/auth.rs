//! Challenge signing for backend authentication
//!
//! The wallet proves key ownership by signing `"<nonce>_<email>"` as a
//! personal message. Every signature is recovered and compared to the
//! wallet's own address before it leaves the process.

use crate::{WalletError, WalletResult};
use sdkd_core::{constant_time_eq, Address, PrivateKey, RecoverableSignature, SignatureParts};
use serde::{Deserialize, Serialize};

/// Body of `POST /sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBody {
    pub signature: SignatureParts,
    pub payload: String,
    pub email: String,
    pub nonce: String,
}

/// Fresh 4-byte challenge nonce as hex
pub fn new_nonce() -> String {
    hex::encode(rand::random::<[u8; 4]>())
}

/// Sign a challenge for `email` with a fresh nonce
pub fn sign_challenge(key: &PrivateKey, email: &str) -> WalletResult<ChallengeBody> {
    sign_challenge_with_nonce(key, email, &new_nonce())
}

/// Sign a challenge with a caller-chosen nonce
pub fn sign_challenge_with_nonce(
    key: &PrivateKey,
    email: &str,
    nonce: &str,
) -> WalletResult<ChallengeBody> {
    let payload = format!("{nonce}_{email}");
    let signature = sign_checked(key, payload.as_bytes())?;

    Ok(ChallengeBody {
        signature: signature.to_parts(),
        payload,
        email: email.to_string(),
        nonce: nonce.to_string(),
    })
}

/// Personal-message signature of the e-mail address, carried in recovery codes
pub fn sign_email(key: &PrivateKey, email: &str) -> WalletResult<SignatureParts> {
    sign_message(key, email.as_bytes())
}

/// Self-checked personal-message signature in wire form
pub fn sign_message(key: &PrivateKey, message: &[u8]) -> WalletResult<SignatureParts> {
    Ok(sign_checked(key, message)?.to_parts())
}

fn sign_checked(key: &PrivateKey, message: &[u8]) -> WalletResult<RecoverableSignature> {
    let expected = key.address()?;
    let signature = key.sign_personal_message(message)?;
    verify_signer(&signature, message, &expected)?;
    Ok(signature)
}

/// Fail unless `signature` over `message` recovers to `expected`
pub fn verify_signer(
    signature: &RecoverableSignature,
    message: &[u8],
    expected: &Address,
) -> WalletResult<()> {
    let hash = sdkd_core::personal_message_hash(message);
    let recovered = signature
        .recover(&hash)
        .map_err(|e| WalletError::SignatureSelfCheckFailed(e.to_string()))?
        .address();

    if !constant_time_eq(recovered.as_bytes(), expected.as_bytes()) {
        tracing::error!("signature does not recover to the wallet address");
        return Err(WalletError::SignatureSelfCheckFailed(
            "recovered address does not match".to_string(),
        ));
    }
    Ok(())
}
