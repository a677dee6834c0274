//! QR recovery codes and scan events
//!
//! A recovery code is the e-mailed half of the key plus enough identity to
//! ask the backend for the other half.

use crate::{WalletError, WalletResult};
use base64::{engine::general_purpose, Engine as _};
use sdkd_core::SignatureParts;
use sdkd_multisig::Share;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Recovery payload encoded into the QR code
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct RecoveryCode {
    pub email: String,
    pub api_client_id: String,
    /// Locally held share in wire form
    pub part: String,
    #[serde(rename = "signedEmail")]
    #[zeroize(skip)]
    pub signed_email: SignatureParts,
}

impl RecoveryCode {
    /// Base64 of the JSON payload
    pub fn encode(&self) -> WalletResult<String> {
        let json = serde_json::to_vec(self)?;
        Ok(general_purpose::STANDARD.encode(json))
    }

    /// Parse a scanned code; plain JSON is accepted as well as base64
    pub fn decode(value: &str) -> WalletResult<Self> {
        let value = value.trim();
        if value.starts_with('{') {
            return serde_json::from_str(value)
                .map_err(|e| WalletError::InvalidRecoveryCode(e.to_string()));
        }
        let raw = general_purpose::STANDARD
            .decode(value)
            .map_err(|e| WalletError::InvalidRecoveryCode(format!("not base64: {e}")))?;
        serde_json::from_slice(&raw).map_err(|e| WalletError::InvalidRecoveryCode(e.to_string()))
    }

    /// The share carried by this code
    pub fn local_share(&self) -> WalletResult<Share> {
        Ok(self.part.parse::<Share>()?)
    }
}

impl fmt::Debug for RecoveryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecoveryCode")
            .field("email", &self.email)
            .field("api_client_id", &self.api_client_id)
            .field("part", &"[REDACTED]")
            .finish()
    }
}

/// Payment request scanned from a QR code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub to: String,
    /// Amount in wei
    pub value: String,
}

/// Something the camera decoded
#[derive(Debug, Clone)]
pub enum ScanEvent {
    Recovery(RecoveryCode),
    SendTx(SendRequest),
}

/// Result of handling a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Activated { address: String },
    Sent { tx_hash: String },
    /// A recovery was already running
    Ignored,
}

/// Lets only one recovery scan run at a time
#[derive(Debug, Default)]
pub struct ScanGuard {
    busy: AtomicBool,
}

/// Held while a recovery scan runs; releases the guard on drop
#[derive(Debug)]
pub struct ScanPermit<'a> {
    guard: &'a ScanGuard,
}

impl ScanGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` when a scan is already in flight
    pub fn try_acquire(&self) -> Option<ScanPermit<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ScanPermit { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for ScanPermit<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> RecoveryCode {
        RecoveryCode {
            email: "user@example.com".to_string(),
            api_client_id: "client-42".to_string(),
            part: "801abc".to_string(),
            signed_email: SignatureParts {
                r: "11".repeat(32),
                s: "22".repeat(32),
                v: "1b".to_string(),
            },
        }
    }

    #[test]
    fn test_encode_decode() {
        let encoded = code().encode().unwrap();
        assert!(!encoded.contains('{'));
        assert_eq!(RecoveryCode::decode(&encoded).unwrap(), code());

        let json = serde_json::to_string(&code()).unwrap();
        assert!(json.contains("\"signedEmail\""));
        assert_eq!(RecoveryCode::decode(&json).unwrap(), code());
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            RecoveryCode::decode("not base64!"),
            Err(WalletError::InvalidRecoveryCode(_))
        ));
        assert!(matches!(
            RecoveryCode::decode("{\"email\":1}"),
            Err(WalletError::InvalidRecoveryCode(_))
        ));
    }

    #[test]
    fn test_debug_redacts_part() {
        let debug = format!("{:?}", code());
        assert!(!debug.contains("801abc"));
        assert!(debug.contains("user@example.com"));
    }

    #[test]
    fn test_scan_guard() {
        let guard = ScanGuard::new();
        let permit = guard.try_acquire().unwrap();
        assert!(guard.is_busy());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(!guard.is_busy());
        assert!(guard.try_acquire().is_some());
    }
}
