//! Shared wallet types

use serde::{Deserialize, Serialize};
use std::fmt;

/// How the user wants to be able to recover the wallet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryType {
    /// One share mailed to the user, one held by the backend
    #[default]
    Email,
    /// 24-word phrase handed to the caller once
    Phrase,
}

impl std::str::FromStr for RecoveryType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "email" => Ok(RecoveryType::Email),
            "phrase" => Ok(RecoveryType::Phrase),
            other => Err(format!("unknown recovery type: {other}")),
        }
    }
}

/// Input to [`crate::WalletCore::activate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub email: String,
    #[serde(default)]
    pub recovery_type: RecoveryType,
}

impl ActivationRequest {
    /// Request with the default recovery type
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            recovery_type: RecoveryType::default(),
        }
    }

    #[must_use]
    pub fn with_recovery_type(mut self, recovery_type: RecoveryType) -> Self {
        self.recovery_type = recovery_type;
        self
    }
}

/// Activation lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WalletState {
    #[default]
    Uninitialized,
    Activating,
    Ready,
}

impl fmt::Display for WalletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletState::Uninitialized => write!(f, "uninitialized"),
            WalletState::Activating => write!(f, "activating"),
            WalletState::Ready => write!(f, "ready"),
        }
    }
}
