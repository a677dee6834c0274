//! SDK configuration and per-wallet session context

use crate::{WalletError, WalletResult};
use base64::{engine::general_purpose, Engine as _};
use sdkd_core::Address;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;

/// SDK configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Signed API key issued to the integrating app
    pub api_key: String,
    /// SDKD backend base URL
    pub backend_host: String,
    /// Ethereum JSON-RPC endpoint
    pub eth_node_host: String,
    /// EIP-155 chain id; `None` produces legacy signatures
    pub chain_id: Option<u64>,
    /// Sender address for recovery mail
    pub recovery_sender: String,
    /// AWS region used for SES
    pub ses_region: String,
    /// SES endpoint URL; derived from `ses_region` when unset
    pub ses_endpoint: Option<String>,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            backend_host: "https://sdk-d.herokuapp.com".to_string(),
            eth_node_host: "https://api.myetherapi.com/rop".to_string(),
            chain_id: None,
            recovery_sender: "recovery@sdkd.co".to_string(),
            ses_region: sdkd_aws::DEFAULT_SES_REGION.to_string(),
            ses_endpoint: None,
            request_timeout_ms: 30_000,
        }
    }
}

impl SdkConfig {
    /// Default configuration with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load_from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let config: SdkConfig = toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get default configuration directory
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir().unwrap_or_default().join("sdkd")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.api_key.is_empty() {
            return Err("API key cannot be empty".to_string());
        }
        for (name, host) in [
            ("Backend host", Some(&self.backend_host)),
            ("Ethereum node host", Some(&self.eth_node_host)),
            ("SES endpoint", self.ses_endpoint.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, host)| host.map(|host| (name, host)))
        {
            if !(host.starts_with("https://") || host.starts_with("http://")) {
                return Err(format!("{name} must be an http(s) URL"));
            }
        }
        if self.chain_id == Some(0) {
            return Err("Chain id cannot be zero".to_string());
        }
        if !self.recovery_sender.contains('@') {
            return Err("Recovery sender must be a mail address".to_string());
        }
        if self.ses_region.is_empty() {
            return Err("SES region cannot be empty".to_string());
        }
        if self.request_timeout_ms == 0 {
            return Err("Request timeout cannot be zero".to_string());
        }
        Ok(())
    }

    /// Payload segment of the API key, still base64url encoded
    pub fn unsigned_api_key(&self) -> WalletResult<&str> {
        self.api_key
            .split('.')
            .nth(1)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| WalletError::Configuration("API key is not a JWT".to_string()))
    }

    /// `api_client_id` claim of the API key
    pub fn api_client_id(&self) -> WalletResult<String> {
        let segment = self.unsigned_api_key()?.trim_end_matches('=');
        let raw = general_purpose::URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| WalletError::Configuration(format!("API key payload: {e}")))?;
        let claims: serde_json::Value = serde_json::from_slice(&raw)?;

        match claims.get("api_client_id") {
            Some(serde_json::Value::String(id)) => Ok(id.clone()),
            Some(serde_json::Value::Number(id)) => Ok(id.to_string()),
            _ => Err(WalletError::Configuration(
                "API key has no api_client_id claim".to_string(),
            )),
        }
    }

    pub(crate) fn backend_url(&self, path: &str) -> String {
        format!("{}{}", self.backend_host.trim_end_matches('/'), path)
    }
}

/// Authenticated backend session
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token returned by the backend
    pub user_key: SecretString,
    /// Wallet address, once a key is loaded
    pub address: Option<Address>,
}

/// Configuration plus mutable session state, shared by the wallet and its clients
#[derive(Debug)]
pub struct SdkContext {
    config: SdkConfig,
    session: RwLock<Option<Session>>,
}

impl SdkContext {
    /// Create a context after validating the configuration
    pub fn new(config: SdkConfig) -> WalletResult<Self> {
        config.validate().map_err(WalletError::Configuration)?;
        Ok(Self {
            config,
            session: RwLock::new(None),
        })
    }

    /// SDK configuration
    pub fn config(&self) -> &SdkConfig {
        &self.config
    }

    /// Current session, if any
    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Bearer token of the current session
    pub async fn user_key(&self) -> Option<SecretString> {
        self.session.read().await.as_ref().map(|s| s.user_key.clone())
    }

    /// Replace the bearer token, keeping any known address
    pub async fn set_user_key(&self, user_key: SecretString) {
        let mut session = self.session.write().await;
        let address = session.as_ref().and_then(|s| s.address);
        *session = Some(Session { user_key, address });
    }

    /// Attach the wallet address to the current session
    pub async fn set_address(&self, address: Address) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.address = Some(address);
        }
    }

    /// Forget the session
    pub async fn clear_session(&self) {
        *self.session.write().await = None;
    }
}
