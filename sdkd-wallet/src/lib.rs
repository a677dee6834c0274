//! SDKD Wallet - self-custodial Ethereum wallet core
//!
//! [`WalletCore`] owns the user's private key and drives the activation state
//! machine:
//! - fresh registration, with the key split between the user's mailbox and the
//!   backend, or handed back once as a 24-word phrase
//! - re-authentication from a key held in the [`KeyStore`]
//! - recovery from a mnemonic or from a scanned recovery code
//!
//! After activation it signs messages and builds, signs and submits legacy
//! Ethereum transactions.
//!
//! A fresh activation that fails after `POST /users` succeeded is retried as a
//! whole, so the backend may see the same e-mail registered twice.

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod keystore;
pub mod recovery;
pub mod rpc;
pub mod tx;
pub mod types;
pub mod units;

pub use backend::BackendClient;
pub use config::{SdkConfig, SdkContext, Session};
pub use error::{ValidationKind, WalletError, WalletErrorCategory, WalletResult};
pub use keystore::{keystore_key, KeyStore, MemoryKeyStore, StoredCredentials};
pub use recovery::{RecoveryCode, ScanEvent, ScanGuard, ScanOutcome, SendRequest};
pub use rpc::NodeClient;
pub use tx::{AssembledTx, ChainData, SignedTx, TxDraft};
pub use types::{ActivationRequest, RecoveryType, WalletState};
pub use units::EtherUnit;

use sdkd_aws::{Attachment, AwsError, RawEmail, SesMailer, TemporaryCredentials};
use sdkd_core::{
    constant_time_eq, private_key_from_mnemonic, private_key_to_mnemonic, Address, HttpTransport,
    PrivateKey, ReqwestTransport, SignatureParts,
};
use sdkd_multisig::{SecretSharing, Share};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Backend part stored when the user picks phrase recovery
pub const RECOVERY_PHRASE_SENTINEL: &str = "<RecoveryPhraseChosen>";

/// Subject of the recovery mail
pub const RECOVERY_MAIL_SUBJECT: &str = "Your recovery key for SDKD";

/// Attachment name of the recovery code
pub const RECOVERY_ATTACHMENT_NAME: &str = "recovery-code.txt";

#[derive(Default)]
struct WalletInner {
    state: WalletState,
    email: Option<String>,
    key: Option<PrivateKey>,
}

/// Wallet instance bound to one SDK context
pub struct WalletCore {
    context: Arc<SdkContext>,
    transport: Arc<dyn HttpTransport>,
    backend: BackendClient,
    node: NodeClient,
    keystore: Arc<dyn KeyStore>,
    engine: SecretSharing,
    inner: RwLock<WalletInner>,
    /// Serializes activation attempts
    activation: Mutex<()>,
    scan_guard: ScanGuard,
}

impl std::fmt::Debug for WalletCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletCore")
            .field("backend_host", &self.context.config().backend_host)
            .field("node", &self.node.endpoint())
            .finish_non_exhaustive()
    }
}

impl WalletCore {
    /// Create a wallet over explicit collaborators
    pub fn new(
        context: Arc<SdkContext>,
        transport: Arc<dyn HttpTransport>,
        keystore: Arc<dyn KeyStore>,
    ) -> Self {
        let backend = BackendClient::new(context.clone(), transport.clone());
        let node = NodeClient::new(context.config().eth_node_host.clone(), transport.clone());

        Self {
            context,
            transport,
            backend,
            node,
            keystore,
            engine: SecretSharing::default(),
            inner: RwLock::new(WalletInner::default()),
            activation: Mutex::new(()),
            scan_guard: ScanGuard::new(),
        }
    }

    /// Create a wallet using the `reqwest` transport
    pub fn with_config(config: SdkConfig, keystore: Arc<dyn KeyStore>) -> WalletResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout_ms)?;
        let context = Arc::new(SdkContext::new(config)?);
        Ok(Self::new(context, Arc::new(transport), keystore))
    }

    /// Shared SDK context
    pub fn context(&self) -> &Arc<SdkContext> {
        &self.context
    }

    /// Activate for an e-mail address.
    ///
    /// Returns the recovery phrase when a fresh wallet was created with
    /// [`RecoveryType::Phrase`]; `None` otherwise. The phrase is not kept.
    pub async fn activate(&self, request: ActivationRequest) -> WalletResult<Option<SecretString>> {
        let _flight = self.activation.lock().await;
        self.begin_activation().await;

        let result = self.activate_locked(&request).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "activation failed");
            self.reset().await;
        }
        result
    }

    /// Restore a wallet from its 24-word mnemonic
    pub async fn activate_from_recovery_phrase(
        &self,
        email: &str,
        phrase: &SecretString,
    ) -> WalletResult<Address> {
        let _flight = self.activation.lock().await;
        self.begin_activation().await;

        let result = match private_key_from_mnemonic(phrase) {
            Ok(key) => self.restore(email, key).await,
            Err(e) => Err(e.into()),
        };
        if result.is_err() {
            self.reset().await;
        }
        result
    }

    /// Restore a wallet from a scanned recovery code and the backend's share
    pub async fn activate_from_recovery_code(&self, code: &RecoveryCode) -> WalletResult<Address> {
        let _flight = self.activation.lock().await;
        self.begin_activation().await;

        let result = self.recover_from_code(code).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "recovery from code failed");
            self.reset().await;
        }
        result
    }

    /// Dispatch a camera scan
    pub async fn handle_scan(&self, event: ScanEvent) -> WalletResult<ScanOutcome> {
        match event {
            ScanEvent::Recovery(code) => {
                let Some(_permit) = self.scan_guard.try_acquire() else {
                    tracing::debug!("recovery scan already in flight");
                    return Ok(ScanOutcome::Ignored);
                };
                let address = self.activate_from_recovery_code(&code).await?;
                Ok(ScanOutcome::Activated {
                    address: address.to_string(),
                })
            }
            ScanEvent::SendTx(request) => {
                let tx_hash = self.send_tx(&request.to, &request.value).await?;
                Ok(ScanOutcome::Sent { tx_hash })
            }
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> WalletState {
        self.inner.read().await.state
    }

    /// Current backend session
    pub async fn session(&self) -> Option<Session> {
        self.context.session().await
    }

    /// E-mail address the wallet was activated for
    pub async fn email(&self) -> Option<String> {
        self.inner.read().await.email.clone()
    }

    /// Wallet address
    pub async fn address(&self) -> WalletResult<Address> {
        self.with_key(|key| Ok(key.address()?)).await
    }

    /// Lowercase `0x` address
    pub async fn address_string(&self) -> WalletResult<String> {
        Ok(self.address().await?.to_string())
    }

    /// EIP-55 address
    pub async fn checksum_address(&self) -> WalletResult<String> {
        Ok(self.address().await?.to_checksum_string())
    }

    /// `0x` hex of the uncompressed public key
    pub async fn public_key_string(&self) -> WalletResult<String> {
        self.with_key(|key| Ok(key.public_key()?.to_string())).await
    }

    /// Balance in wei as a decimal string
    pub async fn get_balance(&self) -> WalletResult<String> {
        let address = self.address().await?;
        let balance = self.node.get_balance(&address).await?;
        Ok(balance.to_string())
    }

    /// Send `value` wei to `to` with the default gas limit
    pub async fn send_tx(&self, to: &str, value: &str) -> WalletResult<String> {
        self.send_draft(TxDraft::transfer(to, value)).await
    }

    /// Validate, assemble, sign and submit a draft; returns the transaction hash
    pub async fn send_draft(&self, mut draft: TxDraft) -> WalletResult<String> {
        let address = self.address().await?;
        tx::validate(&mut draft)?;

        let chain = self.node.chain_data(&address).await?;
        let assembled = tx::assemble(&draft, &chain, self.context.config().chain_id)?;
        let signed = self.with_key(|key| tx::sign(&assembled, key)).await?;

        tracing::debug!(nonce = %assembled.nonce_hex(), "submitting transaction");
        let tx_hash = self.node.send_raw_transaction(&signed.raw_hex()).await?;
        tracing::info!(%tx_hash, "transaction submitted");
        Ok(tx_hash)
    }

    /// Personal-message signature
    pub async fn sign_message(&self, message: &[u8]) -> WalletResult<SignatureParts> {
        self.with_key(|key| auth::sign_message(key, message)).await
    }

    /// Notifications for the session user
    pub async fn notifications(&self) -> WalletResult<Vec<serde_json::Value>> {
        self.ensure_ready().await?;
        self.backend.notifications().await
    }

    async fn activate_locked(
        &self,
        request: &ActivationRequest,
    ) -> WalletResult<Option<SecretString>> {
        let slot = keystore_key(&request.email);
        if let Some(stored) = self.keystore.get(&slot).await? {
            tracing::debug!("found stored key");
            let key = PrivateKey::from_hex(stored.secret.expose_secret())?;
            self.authenticate(&request.email, &key).await?;
            self.finish(&request.email, key).await;
            return Ok(None);
        }
        self.register(request, &slot).await
    }

    async fn register(
        &self,
        request: &ActivationRequest,
        slot: &str,
    ) -> WalletResult<Option<SecretString>> {
        let api_client_id = match request.recovery_type {
            RecoveryType::Email => Some(self.context.config().api_client_id()?),
            RecoveryType::Phrase => None,
        };

        let jwt = self.backend.register_user(&request.email).await?;
        self.context.set_user_key(jwt).await;

        let key = PrivateKey::generate();
        let address = key.address()?;
        self.keystore
            .set(slot, &address.to_string(), &key.to_hex())
            .await?;
        self.context.set_address(address).await;
        tracing::info!(%address, recovery = ?request.recovery_type, "registered new wallet");

        let outcome = match api_client_id {
            Some(api_client_id) => self
                .set_up_email_recovery(&request.email, &api_client_id, &key, &address)
                .await
                .map(|()| None),
            None => self.set_up_phrase_recovery(&key, &address).await.map(Some),
        };

        match outcome {
            Ok(phrase) => {
                self.finish(&request.email, key).await;
                Ok(phrase)
            }
            Err(e) => {
                if let Err(clear_error) = self.keystore.clear(slot).await {
                    tracing::warn!(error = %clear_error, "could not clear stored key");
                }
                Err(e)
            }
        }
    }

    async fn set_up_email_recovery(
        &self,
        email: &str,
        api_client_id: &str,
        key: &PrivateKey,
        address: &Address,
    ) -> WalletResult<()> {
        let secret = key.to_hex();
        let shares = self.engine.share(secret.expose_secret(), 2, 2)?;
        if shares.len() != 2 {
            return Err(WalletError::RecoverySetMismatch(format!(
                "expected 2 shares, got {}",
                shares.len()
            )));
        }
        let combined = SecretSharing::combine(&shares)?;
        if !constant_time_eq(combined.as_bytes(), secret.expose_secret().as_bytes()) {
            return Err(WalletError::RecoverySetMismatch(
                "shares do not recombine to the key".to_string(),
            ));
        }

        let code = RecoveryCode {
            email: email.to_string(),
            api_client_id: api_client_id.to_string(),
            part: shares[0].to_string(),
            signed_email: auth::sign_email(key, email)?,
        };

        let credentials = self.backend.aws_credentials().await?;
        self.mail_recovery_code(&credentials, &code, address).await?;
        self.backend
            .upload_key_part(address, &shares[1].to_string())
            .await?;
        tracing::debug!("recovery shares distributed");
        Ok(())
    }

    async fn set_up_phrase_recovery(
        &self,
        key: &PrivateKey,
        address: &Address,
    ) -> WalletResult<SecretString> {
        self.backend
            .upload_key_part(address, RECOVERY_PHRASE_SENTINEL)
            .await?;
        Ok(private_key_to_mnemonic(key)?)
    }

    async fn mail_recovery_code(
        &self,
        credentials: &TemporaryCredentials,
        code: &RecoveryCode,
        address: &Address,
    ) -> WalletResult<()> {
        if credentials.is_expired(chrono::Utc::now()) {
            return Err(AwsError::MissingCredentials(
                "temporary credentials have expired".to_string(),
            )
            .into());
        }

        let config = self.context.config();
        let mut mailer = SesMailer::new(self.transport.clone(), credentials, &config.ses_region)?;
        if let Some(endpoint) = &config.ses_endpoint {
            mailer = mailer.with_endpoint(endpoint.clone());
        }

        let encoded = code.encode()?;
        let email = RawEmail {
            to: code.email.clone(),
            from: config.recovery_sender.clone(),
            subject: RECOVERY_MAIL_SUBJECT.to_string(),
            body: format!(
                "Your recovery key is {encoded}\n\nWallet address: {}\n",
                address.to_checksum_string()
            ),
            attachments: vec![Attachment::new(
                RECOVERY_ATTACHMENT_NAME,
                "text/plain",
                encoded.into_bytes(),
            )],
        };

        let message_id = mailer.send_raw_email(&email).await?;
        tracing::debug!(?message_id, "recovery code mailed");
        Ok(())
    }

    async fn recover_from_code(&self, code: &RecoveryCode) -> WalletResult<Address> {
        let local = code.local_share()?;
        let part = self
            .backend
            .recover_key_part(&code.email, &code.api_client_id, &code.signed_email)
            .await?;
        let remote: Share = part.parse()?;

        let secret = SecretSharing::combine(&[local, remote])?;
        let key = PrivateKey::from_hex(&secret)?;
        self.restore(&code.email, key).await
    }

    /// Persist a recovered key, authenticate and become ready
    async fn restore(&self, email: &str, key: PrivateKey) -> WalletResult<Address> {
        let slot = keystore_key(email);
        let address = key.address()?;
        self.keystore
            .set(&slot, &address.to_string(), &key.to_hex())
            .await?;

        if let Err(e) = self.authenticate(email, &key).await {
            if let Err(clear_error) = self.keystore.clear(&slot).await {
                tracing::warn!(error = %clear_error, "could not clear stored key");
            }
            return Err(e);
        }

        self.finish(email, key).await;
        tracing::info!(%address, "wallet restored");
        Ok(address)
    }

    async fn authenticate(&self, email: &str, key: &PrivateKey) -> WalletResult<()> {
        let challenge = auth::sign_challenge(key, email)?;
        let jwt = self.backend.create_session(&challenge).await?;
        self.context.set_user_key(jwt).await;
        self.context.set_address(key.address()?).await;
        tracing::debug!("session established");
        Ok(())
    }

    async fn begin_activation(&self) {
        self.inner.write().await.state = WalletState::Activating;
        tracing::info!(state = %WalletState::Activating, "wallet state changed");
    }

    async fn finish(&self, email: &str, key: PrivateKey) {
        let mut inner = self.inner.write().await;
        inner.email = Some(email.to_string());
        inner.key = Some(key);
        inner.state = WalletState::Ready;
        tracing::info!(state = %WalletState::Ready, "wallet state changed");
    }

    async fn reset(&self) {
        {
            let mut inner = self.inner.write().await;
            inner.key = None;
            inner.email = None;
            inner.state = WalletState::Uninitialized;
        }
        self.context.clear_session().await;
        tracing::info!(state = %WalletState::Uninitialized, "wallet state changed");
    }

    async fn ensure_ready(&self) -> WalletResult<()> {
        match self.inner.read().await.state {
            WalletState::Ready => Ok(()),
            WalletState::Activating => Err(WalletError::ActivationInProgress),
            WalletState::Uninitialized => Err(WalletError::NotActivated),
        }
    }

    async fn with_key<T>(
        &self,
        f: impl FnOnce(&PrivateKey) -> WalletResult<T>,
    ) -> WalletResult<T> {
        let inner = self.inner.read().await;
        match (&inner.state, &inner.key) {
            (WalletState::Ready, Some(key)) => f(key),
            (WalletState::Activating, _) => Err(WalletError::ActivationInProgress),
            _ => Err(WalletError::NotActivated),
        }
    }
}
