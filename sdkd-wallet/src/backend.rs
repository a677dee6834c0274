//! SDKD backend client
//!
//! Thin JSON client over [`HttpTransport`]. A response that carries an `error`
//! member is a failure even when the status is 2xx.

use crate::auth::ChallengeBody;
use crate::config::SdkContext;
use crate::{WalletError, WalletResult};
use sdkd_aws::TemporaryCredentials;
use sdkd_core::{Address, HttpRequest, HttpTransport, SignatureParts, TransportError};
use secrecy::{ExposeSecret, SecretString};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Header carrying the app's API key
pub const API_CLIENT_KEY_HEADER: &str = "X-SDKD-API-Client-Key";
/// Header carrying the session token
pub const USER_KEY_HEADER: &str = "X-SDKD-User-Key";

#[derive(Debug, Deserialize)]
struct JwtResponse {
    jwt: String,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    part: String,
}

#[derive(Debug, Deserialize)]
struct CredentialsResponse {
    credentials: TemporaryCredentials,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct UploadPartBody<'a> {
    address: String,
    part: &'a str,
}

#[derive(Debug, Serialize)]
struct RecoverPartBody<'a> {
    email: &'a str,
    api_client_id: &'a str,
    #[serde(rename = "signedEmail")]
    signed_email: &'a SignatureParts,
}

/// Client for the SDKD REST API
#[derive(Debug, Clone)]
pub struct BackendClient {
    context: Arc<SdkContext>,
    transport: Arc<dyn HttpTransport>,
}

impl BackendClient {
    pub fn new(context: Arc<SdkContext>, transport: Arc<dyn HttpTransport>) -> Self {
        Self { context, transport }
    }

    /// Register an e-mail address; returns the session token
    pub async fn register_user(&self, email: &str) -> WalletResult<SecretString> {
        let response: JwtResponse = self.post("/users", &RegisterBody { email }).await?;
        Ok(SecretString::new(response.jwt))
    }

    /// Exchange a signed challenge for a session token
    pub async fn create_session(&self, challenge: &ChallengeBody) -> WalletResult<SecretString> {
        let response: JwtResponse = self.post("/sessions", challenge).await?;
        Ok(SecretString::new(response.jwt))
    }

    /// Store the backend's share of the key, or the phrase sentinel
    pub async fn upload_key_part(&self, address: &Address, part: &str) -> WalletResult<()> {
        let body = UploadPartBody {
            address: address.to_string(),
            part,
        };
        let _: IgnoredAny = self.post("/user_key_parts", &body).await?;
        Ok(())
    }

    /// Fetch the backend's share for a recovery code
    pub async fn recover_key_part(
        &self,
        email: &str,
        api_client_id: &str,
        signed_email: &SignatureParts,
    ) -> WalletResult<String> {
        let body = RecoverPartBody {
            email,
            api_client_id,
            signed_email,
        };
        let response: PartResponse = self.post("/user_key_parts/recover", &body).await?;
        Ok(response.part)
    }

    /// Pending notifications for the session user
    pub async fn notifications(&self) -> WalletResult<Vec<Value>> {
        self.get("/notifications").await
    }

    /// Temporary AWS credentials for sending recovery mail
    pub async fn aws_credentials(&self) -> WalletResult<TemporaryCredentials> {
        let response: CredentialsResponse = self.get("/modules/wallet_aws_token").await?;
        Ok(response.credentials)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> WalletResult<T> {
        let request = HttpRequest::get(self.context.config().backend_url(path));
        self.execute(path, request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> WalletResult<T> {
        let request = HttpRequest::post_json(self.context.config().backend_url(path), body)?;
        self.execute(path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: HttpRequest,
    ) -> WalletResult<T> {
        let mut request = request
            .with_header("Accept", "application/json")
            .with_header(API_CLIENT_KEY_HEADER, self.context.config().api_key.clone());
        if request.header("Content-Type").is_none() {
            request = request.with_header("Content-Type", "application/json");
        }
        if let Some(user_key) = self.context.user_key().await {
            request = request.with_header(USER_KEY_HEADER, user_key.expose_secret().clone());
        }

        tracing::debug!(path, method = request.method.as_str(), "backend request");
        let response = self.transport.send(request).await?;

        let parsed: Option<Value> = serde_json::from_str(&response.body).ok();
        if let Some(error) = parsed
            .as_ref()
            .and_then(|value| value.get("error"))
            .filter(|error| is_set(error))
        {
            let message = match error {
                Value::String(message) => message.clone(),
                other => other.to_string(),
            };
            tracing::debug!(path, status = response.status, "backend returned an error");
            return Err(WalletError::Backend(message));
        }
        if !response.is_success() {
            return Err(WalletError::Backend(format!(
                "{path} returned status {}",
                response.status
            )));
        }

        let value = parsed.ok_or_else(|| {
            TransportError::Decode(format!("{path} returned a non-JSON body"))
        })?;
        serde_json::from_value(value)
            .map_err(|e| TransportError::Decode(format!("{path}: {e}")).into())
    }
}

/// `null`, `false`, `0` and `""` do not count as an error member
fn is_set(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
