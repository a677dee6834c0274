//! AWS Signature Version 4 request signing
//!
//! [`AwsSigner::sign`] is pure: it takes the request and the signing instant and
//! returns the headers to attach, without performing any I/O.

use crate::{AwsError, AwsResult};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped
pub const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single URI component
pub fn encode_uri_component(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

/// Short-lived credentials as issued by the SDKD backend
#[derive(Debug, Clone, Deserialize)]
pub struct TemporaryCredentials {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    #[serde(default)]
    pub session_token: Option<SecretString>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl TemporaryCredentials {
    /// Whether the credentials have passed their expiration time
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.map_or(false, |expiration| now >= expiration)
    }
}

/// Signer configuration
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    pub session_token: Option<SecretString>,
    pub region: String,
    pub service: String,
    pub default_content_type: String,
    pub default_accept_type: String,
}

impl SigningConfig {
    /// Configuration with the default region and service
    pub fn new(access_key_id: impl Into<String>, secret_access_key: SecretString) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key,
            session_token: None,
            region: "eu-west-1".to_string(),
            service: "execute-api".to_string(),
            default_content_type: "application/json".to_string(),
            default_accept_type: "application/json".to_string(),
        }
    }

    /// Configuration built from temporary credentials
    pub fn from_credentials(credentials: &TemporaryCredentials) -> Self {
        Self {
            session_token: credentials.session_token.clone(),
            ..Self::new(
                credentials.access_key_id.clone(),
                credentials.secret_access_key.clone(),
            )
        }
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    #[must_use]
    pub fn with_session_token(mut self, token: SecretString) -> Self {
        self.session_token = Some(token);
        self
    }
}

/// A request as seen by the signer
#[derive(Debug, Clone, Default)]
pub struct SignableRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Extra query parameters merged over those in `url`
    pub params: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl SignableRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Headers produced by signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub accept: String,
    pub authorization: String,
    /// Absent when the request has no body and no explicit content type
    pub content_type: Option<String>,
    pub amz_date: String,
    pub security_token: Option<String>,
}

impl SignedHeaders {
    /// Header name and value pairs ready for a transport
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("Accept".to_string(), self.accept.clone()),
            ("Authorization".to_string(), self.authorization.clone()),
        ];
        if let Some(content_type) = &self.content_type {
            pairs.push(("Content-Type".to_string(), content_type.clone()));
        }
        pairs.push(("x-amz-date".to_string(), self.amz_date.clone()));
        if let Some(token) = &self.security_token {
            pairs.push(("x-amz-security-token".to_string(), token.clone()));
        }
        pairs
    }
}

/// SigV4 signer bound to one set of credentials
#[derive(Debug, Clone)]
pub struct AwsSigner {
    config: SigningConfig,
}

struct WorkingSet<'a> {
    method: String,
    headers: BTreeMap<String, String>,
    path: String,
    query: BTreeMap<String, String>,
    payload: &'a str,
    amz_date: String,
    short_date: String,
}

impl AwsSigner {
    /// Create a signer, failing fast when either key is empty
    pub fn new(config: SigningConfig) -> AwsResult<Self> {
        if config.access_key_id.is_empty() {
            return Err(AwsError::MissingCredentials(
                "AwsSigner requires an access key id".to_string(),
            ));
        }
        if config.secret_access_key.expose_secret().is_empty() {
            return Err(AwsError::MissingCredentials(
                "AwsSigner requires a secret access key".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Signer configuration
    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Compute the signature headers for `request` at `sign_date`
    pub fn sign(
        &self,
        request: &SignableRequest,
        sign_date: DateTime<Utc>,
    ) -> AwsResult<SignedHeaders> {
        let ws = self.prepare(request, sign_date)?;
        let (canonical, signed_header_names) = Self::build_canonical_request(&ws);

        let scope = format!(
            "{}/{}/{}/aws4_request",
            ws.short_date, self.config.region, self.config.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{scope}\n{}",
            ws.amz_date,
            hex::encode(Sha256::digest(canonical.as_bytes()))
        );

        let signing_key = self.signing_key(&ws.short_date)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
            self.config.access_key_id
        );

        tracing::debug!(
            service = %self.config.service,
            region = %self.config.region,
            signed_headers = %signed_header_names,
            "signed request"
        );

        Ok(SignedHeaders {
            accept: ws.headers.get("accept").cloned().unwrap_or_default(),
            authorization,
            content_type: ws.headers.get("content-type").cloned(),
            amz_date: ws.amz_date,
            security_token: self
                .config
                .session_token
                .as_ref()
                .map(|token| token.expose_secret().clone()),
        })
    }

    /// The canonical request string that `sign` would hash
    pub fn canonical_request(
        &self,
        request: &SignableRequest,
        sign_date: DateTime<Utc>,
    ) -> AwsResult<String> {
        let ws = self.prepare(request, sign_date)?;
        Ok(Self::build_canonical_request(&ws).0)
    }

    fn prepare<'a>(
        &self,
        request: &'a SignableRequest,
        sign_date: DateTime<Utc>,
    ) -> AwsResult<WorkingSet<'a>> {
        let url = Url::parse(&request.url)?;
        let host = url
            .host_str()
            .ok_or_else(|| AwsError::InvalidUrl(format!("no host in {}", request.url)))?;
        let host = match url.port() {
            Some(port) if port != 80 && port != 443 => format!("{host}:{port}"),
            _ => host.to_string(),
        };

        let amz_date = sign_date.format("%Y%m%dT%H%M%SZ").to_string();
        let short_date = sign_date.format("%Y%m%d").to_string();
        let payload = request.body.as_deref().unwrap_or_default();

        let mut headers = BTreeMap::new();
        headers.insert("host".to_string(), host);
        if !payload.is_empty() {
            headers.insert(
                "content-type".to_string(),
                self.config.default_content_type.clone(),
            );
        }
        headers.insert("accept".to_string(), self.config.default_accept_type.clone());
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        for (name, value) in &request.headers {
            headers.insert(name.to_lowercase(), value.clone());
        }
        if let Some(content_type) = headers.get_mut("content-type") {
            // Parameters such as charset may be rewritten in transit
            if let Some(idx) = content_type.find(';') {
                content_type.truncate(idx);
            }
        }

        let mut query: BTreeMap<String, String> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        query.extend(request.params.clone());

        let path = if url.path().starts_with('/') {
            url.path().to_string()
        } else {
            format!("/{}", url.path())
        };

        Ok(WorkingSet {
            method: request.method.to_uppercase(),
            headers,
            path,
            query,
            payload,
            amz_date,
            short_date,
        })
    }

    fn build_canonical_request(ws: &WorkingSet<'_>) -> (String, String) {
        let signed_header_names = ws.headers.keys().cloned().collect::<Vec<_>>().join(";");

        let canonical_path = ws
            .path
            .split('/')
            // `Url` already escaped the path
            .map(|segment| encode_uri_component(&percent_decode_str(segment).decode_utf8_lossy()))
            .collect::<Vec<_>>()
            .join("/");

        let canonical_query = ws
            .query
            .iter()
            .map(|(key, value)| format!("{}={}", encode_uri_component(key), encode_uri_component(value)))
            .collect::<Vec<_>>()
            .join("&");

        let canonical_headers = ws
            .headers
            .iter()
            .map(|(name, value)| format!("{name}:{value}"))
            .collect::<Vec<_>>()
            .join("\n");

        let canonical = format!(
            "{}\n{canonical_path}\n{canonical_query}\n{canonical_headers}\n\n{signed_header_names}\n{}",
            ws.method,
            hex::encode(Sha256::digest(ws.payload.as_bytes()))
        );

        (canonical, signed_header_names)
    }

    fn signing_key(&self, short_date: &str) -> AwsResult<Vec<u8>> {
        let secret = format!("AWS4{}", self.config.secret_access_key.expose_secret());
        let key = hmac_sha256(secret.as_bytes(), short_date.as_bytes())?;
        let key = hmac_sha256(&key, self.config.region.as_bytes())?;
        let key = hmac_sha256(&key, self.config.service.as_bytes())?;
        hmac_sha256(&key, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> AwsResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| AwsError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
