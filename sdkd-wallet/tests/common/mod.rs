//! In-process fakes of the SDKD backend, the Ethereum node and SES

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use sdkd_core::{keccak256, HttpRequest, HttpResponse, HttpTransport, TransportError};
use sdkd_wallet::{MemoryKeyStore, RecoveryCode, SdkConfig, SdkContext, WalletCore};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// header.{"api_client_id":"client-42"}.signature
pub const API_KEY: &str = "eyJhbGciOiJIUzI1NiJ9.eyJhcGlfY2xpZW50X2lkIjoiY2xpZW50LTQyIn0.c2ln";
pub const BACKEND: &str = "https://backend.test";
pub const NODE: &str = "https://node.test";
pub const ONE_ETHER_HEX: &str = "0xde0b6b3a7640000";

#[derive(Debug, Default)]
pub struct NetworkState {
    pub registrations: Vec<String>,
    pub sessions: Vec<Value>,
    /// Uploaded key parts by e-mail
    pub parts: HashMap<String, String>,
    pub recover_requests: Vec<Value>,
    pub mails: Vec<HttpRequest>,
    pub raw_transactions: Vec<String>,
    pub rpc_methods: Vec<String>,
}

/// Scripted backend + node + SES behind one transport
#[derive(Debug, Default)]
pub struct FakeNetwork {
    pub state: Mutex<NetworkState>,
    pub recover_delay: Option<Duration>,
    pub reject_mail: bool,
    pub expired_credentials: bool,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_recover_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            recover_delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn rejecting_mail() -> Arc<Self> {
        Arc::new(Self {
            reject_mail: true,
            ..Self::default()
        })
    }

    pub fn with_expired_credentials() -> Arc<Self> {
        Arc::new(Self {
            expired_credentials: true,
            ..Self::default()
        })
    }

    pub fn snapshot<T>(&self, f: impl FnOnce(&NetworkState) -> T) -> T {
        f(&self.state.lock().unwrap())
    }

    fn backend(&self, request: &HttpRequest) -> HttpResponse {
        let path = &request.url[BACKEND.len()..];
        let body: Value = request
            .body
            .as_deref()
            .map(|b| serde_json::from_str(b).unwrap())
            .unwrap_or(Value::Null);
        let mut state = self.state.lock().unwrap();

        match path {
            "/users" => {
                let email = body["email"].as_str().unwrap().to_string();
                state.registrations.push(email.clone());
                ok(json!({ "jwt": format!("jwt-{email}") }))
            }
            "/sessions" => {
                let email = body["email"].as_str().unwrap().to_string();
                state.sessions.push(body);
                ok(json!({ "jwt": format!("jwt-{email}") }))
            }
            "/user_key_parts" => {
                let Some(email) = request
                    .header("X-SDKD-User-Key")
                    .and_then(|key| key.strip_prefix("jwt-"))
                else {
                    return ok(json!({ "error": "not signed in" }));
                };
                let part = body["part"].as_str().unwrap().to_string();
                state.parts.insert(email.to_string(), part);
                ok(json!({}))
            }
            "/user_key_parts/recover" => {
                let email = body["email"].as_str().unwrap().to_string();
                state.recover_requests.push(body);
                match state.parts.get(&email) {
                    Some(part) => ok(json!({ "part": part })),
                    None => ok(json!({ "error": "no key part for user" })),
                }
            }
            "/modules/wallet_aws_token" => ok(json!({
                "credentials": {
                    "access_key_id": "ASIATESTKEY",
                    "secret_access_key": "test-secret",
                    "session_token": "test-session",
                    "expiration": if self.expired_credentials {
                        "2001-01-01T00:00:00Z"
                    } else {
                        "2030-01-01T00:00:00Z"
                    }
                }
            })),
            "/notifications" => ok(json!([{ "message": "welcome" }])),
            _ => HttpResponse::new(404, "{}"),
        }
    }

    fn node(&self, request: &HttpRequest) -> HttpResponse {
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        match body {
            Value::Array(calls) => {
                let responses: Vec<Value> = calls.iter().rev().map(|c| self.rpc(c)).collect();
                ok(Value::Array(responses))
            }
            call => ok(self.rpc(&call)),
        }
    }

    fn rpc(&self, call: &Value) -> Value {
        let method = call["method"].as_str().unwrap().to_string();
        let mut state = self.state.lock().unwrap();
        state.rpc_methods.push(method.clone());

        let result = match method.as_str() {
            "eth_getBalance" => json!(ONE_ETHER_HEX),
            "eth_gasPrice" => json!("0x4a817c800"),
            "eth_getTransactionCount" => json!("0x9"),
            "eth_sendRawTransaction" => {
                let raw = call["params"][0].as_str().unwrap().to_string();
                let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
                state.raw_transactions.push(raw);
                json!(format!("0x{}", hex::encode(keccak256(&bytes))))
            }
            _ => {
                return json!({
                    "jsonrpc": "2.0",
                    "id": call["id"],
                    "error": { "code": -32601, "message": "method not found" }
                })
            }
        };
        json!({ "jsonrpc": "2.0", "id": call["id"], "result": result })
    }

    fn ses(&self, request: &HttpRequest) -> HttpResponse {
        self.state.lock().unwrap().mails.push(request.clone());
        if self.reject_mail {
            return HttpResponse::new(400, "<ErrorResponse>MessageRejected</ErrorResponse>");
        }
        HttpResponse::new(
            200,
            "<SendRawEmailResponse><SendRawEmailResult><MessageId>msg-1</MessageId>\
             </SendRawEmailResult></SendRawEmailResponse>",
        )
    }
}

#[async_trait]
impl HttpTransport for FakeNetwork {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        if request.url.starts_with(BACKEND) {
            if request.url.ends_with("/recover") {
                if let Some(delay) = self.recover_delay {
                    tokio::time::sleep(delay).await;
                }
            }
            Ok(self.backend(&request))
        } else if request.url.starts_with(NODE) {
            Ok(self.node(&request))
        } else if request.url.starts_with("https://email.") {
            Ok(self.ses(&request))
        } else {
            Err(TransportError::Http(format!("unknown host: {}", request.url)))
        }
    }
}

fn ok(body: Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string())
}

pub fn config() -> SdkConfig {
    let mut config = SdkConfig::new(API_KEY);
    config.backend_host = BACKEND.to_string();
    config.eth_node_host = NODE.to_string();
    config
}

pub fn wallet(network: &Arc<FakeNetwork>, keystore: &Arc<MemoryKeyStore>) -> WalletCore {
    wallet_with_config(network, keystore, config())
}

pub fn wallet_with_config(
    network: &Arc<FakeNetwork>,
    keystore: &Arc<MemoryKeyStore>,
    config: SdkConfig,
) -> WalletCore {
    let context = Arc::new(SdkContext::new(config).unwrap());
    WalletCore::new(context, network.clone(), keystore.clone())
}

/// Decoded MIME text of a captured SES request
pub fn mail_text(request: &HttpRequest) -> String {
    let body = request.body.as_deref().unwrap();
    let data = body
        .split('&')
        .find_map(|pair| pair.strip_prefix("RawMessage.Data="))
        .unwrap();
    let data = percent_encoding::percent_decode_str(data)
        .decode_utf8()
        .unwrap()
        .to_string();
    String::from_utf8(general_purpose::STANDARD.decode(data).unwrap()).unwrap()
}

/// Recovery code quoted in a recovery mail
pub fn recovery_code_from_mail(request: &HttpRequest) -> RecoveryCode {
    let text = mail_text(request);
    let start = text.find("Your recovery key is ").unwrap() + "Your recovery key is ".len();
    let encoded = text[start..].split_whitespace().next().unwrap();
    RecoveryCode::decode(encoded).unwrap()
}
