//! Ethereum JSON-RPC 2.0 client

use crate::tx::ChainData;
use crate::{WalletError, WalletResult};
use sdkd_core::{strip_hex_prefix, Address, HttpRequest, HttpTransport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Block tag used for state queries
pub const BLOCK_TAG: &str = "pending";

#[derive(Debug, Clone, Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: String,
    method: String,
    params: Value,
}

impl RpcRequest {
    fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: hex::encode(rand::random::<[u8; 16]>()),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    message: String,
}

impl RpcResponse {
    fn into_result(self) -> WalletResult<Value> {
        if let Some(error) = self.error {
            tracing::debug!(code = error.code, "node returned an error");
            return Err(WalletError::Chain(error.message));
        }
        self.result
            .ok_or_else(|| WalletError::Chain("response has neither result nor error".to_string()))
    }
}

/// Parse a `0x` hex quantity
pub fn parse_quantity(value: &str) -> WalletResult<u128> {
    let digits = strip_hex_prefix(value);
    if digits.is_empty() {
        return Err(WalletError::Chain(format!("empty quantity: {value:?}")));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| WalletError::Chain(format!("bad quantity {value:?}: {e}")))
}

fn quantity_of(value: &Value) -> WalletResult<u128> {
    value
        .as_str()
        .ok_or_else(|| WalletError::Chain(format!("expected hex string, got {value}")))
        .and_then(parse_quantity)
}

/// Client for one node endpoint
#[derive(Debug, Clone)]
pub struct NodeClient {
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
}

impl NodeClient {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Single call
    pub async fn call(&self, method: &str, params: Value) -> WalletResult<Value> {
        let request = RpcRequest::new(method, params);
        tracing::debug!(method, id = %request.id, "rpc call");

        let response: RpcResponse = self.exchange(&request).await?;
        if response.id != Value::String(request.id.clone()) {
            return Err(WalletError::Chain(format!(
                "response id {} does not match request {}",
                response.id, request.id
            )));
        }
        response.into_result()
    }

    /// Batched calls; results are returned in request order
    pub async fn batch(&self, calls: &[(&str, Value)]) -> WalletResult<Vec<Value>> {
        let requests: Vec<RpcRequest> = calls
            .iter()
            .map(|(method, params)| RpcRequest::new(method, params.clone()))
            .collect();
        tracing::debug!(calls = requests.len(), "rpc batch");

        let responses: Vec<RpcResponse> = self.exchange(&requests).await?;
        let mut by_id: HashMap<String, RpcResponse> = responses
            .into_iter()
            .filter_map(|response| match &response.id {
                Value::String(id) => Some((id.clone(), response)),
                _ => None,
            })
            .collect();

        requests
            .iter()
            .map(|request| {
                by_id
                    .remove(&request.id)
                    .ok_or_else(|| {
                        WalletError::Chain(format!("no response for {}", request.method))
                    })
                    .and_then(RpcResponse::into_result)
            })
            .collect()
    }

    /// Balance in wei
    pub async fn get_balance(&self, address: &Address) -> WalletResult<u128> {
        let result = self
            .call("eth_getBalance", json!([address.to_string(), BLOCK_TAG]))
            .await?;
        quantity_of(&result)
    }

    /// Balance, gas price and nonce in one round trip
    pub async fn chain_data(&self, address: &Address) -> WalletResult<ChainData> {
        let address = address.to_string();
        let results = self
            .batch(&[
                ("eth_getBalance", json!([address, BLOCK_TAG])),
                ("eth_gasPrice", json!([])),
                ("eth_getTransactionCount", json!([address, BLOCK_TAG])),
            ])
            .await?;

        match results.as_slice() {
            [balance, gas_price, nonce] => Ok(ChainData {
                balance: quantity_of(balance)?,
                gas_price: quantity_of(gas_price)?,
                nonce: quantity_of(nonce)?,
            }),
            _ => Err(WalletError::Chain("incomplete batch response".to_string())),
        }
    }

    /// Submit a signed transaction, returning its hash
    pub async fn send_raw_transaction(&self, raw_hex: &str) -> WalletResult<String> {
        let result = self.call("eth_sendRawTransaction", json!([raw_hex])).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Chain(format!("unexpected transaction hash: {result}")))
    }

    async fn exchange<B: Serialize, T: DeserializeOwned>(
        &self,
        body: &B,
    ) -> WalletResult<T> {
        let request = HttpRequest::post_json(self.endpoint.clone(), body)?
            .with_header("Accept", "application/json");
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(WalletError::Chain(format!(
                "node returned status {}",
                response.status
            )));
        }
        Ok(response.json()?)
    }
}
