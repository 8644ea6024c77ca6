//! Ethereum JSON-RPC client.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use crate::chain::BackendFailure;
use crate::domain::ConfigError;
use crate::infra::http::{HttpClientConfig, read_json, transport_failure};

use super::records::{RpcBlock, RpcCallRequest, RpcReceipt, RpcTransaction};

/// Node methods consumed by [`EvmRpcNetwork`](super::EvmRpcNetwork).
///
/// Lookups by hash return `None` when the node does not know the object.
/// Quantities are returned as the node sent them.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    async fn block_number(&self) -> Result<String, BackendFailure>;

    async fn block_by_hash(&self, hash: &str) -> Result<Option<RpcBlock>, BackendFailure>;

    async fn latest_block(&self) -> Result<Option<RpcBlock>, BackendFailure>;

    async fn transaction_by_hash(&self, hash: &str)
    -> Result<Option<RpcTransaction>, BackendFailure>;

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, BackendFailure>;

    async fn balance(&self, address: &str) -> Result<String, BackendFailure>;

    /// Transaction count including pending transactions.
    async fn pending_transaction_count(&self, address: &str) -> Result<String, BackendFailure>;

    /// `eth_call` against the latest block, returning the raw return data.
    async fn call(&self, request: &RpcCallRequest) -> Result<String, BackendFailure>;

    async fn estimate_gas(&self, request: &RpcCallRequest) -> Result<String, BackendFailure>;

    async fn max_priority_fee_per_gas(&self) -> Result<String, BackendFailure>;

    /// Returns the transaction hash.
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, BackendFailure>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Value,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Maps a JSON-RPC error object to a failure signal.
///
/// Reserved protocol codes mean the exchange itself broke down; every other
/// code, including server-defined errors and reverts, is a rejection.
pub fn classify_rpc_error(code: i64, message: &str) -> BackendFailure {
    match code {
        -32700 | -32603..=-32600 => BackendFailure::malformed(format!("[{code}] {message}")),
        _ => BackendFailure::coded(code.to_string(), message),
    }
}

/// HTTP implementation of [`EvmRpc`].
pub struct JsonRpcClient {
    http_client: Client,
    rpc_url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(rpc_url: &str, config: &HttpClientConfig) -> Result<Self, ConfigError> {
        let http_client = config.build()?;
        info!(rpc_url = %rpc_url, "Created JSON-RPC client");
        Ok(Self {
            http_client,
            rpc_url: rpc_url.to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn with_defaults(rpc_url: &str) -> Result<Self, ConfigError> {
        Self::new(rpc_url, &HttpClientConfig::default())
    }

    /// Executes a single call. Failures are never retried here.
    async fn rpc_call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, BackendFailure> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method = %method, id = request.id, "JSON-RPC request");

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(transport_failure)?;
        let rpc_response: JsonRpcResponse = read_json(response).await?;
        decode_result(method, rpc_response)
    }
}

fn decode_result<R: DeserializeOwned>(
    method: &str,
    response: JsonRpcResponse,
) -> Result<R, BackendFailure> {
    if let Some(error) = response.error {
        return Err(classify_rpc_error(error.code, &error.message));
    }
    serde_json::from_value(response.result)
        .map_err(|e| BackendFailure::malformed(format!("{method} result: {e}")))
}

#[async_trait]
impl EvmRpc for JsonRpcClient {
    #[instrument(skip(self))]
    async fn block_number(&self) -> Result<String, BackendFailure> {
        self.rpc_call("eth_blockNumber", json!([])).await
    }

    #[instrument(skip(self))]
    async fn block_by_hash(&self, hash: &str) -> Result<Option<RpcBlock>, BackendFailure> {
        self.rpc_call("eth_getBlockByHash", json!([hash, false]))
            .await
    }

    #[instrument(skip(self))]
    async fn latest_block(&self) -> Result<Option<RpcBlock>, BackendFailure> {
        self.rpc_call("eth_getBlockByNumber", json!(["latest", false]))
            .await
    }

    #[instrument(skip(self))]
    async fn transaction_by_hash(
        &self,
        hash: &str,
    ) -> Result<Option<RpcTransaction>, BackendFailure> {
        self.rpc_call("eth_getTransactionByHash", json!([hash]))
            .await
    }

    #[instrument(skip(self))]
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<RpcReceipt>, BackendFailure> {
        self.rpc_call("eth_getTransactionReceipt", json!([hash]))
            .await
    }

    #[instrument(skip(self))]
    async fn balance(&self, address: &str) -> Result<String, BackendFailure> {
        self.rpc_call("eth_getBalance", json!([address, "latest"]))
            .await
    }

    #[instrument(skip(self))]
    async fn pending_transaction_count(&self, address: &str) -> Result<String, BackendFailure> {
        self.rpc_call("eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    #[instrument(skip(self, request), fields(to = %request.to))]
    async fn call(&self, request: &RpcCallRequest) -> Result<String, BackendFailure> {
        self.rpc_call("eth_call", json!([request, "latest"])).await
    }

    #[instrument(skip(self, request), fields(to = %request.to))]
    async fn estimate_gas(&self, request: &RpcCallRequest) -> Result<String, BackendFailure> {
        self.rpc_call("eth_estimateGas", json!([request])).await
    }

    #[instrument(skip(self))]
    async fn max_priority_fee_per_gas(&self) -> Result<String, BackendFailure> {
        self.rpc_call("eth_maxPriorityFeePerGas", json!([])).await
    }

    #[instrument(skip(self, raw_hex), fields(size = raw_hex.len()))]
    async fn send_raw_transaction(&self, raw_hex: &str) -> Result<String, BackendFailure> {
        self.rpc_call("eth_sendRawTransaction", json!([raw_hex]))
            .await
    }
}
