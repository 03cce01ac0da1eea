//! HTTP adapters for the two readers: an Ethereum JSON-RPC node and the
//! Livepeer subgraph.

pub mod abi;
pub mod livepeer;
pub mod subgraph;

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{hex, Address, Bytes};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

use crate::errors::LookupError;
use crate::types::BlockNumber;

pub use livepeer::{LivepeerChain, LivepeerContracts};
pub use subgraph::SubgraphIndexer;

/// The two node methods the Livepeer reader needs.
#[async_trait]
pub trait EthTransport: Send + Sync {
    async fn block_number(&self) -> Result<BlockNumber, LookupError>;

    /// `eth_call` against `to`, at `block` or `latest`.
    async fn call(
        &self,
        to: Address,
        data: Bytes,
        block: Option<BlockNumber>,
    ) -> Result<Bytes, LookupError>;
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

/// JSON-RPC 2.0 over HTTP.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LookupError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        trace!(id, method, "json-rpc request");

        let response: RpcResponse<T> = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(LookupError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => Ok(result),
            (None, None) => Err(LookupError::Malformed(format!(
                "{method} returned neither result nor error"
            ))),
        }
    }
}

#[async_trait]
impl EthTransport for JsonRpcClient {
    async fn block_number(&self) -> Result<BlockNumber, LookupError> {
        let quantity: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&quantity)
    }

    async fn call(
        &self,
        to: Address,
        data: Bytes,
        block: Option<BlockNumber>,
    ) -> Result<Bytes, LookupError> {
        let tag = match block {
            Some(number) => format!("{number:#x}"),
            None => "latest".to_string(),
        };
        let raw: String = self
            .request(
                "eth_call",
                json!([{ "to": hex::encode_prefixed(to), "data": hex::encode_prefixed(&data) }, tag]),
            )
            .await?;
        hex::decode(&raw)
            .map(Bytes::from)
            .map_err(|err| LookupError::Malformed(format!("eth_call result is not hex: {err}")))
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x1b4"`.
pub fn parse_quantity(quantity: &str) -> Result<u64, LookupError> {
    let digits = quantity
        .strip_prefix("0x")
        .ok_or_else(|| LookupError::Malformed(format!("quantity {quantity:?} lacks 0x prefix")))?;
    u64::from_str_radix(digits, 16)
        .map_err(|err| LookupError::Malformed(format!("bad quantity {quantity:?}: {err}")))
}
