//! HTTP JSON-RPC backend.
//!
//! Signing is delegated to the node: the accounts returned by `eth_accounts`
//! must be unlocked there (a dev node, a Clef-fronted node, or a signing
//! proxy).

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{hex, Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{ChainBackend, TxDescriptor, TxHash, TxReceipt};
use crate::error::{ChainError, ChainResult};

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC client for an EVM node.
pub struct JsonRpcBackend {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    #[serde(default)]
    status: Option<String>,
    gas_used: String,
    #[serde(default)]
    contract_address: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
}

impl JsonRpcBackend {
    /// Creates a client for `url`.
    ///
    /// # Errors
    ///
    /// [`ChainError::Configuration`] if the URL is empty or the HTTP client
    /// cannot be built.
    pub fn new(url: impl Into<String>) -> ChainResult<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(ChainError::Configuration("RPC URL is empty".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ChainError::Configuration(format!("http client: {error}")))?;
        Ok(Self {
            http,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint this backend talks to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issues one request. `Ok(None)` means the node answered `null`.
    async fn rpc_call(&self, method: &str, params: Value) -> ChainResult<Option<Value>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });
        trace!(method, id, "rpc request");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|error| ChainError::Network(format!("{method} failed: {error}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Network(format!(
                "{method}: rpc returned status {status}"
            )));
        }
        let envelope: RpcEnvelope = response.json().await.map_err(|error| {
            ChainError::Network(format!("failed to parse {method} response JSON: {error}"))
        })?;

        if let Some(error) = envelope.error {
            return Err(classify_rpc_error(method, &error));
        }
        Ok(envelope.result.filter(|value| !value.is_null()))
    }

    async fn rpc_string(&self, method: &str, params: Value) -> ChainResult<String> {
        self.rpc_call(method, params)
            .await?
            .and_then(|value| value.as_str().map(str::to_owned))
            .ok_or_else(|| ChainError::Network(format!("{method} result was missing")))
    }
}

#[async_trait]
impl ChainBackend for JsonRpcBackend {
    async fn chain_id(&self) -> ChainResult<u64> {
        let raw = self.rpc_string("eth_chainId", json!([])).await?;
        parse_hex_u64(&raw, "eth_chainId")
    }

    async fn accounts(&self) -> ChainResult<Vec<Address>> {
        let result = self.rpc_call("eth_accounts", json!([])).await?;
        let Some(Value::Array(items)) = result else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .map(|item| {
                item.as_str()
                    .ok_or_else(|| ChainError::Network("eth_accounts entry is not a string".into()))
                    .and_then(|raw| parse_address(raw, "eth_accounts"))
            })
            .collect()
    }

    async fn balance(&self, account: Address) -> ChainResult<U256> {
        let raw = self
            .rpc_string("eth_getBalance", json!([account.to_checksum(None), "latest"]))
            .await?;
        parse_hex_u256(&raw, "eth_getBalance")
    }

    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        let raw = self
            .rpc_string(
                "eth_call",
                json!([
                    {"to": to.to_checksum(None), "data": hex::encode_prefixed(&data)},
                    "latest"
                ]),
            )
            .await?;
        parse_hex_bytes(&raw, "eth_call")
    }

    async fn send_transaction(&self, from: Address, tx: &TxDescriptor) -> ChainResult<TxHash> {
        let mut request = serde_json::Map::new();
        request.insert("from".into(), Value::String(from.to_checksum(None)));
        if let Some(to) = tx.to {
            request.insert("to".into(), Value::String(to.to_checksum(None)));
        }
        request.insert("data".into(), Value::String(hex::encode_prefixed(&tx.data)));
        request.insert("value".into(), Value::String(format!("0x{:x}", tx.value)));
        debug!(label = %tx.label, function = tx.function, "eth_sendTransaction");

        let raw = self
            .rpc_string("eth_sendTransaction", Value::Array(vec![Value::Object(request)]))
            .await?;
        parse_hash(&raw, "eth_sendTransaction")
    }

    async fn receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>> {
        let Some(raw) = self
            .rpc_call("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?
        else {
            return Ok(None);
        };
        let receipt: RpcReceipt = serde_json::from_value(raw).map_err(|error| {
            ChainError::Network(format!("failed to decode receipt for {hash}: {error}"))
        })?;

        // Pre-byzantium receipts carry no status; treat them as successful.
        let success = match receipt.status.as_deref() {
            Some(status) => parse_hex_u64(status, "receipt status")? == 1,
            None => true,
        };
        Ok(Some(TxReceipt {
            hash: parse_hash(&receipt.transaction_hash, "receipt hash")?,
            success,
            gas_used: parse_hex_u64(&receipt.gas_used, "receipt gasUsed")?,
            contract_address: receipt
                .contract_address
                .as_deref()
                .map(|raw| parse_address(raw, "receipt contractAddress"))
                .transpose()?,
            block_number: receipt
                .block_number
                .as_deref()
                .map(|raw| parse_hex_u64(raw, "receipt blockNumber"))
                .transpose()?,
        }))
    }
}

/// Maps a JSON-RPC error object onto the chain error taxonomy.
fn classify_rpc_error(method: &str, error: &RpcErrorObject) -> ChainError {
    let lowered = error.message.to_ascii_lowercase();
    // EIP-1474: code 3 is "execution reverted" with revert data.
    if error.code == 3 || lowered.contains("revert") {
        let message = match &error.data {
            Some(data) => format!("{} ({data})", error.message),
            None => error.message.clone(),
        };
        return ChainError::Revert { message };
    }
    if lowered.contains("insufficient funds")
        || lowered.contains("rejected")
        || lowered.contains("denied")
        || lowered.contains("unknown account")
    {
        return ChainError::Rejected(format!("{method}: {}", error.message));
    }
    ChainError::Network(format!(
        "rpc returned error for {method}: {} (code {})",
        error.message, error.code
    ))
}

fn strip_hex_prefix<'a>(raw: &'a str, field: &str) -> ChainResult<&'a str> {
    let value = raw.trim();
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| ChainError::Network(format!("{field} must be 0x-prefixed hex")))
}

fn parse_hex_u64(raw: &str, field: &str) -> ChainResult<u64> {
    let digits = strip_hex_prefix(raw, field)?;
    u64::from_str_radix(digits, 16)
        .map_err(|error| {
            ChainError::Network(format!("failed to parse {field} as hex u64: {error}"))
        })
}

fn parse_hex_u256(raw: &str, field: &str) -> ChainResult<U256> {
    let digits = strip_hex_prefix(raw, field)?;
    U256::from_str_radix(digits, 16)
        .map_err(|error| ChainError::Network(format!("failed to parse {field}: {error}")))
}

fn parse_hex_bytes(raw: &str, field: &str) -> ChainResult<Bytes> {
    hex::decode(raw.trim())
        .map(Bytes::from)
        .map_err(|error| ChainError::Network(format!("{field} is not valid hex: {error}")))
}

fn parse_address(raw: &str, field: &str) -> ChainResult<Address> {
    Address::from_str(raw.trim())
        .map_err(|error| {
            ChainError::Network(format!("{field} returned bad address {raw:?}: {error}"))
        })
}

fn parse_hash(raw: &str, field: &str) -> ChainResult<B256> {
    B256::from_str(raw.trim())
        .map_err(|error| ChainError::Network(format!("{field} returned bad hash {raw:?}: {error}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rpc_error(code: i64, message: &str) -> RpcErrorObject {
        RpcErrorObject {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_classify_revert() {
        let error = classify_rpc_error("eth_call", &rpc_error(3, "execution reverted: not owner"));
        assert!(matches!(error, ChainError::Revert { message } if message.contains("not owner")));
    }

    #[test]
    fn test_classify_insufficient_funds() {
        let error = classify_rpc_error(
            "eth_sendTransaction",
            &rpc_error(-32000, "insufficient funds for gas * price + value"),
        );
        assert!(error.is_pre_submission());
    }

    #[test]
    fn test_classify_other_is_network() {
        let error = classify_rpc_error("eth_chainId", &rpc_error(-32603, "internal error"));
        assert!(matches!(error, ChainError::Network(_)));
    }

    #[test]
    fn test_parse_quantities() {
        assert_eq!(parse_hex_u64("0x29", "chain").unwrap(), 41);
        assert!(parse_hex_u64("41", "chain").is_err());
        assert_eq!(
            parse_hex_u256("0xde0b6b3a7640000", "balance").unwrap(),
            U256::from(1_000_000_000_000_000_000u64)
        );
        assert_eq!(parse_hex_bytes("0x", "call").unwrap().len(), 0);
    }

    #[test]
    fn test_receipt_deserialization() {
        let raw = json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x0",
            "gasUsed": "0x5208",
            "contractAddress": null,
            "blockNumber": "0x10"
        });
        let receipt: RpcReceipt = serde_json::from_value(raw).unwrap();
        assert_eq!(receipt.status.as_deref(), Some("0x0"));
        assert!(receipt.contract_address.is_none());
        assert_eq!(parse_hex_u64(&receipt.gas_used, "gas").unwrap(), 21_000);
    }

    #[test]
    fn test_empty_url_is_configuration_error() {
        assert!(matches!(
            JsonRpcBackend::new("  "),
            Err(ChainError::Configuration(_))
        ));
    }
}
