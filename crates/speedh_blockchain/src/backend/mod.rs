//! # Chain Backends
//!
//! The seam between this crate and a node. Two implementations ship:
//!
//! - [`JsonRpcBackend`]: HTTP JSON-RPC against a node that manages the
//!   deployer/player accounts (`eth_accounts` + `eth_sendTransaction`)
//! - [`SimulatedChain`]: deterministic in-memory chain that understands the
//!   SpeedH contract surface, used by tests and `--simulate` runs
//!
//! Submission and inclusion are separate steps. [`wait_for_inclusion`] polls
//! receipts under a bounded [`InclusionPolicy`]; nothing here retries.

mod rpc;
mod simulated;

pub use rpc::JsonRpcBackend;
pub use simulated::{SimulatedChain, SIMULATED_CODE_PREFIX};

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tracing::debug;

use crate::error::{ChainError, ChainResult};

/// Transaction hash.
pub type TxHash = B256;

/// A transaction the caller wants signed and submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxDescriptor {
    /// Recipient; `None` creates a contract from `data`.
    pub to: Option<Address>,
    /// Solidity signature of the called function, or `"constructor"`.
    pub function: &'static str,
    /// Calldata or creation code.
    pub data: Bytes,
    /// Attached native value in wei.
    pub value: U256,
    /// Human-readable label for logs and transcripts.
    pub label: String,
}

impl TxDescriptor {
    /// Contract creation from `code`.
    #[must_use]
    pub fn create(label: impl Into<String>, code: Bytes) -> Self {
        Self {
            to: None,
            function: "constructor",
            data: code,
            value: U256::ZERO,
            label: label.into(),
        }
    }

    /// Call to an existing contract.
    #[must_use]
    pub fn call(
        label: impl Into<String>,
        to: Address,
        function: &'static str,
        data: Vec<u8>,
        value: U256,
    ) -> Self {
        Self {
            to: Some(to),
            function,
            data: data.into(),
            value,
            label: label.into(),
        }
    }

    /// Whether this creates a contract.
    #[must_use]
    pub const fn is_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Leading four bytes of the calldata, if any.
    #[must_use]
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.data.get(..4).and_then(|s| s.try_into().ok())
    }
}

/// Inclusion receipt of a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash.
    pub hash: TxHash,
    /// Whether execution succeeded.
    pub success: bool,
    /// Gas consumed.
    pub gas_used: u64,
    /// Created contract, for creations.
    pub contract_address: Option<Address>,
    /// Including block, when the node reports it.
    pub block_number: Option<u64>,
}

impl TxReceipt {
    /// Turns a failed receipt into [`ChainError::Revert`].
    ///
    /// # Errors
    ///
    /// Returns `Revert` when `success` is false.
    pub fn ensure_success(self) -> ChainResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ChainError::Revert {
                message: format!("transaction {} reverted", self.hash),
            })
        }
    }
}

/// Everything the client and the deployment tooling need from a node.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Active chain id.
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Accounts the backend can sign for. Empty means no signer.
    async fn accounts(&self) -> ChainResult<Vec<Address>>;

    /// Native balance in wei.
    async fn balance(&self, account: Address) -> ChainResult<U256>;

    /// Read-only call.
    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes>;

    /// Signs with `from` and submits. Returns as soon as the node accepted it.
    async fn send_transaction(&self, from: Address, tx: &TxDescriptor) -> ChainResult<TxHash>;

    /// Receipt of a submitted transaction, `None` while pending.
    async fn receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>>;
}

/// Bounded wait for inclusion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InclusionPolicy {
    /// Give up after this long.
    pub timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for InclusionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Polls `backend` until `hash` has a receipt or the policy times out.
///
/// A failed receipt is returned as-is; callers decide whether it is an error.
///
/// # Errors
///
/// [`ChainError::InclusionTimeout`] when the policy expires, or whatever the
/// backend raises while polling.
pub async fn wait_for_inclusion(
    backend: &dyn ChainBackend,
    hash: TxHash,
    policy: InclusionPolicy,
) -> ChainResult<TxReceipt> {
    let poll = async {
        loop {
            if let Some(receipt) = backend.receipt(hash).await? {
                return Ok(receipt);
            }
            debug!(%hash, "receipt pending");
            tokio::time::sleep(policy.poll_interval).await;
        }
    };

    tokio::time::timeout(policy.timeout, poll)
        .await
        .map_err(|_| ChainError::InclusionTimeout {
            hash,
            waited: policy.timeout,
        })?
}

/// Submits `tx` from `from`, waits for inclusion and requires success.
///
/// # Errors
///
/// Submission, inclusion and revert errors, unmodified.
pub async fn submit_and_confirm(
    backend: &dyn ChainBackend,
    from: Address,
    tx: &TxDescriptor,
    policy: InclusionPolicy,
) -> ChainResult<TxReceipt> {
    let hash = backend.send_transaction(from, tx).await?;
    debug!(label = %tx.label, %hash, "submitted");
    wait_for_inclusion(backend, hash, policy)
        .await?
        .ensure_success()
}
