//! # Chain Error Types
//!
//! Everything that can go wrong between this process and a node.
//!
//! | Class              | Variants                                   |
//! |--------------------|--------------------------------------------|
//! | Configuration      | `MissingAddress`, `Configuration`          |
//! | Network            | `Network`, `InclusionTimeout`              |
//! | Contract revert    | `Revert`, `MalformedReturn`                |
//! | Pre-submission     | `Rejected`                                 |
//!
//! Decoding a pending foal never produces an error; see [`crate::decode`].

use std::time::Duration;

use alloy_primitives::B256;
use speedh_shared::ContractRole;
use thiserror::Error;

/// Errors raised by chain backends, the contract client and signers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// A role has no usable address on the active chain.
    #[error("contract address for {role} on chain {chain_id} is missing or zero")]
    MissingAddress {
        /// Role that could not be resolved.
        role: ContractRole,
        /// Active chain id.
        chain_id: u64,
    },

    /// The environment handed us something unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// RPC/provider failure on read or submit. Never retried automatically.
    #[error("network error: {0}")]
    Network(String),

    /// A call or transaction reverted.
    #[error("execution reverted: {message}")]
    Revert {
        /// Raw revert message from the node.
        message: String,
    },

    /// A typed accessor returned bytes that do not match its ABI.
    #[error("malformed return from {function}: {reason}")]
    MalformedReturn {
        /// Function signature that was called.
        function: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// The transaction was submitted but not included within the wait policy.
    #[error("transaction {hash} not included after {waited:?}")]
    InclusionTimeout {
        /// Submitted transaction hash.
        hash: B256,
        /// How long we waited.
        waited: Duration,
    },

    /// The signer refused before submission (user rejection, insufficient funds).
    #[error("transaction rejected before submission: {0}")]
    Rejected(String),
}

impl ChainError {
    /// Whether the error belongs to the configuration class (fatal for ops runs).
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingAddress { .. } | Self::Configuration(_))
    }

    /// Whether the error happened before anything reached the chain.
    #[must_use]
    pub const fn is_pre_submission(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;
