//! # Deployment Error Types
//!
//! Every variant aborts the current run. Nothing is retried; re-running the
//! orchestrator resumes from the persisted address book.

use std::path::PathBuf;

use speedh_blockchain::ChainError;
use speedh_shared::{BookError, ContractRole};
use thiserror::Error;

/// Actionable diagnostic printed when no signing account is available.
pub const NO_SIGNER_HELP: &str = "\
How to fix:
  1) Make sure the RPC endpoint exposes an unlocked deployer account
     (eth_accounts must not be empty), or set `deployer` / SPEEDH_DEPLOYER
     to one of the accounts it exposes.
  2) The account must hold native funds on the target network to pay for
     twelve deployments and the wiring transactions.
  3) Relative paths in the config resolve against the working directory;
     run from the repository root or use absolute paths.

Quick checks:
  speedh_accounts --config <file>
  echo $SPEEDH_RPC_URL";

/// Errors raised by the orchestrator, the probe and the CLI plumbing.
#[derive(Error, Debug)]
pub enum DeployError {
    /// No account to sign with.
    #[error("no signer available: {detail}\n\n{}", NO_SIGNER_HELP)]
    NoSigner {
        /// What exactly was missing.
        detail: String,
    },

    /// The endpoint serves a different chain than configured.
    #[error("RPC endpoint serves chain {actual}, configuration expects {expected}")]
    ChainMismatch {
        /// Configured chain id.
        expected: u64,
        /// Chain id reported by the endpoint.
        actual: u64,
    },

    /// A role has no address after the deploy pass.
    #[error("{role} has no address on chain {chain_id}")]
    UnresolvedRole {
        /// Unresolved role.
        role: ContractRole,
        /// Active chain.
        chain_id: u64,
    },

    /// Creation code for a role could not be loaded.
    #[error("artifact for {role} at {path}: {reason}")]
    Artifact {
        /// Role being deployed.
        role: ContractRole,
        /// Artifact location.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A deploy or wiring transaction failed.
    #[error("{title} failed: {source}")]
    Transaction {
        /// Human-readable step title.
        title: String,
        /// Cause.
        #[source]
        source: ChainError,
    },

    /// An on-chain value differs from what the address book implies.
    #[error("verification failed for {label}: expected {expected}, received {received}")]
    Verification {
        /// Which check.
        label: String,
        /// Expected value.
        expected: String,
        /// Value read from the chain.
        received: String,
    },

    /// Chain access failed outside a transaction step.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Address book failure.
    #[error(transparent)]
    Book(#[from] BookError),

    /// Configuration file or override is invalid.
    #[error("configuration {path}: {reason}")]
    Config {
        /// Offending file, or the variable name for overrides.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// Transcript or output I/O failed.
    #[error("I/O at {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;
