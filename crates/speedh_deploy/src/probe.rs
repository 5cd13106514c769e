//! # Verification Probe
//!
//! Read-only pass over a deployed graph. Reads every wiring edge back through
//! its accessor, then every contract's `version()`, and stops at the first
//! disagreement. Check order follows [`WIRING_EDGES`], so a clean run prints
//! hub references, submodule back-references, NFT references, minter
//! references, fixture-manager references and finally versions.

use std::io::Write;
use std::sync::Arc;

use alloy_primitives::Address;
use speedh_blockchain::{ChainBackend, ChainError, ContractClient, ContractHandle};
use speedh_shared::{AddressBook, ContractRole, DeploymentEdge, EdgeAction, EdgeStage, WIRING_EDGES};
use tracing::{error, info};

use crate::error::{DeployError, DeployResult};

/// One passed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRecord {
    /// Edge stage, `None` for version checks.
    pub stage: Option<EdgeStage>,
    /// What was checked.
    pub label: String,
    /// Value read from the chain.
    pub value: String,
}

/// Read-only verification of the contract graph on one chain.
pub struct VerificationProbe {
    client: ContractClient,
    chain_id: u64,
}

impl VerificationProbe {
    /// Probe over the addresses `book` holds for `chain_id`.
    pub fn new(backend: Arc<dyn ChainBackend>, book: AddressBook, chain_id: u64) -> Self {
        Self {
            client: ContractClient::new(backend, book),
            chain_id,
        }
    }

    /// Runs every check, writing one `✓ label -> value` line per pass to `out`.
    ///
    /// # Errors
    ///
    /// [`DeployError::UnresolvedRole`] if a role has no address,
    /// [`DeployError::Verification`] on the first mismatch, chain errors on
    /// failed reads.
    pub async fn run<W: Write>(&self, out: &mut W) -> DeployResult<Vec<CheckRecord>> {
        let mut handles = Vec::with_capacity(ContractRole::ALL.len());
        for role in ContractRole::ALL {
            let handle = self.client.handle(role, self.chain_id).map_err(|e| match e {
                ChainError::MissingAddress { role, chain_id } => {
                    DeployError::UnresolvedRole { role, chain_id }
                }
                other => DeployError::Chain(other),
            })?;
            handles.push(handle);
        }

        let mut records = Vec::with_capacity(WIRING_EDGES.len() + handles.len());
        for edge in &WIRING_EDGES {
            let record = self.check_edge(edge, &handles).await?;
            emit(out, &record)?;
            records.push(record);
        }

        for handle in &handles {
            let record = self.check_version(handle).await?;
            emit(out, &record)?;
            records.push(record);
        }

        info!(checks = records.len(), chain_id = self.chain_id, "verification passed");
        Ok(records)
    }

    async fn check_edge(
        &self,
        edge: &DeploymentEdge,
        handles: &[ContractHandle],
    ) -> DeployResult<CheckRecord> {
        let source = &handles[edge.source.index()];
        let target = handles[edge.target().index()].address;
        let label = edge.label();

        let (expected, received) = match edge.action {
            EdgeAction::Reference { slot, .. } => {
                let stored = self.client.read_reference(source, slot).await?;
                (checksum(target), checksum(stored))
            }
            EdgeAction::AuthorizeMinter { .. } => {
                let flag = self.client.read_minter_flag(source, target).await?;
                ("true".to_string(), flag.to_string())
            }
        };

        ensure_equal(&label, expected, &received)?;
        Ok(CheckRecord {
            stage: Some(edge.stage()),
            label,
            value: received,
        })
    }

    async fn check_version(&self, handle: &ContractHandle) -> DeployResult<CheckRecord> {
        let label = format!("{}.version()", handle.role);
        let received = self.client.read_version(handle).await?;
        ensure_equal(&label, handle.role.expected_version(), &received)?;
        Ok(CheckRecord {
            stage: None,
            label,
            value: received,
        })
    }
}

fn checksum(address: Address) -> String {
    address.to_checksum(None)
}

fn ensure_equal(label: &str, expected: String, received: &str) -> DeployResult<()> {
    if expected == received {
        return Ok(());
    }
    error!(%label, %expected, %received, "verification mismatch");
    Err(DeployError::Verification {
        label: label.to_string(),
        expected,
        received: received.to_string(),
    })
}

fn emit<W: Write>(out: &mut W, record: &CheckRecord) -> DeployResult<()> {
    info!(label = %record.label, value = %record.value, "check passed");
    writeln!(out, "✓ {} -> {}", record.label, record.value)
        .map_err(|e| DeployError::io("<output>", e))
}
