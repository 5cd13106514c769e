//! # Deployment Orchestrator
//!
//! Brings the contract graph on one chain to a fully wired state:
//!
//! 1. Resolve the deployer and check the endpoint's chain id
//! 2. Reuse every role the address book already has, create the rest
//! 3. Apply [`WIRING_EDGES`] in order, stopping at the first failure
//! 4. On full success, persist the address book and the JSON dump
//!
//! Strictly sequential: one deployer account, one nonce stream.

use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use chrono::Local;
use speedh_blockchain::{
    submit_and_confirm, ChainBackend, ChainError, ContractClient, InclusionPolicy, TxDescriptor,
    TxReceipt,
};
use speedh_shared::{
    address_book, AddressBook, ContractRole, EdgeAction, EdgeStage, NativeAmount, WIRING_EDGES,
};
use tracing::{error, info, warn};

use crate::artifacts::ArtifactSource;
use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};
use crate::transcript::Transcript;

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct DeploymentReport {
    /// Active chain.
    pub chain_id: u64,
    /// Signing account.
    pub deployer: Address,
    /// Roles created in this run.
    pub created: Vec<(ContractRole, Address)>,
    /// Roles taken from the address book.
    pub reused: Vec<(ContractRole, Address)>,
    /// Wiring calls that succeeded.
    pub edges_applied: usize,
    /// The persisted book.
    pub book: AddressBook,
    /// Markdown transcript.
    pub transcript_path: PathBuf,
    /// JSON address dump.
    pub dump_path: PathBuf,
}

/// Resolves the signing account: the configured deployer if the endpoint
/// exposes it, otherwise the first exposed account.
///
/// # Errors
///
/// [`DeployError::NoSigner`] when no usable account exists,
/// [`DeployError::Config`] when the configured deployer is not an address.
pub async fn resolve_deployer(
    backend: &dyn ChainBackend,
    config: &DeployConfig,
) -> DeployResult<Address> {
    let accounts = backend.accounts().await.map_err(|e| DeployError::NoSigner {
        detail: format!("eth_accounts failed on {}: {e}", config.rpc_url()),
    })?;

    match config.deployer_address()? {
        Some(wanted) if accounts.contains(&wanted) => Ok(wanted),
        Some(wanted) => Err(DeployError::NoSigner {
            detail: format!(
                "configured deployer {} is not among the {} account(s) exposed by {}",
                wanted.to_checksum(None),
                accounts.len(),
                config.rpc_url()
            ),
        }),
        None => accounts.first().copied().ok_or_else(|| DeployError::NoSigner {
            detail: format!("{} exposes no accounts", config.rpc_url()),
        }),
    }
}

/// Reads the endpoint's chain id and checks it against the configuration.
///
/// # Errors
///
/// [`DeployError::ChainMismatch`] or the backend's error.
pub async fn check_chain(backend: &dyn ChainBackend, config: &DeployConfig) -> DeployResult<u64> {
    let actual = backend.chain_id().await?;
    match config.expected_chain_id() {
        Some(expected) if expected != actual => {
            Err(DeployError::ChainMismatch { expected, actual })
        }
        _ => Ok(actual),
    }
}

/// Deploys and wires the contract graph.
pub struct Orchestrator {
    backend: Arc<dyn ChainBackend>,
    artifacts: Box<dyn ArtifactSource>,
    config: DeployConfig,
}

struct Run {
    chain_id: u64,
    deployer: Address,
    transcript: Transcript,
    initial_balance: NativeAmount,
    balance: NativeAmount,
}

impl Orchestrator {
    /// New orchestrator over `backend`.
    pub fn new(
        backend: Arc<dyn ChainBackend>,
        artifacts: Box<dyn ArtifactSource>,
        config: DeployConfig,
    ) -> Self {
        Self {
            backend,
            artifacts,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Runs all stages.
    ///
    /// # Errors
    ///
    /// The first fatal error. Already-included transactions stay on chain;
    /// the address book is only written when every stage succeeded.
    pub async fn run(&self) -> DeployResult<DeploymentReport> {
        let chain_id = check_chain(self.backend.as_ref(), &self.config).await?;
        let deployer = resolve_deployer(self.backend.as_ref(), &self.config).await?;
        info!(network = %self.config.network_name, chain_id, %deployer, "starting deployment");

        let mut run = Run {
            chain_id,
            deployer,
            transcript: Transcript::create(
                &self.config.paths.logs_dir,
                &self.config.network_name,
                Local::now(),
            )?,
            initial_balance: NativeAmount::ZERO,
            balance: NativeAmount::ZERO,
        };

        run.transcript.section("Deployer")?;
        run.transcript
            .line(&format!("- **Address**: `{}`", deployer.to_checksum(None)))?;
        run.initial_balance = self.balance(deployer).await?;
        run.balance = run.initial_balance;
        run.transcript.balance(run.balance, None)?;

        let mut book = AddressBook::load(&self.config.paths.address_book)?;
        let (created, reused) = self.deploy_roles(&mut run, &mut book).await?;

        if let Some(role) = book.missing_roles(chain_id).into_iter().next() {
            error!(%role, chain_id, "role unresolved after deploy pass");
            return Err(DeployError::UnresolvedRole { role, chain_id });
        }

        let edges_applied = self.apply_edges(&mut run, &book).await?;

        let balance = self.balance(deployer).await?;
        run.transcript.section("Final balance")?;
        run.transcript.balance(balance, Some(balance.delta_from(run.initial_balance)))?;

        run.transcript.section("Address book")?;
        let listing = book.resolve_all(chain_id).unwrap_or_default();
        run.transcript
            .address_listing(listing.iter().map(|(role, address)| (role.name(), *address)))?;

        let dump_path = self.config.dump_path();
        address_book::write_atomic(&dump_path, &book.dump_json(chain_id)?)?;
        book.persist(&self.config.paths.address_book)?;
        info!(
            created = created.len(),
            reused = reused.len(),
            edges_applied,
            book = %self.config.paths.address_book.display(),
            dump = %dump_path.display(),
            "deployment complete"
        );

        Ok(DeploymentReport {
            chain_id,
            deployer,
            created,
            reused,
            edges_applied,
            book,
            transcript_path: run.transcript.path().to_path_buf(),
            dump_path,
        })
    }

    async fn balance(&self, account: Address) -> DeployResult<NativeAmount> {
        Ok(NativeAmount::from_u256(self.backend.balance(account).await?))
    }

    async fn deploy_roles(
        &self,
        run: &mut Run,
        book: &mut AddressBook,
    ) -> DeployResult<(Vec<(ContractRole, Address)>, Vec<(ContractRole, Address)>)> {
        let mut created = Vec::new();
        let mut reused = Vec::new();

        run.transcript.section("Deploy contracts")?;
        for role in ContractRole::ALL {
            if let Some(address) = book.resolve(role, run.chain_id) {
                info!(%role, %address, "reusing");
                run.transcript.subsection(&format!("Reusing existing {role}"))?;
                run.transcript.reused(role.name(), address)?;
                reused.push((role, address));
                continue;
            }

            let title = format!("Deploy {role}");
            run.transcript.subsection(&title)?;
            let address = match self.create(run, role, &title).await {
                Ok(address) => address,
                Err(e) => {
                    error!(%role, error = %e, "deployment failed");
                    run.transcript.failure(&title, &e.to_string())?;
                    return Err(e);
                }
            };

            book.assign(role, run.chain_id, address);
            created.push((role, address));
        }

        Ok((created, reused))
    }

    async fn create(
        &self,
        run: &mut Run,
        role: ContractRole,
        title: &str,
    ) -> DeployResult<Address> {
        let code = self.artifacts.creation_code(role)?;
        let tx = TxDescriptor::create(title, code);
        let receipt = submit_and_confirm(
            self.backend.as_ref(),
            run.deployer,
            &tx,
            self.config.inclusion_policy(),
        )
        .await
        .map_err(|source| DeployError::Transaction {
            title: title.to_string(),
            source,
        })?;

        let address = receipt
            .contract_address
            .filter(|a| !a.is_zero())
            .ok_or_else(|| DeployError::Transaction {
                title: title.to_string(),
                source: ChainError::MalformedReturn {
                    function: "eth_getTransactionReceipt",
                    reason: "creation receipt carries no contract address".to_string(),
                },
            })?;

        let balance = self.balance(run.deployer).await?;
        let delta = balance.delta_from(run.balance);
        run.balance = balance;

        info!(%role, %address, gas_used = receipt.gas_used, %delta, "deployed");
        run.transcript.success(title, &receipt)?;
        run.transcript
            .line(&format!("- **Address**: `{}`", address.to_checksum(None)))?;
        run.transcript.balance(balance, Some(delta))?;
        Ok(address)
    }

    async fn apply_edges(&self, run: &mut Run, book: &AddressBook) -> DeployResult<usize> {
        let client = ContractClient::new(Arc::clone(&self.backend), book.clone());
        let policy = self.config.inclusion_policy();
        let mut stage: Option<EdgeStage> = None;
        let mut applied = 0;

        run.transcript.section("Set contract references")?;
        for edge in &WIRING_EDGES {
            if stage != Some(edge.stage()) {
                stage = Some(edge.stage());
                info!(stage = edge.stage().title(), "wiring");
                run.transcript.subsection(edge.stage().title())?;
            }

            let label = edge.label();
            let outcome = self.wire(&client, run, edge.source, edge.action, &label, policy).await;
            match outcome {
                Ok(receipt) => {
                    info!(
                        %label,
                        hash = %receipt.hash,
                        gas_used = receipt.gas_used,
                        "edge applied"
                    );
                    run.transcript.success(&label, &receipt)?;
                    applied += 1;
                }
                Err(source) => {
                    error!(%label, error = %source, "edge failed, aborting wiring");
                    run.transcript.failure(&label, &source.to_string())?;
                    if applied > 0 {
                        warn!(applied, "edges applied before the failure stay applied");
                    }
                    return Err(DeployError::Transaction { title: label, source });
                }
            }
        }

        Ok(applied)
    }

    async fn wire(
        &self,
        client: &ContractClient,
        run: &Run,
        source: ContractRole,
        action: EdgeAction,
        label: &str,
        policy: InclusionPolicy,
    ) -> Result<TxReceipt, ChainError> {
        let handle = client.handle(source, run.chain_id)?;
        let tx = match action {
            EdgeAction::Reference { slot, target } => {
                let target = client.handle(target, run.chain_id)?.address;
                handle.set_reference(label, slot, target)
            }
            EdgeAction::AuthorizeMinter { minter } => {
                let minter = client.handle(minter, run.chain_id)?.address;
                handle.authorize_minter(label, minter)
            }
        };
        submit_and_confirm(self.backend.as_ref(), run.deployer, &tx, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedh_blockchain::SimulatedChain;

    #[tokio::test]
    async fn test_first_account_is_default_deployer() {
        let chain = SimulatedChain::new(41);
        let deployer = resolve_deployer(&chain, &DeployConfig::default()).await.unwrap();
        assert_eq!(Some(deployer), chain.account(0));
    }

    #[tokio::test]
    async fn test_configured_deployer_must_be_exposed() {
        let chain = SimulatedChain::new(41);
        let mut config = DeployConfig::default();
        config.deployer = Some(chain.account(2).unwrap().to_string());
        assert_eq!(
            resolve_deployer(&chain, &config).await.unwrap(),
            chain.account(2).unwrap()
        );

        config.deployer = Some(Address::with_last_byte(9).to_string());
        let err = resolve_deployer(&chain, &config).await.unwrap_err();
        assert!(matches!(err, DeployError::NoSigner { .. }));
    }

    #[tokio::test]
    async fn test_no_accounts_is_actionable() {
        let chain = SimulatedChain::without_accounts(41);
        let err = resolve_deployer(&chain, &DeployConfig::default()).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("no signer available"));
        assert!(message.contains("eth_accounts"));
        assert!(message.contains("working directory"));
    }

    #[tokio::test]
    async fn test_chain_mismatch() {
        let chain = SimulatedChain::new(41);
        let mut config = DeployConfig::default();
        config.chain_id = Some(40);
        let err = check_chain(&chain, &config).await.unwrap_err();
        assert!(matches!(err, DeployError::ChainMismatch { expected: 40, actual: 41 }));

        config.chain_id = None;
        assert_eq!(check_chain(&chain, &config).await.unwrap(), 41);
    }
}
