//! # Foal Transaction Pipeline
//!
//! Runs the four forge actions for a session:
//!
//! 1. Build the call with the configured price
//! 2. Have the session's signer submit it
//! 3. Wait for inclusion, bounded by an [`InclusionPolicy`]
//! 4. Refresh the session's pending-foal slot, whatever happened in 3
//!
//! A signer rejection stops at step 2 and leaves the cached value untouched.
//! Operations of one session are serialized; different sessions run freely.

use std::future::Future;
use std::sync::Arc;

use alloy_primitives::Address;
use speedh_shared::ContractRole;
use thiserror::Error;
use tracing::{info, warn};

use crate::backend::{wait_for_inclusion, InclusionPolicy, TxHash, TxReceipt};
use crate::client::ContractClient;
use crate::error::{ChainError, ChainResult};
use crate::foal::{FoalPhase, FoalPricing, FoalStateStore, FoalSubscription, PendingFoal};
use crate::session::{Session, Submission};

/// Which parts of the foal `randomizeHorse` keeps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RandomizeOptions {
    /// Keep the image.
    pub keep_image: bool,
    /// Keep the stats.
    pub keep_stats: bool,
    /// Keep the horseshoes.
    pub keep_shoes: bool,
}

/// A mutating forge action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FoalAction {
    /// `startHorseMint()`.
    StartMint,
    /// `randomizeHorse(..)`.
    Randomize(RandomizeOptions),
    /// `buyExtraPoints()`.
    BuyExtraPoints,
    /// `claimHorse()`.
    Claim,
}

impl FoalAction {
    /// Label used in errors and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::StartMint => "Start horse mint",
            Self::Randomize(_) => "Randomize horse",
            Self::BuyExtraPoints => "Buy extra points",
            Self::Claim => "Claim horse",
        }
    }
}

/// Receipt summary of a completed action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    /// Action that was run.
    pub action: FoalAction,
    /// Transaction hash.
    pub hash: TxHash,
    /// Gas consumed.
    pub gas_used: u64,
    /// Including block, when known.
    pub block_number: Option<u64>,
}

/// Result of a successful action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FoalOutcome {
    /// Refreshed foal; for a claim, the foal as it was before claiming.
    pub foal: Option<PendingFoal>,
    /// The included transaction.
    pub transaction: TransactionRecord,
}

/// Failure of a pipeline action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The session has no bound account.
    #[error("{}: no account is bound to the session", .action.label())]
    NoAccount {
        /// Attempted action.
        action: FoalAction,
    },

    /// Resolution, signing, inclusion or execution failed.
    #[error("{}: {source}", .action.label())]
    Failed {
        /// Attempted action.
        action: FoalAction,
        /// Cause.
        #[source]
        source: ChainError,
    },
}

impl PipelineError {
    /// Attempted action.
    #[must_use]
    pub const fn action(&self) -> FoalAction {
        match self {
            Self::NoAccount { action } | Self::Failed { action, .. } => *action,
        }
    }

    /// Underlying chain error, if any.
    #[must_use]
    pub const fn chain_error(&self) -> Option<&ChainError> {
        match self {
            Self::NoAccount { .. } => None,
            Self::Failed { source, .. } => Some(source),
        }
    }
}

/// Result type for pipeline actions.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Orchestrates forge transactions and the per-session foal cache.
#[derive(Clone)]
pub struct TransactionPipeline {
    store: FoalStateStore,
    pricing: FoalPricing,
    policy: InclusionPolicy,
}

impl TransactionPipeline {
    /// Pipeline with default prices and inclusion policy.
    #[must_use]
    pub fn new(client: Arc<ContractClient>) -> Self {
        Self {
            store: FoalStateStore::new(client),
            pricing: FoalPricing::default(),
            policy: InclusionPolicy::default(),
        }
    }

    /// Overrides the prices attached to paid actions.
    #[must_use]
    pub const fn with_pricing(mut self, pricing: FoalPricing) -> Self {
        self.pricing = pricing;
        self
    }

    /// Overrides the inclusion wait.
    #[must_use]
    pub const fn with_policy(mut self, policy: InclusionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cache store.
    #[must_use]
    pub const fn store(&self) -> &FoalStateStore {
        &self.store
    }

    /// Prices in use.
    #[must_use]
    pub const fn pricing(&self) -> &FoalPricing {
        &self.pricing
    }

    /// Cached foal. Never touches the network.
    #[must_use]
    pub fn current(&self, session: &Session) -> Option<PendingFoal> {
        self.store.current(session)
    }

    /// Phase of the session's slot.
    #[must_use]
    pub fn phase(&self, session: &Session) -> FoalPhase {
        self.store.slot(session).phase()
    }

    /// Re-reads and publishes the session's pending foal.
    pub async fn refresh(&self, session: &Session) -> Option<PendingFoal> {
        self.store.refresh(session).await
    }

    /// Subscribes to the session's slot and refreshes it.
    pub async fn watch(&self, session: &Session) -> FoalSubscription {
        self.store.watch(session).await
    }

    /// Starts a new pending foal.
    ///
    /// # Errors
    ///
    /// See [`PipelineError`].
    pub async fn start_mint(&self, session: &Session) -> PipelineResult<FoalOutcome> {
        self.execute(session, FoalAction::StartMint).await
    }

    /// Re-rolls the pending foal, or starts one if the cache holds none.
    ///
    /// # Errors
    ///
    /// See [`PipelineError`].
    pub async fn randomize(
        &self,
        session: &Session,
        options: RandomizeOptions,
    ) -> PipelineResult<FoalOutcome> {
        if session.address().is_some() && self.current(session).is_none() {
            info!("no cached foal, starting a mint instead of randomizing");
            return self.execute(session, FoalAction::StartMint).await;
        }
        self.execute(session, FoalAction::Randomize(options)).await
    }

    /// Buys an extra-points package for the pending foal.
    ///
    /// # Errors
    ///
    /// See [`PipelineError`].
    pub async fn buy_extra_points(&self, session: &Session) -> PipelineResult<FoalOutcome> {
        self.execute(session, FoalAction::BuyExtraPoints).await
    }

    /// Claims the pending foal. The outcome carries the foal as it stood before
    /// the claim, read from the chain when the session has no cached value;
    /// the slot itself is refreshed (normally to `None`).
    ///
    /// # Errors
    ///
    /// See [`PipelineError`].
    pub async fn claim(&self, session: &Session) -> PipelineResult<FoalOutcome> {
        self.execute(session, FoalAction::Claim).await
    }

    async fn execute(&self, session: &Session, action: FoalAction) -> PipelineResult<FoalOutcome> {
        let failed = |source: ChainError| PipelineError::Failed { action, source };
        let slot = self.store.slot(session);

        let Some(owner) = session.address() else {
            slot.publish(None);
            return Err(PipelineError::NoAccount { action });
        };

        let _operation = slot.begin_operation().await;
        let forge = self
            .store
            .client()
            .handle(ContractRole::MinterFoalForge, session.chain_id())
            .map_err(failed)?;
        let tx = match action {
            FoalAction::StartMint => forge.start_mint(&self.pricing),
            FoalAction::Randomize(o) => {
                forge.randomize(&self.pricing, o.keep_image, o.keep_stats, o.keep_shoes)
            }
            FoalAction::BuyExtraPoints => forge.buy_extra_points(&self.pricing),
            FoalAction::Claim => forge.claim(),
        }
        .map_err(failed)?;

        let before = match (action, slot.value()) {
            (FoalAction::Claim, None) => self.chain_snapshot(session, owner).await,
            (_, cached) => cached,
        };
        slot.enter(FoalPhase::Submitting);
        let submission = match session.signer().sign_and_submit(owner, &tx).await {
            Ok(submission) => submission,
            Err(error) => {
                slot.settle();
                warn!(action = action.label(), %owner, %error, "signer refused");
                return Err(failed(error));
            }
        };

        let hash = submission.hash();
        slot.enter(FoalPhase::Confirming);
        info!(action = action.label(), %owner, %hash, "submitted");

        let inclusion = self
            .await_inclusion(submission)
            .await
            .and_then(TxReceipt::ensure_success);
        let refreshed = self.store.refresh(session).await;

        let receipt = inclusion.map_err(|error| {
            warn!(action = action.label(), %hash, %error, "transaction failed");
            failed(error)
        })?;
        info!(action = action.label(), %hash, gas_used = receipt.gas_used, "included");

        let foal = if action == FoalAction::Claim {
            before
        } else {
            refreshed
        };
        Ok(FoalOutcome {
            foal,
            transaction: TransactionRecord {
                action,
                hash,
                gas_used: receipt.gas_used,
                block_number: receipt.block_number,
            },
        })
    }

    /// On-chain pending foal for a session whose cache was never filled.
    async fn chain_snapshot(&self, session: &Session, owner: Address) -> Option<PendingFoal> {
        match self.store.client().pending_foal(session.chain_id(), owner).await {
            Ok(foal) => foal,
            Err(error) => {
                warn!(%owner, %error, "claim snapshot read failed");
                None
            }
        }
    }

    async fn await_inclusion(&self, submission: Submission) -> ChainResult<TxReceipt> {
        match submission {
            Submission::Hash(hash) => {
                let backend = self.store.client().backend();
                wait_for_inclusion(backend.as_ref(), hash, self.policy).await
            }
            Submission::Future { hash, completion } => {
                bounded(hash, self.policy, completion).await
            }
            Submission::Notify { hash, completion } => {
                let notified = async move {
                    completion.await.unwrap_or_else(|_| {
                        Err(ChainError::Network(
                            "wallet dropped the completion channel".to_string(),
                        ))
                    })
                };
                bounded(hash, self.policy, notified).await
            }
        }
    }
}

async fn bounded<F>(hash: TxHash, policy: InclusionPolicy, completion: F) -> ChainResult<TxReceipt>
where
    F: Future<Output = ChainResult<TxReceipt>>,
{
    tokio::time::timeout(policy.timeout, completion)
        .await
        .map_err(|_| ChainError::InclusionTimeout {
            hash,
            waited: policy.timeout,
        })?
}
