//! End-to-end pending-foal lifecycle against the simulated chain.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use futures::future::{self, FutureExt};
use speedh_blockchain::contracts::IFoalForge;
use speedh_blockchain::{
    submit_and_confirm, wait_for_inclusion, BackendSigner, ChainBackend, ChainError, ChainResult,
    ContractClient, FoalAction, FoalPhase, FoalPricing, InclusionPolicy, PipelineError,
    RandomizeOptions, Session, SessionSigner, SimulatedChain, Submission, TransactionPipeline,
    TxDescriptor,
};
use speedh_shared::{AddressBook, ContractRole, NativeAmount};
use tokio::sync::oneshot;

const CHAIN_ID: u64 = 41;

struct Fixture {
    chain: Arc<SimulatedChain>,
    forge: Address,
    pipeline: TransactionPipeline,
}

async fn fixture() -> Fixture {
    let chain = Arc::new(SimulatedChain::new(CHAIN_ID));
    let deployer = chain.account(0).unwrap();
    let tx = TxDescriptor::create(
        "deploy forge",
        SimulatedChain::creation_code(ContractRole::MinterFoalForge),
    );
    let forge = submit_and_confirm(chain.as_ref(), deployer, &tx, InclusionPolicy::default())
        .await
        .unwrap()
        .contract_address
        .unwrap();

    let mut book = AddressBook::new();
    book.assign(ContractRole::MinterFoalForge, CHAIN_ID, forge);
    let backend: Arc<dyn ChainBackend> = chain.clone();
    let client = Arc::new(ContractClient::new(backend, book));
    let pipeline = TransactionPipeline::new(client).with_policy(fast_policy());
    Fixture {
        chain,
        forge,
        pipeline,
    }
}

fn fast_policy() -> InclusionPolicy {
    InclusionPolicy {
        timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(5),
    }
}

fn player_session(fx: &Fixture, index: usize) -> Session {
    let backend: Arc<dyn ChainBackend> = fx.chain.clone();
    Session::new(
        CHAIN_ID,
        fx.chain.account(index),
        Arc::new(BackendSigner::new(backend)),
    )
}

struct RejectingSigner;

#[async_trait]
impl SessionSigner for RejectingSigner {
    async fn sign_and_submit(&self, _from: Address, _tx: &TxDescriptor) -> ChainResult<Submission> {
        Err(ChainError::Rejected("user rejected the request".to_string()))
    }
}

/// Wallet that reports completion through a one-shot channel.
struct NotifyingSigner {
    chain: Arc<SimulatedChain>,
}

#[async_trait]
impl SessionSigner for NotifyingSigner {
    async fn sign_and_submit(&self, from: Address, tx: &TxDescriptor) -> ChainResult<Submission> {
        let hash = self.chain.send_transaction(from, tx).await?;
        let receipt = wait_for_inclusion(self.chain.as_ref(), hash, fast_policy()).await;
        let (sender, completion) = oneshot::channel();
        let _ = sender.send(receipt);
        Ok(Submission::Notify { hash, completion })
    }
}

/// Wallet that hands back a future resolving on inclusion.
struct FutureSigner {
    chain: Arc<SimulatedChain>,
    stalled: bool,
}

#[async_trait]
impl SessionSigner for FutureSigner {
    async fn sign_and_submit(&self, from: Address, tx: &TxDescriptor) -> ChainResult<Submission> {
        let hash = self.chain.send_transaction(from, tx).await?;
        let completion = if self.stalled {
            future::pending().boxed()
        } else {
            let chain = self.chain.clone();
            async move { wait_for_inclusion(chain.as_ref(), hash, fast_policy()).await }.boxed()
        };
        Ok(Submission::Future { hash, completion })
    }
}

fn future_session(fx: &Fixture, stalled: bool) -> Session {
    let signer = FutureSigner {
        chain: fx.chain.clone(),
        stalled,
    };
    Session::new(CHAIN_ID, fx.chain.account(1), Arc::new(signer))
}

#[tokio::test]
async fn test_start_mint_publishes_pending_foal() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    let owner = session.address().unwrap();
    let before = fx.chain.balance(owner).await.unwrap();

    let outcome = fx.pipeline.start_mint(&session).await.unwrap();

    let foal = outcome.foal.expect("mint should leave a pending foal");
    assert_eq!(foal.total_points, 120);
    assert!(foal.horseshoes.len() <= 4);
    assert_eq!(fx.pipeline.current(&session), Some(foal));
    assert_eq!(fx.pipeline.phase(&session), FoalPhase::Pending);
    assert_eq!(outcome.transaction.action, FoalAction::StartMint);

    let spent = before - fx.chain.balance(owner).await.unwrap();
    assert!(spent > NativeAmount::from_whole(600).to_u256());
}

#[tokio::test]
async fn test_randomize_without_foal_starts_mint() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);

    let outcome = fx
        .pipeline
        .randomize(&session, RandomizeOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.transaction.action, FoalAction::StartMint);
    assert!(outcome.foal.is_some());
}

#[tokio::test]
async fn test_randomize_keeping_everything_changes_nothing() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    let minted = fx.pipeline.start_mint(&session).await.unwrap().foal;

    let keep_all = RandomizeOptions {
        keep_image: true,
        keep_stats: true,
        keep_shoes: true,
    };
    let outcome = fx.pipeline.randomize(&session, keep_all).await.unwrap();

    assert_eq!(outcome.transaction.action, FoalAction::Randomize(keep_all));
    assert_eq!(outcome.foal, minted);
}

#[tokio::test]
async fn test_extra_points_increase_total() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    fx.pipeline.start_mint(&session).await.unwrap();

    let foal = fx.pipeline.buy_extra_points(&session).await.unwrap().foal.unwrap();

    assert_eq!(foal.extra_packages_bought, 1);
    assert!(foal.total_points > 120);
}

#[tokio::test]
async fn test_claim_then_refresh_is_absent() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    let minted = fx.pipeline.start_mint(&session).await.unwrap().foal;

    let outcome = fx.pipeline.claim(&session).await.unwrap();

    assert_eq!(outcome.foal, minted);
    assert!(fx.pipeline.current(&session).is_none());
    assert!(fx.pipeline.refresh(&session).await.is_none());
    assert_eq!(fx.pipeline.phase(&session), FoalPhase::Absent);
    assert_eq!(
        fx.chain.claimed_horses(fx.forge, session.address().unwrap()),
        1
    );
}

#[tokio::test]
async fn test_claim_from_fresh_session_returns_chain_foal() {
    let fx = fixture().await;
    let minter = player_session(&fx, 1);
    let minted = fx.pipeline.start_mint(&minter).await.unwrap().foal;
    assert!(minted.is_some());

    // Same account, nothing cached yet.
    let claimer = player_session(&fx, 1);
    assert!(fx.pipeline.current(&claimer).is_none());

    let outcome = fx.pipeline.claim(&claimer).await.unwrap();

    assert_eq!(outcome.foal, minted);
    assert!(fx.pipeline.current(&claimer).is_none());
    assert_eq!(fx.chain.claimed_horses(fx.forge, claimer.address().unwrap()), 1);
}

#[tokio::test]
async fn test_rejection_leaves_cache_untouched() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    fx.pipeline.start_mint(&session).await.unwrap();
    let cached = fx.pipeline.current(&session);
    let submissions = fx.chain.submission_count();

    // Same account, but the wallet now refuses.
    let refusing = Session::new(CHAIN_ID, session.address(), Arc::new(RejectingSigner));
    let err = fx.pipeline.claim(&refusing).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Failed {
            action: FoalAction::Claim,
            source: ChainError::Rejected(_)
        }
    ));
    assert_eq!(fx.chain.submission_count(), submissions);
    assert_eq!(fx.pipeline.current(&session), cached);
    assert_eq!(fx.pipeline.phase(&refusing), FoalPhase::Absent);
}

#[tokio::test]
async fn test_rejection_restores_pending_phase() {
    let fx = fixture().await;
    let backend: Arc<dyn ChainBackend> = fx.chain.clone();
    let owner = fx.chain.account(1);
    let session = Session::new(CHAIN_ID, owner, Arc::new(BackendSigner::new(backend)));
    fx.pipeline.start_mint(&session).await.unwrap();
    let cached = fx.pipeline.current(&session);

    // Second session for the same account, with a wallet that refuses.
    let refusing = Session::new(CHAIN_ID, owner, Arc::new(RejectingSigner));
    fx.pipeline.refresh(&refusing).await;
    assert_eq!(fx.pipeline.current(&refusing), cached);

    let err = fx.pipeline.buy_extra_points(&refusing).await.unwrap_err();
    assert!(err.to_string().starts_with("Buy extra points"));
    assert_eq!(fx.pipeline.current(&refusing), cached);
    assert_eq!(fx.pipeline.phase(&refusing), FoalPhase::Pending);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let fx = fixture().await;
    let alice = player_session(&fx, 1);
    let bob = player_session(&fx, 2);

    fx.pipeline.start_mint(&alice).await.unwrap();

    assert!(fx.pipeline.current(&alice).is_some());
    assert!(fx.pipeline.current(&bob).is_none());
    assert!(fx.pipeline.refresh(&bob).await.is_none());
    assert!(fx.pipeline.current(&alice).is_some());
}

#[tokio::test]
async fn test_no_account_publishes_absent_without_network() {
    let fx = fixture().await;
    let backend: Arc<dyn ChainBackend> = fx.chain.clone();
    let session = Session::new(CHAIN_ID, None, Arc::new(BackendSigner::new(backend)));
    let submissions = fx.chain.submission_count();

    let err = fx.pipeline.start_mint(&session).await.unwrap_err();

    assert_eq!(
        err,
        PipelineError::NoAccount {
            action: FoalAction::StartMint
        }
    );
    assert!(fx.pipeline.refresh(&session).await.is_none());
    assert_eq!(fx.pipeline.phase(&session), FoalPhase::Absent);
    assert_eq!(fx.chain.submission_count(), submissions);
}

#[tokio::test]
async fn test_wrong_price_reverts_and_refreshes() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    let cheap = FoalPricing {
        start_mint: NativeAmount::from_whole(1),
        ..FoalPricing::default()
    };
    let pipeline = fx.pipeline.clone().with_pricing(cheap);

    let err = pipeline.start_mint(&session).await.unwrap_err();

    assert!(matches!(
        err.chain_error(),
        Some(ChainError::Revert { .. })
    ));
    assert!(pipeline.current(&session).is_none());
    assert_eq!(pipeline.phase(&session), FoalPhase::Absent);
}

#[tokio::test]
async fn test_inclusion_timeout_is_surfaced() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    fx.chain.set_inclusion_delay(u32::MAX);
    let pipeline = fx.pipeline.clone().with_policy(InclusionPolicy {
        timeout: Duration::from_millis(30),
        poll_interval: Duration::from_millis(5),
    });

    let err = pipeline.start_mint(&session).await.unwrap_err();

    assert!(matches!(
        err.chain_error(),
        Some(ChainError::InclusionTimeout { .. })
    ));
    // The refresh still ran: the simulator applies state at submission.
    assert!(pipeline.current(&session).is_some());
    assert!(!pipeline.phase(&session).is_busy());
}

#[tokio::test]
async fn test_failed_refresh_downgrades_to_absent() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    fx.pipeline.start_mint(&session).await.unwrap();

    fx.chain.fail_selector(IFoalForge::getPendingHorseCall::SELECTOR);
    assert!(fx.pipeline.refresh(&session).await.is_none());
    assert_eq!(fx.pipeline.phase(&session), FoalPhase::Absent);

    fx.chain.clear_failures();
    assert!(fx.pipeline.refresh(&session).await.is_some());
}

#[tokio::test]
async fn test_watch_replays_then_refreshes() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    fx.pipeline.start_mint(&session).await.unwrap();

    // Fresh session for the same account: empty cache, live chain state.
    let observer = player_session(&fx, 1);
    let subscription = fx.pipeline.watch(&observer).await;

    let first = subscription.receiver().try_recv().unwrap();
    assert!(first.foal.is_none());
    let last = subscription.latest().unwrap();
    assert_eq!(last.phase, FoalPhase::Pending);
    assert!(last.revision > first.revision);
}

#[tokio::test]
async fn test_subscribers_see_transaction_phases() {
    let fx = fixture().await;
    let session = player_session(&fx, 1);
    let subscription = fx.pipeline.store().slot(&session).subscribe();

    fx.pipeline.start_mint(&session).await.unwrap();

    let phases: Vec<FoalPhase> = subscription
        .receiver()
        .try_iter()
        .map(|snapshot| snapshot.phase)
        .collect();
    assert_eq!(
        phases,
        vec![
            FoalPhase::Absent,
            FoalPhase::Submitting,
            FoalPhase::Confirming,
            FoalPhase::Pending
        ]
    );
}

#[tokio::test]
async fn test_notify_submission_is_awaited() {
    let fx = fixture().await;
    let session = Session::new(
        CHAIN_ID,
        fx.chain.account(1),
        Arc::new(NotifyingSigner {
            chain: fx.chain.clone(),
        }),
    );

    let outcome = fx.pipeline.start_mint(&session).await.unwrap();

    assert!(outcome.foal.is_some());
    assert!(outcome.transaction.gas_used > 0);
}

#[tokio::test]
async fn test_future_submission_is_awaited() {
    let fx = fixture().await;
    let session = future_session(&fx, false);

    let outcome = fx.pipeline.start_mint(&session).await.unwrap();

    assert!(outcome.foal.is_some());
    assert!(outcome.transaction.gas_used > 0);
    assert_eq!(fx.pipeline.phase(&session), FoalPhase::Pending);
}

#[tokio::test]
async fn test_stalled_future_submission_times_out() {
    let fx = fixture().await;
    let session = future_session(&fx, true);

    let err = fx.pipeline.start_mint(&session).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Failed {
            action: FoalAction::StartMint,
            source: ChainError::InclusionTimeout { waited, .. },
        } if waited == fast_policy().timeout
    ));
    assert!(fx.pipeline.current(&session).is_some());
    assert!(!fx.pipeline.phase(&session).is_busy());
}

#[tokio::test]
async fn test_missing_forge_is_configuration_error() {
    let chain = Arc::new(SimulatedChain::new(CHAIN_ID));
    let backend: Arc<dyn ChainBackend> = chain.clone();
    let client = Arc::new(ContractClient::new(backend.clone(), AddressBook::new()));
    let pipeline = TransactionPipeline::new(client);
    let session = Session::new(CHAIN_ID, chain.account(1), Arc::new(BackendSigner::new(backend)));

    let err = pipeline.start_mint(&session).await.unwrap_err();

    assert!(err.chain_error().is_some_and(ChainError::is_configuration));
    assert!(err.to_string().contains("SpeedH_Minter_FoalForge"));
    assert_eq!(chain.submission_count(), 0);
    assert_eq!(chain.creation_count(), 0);
}
