//! # SpeedH Blockchain
//!
//! Contract client and player-facing transaction layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌───────────────────┐     ┌─────────────────┐
//! │ TransactionPipeline  │────►│  ContractClient   │────►│  ChainBackend   │
//! │ (start/randomize/    │     │  (handles, typed  │     │  (JSON-RPC or   │
//! │  extra/claim)        │     │   reads, decode)  │     │   simulated)    │
//! └──────────┬───────────┘     └───────────────────┘     └─────────────────┘
//!            │ refresh
//!            ▼
//! ┌──────────────────────┐
//! │   FoalStateStore     │  one FoalSlot per Session, subscribers notified
//! └──────────────────────┘  on every publish
//! ```
//!
//! ## Guarantees
//!
//! - Decoding a pending foal never fails; bad leaves become 0
//! - Reading the cache never touches the network
//! - Sessions never share cached state

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod client;
pub mod contracts;
pub mod decode;
pub mod error;
pub mod foal;
pub mod pipeline;
pub mod session;

pub use backend::{
    submit_and_confirm, wait_for_inclusion, ChainBackend, InclusionPolicy, JsonRpcBackend,
    SimulatedChain, TxDescriptor, TxHash, TxReceipt,
};
pub use client::{ContractAbi, ContractClient, ContractHandle};
pub use decode::{decode_pending_foal, decode_pending_foal_bytes, to_number, RawValue};
pub use error::{ChainError, ChainResult};
pub use foal::{
    FoalPhase, FoalPricing, FoalSlot, FoalSnapshot, FoalStateStore, FoalSubscription, Horseshoe,
    ListenerId, PendingFoal, PerformanceStats,
};
pub use pipeline::{
    FoalAction, FoalOutcome, PipelineError, PipelineResult, RandomizeOptions, TransactionPipeline,
    TransactionRecord,
};
pub use session::{BackendSigner, Session, SessionSigner, SessionStorage, Submission};
