//! # SpeedH Deploy
//!
//! Ops tooling for the SpeedH contract graph.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐
//! │ DeployConfig │──►│ Orchestrator │──►│ addresses.toml       │
//! └──────────────┘   │ deploy, wire │   │ addresses.<net>.json │
//!                    └──────┬───────┘   │ deployment_*.md      │
//!                           │           └──────────┬───────────┘
//!                           ▼                      ▼
//!                    ┌──────────────┐   ┌──────────────────────┐
//!                    │ ChainBackend │◄──│ VerificationProbe    │
//!                    └──────────────┘   └──────────────────────┘
//! ```
//!
//! Everything runs strictly in sequence: one role, one edge, one check at a
//! time, all signed by a single deployer account.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod probe;
pub mod transcript;

pub use artifacts::{ArtifactSource, HardhatArtifacts, SimulatedArtifacts};
pub use config::{DeployConfig, InclusionConfig, NetworkProfile, PathsConfig};
pub use error::{DeployError, DeployResult, NO_SIGNER_HELP};
pub use orchestrator::{check_chain, resolve_deployer, DeploymentReport, Orchestrator};
pub use probe::{CheckRecord, VerificationProbe};
pub use transcript::Transcript;
