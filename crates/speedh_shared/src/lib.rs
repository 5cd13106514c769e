//! # SpeedH Shared
//!
//! The vocabulary of the SpeedH contract graph, shared by the deployment
//! tooling and the runtime client.
//!
//! ## Contents
//!
//! - [`ContractRole`]: the twelve fixed contracts of the game economy
//! - [`DeploymentEdge`]: the "role A stores the address of role B" calls
//! - [`AddressBook`]: persisted `role -> chain id -> address` mapping
//! - [`NativeAmount`]: 18-decimal native currency amounts for logs and pricing
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on an async runtime or a network client.
//! Anything that talks to a node belongs in `speedh_blockchain`.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod address_book;
pub mod amount;
pub mod constants;
pub mod edges;
pub mod error;
pub mod roles;

pub use address_book::AddressBook;
pub use amount::{BalanceDelta, NativeAmount};
pub use constants::{VERSION_SUFFIX, ZERO_ADDRESS};
pub use edges::{edges_for, DeploymentEdge, EdgeAction, EdgeStage, WIRING_EDGES};
pub use error::{BookError, BookResult};
pub use roles::{ContractRole, ReferenceSlot};
