//! # Contract Client
//!
//! Binds roles to addresses on the active chain and exposes typed reads and
//! transaction descriptors over them. Handles are cached per
//! `(role, chain id)`; the cache is an optimisation, not a source of truth.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use parking_lot::Mutex;
use speedh_shared::{AddressBook, ContractRole, ReferenceSlot};
use tracing::debug;

use crate::backend::{ChainBackend, TxDescriptor};
use crate::contracts::{self, IFoalForge, ISpeedHContract};
use crate::decode::decode_pending_foal_bytes;
use crate::error::{ChainError, ChainResult};
use crate::foal::{FoalPricing, PendingFoal};

/// Which ABI a handle speaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractAbi {
    /// Wiring surface only.
    Wiring,
    /// Wiring surface plus the pending-foal lifecycle.
    FoalForge,
}

impl ContractAbi {
    /// ABI for `role`.
    #[must_use]
    pub const fn for_role(role: ContractRole) -> Self {
        match role {
            ContractRole::MinterFoalForge => Self::FoalForge,
            _ => Self::Wiring,
        }
    }
}

/// A role bound to its address on one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContractHandle {
    /// Bound role.
    pub role: ContractRole,
    /// Chain the address belongs to.
    pub chain_id: u64,
    /// Deployed address, never zero.
    pub address: Address,
    /// ABI the address speaks.
    pub abi: ContractAbi,
}

impl ContractHandle {
    /// Descriptor for calling `call` on this contract.
    #[must_use]
    pub fn describe<C: SolCall>(
        &self,
        label: impl Into<String>,
        call: &C,
        value: U256,
    ) -> TxDescriptor {
        TxDescriptor::call(label, self.address, C::SIGNATURE, call.abi_encode(), value)
    }

    /// `setContract<Slot>(target)`.
    #[must_use]
    pub fn set_reference(
        &self,
        label: impl Into<String>,
        slot: ReferenceSlot,
        target: Address,
    ) -> TxDescriptor {
        TxDescriptor::call(
            label,
            self.address,
            contracts::set_reference_signature(slot),
            contracts::set_reference_calldata(slot, target),
            U256::ZERO,
        )
    }

    /// `setContractMinter(minter, true)`.
    #[must_use]
    pub fn authorize_minter(&self, label: impl Into<String>, minter: Address) -> TxDescriptor {
        self.describe(
            label,
            &ISpeedHContract::setContractMinterCall {
                minter,
                enabled: true,
            },
            U256::ZERO,
        )
    }

    fn require_forge(&self) -> ChainResult<()> {
        if self.abi == ContractAbi::FoalForge {
            Ok(())
        } else {
            Err(ChainError::Configuration(format!(
                "{} does not expose the foal lifecycle",
                self.role
            )))
        }
    }

    /// `startHorseMint()` with the configured price.
    ///
    /// # Errors
    ///
    /// [`ChainError::Configuration`] if this is not the forge.
    pub fn start_mint(&self, pricing: &FoalPricing) -> ChainResult<TxDescriptor> {
        self.require_forge()?;
        Ok(self.describe(
            "Start horse mint",
            &IFoalForge::startHorseMintCall {},
            pricing.start_mint.to_u256(),
        ))
    }

    /// `randomizeHorse(keepImage, keepStats, keepShoes)` with the configured price.
    ///
    /// # Errors
    ///
    /// [`ChainError::Configuration`] if this is not the forge.
    pub fn randomize(
        &self,
        pricing: &FoalPricing,
        keep_image: bool,
        keep_stats: bool,
        keep_shoes: bool,
    ) -> ChainResult<TxDescriptor> {
        self.require_forge()?;
        Ok(self.describe(
            "Randomize horse",
            &IFoalForge::randomizeHorseCall {
                keepImage: keep_image,
                keepStats: keep_stats,
                keepShoes: keep_shoes,
            },
            pricing.randomize.to_u256(),
        ))
    }

    /// `buyExtraPoints()` with the configured price.
    ///
    /// # Errors
    ///
    /// [`ChainError::Configuration`] if this is not the forge.
    pub fn buy_extra_points(&self, pricing: &FoalPricing) -> ChainResult<TxDescriptor> {
        self.require_forge()?;
        Ok(self.describe(
            "Buy extra points",
            &IFoalForge::buyExtraPointsCall {},
            pricing.extra_points.to_u256(),
        ))
    }

    /// `claimHorse()`.
    ///
    /// # Errors
    ///
    /// [`ChainError::Configuration`] if this is not the forge.
    pub fn claim(&self) -> ChainResult<TxDescriptor> {
        self.require_forge()?;
        Ok(self.describe("Claim horse", &IFoalForge::claimHorseCall {}, U256::ZERO))
    }
}

/// Shared entry point for contract reads and transaction building.
pub struct ContractClient {
    backend: Arc<dyn ChainBackend>,
    book: AddressBook,
    handles: Mutex<HashMap<(ContractRole, u64), ContractHandle>>,
}

impl ContractClient {
    /// Creates a client over `backend` resolving addresses from `book`.
    #[must_use]
    pub fn new(backend: Arc<dyn ChainBackend>, book: AddressBook) -> Self {
        Self {
            backend,
            book,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Underlying backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn ChainBackend> {
        &self.backend
    }

    /// Address book in use.
    #[must_use]
    pub const fn book(&self) -> &AddressBook {
        &self.book
    }

    /// Handle for `role` on `chain_id`.
    ///
    /// # Errors
    ///
    /// [`ChainError::MissingAddress`] when the book has no non-zero address.
    pub fn handle(&self, role: ContractRole, chain_id: u64) -> ChainResult<ContractHandle> {
        let mut handles = self.handles.lock();
        if let Some(handle) = handles.get(&(role, chain_id)) {
            return Ok(*handle);
        }
        let address = self
            .book
            .resolve(role, chain_id)
            .ok_or(ChainError::MissingAddress { role, chain_id })?;
        let handle = ContractHandle {
            role,
            chain_id,
            address,
            abi: ContractAbi::for_role(role),
        };
        debug!(%role, chain_id, %address, "contract handle bound");
        handles.insert((role, chain_id), handle);
        Ok(handle)
    }

    /// Stored `contract<Slot>()` of `handle`.
    ///
    /// # Errors
    ///
    /// Network, revert or malformed-return errors.
    pub async fn read_reference(
        &self,
        handle: &ContractHandle,
        slot: ReferenceSlot,
    ) -> ChainResult<Address> {
        let raw = self
            .backend
            .call(handle.address, contracts::reference_accessor_calldata(slot).into())
            .await?;
        contracts::decode_address_return(&raw)
    }

    /// `isHorseMinter(minter)` of `handle`.
    ///
    /// # Errors
    ///
    /// Network, revert or malformed-return errors.
    pub async fn read_minter_flag(
        &self,
        handle: &ContractHandle,
        minter: Address,
    ) -> ChainResult<bool> {
        let data = ISpeedHContract::isHorseMinterCall { minter }.abi_encode();
        let raw = self.backend.call(handle.address, data.into()).await?;
        contracts::decode_bool_return(&raw)
    }

    /// `version()` of `handle`.
    ///
    /// # Errors
    ///
    /// Network, revert or malformed-return errors.
    pub async fn read_version(&self, handle: &ContractHandle) -> ChainResult<String> {
        let data = ISpeedHContract::versionCall {}.abi_encode();
        let raw = self.backend.call(handle.address, data.into()).await?;
        contracts::decode_string_return(&raw)
    }

    /// Pending foal of `owner` on the forge of `chain_id`.
    ///
    /// Decoding never fails; only resolution and transport errors surface.
    ///
    /// # Errors
    ///
    /// [`ChainError::MissingAddress`] if the forge is not deployed on
    /// `chain_id`, otherwise network or revert errors.
    pub async fn pending_foal(
        &self,
        chain_id: u64,
        owner: Address,
    ) -> ChainResult<Option<PendingFoal>> {
        let forge = self.handle(ContractRole::MinterFoalForge, chain_id)?;
        let data = IFoalForge::getPendingHorseCall { owner }.abi_encode();
        let raw = self.backend.call(forge.address, data.into()).await?;
        Ok(decode_pending_foal_bytes(&raw))
    }
}
