//! # Contract Definitions
//!
//! Solidity ABIs consumed by the deployment tooling and the runtime client.
//!
//! Every SpeedH contract exposes the wiring surface ([`ISpeedHContract`]):
//! `version()`, `setContractMinter`/`isHorseMinter` and one
//! `setContract<Slot>`/`contract<Slot>` pair per [`ReferenceSlot`]. The foal
//! forge additionally exposes the pending-foal lifecycle ([`IFoalForge`]).

// The sol! macro generates code that we can't document, so allow missing_docs
#![allow(missing_docs)]

use alloy_primitives::Address;
use alloy_sol_types::{sol, SolCall};
use speedh_shared::ReferenceSlot;

use crate::error::{ChainError, ChainResult};

sol! {
    /// Eight performance stats shared by horses and horseshoe bonuses.
    #[derive(Debug, PartialEq, Eq)]
    struct PerformanceStats {
        uint256 power;
        uint256 acceleration;
        uint256 stamina;
        uint256 minSpeed;
        uint256 maxSpeed;
        uint256 luck;
        uint256 curveBonus;
        uint256 straightBonus;
    }

    /// One horseshoe slot of a pending foal.
    #[derive(Debug, PartialEq, Eq)]
    struct HorseshoeData {
        uint256 imgCategory;
        uint256 imgNumber;
        PerformanceStats bonusStats;
    }

    /// Wiring surface shared by all twelve contracts.
    #[derive(Debug)]
    interface ISpeedHContract {
        function version() external view returns (string memory);

        function setContractMinter(address minter, bool enabled) external;
        function isHorseMinter(address minter) external view returns (bool);

        function setContractStats(address target) external;
        function contractStats() external view returns (address);
        function setContractFixtureManager(address target) external;
        function contractFixtureManager() external view returns (address);
        function setContractHayToken(address target) external;
        function contractHayToken() external view returns (address);
        function setContractNFTHorse(address target) external;
        function contractNFTHorse() external view returns (address);
        function setContractNFTHorseshoe(address target) external;
        function contractNFTHorseshoe() external view returns (address);
        function setContractStatsHorse(address target) external;
        function contractStatsHorse() external view returns (address);
        function setContractStatsHorseshoe(address target) external;
        function contractStatsHorseshoe() external view returns (address);
        function setContractMetadataHorse(address target) external;
        function contractMetadataHorse() external view returns (address);
        function setContractMetadataHorseshoe(address target) external;
        function contractMetadataHorseshoe() external view returns (address);
    }

    /// Pending-foal lifecycle on `SpeedH_Minter_FoalForge`.
    #[derive(Debug)]
    interface IFoalForge {
        function getPendingHorse(address owner) external view returns (
            uint256 imgCategory,
            uint256 imgNumber,
            PerformanceStats stats,
            uint256 totalPoints,
            uint8 extraPackagesBought,
            HorseshoeData[4] horseshoes
        );

        function startHorseMint() external payable;
        function randomizeHorse(bool keepImage, bool keepStats, bool keepShoes) external payable;
        function buyExtraPoints() external payable;
        function claimHorse() external;
    }
}

use ISpeedHContract as W;

/// Calldata for `setContract<Slot>(target)`.
#[must_use]
pub fn set_reference_calldata(slot: ReferenceSlot, target: Address) -> Vec<u8> {
    match slot {
        ReferenceSlot::Stats => W::setContractStatsCall { target }.abi_encode(),
        ReferenceSlot::FixtureManager => W::setContractFixtureManagerCall { target }.abi_encode(),
        ReferenceSlot::HayToken => W::setContractHayTokenCall { target }.abi_encode(),
        ReferenceSlot::NftHorse => W::setContractNFTHorseCall { target }.abi_encode(),
        ReferenceSlot::NftHorseshoe => W::setContractNFTHorseshoeCall { target }.abi_encode(),
        ReferenceSlot::StatsHorse => W::setContractStatsHorseCall { target }.abi_encode(),
        ReferenceSlot::StatsHorseshoe => W::setContractStatsHorseshoeCall { target }.abi_encode(),
        ReferenceSlot::MetadataHorse => W::setContractMetadataHorseCall { target }.abi_encode(),
        ReferenceSlot::MetadataHorseshoe => {
            W::setContractMetadataHorseshoeCall { target }.abi_encode()
        }
    }
}

/// Solidity signature of `setContract<Slot>(address)`.
#[must_use]
pub const fn set_reference_signature(slot: ReferenceSlot) -> &'static str {
    match slot {
        ReferenceSlot::Stats => W::setContractStatsCall::SIGNATURE,
        ReferenceSlot::FixtureManager => W::setContractFixtureManagerCall::SIGNATURE,
        ReferenceSlot::HayToken => W::setContractHayTokenCall::SIGNATURE,
        ReferenceSlot::NftHorse => W::setContractNFTHorseCall::SIGNATURE,
        ReferenceSlot::NftHorseshoe => W::setContractNFTHorseshoeCall::SIGNATURE,
        ReferenceSlot::StatsHorse => W::setContractStatsHorseCall::SIGNATURE,
        ReferenceSlot::StatsHorseshoe => W::setContractStatsHorseshoeCall::SIGNATURE,
        ReferenceSlot::MetadataHorse => W::setContractMetadataHorseCall::SIGNATURE,
        ReferenceSlot::MetadataHorseshoe => W::setContractMetadataHorseshoeCall::SIGNATURE,
    }
}

/// Calldata for the `contract<Slot>()` accessor.
#[must_use]
pub fn reference_accessor_calldata(slot: ReferenceSlot) -> Vec<u8> {
    match slot {
        ReferenceSlot::Stats => W::contractStatsCall {}.abi_encode(),
        ReferenceSlot::FixtureManager => W::contractFixtureManagerCall {}.abi_encode(),
        ReferenceSlot::HayToken => W::contractHayTokenCall {}.abi_encode(),
        ReferenceSlot::NftHorse => W::contractNFTHorseCall {}.abi_encode(),
        ReferenceSlot::NftHorseshoe => W::contractNFTHorseshoeCall {}.abi_encode(),
        ReferenceSlot::StatsHorse => W::contractStatsHorseCall {}.abi_encode(),
        ReferenceSlot::StatsHorseshoe => W::contractStatsHorseshoeCall {}.abi_encode(),
        ReferenceSlot::MetadataHorse => W::contractMetadataHorseCall {}.abi_encode(),
        ReferenceSlot::MetadataHorseshoe => W::contractMetadataHorseshoeCall {}.abi_encode(),
    }
}

/// `(slot, setter selector, accessor selector)` for every reference slot.
#[must_use]
pub fn reference_selectors() -> [(ReferenceSlot, [u8; 4], [u8; 4]); 9] {
    [
        (
            ReferenceSlot::Stats,
            W::setContractStatsCall::SELECTOR,
            W::contractStatsCall::SELECTOR,
        ),
        (
            ReferenceSlot::FixtureManager,
            W::setContractFixtureManagerCall::SELECTOR,
            W::contractFixtureManagerCall::SELECTOR,
        ),
        (
            ReferenceSlot::HayToken,
            W::setContractHayTokenCall::SELECTOR,
            W::contractHayTokenCall::SELECTOR,
        ),
        (
            ReferenceSlot::NftHorse,
            W::setContractNFTHorseCall::SELECTOR,
            W::contractNFTHorseCall::SELECTOR,
        ),
        (
            ReferenceSlot::NftHorseshoe,
            W::setContractNFTHorseshoeCall::SELECTOR,
            W::contractNFTHorseshoeCall::SELECTOR,
        ),
        (
            ReferenceSlot::StatsHorse,
            W::setContractStatsHorseCall::SELECTOR,
            W::contractStatsHorseCall::SELECTOR,
        ),
        (
            ReferenceSlot::StatsHorseshoe,
            W::setContractStatsHorseshoeCall::SELECTOR,
            W::contractStatsHorseshoeCall::SELECTOR,
        ),
        (
            ReferenceSlot::MetadataHorse,
            W::setContractMetadataHorseCall::SELECTOR,
            W::contractMetadataHorseCall::SELECTOR,
        ),
        (
            ReferenceSlot::MetadataHorseshoe,
            W::setContractMetadataHorseshoeCall::SELECTOR,
            W::contractMetadataHorseshoeCall::SELECTOR,
        ),
    ]
}

/// Decodes the single-address return of any `contract<Slot>()` accessor.
///
/// # Errors
///
/// Returns [`ChainError::MalformedReturn`] if `data` is not one ABI word.
pub fn decode_address_return(data: &[u8]) -> ChainResult<Address> {
    W::contractStatsCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| ChainError::MalformedReturn {
            function: "contract<Slot>()",
            reason: e.to_string(),
        })
}

/// Decodes the boolean return of `isHorseMinter(address)`.
///
/// # Errors
///
/// Returns [`ChainError::MalformedReturn`] on bad data.
pub fn decode_bool_return(data: &[u8]) -> ChainResult<bool> {
    W::isHorseMinterCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| ChainError::MalformedReturn {
            function: W::isHorseMinterCall::SIGNATURE,
            reason: e.to_string(),
        })
}

/// Decodes the string return of `version()`.
///
/// # Errors
///
/// Returns [`ChainError::MalformedReturn`] on bad data.
pub fn decode_string_return(data: &[u8]) -> ChainResult<String> {
    W::versionCall::abi_decode_returns(data, true)
        .map(|ret| ret._0)
        .map_err(|e| ChainError::MalformedReturn {
            function: W::versionCall::SIGNATURE,
            reason: e.to_string(),
        })
}
