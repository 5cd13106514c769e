//! # Contract Roles
//!
//! The twelve logical contracts of the SpeedH economy. The set is static and
//! known at build time; the declaration order below is the deployment order,
//! the address book order and the address dump order.

use std::fmt;
use std::str::FromStr;

use crate::constants::VERSION_SUFFIX;
use crate::error::BookError;

/// One of the twelve fixed contracts composing the on-chain system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContractRole {
    /// Race fixtures and prize distribution.
    FixtureManager,
    /// The fungible HAY token.
    HayToken,
    /// Token metadata for horse NFTs.
    MetadataHorse,
    /// Token metadata for horseshoe NFTs.
    MetadataHorseshoe,
    /// Forges horseshoes from HAY.
    MinterAnvilAlchemy,
    /// Breeds pending foals and mints them as horses.
    MinterFoalForge,
    /// Redeems iron for horseshoes.
    MinterIronRedemption,
    /// Horse NFT collection.
    NftHorse,
    /// Horseshoe NFT collection.
    NftHorseshoe,
    /// Horse stats submodule.
    StatsHorse,
    /// Horseshoe stats submodule.
    StatsHorseshoe,
    /// The hub every other contract reports to.
    Stats,
}

impl ContractRole {
    /// All roles in declaration order.
    pub const ALL: [Self; 12] = [
        Self::FixtureManager,
        Self::HayToken,
        Self::MetadataHorse,
        Self::MetadataHorseshoe,
        Self::MinterAnvilAlchemy,
        Self::MinterFoalForge,
        Self::MinterIronRedemption,
        Self::NftHorse,
        Self::NftHorseshoe,
        Self::StatsHorse,
        Self::StatsHorseshoe,
        Self::Stats,
    ];

    /// The hub stats contract.
    pub const HUB: Self = Self::Stats;

    /// The three minters, in the order they are authorized.
    pub const MINTERS: [Self; 3] = [
        Self::MinterAnvilAlchemy,
        Self::MinterFoalForge,
        Self::MinterIronRedemption,
    ];

    /// Contract name as compiled and as stored in the address book.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FixtureManager => "SpeedH_FixtureManager",
            Self::HayToken => "SpeedH_HayToken",
            Self::MetadataHorse => "SpeedH_Metadata_Horse",
            Self::MetadataHorseshoe => "SpeedH_Metadata_Horseshoe",
            Self::MinterAnvilAlchemy => "SpeedH_Minter_AnvilAlchemy",
            Self::MinterFoalForge => "SpeedH_Minter_FoalForge",
            Self::MinterIronRedemption => "SpeedH_Minter_IronRedemption",
            Self::NftHorse => "SpeedH_NFT_Horse",
            Self::NftHorseshoe => "SpeedH_NFT_Horseshoe",
            Self::StatsHorse => "SpeedH_Stats_Horse",
            Self::StatsHorseshoe => "SpeedH_Stats_Horseshoe",
            Self::Stats => "SpeedH_Stats",
        }
    }

    /// Short name used inside edge labels, e.g. `AnvilAlchemy` or `NFT_Horse`.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::FixtureManager => "FixtureManager",
            Self::HayToken => "HayToken",
            Self::MetadataHorse => "Metadata_Horse",
            Self::MetadataHorseshoe => "Metadata_Horseshoe",
            Self::MinterAnvilAlchemy => "AnvilAlchemy",
            Self::MinterFoalForge => "FoalForge",
            Self::MinterIronRedemption => "IronRedemption",
            Self::NftHorse => "NFT_Horse",
            Self::NftHorseshoe => "NFT_Horseshoe",
            Self::StatsHorse => "Stats_Horse",
            Self::StatsHorseshoe => "Stats_Horseshoe",
            Self::Stats => "Stats",
        }
    }

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks a role up by its contract name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.name() == name)
    }

    /// Whether this role is one of the three minters.
    #[must_use]
    pub const fn is_minter(self) -> bool {
        matches!(
            self,
            Self::MinterAnvilAlchemy | Self::MinterFoalForge | Self::MinterIronRedemption
        )
    }

    /// The string `version()` must return for this role.
    #[must_use]
    pub fn expected_version(self) -> String {
        format!("{}{VERSION_SUFFIX}", self.name())
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContractRole {
    type Err = BookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| BookError::UnknownRole(s.to_string()))
    }
}

/// A single-address reference a contract stores about another contract.
///
/// Each slot has a `setContract<Suffix>(address)` setter and a
/// `contract<Suffix>() -> address` accessor on every contract that holds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReferenceSlot {
    /// Reference to the hub.
    Stats,
    /// Reference to the fixture manager.
    FixtureManager,
    /// Reference to the HAY token.
    HayToken,
    /// Reference to the horse collection.
    NftHorse,
    /// Reference to the horseshoe collection.
    NftHorseshoe,
    /// Reference to the horse stats submodule.
    StatsHorse,
    /// Reference to the horseshoe stats submodule.
    StatsHorseshoe,
    /// Reference to the horse metadata provider.
    MetadataHorse,
    /// Reference to the horseshoe metadata provider.
    MetadataHorseshoe,
}

impl ReferenceSlot {
    /// Suffix shared by the setter and the accessor.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Stats => "Stats",
            Self::FixtureManager => "FixtureManager",
            Self::HayToken => "HayToken",
            Self::NftHorse => "NFTHorse",
            Self::NftHorseshoe => "NFTHorseshoe",
            Self::StatsHorse => "StatsHorse",
            Self::StatsHorseshoe => "StatsHorseshoe",
            Self::MetadataHorse => "MetadataHorse",
            Self::MetadataHorseshoe => "MetadataHorseshoe",
        }
    }

    /// Setter function name, e.g. `setContractHayToken`.
    #[must_use]
    pub fn setter(self) -> String {
        format!("setContract{}", self.suffix())
    }

    /// Accessor function name, e.g. `contractHayToken`.
    #[must_use]
    pub fn accessor(self) -> String {
        format!("contract{}", self.suffix())
    }

    /// The slot that holds a reference to `role`, if any role can reference it.
    ///
    /// Minters are authorized through flags, never referenced by address.
    #[must_use]
    pub const fn for_target(role: ContractRole) -> Option<Self> {
        match role {
            ContractRole::Stats => Some(Self::Stats),
            ContractRole::FixtureManager => Some(Self::FixtureManager),
            ContractRole::HayToken => Some(Self::HayToken),
            ContractRole::NftHorse => Some(Self::NftHorse),
            ContractRole::NftHorseshoe => Some(Self::NftHorseshoe),
            ContractRole::StatsHorse => Some(Self::StatsHorse),
            ContractRole::StatsHorseshoe => Some(Self::StatsHorseshoe),
            ContractRole::MetadataHorse => Some(Self::MetadataHorse),
            ContractRole::MetadataHorseshoe => Some(Self::MetadataHorseshoe),
            ContractRole::MinterAnvilAlchemy
            | ContractRole::MinterFoalForge
            | ContractRole::MinterIronRedemption => None,
        }
    }
}
