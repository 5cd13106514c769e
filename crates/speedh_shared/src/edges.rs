//! # Wiring Edges
//!
//! The contract graph as data. Every edge is one idempotent setter call that
//! makes its source contract store the address of (or authorize) its target.
//!
//! Edges are order-independent once every role is deployed, but they are
//! applied and verified in the order of [`WIRING_EDGES`] so transcripts are
//! reproducible.

use std::fmt;

use crate::roles::{ContractRole, ReferenceSlot};

/// What an edge asks its source contract to store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeAction {
    /// `setContract<Slot>(target)`, read back through `contract<Slot>()`.
    Reference {
        /// Slot on the source contract.
        slot: ReferenceSlot,
        /// Role whose address is stored.
        target: ContractRole,
    },
    /// `setContractMinter(minter, true)`, read back through `isHorseMinter(minter)`.
    AuthorizeMinter {
        /// Minter being authorized.
        minter: ContractRole,
    },
}

/// Which block of the graph an edge belongs to. Used for log grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeStage {
    /// Minter authorizations and module addresses on the hub.
    HubReferences,
    /// Stats submodules pointing back at the hub.
    SubmoduleBackReferences,
    /// NFT collections pointing at the hub and authorizing minters.
    NftReferences,
    /// Minters pointing at the hub, collections and token.
    MinterReferences,
    /// Fixture manager pointing at the hub and token.
    FixtureManagerReferences,
}

impl EdgeStage {
    /// Human-readable heading.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::HubReferences => "hub references",
            Self::SubmoduleBackReferences => "submodule back-references",
            Self::NftReferences => "NFT references and authorizations",
            Self::MinterReferences => "minter references",
            Self::FixtureManagerReferences => "fixture-manager references",
        }
    }
}

/// A directed "role A must store role B" configuration call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeploymentEdge {
    /// Contract the setter is called on.
    pub source: ContractRole,
    /// What the setter stores.
    pub action: EdgeAction,
}

impl DeploymentEdge {
    const fn reference(source: ContractRole, slot: ReferenceSlot, target: ContractRole) -> Self {
        Self {
            source,
            action: EdgeAction::Reference { slot, target },
        }
    }

    const fn minter(source: ContractRole, minter: ContractRole) -> Self {
        Self {
            source,
            action: EdgeAction::AuthorizeMinter { minter },
        }
    }

    /// The role whose address the source ends up holding.
    #[must_use]
    pub const fn target(&self) -> ContractRole {
        match self.action {
            EdgeAction::Reference { target, .. } => target,
            EdgeAction::AuthorizeMinter { minter } => minter,
        }
    }

    /// Setter function name.
    #[must_use]
    pub fn setter(&self) -> String {
        match self.action {
            EdgeAction::Reference { slot, .. } => slot.setter(),
            EdgeAction::AuthorizeMinter { .. } => "setContractMinter".to_string(),
        }
    }

    /// Accessor used to read the edge back.
    #[must_use]
    pub fn accessor(&self) -> String {
        match self.action {
            EdgeAction::Reference { slot, .. } => slot.accessor(),
            EdgeAction::AuthorizeMinter { .. } => "isHorseMinter".to_string(),
        }
    }

    /// Stage the edge is logged under.
    #[must_use]
    pub const fn stage(&self) -> EdgeStage {
        match self.source {
            ContractRole::Stats => EdgeStage::HubReferences,
            ContractRole::StatsHorse | ContractRole::StatsHorseshoe => {
                EdgeStage::SubmoduleBackReferences
            }
            ContractRole::NftHorse
            | ContractRole::NftHorseshoe
            | ContractRole::MetadataHorse
            | ContractRole::MetadataHorseshoe
            | ContractRole::HayToken => EdgeStage::NftReferences,
            ContractRole::MinterAnvilAlchemy
            | ContractRole::MinterFoalForge
            | ContractRole::MinterIronRedemption => EdgeStage::MinterReferences,
            ContractRole::FixtureManager => EdgeStage::FixtureManagerReferences,
        }
    }

    /// Transcript label, e.g. `SpeedH_Stats.setContractMinter(FoalForge, true)`.
    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DeploymentEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            EdgeAction::Reference { slot, target } => write!(
                f,
                "{}.{}({})",
                self.source.name(),
                slot.setter(),
                target.short_name()
            ),
            EdgeAction::AuthorizeMinter { minter } => write!(
                f,
                "{}.setContractMinter({}, true)",
                self.source.name(),
                minter.short_name()
            ),
        }
    }
}

use ContractRole as R;
use ReferenceSlot as S;

/// The full contract graph, in application order.
pub const WIRING_EDGES: [DeploymentEdge; 32] = [
    // Hub: minters, then module addresses.
    DeploymentEdge::minter(R::Stats, R::MinterAnvilAlchemy),
    DeploymentEdge::minter(R::Stats, R::MinterFoalForge),
    DeploymentEdge::minter(R::Stats, R::MinterIronRedemption),
    DeploymentEdge::reference(R::Stats, S::FixtureManager, R::FixtureManager),
    DeploymentEdge::reference(R::Stats, S::HayToken, R::HayToken),
    DeploymentEdge::reference(R::Stats, S::NftHorse, R::NftHorse),
    DeploymentEdge::reference(R::Stats, S::NftHorseshoe, R::NftHorseshoe),
    DeploymentEdge::reference(R::Stats, S::StatsHorse, R::StatsHorse),
    DeploymentEdge::reference(R::Stats, S::StatsHorseshoe, R::StatsHorseshoe),
    DeploymentEdge::reference(R::Stats, S::MetadataHorse, R::MetadataHorse),
    DeploymentEdge::reference(R::Stats, S::MetadataHorseshoe, R::MetadataHorseshoe),
    // Stats submodules.
    DeploymentEdge::reference(R::StatsHorseshoe, S::Stats, R::Stats),
    DeploymentEdge::reference(R::StatsHorse, S::Stats, R::Stats),
    // Collections.
    DeploymentEdge::reference(R::NftHorse, S::Stats, R::Stats),
    DeploymentEdge::minter(R::NftHorse, R::MinterAnvilAlchemy),
    DeploymentEdge::minter(R::NftHorse, R::MinterFoalForge),
    DeploymentEdge::minter(R::NftHorse, R::MinterIronRedemption),
    DeploymentEdge::reference(R::NftHorseshoe, S::Stats, R::Stats),
    DeploymentEdge::minter(R::NftHorseshoe, R::MinterAnvilAlchemy),
    DeploymentEdge::minter(R::NftHorseshoe, R::MinterFoalForge),
    DeploymentEdge::minter(R::NftHorseshoe, R::MinterIronRedemption),
    // Minters.
    DeploymentEdge::reference(R::MinterIronRedemption, S::Stats, R::Stats),
    DeploymentEdge::reference(R::MinterIronRedemption, S::NftHorseshoe, R::NftHorseshoe),
    DeploymentEdge::reference(R::MinterIronRedemption, S::HayToken, R::HayToken),
    DeploymentEdge::reference(R::MinterFoalForge, S::Stats, R::Stats),
    DeploymentEdge::reference(R::MinterFoalForge, S::NftHorse, R::NftHorse),
    DeploymentEdge::reference(R::MinterFoalForge, S::NftHorseshoe, R::NftHorseshoe),
    DeploymentEdge::reference(R::MinterAnvilAlchemy, S::Stats, R::Stats),
    DeploymentEdge::reference(R::MinterAnvilAlchemy, S::NftHorseshoe, R::NftHorseshoe),
    DeploymentEdge::reference(R::MinterAnvilAlchemy, S::HayToken, R::HayToken),
    // Fixture manager.
    DeploymentEdge::reference(R::FixtureManager, S::Stats, R::Stats),
    DeploymentEdge::reference(R::FixtureManager, S::HayToken, R::HayToken),
];

/// The edges whose setter is called on `role`, in application order.
pub fn edges_for(role: ContractRole) -> impl Iterator<Item = &'static DeploymentEdge> {
    WIRING_EDGES.iter().filter(move |edge| edge.source == role)
}
