//! # Pending Foals
//!
//! A pending foal is the transient, not-yet-claimed horse an account holds on
//! the foal forge. This module holds its canonical shape, the forge's prices,
//! and the per-session cache slot that mirrors it.

mod store;

pub use store::{FoalPhase, FoalSlot, FoalSnapshot, FoalStateStore, FoalSubscription, ListenerId};

use speedh_shared::NativeAmount;

/// Eight non-negative performance stats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PerformanceStats {
    /// Raw power.
    pub power: u64,
    /// Acceleration out of the gate.
    pub acceleration: u64,
    /// Stamina over distance.
    pub stamina: u64,
    /// Speed floor.
    pub min_speed: u64,
    /// Speed ceiling.
    pub max_speed: u64,
    /// Luck.
    pub luck: u64,
    /// Bonus on curved segments.
    pub curve_bonus: u64,
    /// Bonus on straight segments.
    pub straight_bonus: u64,
}

impl PerformanceStats {
    /// ABI field names, in declaration order.
    pub const FIELDS: [&'static str; 8] = [
        "power",
        "acceleration",
        "stamina",
        "minSpeed",
        "maxSpeed",
        "luck",
        "curveBonus",
        "straightBonus",
    ];

    /// Builds from values in [`Self::FIELDS`] order.
    #[must_use]
    pub const fn from_array(values: [u64; 8]) -> Self {
        Self {
            power: values[0],
            acceleration: values[1],
            stamina: values[2],
            min_speed: values[3],
            max_speed: values[4],
            luck: values[5],
            curve_bonus: values[6],
            straight_bonus: values[7],
        }
    }

    /// Values in [`Self::FIELDS`] order.
    #[must_use]
    pub const fn to_array(self) -> [u64; 8] {
        [
            self.power,
            self.acceleration,
            self.stamina,
            self.min_speed,
            self.max_speed,
            self.luck,
            self.curve_bonus,
            self.straight_bonus,
        ]
    }

    /// Sum of all stats, saturating.
    #[must_use]
    pub fn total(self) -> u64 {
        self.to_array()
            .iter()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }
}

/// One horseshoe slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Horseshoe {
    /// Image category.
    pub img_category: u64,
    /// Image number within the category.
    pub img_number: u64,
    /// Stat bonus granted when equipped.
    pub bonus_stats: PerformanceStats,
}

impl Horseshoe {
    /// ABI field names, in declaration order.
    pub const FIELDS: [&'static str; 3] = ["imgCategory", "imgNumber", "bonusStats"];

    /// Whether the slot holds no horseshoe.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.img_category == 0 && self.img_number == 0 && self.bonus_stats.total() == 0
    }
}

/// Canonical pending foal.
///
/// A value of this type always has `total_points > 0`; "no foal" is `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PendingFoal {
    /// Image category.
    pub img_category: u64,
    /// Image number within the category.
    pub img_number: u64,
    /// Rolled stats.
    pub stats: PerformanceStats,
    /// Distributable points. Never zero for a live foal.
    pub total_points: u64,
    /// Extra-point packages bought so far.
    pub extra_packages_bought: u64,
    /// Up to four horseshoe slots, in slot order.
    pub horseshoes: Vec<Horseshoe>,
}

impl PendingFoal {
    /// ABI field names of the `getPendingHorse` return, in declaration order.
    pub const FIELDS: [&'static str; 6] = [
        "imgCategory",
        "imgNumber",
        "stats",
        "totalPoints",
        "extraPackagesBought",
        "horseshoes",
    ];

    /// Slots that actually hold a horseshoe.
    pub fn equipped_horseshoes(&self) -> impl Iterator<Item = &Horseshoe> {
        self.horseshoes.iter().filter(|shoe| !shoe.is_empty())
    }
}

/// Native value attached to each paid forge action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FoalPricing {
    /// `startHorseMint()`.
    pub start_mint: NativeAmount,
    /// `randomizeHorse(..)`.
    pub randomize: NativeAmount,
    /// `buyExtraPoints()`.
    pub extra_points: NativeAmount,
}

impl Default for FoalPricing {
    fn default() -> Self {
        Self {
            start_mint: NativeAmount::from_whole(600),
            randomize: NativeAmount::from_whole(100),
            extra_points: NativeAmount::from_whole(200),
        }
    }
}
