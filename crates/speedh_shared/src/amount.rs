//! # Native Currency Amounts
//!
//! Fixed-point amounts with 18 decimal places, matching the chain's wei
//! precision. Used for payable prices and for the balance lines of the
//! deployment transcript.
//!
//! No floating point: `600.0` is stored as `600 * 10^18` wei.

use std::fmt;

use alloy_primitives::U256;

use crate::constants::NATIVE_DECIMALS;

/// Wei per whole unit.
const WEI_PER_UNIT: u128 = 10u128.pow(NATIVE_DECIMALS);

/// A non-negative native-currency amount in wei.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct NativeAmount(u128);

impl NativeAmount {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Creates from a whole number of units.
    #[inline]
    #[must_use]
    pub const fn from_whole(whole: u128) -> Self {
        Self(whole * WEI_PER_UNIT)
    }

    /// Creates from raw wei.
    #[inline]
    #[must_use]
    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    /// Creates from a 256-bit wei value, saturating at `u128::MAX`.
    #[must_use]
    pub fn from_u256(wei: U256) -> Self {
        Self(u128::try_from(wei).unwrap_or(u128::MAX))
    }

    /// Raw wei.
    #[inline]
    #[must_use]
    pub const fn to_wei(self) -> u128 {
        self.0
    }

    /// Wei as a 256-bit integer, the form transactions carry.
    #[must_use]
    pub fn to_u256(self) -> U256 {
        U256::from(self.0)
    }

    /// Whole-unit part.
    #[inline]
    #[must_use]
    pub const fn whole(self) -> u128 {
        self.0 / WEI_PER_UNIT
    }

    /// Fractional part in wei (0 to 10^18 - 1).
    #[inline]
    #[must_use]
    pub const fn decimal(self) -> u128 {
        self.0 % WEI_PER_UNIT
    }

    /// Signed change from `previous` to `self`.
    #[must_use]
    pub fn delta_from(self, previous: Self) -> BalanceDelta {
        let magnitude = self.0.abs_diff(previous.0);
        BalanceDelta {
            negative: self.0 < previous.0,
            magnitude: Self(magnitude),
        }
    }
}

impl fmt::Display for NativeAmount {
    /// Formats like `formatEther`: at least one fractional digit, no trailing zeros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decimals = NATIVE_DECIMALS as usize;
        let fraction = format!("{:0decimals$}", self.decimal());
        let trimmed = fraction.trim_end_matches('0');
        let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
        write!(f, "{}.{trimmed}", self.whole())
    }
}

/// Signed balance change between two readings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceDelta {
    negative: bool,
    magnitude: NativeAmount,
}

impl BalanceDelta {
    /// Whether the balance went down.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.negative && self.magnitude.0 > 0
    }

    /// Absolute size of the change.
    #[must_use]
    pub const fn magnitude(self) -> NativeAmount {
        self.magnitude
    }
}

impl fmt::Display for BalanceDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() {
            "-"
        } else if self.magnitude.0 > 0 {
            "+"
        } else {
            ""
        };
        write!(f, "{sign}{}", self.magnitude)
    }
}
