//! # Contract Graph Constants
//!
//! Values baked into the deployment tooling and the runtime client.
//! Changing any of them changes what the verification probe accepts.

use alloy_primitives::Address;

/// The all-zero address. A stored zero address means "not deployed".
pub const ZERO_ADDRESS: Address = Address::ZERO;

/// Suffix every contract appends to its role name in `version()`.
///
/// `SpeedH_Stats` reports `SpeedH_Stats-v1.0.0`.
pub const VERSION_SUFFIX: &str = "-v1.0.0";

/// Decimal places of the chain's native currency.
pub const NATIVE_DECIMALS: u32 = 18;

/// Symbol used in transcripts for native-currency amounts.
pub const NATIVE_SYMBOL: &str = "TLOS";

/// Number of horseshoe slots a pending foal carries.
pub const HORSESHOE_SLOTS: usize = 4;
