//! # Defensive Decoding
//!
//! Contract reads arrive in whatever shape the transport produced: a typed
//! ABI tuple, a JSON object from a wallet bridge, a positional array, or raw
//! words that did not match the ABI. [`RawValue`] captures all of them and
//! [`decode_pending_foal`] turns any of them into the canonical
//! [`PendingFoal`].
//!
//! ## Rules
//!
//! 1. Every level is normalized once into its declared field order: keyed
//!    records by name only (absent reads as null), positional lists and
//!    unnamed tuples by position only
//! 2. Every numeric leaf goes through [`to_number`], which never fails
//! 3. `totalPoints == 0` means "no pending foal"
//!
//! Nothing in this module returns an error.

use std::fmt;
use std::sync::Arc;

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use serde_json::Value;
use speedh_shared::constants::HORSESHOE_SLOTS;

use crate::contracts::{self, IFoalForge};
use crate::foal::{Horseshoe, PendingFoal, PerformanceStats};

/// Width of one ABI word.
const WORD: usize = 32;

/// Words in one encoded `PerformanceStats`.
const STATS_WORDS: usize = 8;

/// Words in one encoded `HorseshoeData`.
const SHOE_WORDS: usize = 2 + STATS_WORDS;

/// A decoded-but-unnormalized contract value.
#[derive(Clone)]
pub enum RawValue {
    /// Missing or explicitly null.
    Null,
    /// Boolean leaf.
    Bool(bool),
    /// Big-integer leaf.
    BigInt(U256),
    /// Plain floating-point number leaf.
    Number(f64),
    /// Textual leaf (decimal or `0x` hex).
    Text(String),
    /// Any other object that renders itself as text.
    Object(Arc<dyn fmt::Display + Send + Sync>),
    /// Record whose fields may carry names.
    Tuple(Vec<(Option<String>, RawValue)>),
    /// Positional list.
    List(Vec<RawValue>),
}

static NULL: RawValue = RawValue::Null;

impl fmt::Debug for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Self::BigInt(v) => f.debug_tuple("BigInt").field(v).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Object(o) => f.debug_tuple("Object").field(&o.to_string()).finish(),
            Self::Tuple(fields) => f.debug_tuple("Tuple").field(fields).finish(),
            Self::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

impl RawValue {
    /// Field `name` of a keyed record, or element `index` of a positional one.
    ///
    /// A record with any named entry is keyed: lookup is by name only and a
    /// missing name reads as `Null`. Position is used only for lists and for
    /// tuples whose entries are all unnamed.
    #[must_use]
    pub fn field(&self, name: &str, index: usize) -> &Self {
        match self {
            Self::Tuple(fields) if fields.iter().any(|(n, _)| n.is_some()) => fields
                .iter()
                .find(|(n, _)| n.as_deref() == Some(name))
                .map_or(&NULL, |(_, v)| v),
            Self::Tuple(fields) => fields.get(index).map_or(&NULL, |(_, v)| v),
            Self::List(items) => items.get(index).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    /// The values of `names`, in that order, resolved through [`Self::field`].
    #[must_use]
    pub fn canonical<const N: usize>(&self, names: [&str; N]) -> [&Self; N] {
        std::array::from_fn(|index| self.field(names[index], index))
    }

    /// Elements in positional order. Leaves have none.
    #[must_use]
    pub fn elements(&self) -> Vec<&Self> {
        match self {
            Self::Tuple(fields) => fields.iter().map(|(_, v)| v).collect(),
            Self::List(items) => items.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Reassembles the static `getPendingHorse` layout from raw return words.
    ///
    /// Used when typed decoding fails. Words past the end of `data` read as `Null`.
    #[must_use]
    pub fn pending_foal_from_words(data: &[u8]) -> Self {
        let word = |index: usize| -> Self {
            data.get(index * WORD..(index + 1) * WORD)
                .map_or(Self::Null, |w| Self::BigInt(U256::from_be_slice(w)))
        };
        let stats = |start: usize| Self::List((start..start + STATS_WORDS).map(word).collect());

        let shoes_start = 2 + STATS_WORDS + 2;
        let shoes = (0..HORSESHOE_SLOTS)
            .map(|slot| {
                let base = shoes_start + slot * SHOE_WORDS;
                Self::List(vec![word(base), word(base + 1), stats(base + 2)])
            })
            .collect();

        Self::List(vec![
            word(0),
            word(1),
            stats(2),
            word(2 + STATS_WORDS),
            word(2 + STATS_WORDS + 1),
            Self::List(shoes),
        ])
    }
}

/// Coerces any leaf to a non-negative integer. Total: never fails.
///
/// Order: big integer, plain number, text, stringified object. Anything
/// unparseable, negative or non-finite becomes 0; values beyond `u64`
/// saturate.
#[must_use]
pub fn to_number(value: &RawValue) -> u64 {
    match value {
        RawValue::BigInt(v) => saturate(*v),
        RawValue::Number(n) => from_float(*n),
        RawValue::Text(s) => parse_numeric(s),
        RawValue::Object(o) => parse_numeric(&o.to_string()),
        RawValue::Null | RawValue::Bool(_) | RawValue::Tuple(_) | RawValue::List(_) => 0,
    }
}

fn saturate(v: U256) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn from_float(n: f64) -> u64 {
    if n.is_finite() && n > 0.0 {
        // `as` saturates at u64::MAX and truncates the fraction.
        n as u64
    } else {
        0
    }
}

fn parse_numeric(raw: &str) -> u64 {
    let text = raw.trim();
    if text.is_empty() {
        return 0;
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return U256::from_str_radix(hex, 16).map_or(0, saturate);
    }
    if let Ok(v) = U256::from_str_radix(text, 10) {
        return saturate(v);
    }
    text.parse::<f64>().map_or(0, from_float)
}

fn decode_stats(value: &RawValue) -> PerformanceStats {
    PerformanceStats::from_array(value.canonical(PerformanceStats::FIELDS).map(to_number))
}

fn decode_horseshoe(value: &RawValue) -> Horseshoe {
    let [category, number, bonus] = value.canonical(Horseshoe::FIELDS);
    Horseshoe {
        img_category: to_number(category),
        img_number: to_number(number),
        bonus_stats: decode_stats(bonus),
    }
}

/// Normalizes a `getPendingHorse` result.
///
/// Returns `None` when `totalPoints` coerces to 0. Horseshoe lists longer than
/// four are cut to four; shorter lists are kept as-is.
#[must_use]
pub fn decode_pending_foal(raw: &RawValue) -> Option<PendingFoal> {
    let [category, number, stats, points, extras, shoes] = raw.canonical(PendingFoal::FIELDS);

    let total_points = to_number(points);
    if total_points == 0 {
        return None;
    }

    Some(PendingFoal {
        img_category: to_number(category),
        img_number: to_number(number),
        stats: decode_stats(stats),
        total_points,
        extra_packages_bought: to_number(extras),
        horseshoes: shoes
            .elements()
            .into_iter()
            .take(HORSESHOE_SLOTS)
            .map(decode_horseshoe)
            .collect(),
    })
}

/// Decodes raw `getPendingHorse` return bytes, falling back to word layout.
#[must_use]
pub fn decode_pending_foal_bytes(data: &[u8]) -> Option<PendingFoal> {
    let raw = IFoalForge::getPendingHorseCall::abi_decode_returns(data, true).map_or_else(
        |_| RawValue::pending_foal_from_words(data),
        RawValue::from,
    );
    decode_pending_foal(&raw)
}

fn named(name: &str, value: RawValue) -> (Option<String>, RawValue) {
    (Some(name.to_string()), value)
}

impl From<&contracts::PerformanceStats> for RawValue {
    fn from(stats: &contracts::PerformanceStats) -> Self {
        let [power, acceleration, stamina, min, max, luck, curve, straight] =
            PerformanceStats::FIELDS;
        Self::Tuple(vec![
            named(power, Self::BigInt(stats.power)),
            named(acceleration, Self::BigInt(stats.acceleration)),
            named(stamina, Self::BigInt(stats.stamina)),
            named(min, Self::BigInt(stats.minSpeed)),
            named(max, Self::BigInt(stats.maxSpeed)),
            named(luck, Self::BigInt(stats.luck)),
            named(curve, Self::BigInt(stats.curveBonus)),
            named(straight, Self::BigInt(stats.straightBonus)),
        ])
    }
}

impl From<&contracts::HorseshoeData> for RawValue {
    fn from(shoe: &contracts::HorseshoeData) -> Self {
        let [category, number, bonus] = Horseshoe::FIELDS;
        Self::Tuple(vec![
            named(category, Self::BigInt(shoe.imgCategory)),
            named(number, Self::BigInt(shoe.imgNumber)),
            named(bonus, Self::from(&shoe.bonusStats)),
        ])
    }
}

impl From<IFoalForge::getPendingHorseReturn> for RawValue {
    fn from(ret: IFoalForge::getPendingHorseReturn) -> Self {
        let [category, number, stats, points, extras, shoes] = PendingFoal::FIELDS;
        Self::Tuple(vec![
            named(category, Self::BigInt(ret.imgCategory)),
            named(number, Self::BigInt(ret.imgNumber)),
            named(stats, Self::from(&ret.stats)),
            named(points, Self::BigInt(ret.totalPoints)),
            named(extras, Self::BigInt(U256::from(ret.extraPackagesBought))),
            named(
                shoes,
                Self::List(ret.horseshoes.iter().map(Self::from).collect()),
            ),
        ])
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_u64()
                .map(|v| Self::BigInt(U256::from(v)))
                .or_else(|| n.as_f64().map(Self::Number))
                .unwrap_or(Self::Null),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            Value::Object(map) => Self::Tuple(
                map.iter()
                    .map(|(k, v)| (Some(k.clone()), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats_json(values: [u64; 8]) -> Value {
        json!({
            "power": values[0], "acceleration": values[1], "stamina": values[2],
            "minSpeed": values[3], "maxSpeed": values[4], "luck": values[5],
            "curveBonus": values[6], "straightBonus": values[7]
        })
    }

    fn sample_json() -> Value {
        json!({
            "imgCategory": 2,
            "imgNumber": 17,
            "stats": stats_json([20, 10, 30, 10, 20, 60, 50, 40]),
            "totalPoints": 120,
            "extraPackagesBought": 1,
            "horseshoes": [
                {
                    "imgCategory": 1,
                    "imgNumber": 3,
                    "bonusStats": stats_json([1, 0, 0, 0, 0, 0, 0, 0])
                },
                {
                    "imgCategory": 2,
                    "imgNumber": 5,
                    "bonusStats": stats_json([0, 2, 0, 0, 0, 0, 0, 0])
                }
            ]
        })
    }

    #[test]
    fn test_to_number_coercion_order() {
        assert_eq!(to_number(&RawValue::BigInt(U256::from(42))), 42);
        assert_eq!(to_number(&RawValue::Number(7.9)), 7);
        assert_eq!(to_number(&RawValue::Text("15".into())), 15);
        assert_eq!(to_number(&RawValue::Text("0x1f".into())), 31);
        assert_eq!(to_number(&RawValue::Object(Arc::new(99u32))), 99);
    }

    #[test]
    fn test_to_number_degrades_to_zero() {
        assert_eq!(to_number(&RawValue::Text("abc".into())), 0);
        assert_eq!(to_number(&RawValue::Text(String::new())), 0);
        assert_eq!(to_number(&RawValue::Number(-3.0)), 0);
        assert_eq!(to_number(&RawValue::Number(f64::NAN)), 0);
        assert_eq!(to_number(&RawValue::Number(f64::INFINITY)), 0);
        assert_eq!(to_number(&RawValue::Null), 0);
        assert_eq!(to_number(&RawValue::Bool(true)), 0);
        assert_eq!(to_number(&RawValue::List(vec![])), 0);
    }

    #[test]
    fn test_to_number_saturates() {
        assert_eq!(to_number(&RawValue::BigInt(U256::MAX)), u64::MAX);
        assert_eq!(
            to_number(&RawValue::Text("340282366920938463463374607431768211456".into())),
            u64::MAX
        );
    }

    #[test]
    fn test_decode_named_sample() {
        let foal = decode_pending_foal(&RawValue::from(sample_json())).unwrap();
        assert_eq!(foal.img_category, 2);
        assert_eq!(foal.img_number, 17);
        assert_eq!(foal.total_points, 120);
        assert_eq!(foal.extra_packages_bought, 1);
        assert_eq!(foal.stats.luck, 60);
        assert_eq!(foal.horseshoes.len(), 2);
        assert_eq!(foal.horseshoes[0].bonus_stats.power, 1);
        assert_eq!(foal.horseshoes[1].img_number, 5);
        assert_eq!(foal.horseshoes[1].bonus_stats.acceleration, 2);
    }

    #[test]
    fn test_decode_literal_sample_with_two_shoes() {
        let value = json!({
            "imgCategory": 1,
            "imgNumber": 4,
            "stats": stats_json([20, 10, 30, 10, 20, 60, 50, 40]),
            "totalPoints": 120,
            "extraPackagesBought": 0,
            "horseshoes": [
                {"imgCategory": 1, "imgNumber": 1, "bonusStats": {"power": 8, "acceleration": 2}},
                {"imgCategory": 2, "imgNumber": 2, "bonusStats": {"stamina": 3, "maxSpeed": 7}}
            ]
        });
        let foal = decode_pending_foal(&RawValue::from(value)).unwrap();

        assert_eq!(foal.total_points, 120);
        assert_eq!(foal.stats.to_array(), [20, 10, 30, 10, 20, 60, 50, 40]);
        assert_eq!(foal.horseshoes.len(), 2);
        assert_eq!(foal.horseshoes[0].bonus_stats.to_array(), [8, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(foal.horseshoes[1].bonus_stats.to_array(), [0, 0, 3, 0, 7, 0, 0, 0]);
    }

    fn abi_stats(values: [u64; 8]) -> contracts::PerformanceStats {
        let [power, acceleration, stamina, min, max, luck, curve, straight] =
            values.map(U256::from);
        contracts::PerformanceStats {
            power,
            acceleration,
            stamina,
            minSpeed: min,
            maxSpeed: max,
            luck,
            curveBonus: curve,
            straightBonus: straight,
        }
    }

    fn abi_shoe(category: u64, number: u64, bonus: [u64; 8]) -> contracts::HorseshoeData {
        contracts::HorseshoeData {
            imgCategory: U256::from(category),
            imgNumber: U256::from(number),
            bonusStats: abi_stats(bonus),
        }
    }

    #[test]
    fn test_decode_literal_sample_through_abi() {
        let data = IFoalForge::getPendingHorseCall::abi_encode_returns(&(
            U256::from(1),
            U256::from(4),
            abi_stats([20, 10, 30, 10, 20, 60, 50, 40]),
            U256::from(120),
            0u8,
            [
                abi_shoe(1, 1, [8, 2, 0, 0, 0, 0, 0, 0]),
                abi_shoe(2, 2, [0, 0, 3, 0, 7, 0, 0, 0]),
                abi_shoe(0, 0, [0; 8]),
                abi_shoe(0, 0, [0; 8]),
            ],
        ));
        let foal = decode_pending_foal_bytes(&data).unwrap();

        assert_eq!(foal.total_points, 120);
        assert_eq!(foal.stats.to_array(), [20, 10, 30, 10, 20, 60, 50, 40]);
        assert_eq!(foal.horseshoes.len(), HORSESHOE_SLOTS);
        assert_eq!(foal.equipped_horseshoes().count(), 2);
        assert_eq!(foal.horseshoes[0].bonus_stats.to_array(), [8, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(foal.horseshoes[1].bonus_stats.to_array(), [0, 0, 3, 0, 7, 0, 0, 0]);
        assert!(foal.horseshoes[2].is_empty() && foal.horseshoes[3].is_empty());
    }

    #[test]
    fn test_keyed_record_missing_points_is_none() {
        let value = json!({
            "imgCategory": 2,
            "imgNumber": 17,
            "stats": {"power": 1},
            "extraPackagesBought": 1,
            "horseshoes": []
        });
        assert!(decode_pending_foal(&RawValue::from(value)).is_none());
    }

    #[test]
    fn test_keyed_record_missing_field_reads_zero() {
        let mut value = sample_json();
        value["stats"].as_object_mut().unwrap().remove("luck");
        let foal = decode_pending_foal(&RawValue::from(value)).unwrap();
        assert_eq!(foal.stats.luck, 0);
        assert_eq!(foal.stats.stamina, 30);
        assert_eq!(foal.stats.curve_bonus, 50);
    }

    #[test]
    fn test_unnamed_tuple_is_positional() {
        let unnamed = RawValue::Tuple(vec![
            (None, RawValue::BigInt(U256::from(5))),
            (None, RawValue::Text("6".into())),
        ]);
        assert_eq!(to_number(unnamed.field("imgCategory", 0)), 5);
        assert_eq!(to_number(unnamed.field("imgNumber", 1)), 6);
        assert!(matches!(unnamed.field("stats", 2), RawValue::Null));
    }

    #[test]
    fn test_decode_positional_matches_named() {
        let positional = json!([
            "2", "17",
            [20, 10, 30, 10, 20, 60, 50, 40],
            "120", 1,
            [[1, 3, [1, 0, 0, 0, 0, 0, 0, 0]], [2, 5, [0, 2, 0, 0, 0, 0, 0, 0]]]
        ]);
        assert_eq!(
            decode_pending_foal(&RawValue::from(positional)),
            decode_pending_foal(&RawValue::from(sample_json()))
        );
    }

    #[test]
    fn test_zero_points_is_none() {
        let mut value = sample_json();
        value["totalPoints"] = json!("0");
        assert!(decode_pending_foal(&RawValue::from(value)).is_none());
        assert!(decode_pending_foal(&RawValue::Null).is_none());
        assert!(decode_pending_foal(&RawValue::List(vec![])).is_none());
    }

    #[test]
    fn test_bad_leaf_degrades_not_aborts() {
        let mut value = sample_json();
        value["imgNumber"] = json!("abc");
        value["stats"]["luck"] = json!({"nested": true});
        let foal = decode_pending_foal(&RawValue::from(value)).unwrap();
        assert_eq!(foal.img_number, 0);
        assert_eq!(foal.stats.luck, 0);
        assert_eq!(foal.stats.power, 20);
    }

    #[test]
    fn test_horseshoes_capped_at_four() {
        let mut value = sample_json();
        let shoe = json!({"imgCategory": 1, "imgNumber": 1, "bonusStats": []});
        value["horseshoes"] = json!([shoe.clone(), shoe.clone(), shoe.clone(), shoe.clone(), shoe]);
        let foal = decode_pending_foal(&RawValue::from(value)).unwrap();
        assert_eq!(foal.horseshoes.len(), HORSESHOE_SLOTS);
    }

    #[test]
    fn test_short_words_decode_to_none() {
        assert!(decode_pending_foal_bytes(&[]).is_none());
        assert!(decode_pending_foal_bytes(&[0u8; 40]).is_none());
    }

    #[test]
    fn test_truncated_words_keep_prefix() {
        // Twelve words: header, stats, points, extras; no horseshoes.
        let mut data = Vec::new();
        for v in [3u64, 4, 1, 1, 1, 1, 1, 1, 1, 1, 120, 0] {
            data.extend_from_slice(&U256::from(v).to_be_bytes::<32>());
        }
        let foal = decode_pending_foal_bytes(&data).unwrap();
        assert_eq!(foal.img_category, 3);
        assert_eq!(foal.total_points, 120);
        assert_eq!(foal.horseshoes.len(), HORSESHOE_SLOTS);
        assert!(foal.horseshoes.iter().all(Horseshoe::is_empty));
    }
}
