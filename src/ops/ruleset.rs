//! Operation ruleset registry.
//!
//! Maps operation identifiers to their costs, success curve, casualty
//! curves and target damage. The registry is built once (from the built-in
//! table or a JSON file) and only read afterwards.
//!
//! JSON layout:
//!
//! ```json
//! { "operations": [
//!     { "id": "barracks_spy",
//!       "costs": [{ "counter": "spy_strength", "flat": 2 }],
//!       "success": { "kind": "exponential", "base": 0.8, "scale": 1.4, "min": 0.01, "max": 0.97 },
//!       "on_success": { "kind": "tiered", "tiers": [{ "min_ratio_permille": 0, "basis_points": 100 }] },
//!       "on_failure": { "kind": "scaled", "base_bp": 25, "min_bp": 25, "max_bp": 100 },
//!       "loss_sources": [{ "counter": "military_spies" }],
//!       "damage": [] } ] }
//! ```
//!
//! Unknown keys are rejected. `loss_sources` may be omitted, in which case
//! casualties fall on spies and the attacker race's spy units.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ratio::{cmp_fractions, gcd, StrengthRatio};
use super::resolve::OperationError;
use crate::dominion::{Counter, Dominion};

/// Denominator for basis points.
pub const BASIS_POINTS: u128 = 10_000;

/// Errors raised while loading or validating a ruleset.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("failed to read ruleset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed ruleset: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate operation '{0}'")]
    DuplicateOperation(String),

    #[error("invalid rule for '{id}': {reason}")]
    InvalidRule { id: String, reason: String },
}

/// A resource the attacker pays to attempt an operation.
///
/// The amount is `flat + floor(land * per_acre_permille / 1000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceCost {
    pub counter: Counter,
    #[serde(default)]
    pub flat: u64,
    #[serde(default)]
    pub per_acre_permille: u64,
}

impl ResourceCost {
    pub const fn flat(counter: Counter, amount: u64) -> Self {
        ResourceCost {
            counter,
            flat: amount,
            per_acre_permille: 0,
        }
    }

    pub const fn per_acre(counter: Counter, permille: u64) -> Self {
        ResourceCost {
            counter,
            flat: 0,
            per_acre_permille: permille,
        }
    }

    /// The amount owed by a given dominion.
    pub fn amount_for(&self, dominion: &Dominion) -> u64 {
        let scaled = u128::from(dominion.get(Counter::Land)) * u128::from(self.per_acre_permille)
            / 1000;
        let scaled = u64::try_from(scaled).unwrap_or(u64::MAX);
        self.flat.saturating_add(scaled)
    }
}

/// Maps a strength ratio to a success probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum SuccessCurve {
    /// Always succeeds.
    Always,
    /// Fixed probability regardless of ratio.
    Fixed { chance: f64 },
    /// `clamp(base ^ (scale / ratio), min, max)`; rises with the ratio for
    /// `base` in (0, 1).
    Exponential {
        base: f64,
        scale: f64,
        min: f64,
        max: f64,
    },
}

impl SuccessCurve {
    /// Evaluates the curve.
    pub fn probability(&self, ratio: StrengthRatio) -> f64 {
        match *self {
            SuccessCurve::Always => 1.0,
            SuccessCurve::Fixed { chance } => chance,
            SuccessCurve::Exponential {
                base,
                scale,
                min,
                max,
            } => {
                let r = ratio.as_f64();
                if r <= 0.0 {
                    return min;
                }
                base.powf(scale / r).clamp(min, max)
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        let in_unit = |p: f64| (0.0..=1.0).contains(&p);
        match *self {
            SuccessCurve::Always => Ok(()),
            SuccessCurve::Fixed { chance } => {
                if in_unit(chance) {
                    Ok(())
                } else {
                    Err(format!("fixed chance {} outside [0, 1]", chance))
                }
            }
            SuccessCurve::Exponential {
                base,
                scale,
                min,
                max,
            } => {
                if !(base > 0.0 && base <= 1.0) {
                    return Err(format!("exponential base {} outside (0, 1]", base));
                }
                if !(scale.is_finite() && scale >= 0.0) {
                    return Err(format!("exponential scale {} must be non-negative", scale));
                }
                if !in_unit(min) || !in_unit(max) || min > max {
                    return Err(format!("exponential bounds [{}, {}] invalid", min, max));
                }
                Ok(())
            }
        }
    }
}

/// One step of a tiered loss curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossTier {
    /// Inclusive lower bound on the strength ratio, in thousandths.
    pub min_ratio_permille: u64,
    pub basis_points: u64,
}

/// Maps a strength ratio to a casualty rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum LossCurve {
    /// The highest tier whose bound does not exceed the ratio applies.
    Tiered { tiers: Vec<LossTier> },
    /// `clamp(base_bp / ratio, min_bp, max_bp)`.
    Scaled {
        base_bp: u64,
        min_bp: u64,
        max_bp: u64,
    },
}

impl LossCurve {
    /// Default casualties for a successful info operation.
    pub fn info_tiers() -> Self {
        LossCurve::Tiered {
            tiers: vec![
                // Target more than 100x stronger.
                LossTier {
                    min_ratio_permille: 0,
                    basis_points: 100,
                },
                LossTier {
                    min_ratio_permille: 10,
                    basis_points: 25,
                },
                // Attacker dominant by three orders of magnitude.
                LossTier {
                    min_ratio_permille: 1_000_000,
                    basis_points: 10,
                },
            ],
        }
    }

    /// Evaluates the curve.
    pub fn rate(&self, ratio: StrengthRatio) -> LossRate {
        match self {
            LossCurve::Tiered { tiers } => {
                let bp = tiers
                    .iter()
                    .rev()
                    .find(|t| ratio.cmp_permille(t.min_ratio_permille).is_ge())
                    .or_else(|| tiers.first())
                    .map_or(0, |t| t.basis_points);
                LossRate::from_basis_points(bp)
            }
            LossCurve::Scaled {
                base_bp,
                min_bp,
                max_bp,
            } => {
                // base_bp / ratio == base_bp * den / num
                let scaled = LossRate::new(
                    u128::from(*base_bp).saturating_mul(ratio.denominator()),
                    ratio.numerator(),
                );
                let min = LossRate::from_basis_points(*min_bp);
                let max = LossRate::from_basis_points(*max_bp);
                if scaled.lt(&min) {
                    min
                } else if max.lt(&scaled) {
                    max
                } else {
                    scaled
                }
            }
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            LossCurve::Tiered { tiers } => {
                let Some(first) = tiers.first() else {
                    return Err("tiered loss curve has no tiers".to_string());
                };
                if first.min_ratio_permille != 0 {
                    return Err("first loss tier must start at ratio 0".to_string());
                }
                if tiers
                    .windows(2)
                    .any(|w| w[0].min_ratio_permille >= w[1].min_ratio_permille)
                {
                    return Err("loss tiers must be strictly ascending".to_string());
                }
                if tiers.iter().any(|t| u128::from(t.basis_points) > BASIS_POINTS) {
                    return Err("loss tier above 100%".to_string());
                }
                Ok(())
            }
            LossCurve::Scaled { min_bp, max_bp, .. } => {
                if min_bp > max_bp {
                    return Err(format!("scaled loss bounds [{}, {}] invalid", min_bp, max_bp));
                }
                if u128::from(*max_bp) > BASIS_POINTS {
                    return Err("scaled loss above 100%".to_string());
                }
                Ok(())
            }
        }
    }
}

/// A casualty rate in basis points, held as an exact fraction.
#[derive(Debug, Clone, Copy)]
pub struct LossRate {
    num: u128,
    den: u128,
}

impl LossRate {
    fn new(num: u128, den: u128) -> Self {
        let den = den.max(1);
        let g = gcd(num, den);
        LossRate {
            num: num / g,
            den: den / g,
        }
    }

    pub fn from_basis_points(bp: u64) -> Self {
        LossRate {
            num: u128::from(bp),
            den: 1,
        }
    }

    /// Lossy basis-point value for reporting.
    pub fn basis_points(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// `floor(stock * rate / 10000 * weight_num / weight_den)`, capped at `stock`.
    ///
    /// Exact while `stock * weight_num` times the rate's numerator fits in
    /// `u128`, which holds for any rate clamped from a ratio of realistic
    /// spy counts.
    pub fn casualties(&self, stock: u64, weight_num: u64, weight_den: u64) -> u64 {
        let numerator = u128::from(stock)
            .saturating_mul(self.num)
            .saturating_mul(u128::from(weight_num));
        let denominator = self
            .den
            .saturating_mul(BASIS_POINTS)
            .saturating_mul(u128::from(weight_den.max(1)));
        let lost = numerator / denominator;
        u64::try_from(lost).unwrap_or(u64::MAX).min(stock)
    }

    fn lt(&self, other: &LossRate) -> bool {
        cmp_fractions(self.num, self.den, other.num, other.den).is_lt()
    }
}

impl PartialEq for LossRate {
    fn eq(&self, other: &Self) -> bool {
        !self.lt(other) && !other.lt(self)
    }
}

/// An attacker counter that takes casualties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LossSource {
    pub counter: Counter,
    /// Share of the loss rate this counter suffers, in thousandths.
    #[serde(default = "full_loss_weight")]
    pub weight_permille: u64,
}

fn full_loss_weight() -> u64 {
    1000
}

impl LossSource {
    pub const fn full(counter: Counter) -> Self {
        LossSource {
            counter,
            weight_permille: 1000,
        }
    }
}

/// Damage dealt to the target on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DamageRule {
    pub counter: Counter,
    pub basis_points: u64,
    /// The attacker receives what the target loses.
    #[serde(default)]
    pub transfer: bool,
}

impl DamageRule {
    /// `floor(stock * basis_points / 10000)`.
    pub fn amount_for(&self, target: &Dominion) -> u64 {
        LossRate::from_basis_points(self.basis_points).casualties(target.get(self.counter), 1, 1)
    }
}

/// Everything needed to resolve one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationRule {
    pub id: String,
    #[serde(default)]
    pub costs: Vec<ResourceCost>,
    pub success: SuccessCurve,
    #[serde(default)]
    pub on_success: Option<LossCurve>,
    #[serde(default)]
    pub on_failure: Option<LossCurve>,
    /// Attacker counters that take casualties. Empty means spies plus the
    /// race's spy units.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub loss_sources: Vec<LossSource>,
    #[serde(default)]
    pub damage: Vec<DamageRule>,
}

impl OperationRule {
    fn validate(&self) -> Result<(), RulesetError> {
        let invalid = |reason: String| RulesetError::InvalidRule {
            id: self.id.clone(),
            reason,
        };
        if self.id.is_empty() {
            return Err(invalid("empty operation id".to_string()));
        }
        self.success.validate().map_err(invalid)?;
        for curve in self.on_success.iter().chain(self.on_failure.iter()) {
            curve.validate().map_err(invalid)?;
        }
        for (i, source) in self.loss_sources.iter().enumerate() {
            if source.weight_permille > 1000 {
                return Err(invalid(format!("loss weight for {} above 100%", source.counter)));
            }
            if self.loss_sources[..i].iter().any(|s| s.counter == source.counter) {
                return Err(invalid(format!("duplicate loss source {}", source.counter)));
            }
        }
        for d in &self.damage {
            if u128::from(d.basis_points) > BASIS_POINTS {
                return Err(invalid(format!("damage to {} above 100%", d.counter)));
            }
        }
        Ok(())
    }
}

fn info_op(id: &str) -> OperationRule {
    OperationRule {
        id: id.to_string(),
        costs: vec![ResourceCost::flat(Counter::SpyStrength, 2)],
        success: SuccessCurve::Exponential {
            base: 0.8,
            scale: 1.4,
            min: 0.01,
            max: 0.97,
        },
        on_success: Some(LossCurve::info_tiers()),
        on_failure: Some(LossCurve::Scaled {
            base_bp: 25,
            min_bp: 25,
            max_bp: 100,
        }),
        loss_sources: Vec::new(),
        damage: Vec::new(),
    }
}

fn black_op(id: &str, costs: Vec<ResourceCost>, damage: DamageRule) -> OperationRule {
    OperationRule {
        id: id.to_string(),
        costs,
        success: SuccessCurve::Exponential {
            base: 0.7,
            scale: 1.4,
            min: 0.01,
            max: 0.97,
        },
        on_success: Some(LossCurve::info_tiers()),
        on_failure: Some(LossCurve::Scaled {
            base_bp: 100,
            min_bp: 100,
            max_bp: 400,
        }),
        loss_sources: Vec::new(),
        damage: vec![damage],
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RulesetFile {
    operations: Vec<OperationRule>,
}

/// Read-only table of operation rules keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    rules: BTreeMap<String, OperationRule>,
}

impl Registry {
    /// Builds a registry, validating every rule.
    pub fn new(rules: Vec<OperationRule>) -> Result<Self, RulesetError> {
        let mut map = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            if map.contains_key(&rule.id) {
                return Err(RulesetError::DuplicateOperation(rule.id));
            }
            map.insert(rule.id.clone(), rule);
        }
        Ok(Registry { rules: map })
    }

    /// The built-in info and black operations.
    pub fn builtin() -> Self {
        let mut rules = BTreeMap::new();
        let all = [
            info_op("barracks_spy"),
            info_op("castle_spy"),
            info_op("survey_dominion"),
            info_op("land_spy"),
            black_op(
                "assassinate_draftees",
                vec![ResourceCost::flat(Counter::SpyStrength, 5)],
                DamageRule {
                    counter: Counter::Draftees,
                    basis_points: 200,
                    transfer: false,
                },
            ),
            black_op(
                "assassinate_wizards",
                vec![ResourceCost::flat(Counter::SpyStrength, 5)],
                DamageRule {
                    counter: Counter::Wizards,
                    basis_points: 100,
                    transfer: false,
                },
            ),
            black_op(
                "steal_platinum",
                vec![
                    ResourceCost::flat(Counter::SpyStrength, 5),
                    ResourceCost::per_acre(Counter::Mana, 200),
                ],
                DamageRule {
                    counter: Counter::Platinum,
                    basis_points: 200,
                    transfer: true,
                },
            ),
        ];
        for rule in all {
            rules.insert(rule.id.clone(), rule);
        }
        Registry { rules }
    }

    /// Parses and validates a JSON ruleset.
    pub fn from_json_str(s: &str) -> Result<Self, RulesetError> {
        let file: RulesetFile = serde_json::from_str(s)?;
        Registry::new(file.operations)
    }

    /// Reads a JSON ruleset from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesetError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RulesetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Registry::from_json_str(&text)?;
        log::info!(
            "loaded {} operations from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Looks up a rule. Unknown ids are a configuration error.
    pub fn get(&self, id: &str) -> Result<&OperationRule, OperationError> {
        self.rules
            .get(id)
            .ok_or_else(|| OperationError::UnknownOperation(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// Operation ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominion::Race;

    fn bp(curve: &LossCurve, permille: u64) -> f64 {
        curve.rate(StrengthRatio::from_permille(permille)).basis_points()
    }

    #[test]
    fn builtin_rules_are_valid() {
        let registry = Registry::builtin();
        assert_eq!(registry.len(), 7);
        for id in registry.ids() {
            registry.get(id).unwrap().validate().unwrap();
        }
    }

    #[test]
    fn unknown_operation_is_an_error() {
        let registry = Registry::builtin();
        match registry.get("summon_dragon") {
            Err(OperationError::UnknownOperation(id)) => assert_eq!(id, "summon_dragon"),
            other => panic!("expected UnknownOperation, got {:?}", other),
        }
    }

    #[test]
    fn info_tiers_boundaries() {
        let curve = LossCurve::info_tiers();
        assert_eq!(bp(&curve, 1), 100.0);
        assert_eq!(bp(&curve, 9), 100.0);
        assert_eq!(bp(&curve, 10), 25.0);
        assert_eq!(bp(&curve, 1000), 25.0);
        assert_eq!(bp(&curve, 100_000), 25.0);
        assert_eq!(bp(&curve, 999_999), 25.0);
        assert_eq!(bp(&curve, 1_000_000), 10.0);
        assert_eq!(bp(&curve, 50_000_000), 10.0);
    }

    #[test]
    fn scaled_curve_clamps() {
        let curve = LossCurve::Scaled {
            base_bp: 25,
            min_bp: 25,
            max_bp: 100,
        };
        assert_eq!(bp(&curve, 1000), 25.0);
        assert_eq!(bp(&curve, 500), 50.0);
        assert_eq!(bp(&curve, 100), 100.0);
        assert_eq!(bp(&curve, 100_000), 25.0);
    }

    #[test]
    fn casualties_floor() {
        let rate = LossRate::from_basis_points(25);
        assert_eq!(rate.casualties(10_000, 1, 1), 25);
        assert_eq!(rate.casualties(50_000, 100, 1000), 12);
        assert_eq!(rate.casualties(39, 1, 1), 0);
        assert_eq!(LossRate::from_basis_points(10_000).casualties(7, 1, 1), 7);
    }

    #[test]
    fn exponential_curve_is_monotonic() {
        let curve = SuccessCurve::Exponential {
            base: 0.8,
            scale: 1.4,
            min: 0.01,
            max: 0.97,
        };
        let mut last = 0.0;
        for permille in [1, 10, 100, 500, 1000, 2000, 10_000, 1_000_000] {
            let p = curve.probability(StrengthRatio::from_permille(permille));
            assert!(p >= last, "curve dropped at {}", permille);
            assert!((0.01..=0.97).contains(&p));
            last = p;
        }
    }

    #[test]
    fn per_acre_cost_scales_with_land() {
        let d = Dominion::new("x", Race::new("Human")).with(Counter::Land, 1000);
        assert_eq!(ResourceCost::per_acre(Counter::Mana, 200).amount_for(&d), 200);
        assert_eq!(ResourceCost::flat(Counter::SpyStrength, 2).amount_for(&d), 2);
    }

    #[test]
    fn json_ruleset_parses() {
        let json = r#"{ "operations": [
            { "id": "peek",
              "costs": [{ "counter": "spy_strength", "flat": 1 }],
              "success": { "kind": "fixed", "chance": 0.5 },
              "on_failure": { "kind": "scaled", "base_bp": 10, "min_bp": 5, "max_bp": 50 } }
        ] }"#;
        let registry = Registry::from_json_str(json).unwrap();
        let rule = registry.get("peek").unwrap();
        assert_eq!(rule.success, SuccessCurve::Fixed { chance: 0.5 });
        assert!(rule.on_success.is_none());
        assert!(rule.damage.is_empty());
    }

    #[test]
    fn json_ruleset_rejects_duplicates() {
        let json = r#"{ "operations": [
            { "id": "peek", "success": { "kind": "always" } },
            { "id": "peek", "success": { "kind": "always" } }
        ] }"#;
        assert!(matches!(
            Registry::from_json_str(json),
            Err(RulesetError::DuplicateOperation(_))
        ));
    }

    #[test]
    fn json_ruleset_rejects_bad_tiers() {
        let json = r#"{ "operations": [
            { "id": "peek", "success": { "kind": "always" },
              "on_success": { "kind": "tiered", "tiers": [
                  { "min_ratio_permille": 10, "basis_points": 25 } ] } }
        ] }"#;
        assert!(matches!(
            Registry::from_json_str(json),
            Err(RulesetError::InvalidRule { .. })
        ));
    }

    #[test]
    fn json_ruleset_rejects_bad_probability() {
        let json = r#"{ "operations": [
            { "id": "peek", "success": { "kind": "fixed", "chance": 1.5 } }
        ] }"#;
        assert!(matches!(
            Registry::from_json_str(json),
            Err(RulesetError::InvalidRule { .. })
        ));
    }

    #[test]
    fn json_ruleset_reads_loss_sources() {
        let json = r#"{ "operations": [
            { "id": "raid", "success": { "kind": "always" },
              "loss_sources": [
                  { "counter": "military_draftees" },
                  { "counter": "military_unit1", "weight_permille": 500 } ] }
        ] }"#;
        let registry = Registry::from_json_str(json).unwrap();
        let rule = registry.get("raid").unwrap();
        assert_eq!(
            rule.loss_sources,
            vec![
                LossSource::full(Counter::Draftees),
                LossSource {
                    counter: Counter::Unit1,
                    weight_permille: 500,
                },
            ]
        );
    }

    #[test]
    fn json_ruleset_rejects_bad_loss_sources() {
        for sources in [
            r#"[{ "counter": "military_spies", "weight_permille": 1001 }]"#,
            r#"[{ "counter": "military_spies" }, { "counter": "military_spies" }]"#,
        ] {
            let json = format!(
                r#"{{ "operations": [ {{ "id": "raid", "success": {{ "kind": "always" }},
                     "loss_sources": {} }} ] }}"#,
                sources
            );
            assert!(
                matches!(
                    Registry::from_json_str(&json),
                    Err(RulesetError::InvalidRule { .. })
                ),
                "accepted {}",
                sources
            );
        }
    }

    #[test]
    fn json_ruleset_rejects_unknown_field() {
        let misspelled = r#"{ "operations": [
            { "id": "peek", "success": { "kind": "always" },
              "on_sucess": { "kind": "tiered", "tiers": [
                  { "min_ratio_permille": 0, "basis_points": 25 } ] } }
        ] }"#;
        assert!(matches!(
            Registry::from_json_str(misspelled),
            Err(RulesetError::Json(_))
        ));

        let nested = r#"{ "operations": [
            { "id": "peek", "success": { "kind": "always" },
              "damage": [{ "counter": "resource_food", "basis_points": 10, "steal": true }] }
        ] }"#;
        assert!(matches!(
            Registry::from_json_str(nested),
            Err(RulesetError::Json(_))
        ));

        let top_level = r#"{ "operations": [], "version": 2 }"#;
        assert!(matches!(
            Registry::from_json_str(top_level),
            Err(RulesetError::Json(_))
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(
            Registry::from_json_str("{ nope"),
            Err(RulesetError::Json(_))
        ));
    }
}
