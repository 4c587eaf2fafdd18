//! Spy strength ratio calculation.
//!
//! Spy points are counted in thousandths of a spy and normalized by land
//! into spy points per acre (SPA). The ratio of attacker SPA to target SPA
//! is kept as an exact fraction so tier boundaries never drift.

use std::cmp::Ordering;

use serde::{Serialize, Serializer};

use crate::dominion::{Counter, Dominion, SPY_WEIGHT_PERMILLE};

/// Which spy weights apply to a side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Offense,
    Defense,
}

/// Returns a dominion's spy points in thousandths of a spy.
pub fn spy_points(dominion: &Dominion, side: Side) -> u128 {
    let mut points = u128::from(dominion.get(Counter::Spies)) * u128::from(SPY_WEIGHT_PERMILLE);
    for unit in &dominion.race.spy_units {
        let Some(counter) = unit.counter() else {
            continue;
        };
        let weight = match side {
            Side::Offense => unit.offense,
            Side::Defense => unit.defense,
        };
        points = points.saturating_add(u128::from(dominion.get(counter)) * u128::from(weight));
    }
    points
}

pub(crate) fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Exact comparison of `a / b` with `c / d` for non-zero denominators.
///
/// Falls back to comparing integer parts and then the reciprocals of the
/// remainders when the cross products do not fit in `u128`.
pub(crate) fn cmp_fractions(a: u128, b: u128, c: u128, d: u128) -> Ordering {
    if let (Some(lhs), Some(rhs)) = (a.checked_mul(d), c.checked_mul(b)) {
        return lhs.cmp(&rhs);
    }
    let (qa, ra) = (a / b, a % b);
    let (qc, rc) = (c / d, c % d);
    if qa != qc {
        return qa.cmp(&qc);
    }
    match (ra, rc) {
        (0, 0) => Ordering::Equal,
        (0, _) => Ordering::Less,
        (_, 0) => Ordering::Greater,
        // ra/b vs rc/d is d/rc vs b/ra.
        _ => cmp_fractions(d, rc, b, ra),
    }
}

/// Attacker SPA divided by target SPA, as an exact fraction in lowest
/// terms.
#[derive(Debug, Clone, Copy)]
pub struct StrengthRatio {
    num: u128,
    den: u128,
}

impl StrengthRatio {
    /// Builds a ratio from a numerator and a non-zero denominator.
    pub fn new(num: u128, den: u128) -> Self {
        let den = den.max(1);
        let g = gcd(num, den);
        StrengthRatio {
            num: num / g,
            den: den / g,
        }
    }

    /// Builds a ratio from a value in thousandths.
    pub fn from_permille(permille: u64) -> Self {
        StrengthRatio::new(u128::from(permille), 1000)
    }

    pub fn numerator(&self) -> u128 {
        self.num
    }

    pub fn denominator(&self) -> u128 {
        self.den
    }

    /// Lossy conversion for reporting and probability curves.
    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Compares against a threshold given in thousandths.
    pub fn cmp_permille(&self, permille: u64) -> Ordering {
        self.cmp(&StrengthRatio::from_permille(permille))
    }
}

impl PartialEq for StrengthRatio {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for StrengthRatio {}

impl PartialOrd for StrengthRatio {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StrengthRatio {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_fractions(self.num, self.den, other.num, other.den)
    }
}

impl Serialize for StrengthRatio {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl std::fmt::Display for StrengthRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}", self.as_f64())
    }
}

/// Computes attacker SPA over target SPA.
///
/// Both sides are floored at one spy and one acre, so the result is always
/// finite and strictly positive. Common factors are cancelled before the
/// cross multiplication; only products beyond `u128` after that saturate.
pub fn compute_strength_ratio(attacker: &Dominion, target: &Dominion) -> StrengthRatio {
    let mut attacker_points =
        spy_points(attacker, Side::Offense).max(u128::from(SPY_WEIGHT_PERMILLE));
    let mut target_points = spy_points(target, Side::Defense).max(u128::from(SPY_WEIGHT_PERMILLE));
    let mut attacker_land = u128::from(attacker.get(Counter::Land).max(1));
    let mut target_land = u128::from(target.get(Counter::Land).max(1));

    let g = gcd(attacker_points, target_points);
    attacker_points /= g;
    target_points /= g;
    let g = gcd(attacker_land, target_land);
    attacker_land /= g;
    target_land /= g;

    StrengthRatio::new(
        attacker_points.saturating_mul(target_land),
        target_points.saturating_mul(attacker_land),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dominion::Race;

    fn dominion(race: &str) -> Dominion {
        Dominion::new(race, Race::builtin(race).unwrap())
    }

    #[test]
    fn equal_spies_give_unit_ratio() {
        let a = dominion("halfling").with(Counter::Spies, 10_000);
        let t = dominion("nomad").with(Counter::Spies, 10_000);
        assert_eq!(compute_strength_ratio(&a, &t).cmp_permille(1000), Ordering::Equal);
    }

    #[test]
    fn land_normalizes_strength() {
        let a = dominion("nomad")
            .with(Counter::Spies, 1000)
            .with(Counter::Land, 500);
        let t = dominion("nomad")
            .with(Counter::Spies, 1000)
            .with(Counter::Land, 250);
        // Same spies spread over twice the land is half the SPA.
        assert_eq!(compute_strength_ratio(&a, &t), StrengthRatio::from_permille(500));
    }

    #[test]
    fn spy_units_use_side_weights() {
        let d = dominion("halfling").with(Counter::Unit3, 50_000);
        assert_eq!(spy_points(&d, Side::Offense), 10_000_000);
        assert_eq!(spy_points(&d, Side::Defense), 10_000_000);

        let elf = dominion("darkelf").with(Counter::Unit2, 1000);
        assert_eq!(spy_points(&elf, Side::Offense), 100_000);
        assert_eq!(spy_points(&elf, Side::Defense), 0);
    }

    #[test]
    fn empty_target_is_clamped_to_one_spy() {
        let a = dominion("nomad").with(Counter::Spies, 10);
        let t = dominion("nomad");
        let r = compute_strength_ratio(&a, &t);
        assert_eq!(r.cmp_permille(10_000), Ordering::Equal);
        assert!(r.as_f64().is_finite());
    }

    #[test]
    fn empty_attacker_is_still_positive() {
        let a = dominion("nomad");
        let t = dominion("nomad").with(Counter::Spies, 1000);
        let r = compute_strength_ratio(&a, &t);
        assert!(r.as_f64() > 0.0);
        assert_eq!(r.cmp_permille(1), Ordering::Equal);
    }

    #[test]
    fn zero_land_does_not_divide_by_zero() {
        let a = dominion("nomad")
            .with(Counter::Spies, 5)
            .with(Counter::Land, 0);
        let t = dominion("nomad")
            .with(Counter::Spies, 5)
            .with(Counter::Land, 0);
        assert_eq!(compute_strength_ratio(&a, &t).cmp_permille(1000), Ordering::Equal);
    }

    #[test]
    fn ordering_is_by_value() {
        assert!(StrengthRatio::new(1, 3) < StrengthRatio::new(1, 2));
        assert_eq!(StrengthRatio::new(2, 4), StrengthRatio::new(1, 2));
        assert_eq!(StrengthRatio::new(5, 0).denominator(), 1);
    }

    #[test]
    fn ratios_are_stored_in_lowest_terms() {
        let r = StrengthRatio::new(250_000, 1_000_000);
        assert_eq!((r.numerator(), r.denominator()), (1, 4));
        let zero = StrengthRatio::new(0, 77);
        assert_eq!((zero.numerator(), zero.denominator()), (0, 1));
    }

    #[test]
    fn ordering_survives_cross_product_overflow() {
        let max = u128::MAX;
        // 1 + 1/(max - 1) is smaller than 1 + 1/(max - 2).
        let smaller = StrengthRatio::new(max, max - 1);
        let larger = StrengthRatio::new(max - 1, max - 2);
        assert!(smaller < larger);
        assert!(larger > smaller);
        assert_eq!(smaller.cmp(&smaller), Ordering::Equal);
        assert_eq!(cmp_fractions(max, 2, max - 1, 2), Ordering::Greater);
    }

    #[test]
    fn extreme_counters_keep_exact_ratio() {
        let a = dominion("nomad")
            .with(Counter::Spies, u64::MAX)
            .with(Counter::Land, u64::MAX);
        let t = dominion("nomad")
            .with(Counter::Spies, u64::MAX)
            .with(Counter::Land, u64::MAX);
        assert_eq!(compute_strength_ratio(&a, &t).cmp_permille(1000), Ordering::Equal);

        let small_land = t.clone().with(Counter::Land, 1);
        let r = compute_strength_ratio(&small_land, &a);
        assert_eq!(r.cmp_permille(u64::MAX), Ordering::Greater);
    }
}
