//! Dominion state representation.
//!
//! A dominion is a race plus a fixed array of integer stocks indexed by
//! `Counter as usize`. The engine borrows dominions mutably for the length
//! of one resolution; persisting them is the caller's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::counter::{Counter, ALL_COUNTERS, COUNTER_COUNT};
use super::race::Race;

/// Starting land for a fresh dominion.
pub const STARTING_LAND: u64 = 250;

/// Starting peasants for a fresh dominion.
pub const STARTING_PEASANTS: u64 = 1300;

/// Spy and wizard strength are percentages capped at this value.
pub const MAX_STRENGTH: u64 = 100;

/// Snapshot of a single dominion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DominionRepr", into = "DominionRepr")]
pub struct Dominion {
    pub name: String,
    pub race: Race,
    counters: [u64; COUNTER_COUNT],
}

impl Dominion {
    /// Creates a dominion with starting land, peasants and full strength.
    pub fn new(name: impl Into<String>, race: Race) -> Self {
        let mut counters = [0; COUNTER_COUNT];
        for c in ALL_COUNTERS {
            counters[c as usize] = Dominion::starting_value(c);
        }
        Dominion {
            name: name.into(),
            race,
            counters,
        }
    }

    /// Value a counter holds in a freshly created dominion.
    pub const fn starting_value(counter: Counter) -> u64 {
        match counter {
            Counter::Land => STARTING_LAND,
            Counter::Peasants => STARTING_PEASANTS,
            Counter::SpyStrength | Counter::WizardStrength => MAX_STRENGTH,
            _ => 0,
        }
    }

    /// Returns the value of a counter.
    pub fn get(&self, counter: Counter) -> u64 {
        self.counters[counter as usize]
    }

    /// Overwrites a counter.
    pub fn set(&mut self, counter: Counter, value: u64) {
        self.counters[counter as usize] = value;
    }

    /// Builder-style `set`.
    pub fn with(mut self, counter: Counter, value: u64) -> Self {
        self.set(counter, value);
        self
    }

    /// Adds to a counter, saturating at `u64::MAX`.
    pub fn add(&mut self, counter: Counter, amount: u64) {
        let idx = counter as usize;
        self.counters[idx] = self.counters[idx].saturating_add(amount);
    }

    /// Subtracts from a counter, flooring at zero. Returns the amount
    /// actually removed.
    pub fn sub_clamped(&mut self, counter: Counter, amount: u64) -> u64 {
        let idx = counter as usize;
        let removed = amount.min(self.counters[idx]);
        self.counters[idx] -= removed;
        removed
    }

    /// Iterates over every counter and its value.
    pub fn counters(&self) -> impl Iterator<Item = (Counter, u64)> + '_ {
        ALL_COUNTERS.iter().map(move |&c| (c, self.get(c)))
    }
}

/// Serialized form: counters as a name -> value map, zero entries omitted.
#[derive(Serialize, Deserialize)]
struct DominionRepr {
    name: String,
    race: Race,
    #[serde(default)]
    counters: BTreeMap<Counter, u64>,
}

impl From<Dominion> for DominionRepr {
    fn from(d: Dominion) -> Self {
        let counters = d.counters().filter(|(_, v)| *v != 0).collect();
        DominionRepr {
            name: d.name,
            race: d.race,
            counters,
        }
    }
}

impl From<DominionRepr> for Dominion {
    fn from(repr: DominionRepr) -> Self {
        let mut counters = [0; COUNTER_COUNT];
        for (c, v) in repr.counters {
            counters[c as usize] = v;
        }
        Dominion {
            name: repr.name,
            race: repr.race,
            counters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn halfling() -> Race {
        Race::builtin("halfling").unwrap()
    }

    #[test]
    fn new_dominion_has_starting_values() {
        let d = Dominion::new("Shire", halfling());
        assert_eq!(d.get(Counter::Land), STARTING_LAND);
        assert_eq!(d.get(Counter::Peasants), STARTING_PEASANTS);
        assert_eq!(d.get(Counter::SpyStrength), 100);
        assert_eq!(d.get(Counter::Spies), 0);
        assert_eq!(d.get(Counter::Unit3), 0);
    }

    #[test]
    fn sub_clamped_floors_at_zero() {
        let mut d = Dominion::new("Shire", halfling()).with(Counter::Spies, 10);
        assert_eq!(d.sub_clamped(Counter::Spies, 4), 4);
        assert_eq!(d.get(Counter::Spies), 6);
        assert_eq!(d.sub_clamped(Counter::Spies, 100), 6);
        assert_eq!(d.get(Counter::Spies), 0);
    }

    #[test]
    fn add_saturates() {
        let mut d = Dominion::new("Shire", halfling()).with(Counter::Platinum, u64::MAX - 1);
        d.add(Counter::Platinum, 10);
        assert_eq!(d.get(Counter::Platinum), u64::MAX);
    }

    #[test]
    fn json_omits_zero_counters() {
        let d = Dominion::new("Shire", halfling()).with(Counter::Spies, 42);
        let json = serde_json::to_value(&d).unwrap();
        let counters = json["counters"].as_object().unwrap();
        assert_eq!(counters["military_spies"], 42);
        assert!(!counters.contains_key("military_unit1"));

        let back: Dominion = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }
}
