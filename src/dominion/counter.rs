//! Named integer stocks held by a dominion.
//!
//! Every counter is enumerated here with the snake-case name used on the
//! wire and in ruleset files. The `#[repr(u8)]` discriminant indexes the
//! fixed-size counter array on `Dominion`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The number of counters a dominion tracks.
pub const COUNTER_COUNT: usize = 15;

/// A named stock on a dominion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Counter {
    Land = 0,
    Peasants = 1,
    Platinum = 2,
    Food = 3,
    Mana = 4,
    SpyStrength = 5,
    WizardStrength = 6,
    Draftees = 7,
    Unit1 = 8,
    Unit2 = 9,
    Unit3 = 10,
    Unit4 = 11,
    Spies = 12,
    Wizards = 13,
    Archmages = 14,
}

/// All counters in discriminant order.
pub const ALL_COUNTERS: [Counter; COUNTER_COUNT] = [
    Counter::Land,
    Counter::Peasants,
    Counter::Platinum,
    Counter::Food,
    Counter::Mana,
    Counter::SpyStrength,
    Counter::WizardStrength,
    Counter::Draftees,
    Counter::Unit1,
    Counter::Unit2,
    Counter::Unit3,
    Counter::Unit4,
    Counter::Spies,
    Counter::Wizards,
    Counter::Archmages,
];

impl Counter {
    /// Returns the wire name, e.g. `military_spies`.
    pub const fn name(self) -> &'static str {
        match self {
            Counter::Land => "land",
            Counter::Peasants => "peasants",
            Counter::Platinum => "resource_platinum",
            Counter::Food => "resource_food",
            Counter::Mana => "resource_mana",
            Counter::SpyStrength => "spy_strength",
            Counter::WizardStrength => "wizard_strength",
            Counter::Draftees => "military_draftees",
            Counter::Unit1 => "military_unit1",
            Counter::Unit2 => "military_unit2",
            Counter::Unit3 => "military_unit3",
            Counter::Unit4 => "military_unit4",
            Counter::Spies => "military_spies",
            Counter::Wizards => "military_wizards",
            Counter::Archmages => "military_archmages",
        }
    }

    /// Parses a counter from its wire name.
    pub fn from_name(s: &str) -> Option<Counter> {
        ALL_COUNTERS.iter().copied().find(|c| c.name() == s)
    }

    /// Returns the counter for military unit slot 1..=4.
    pub const fn military_unit_slot(slot: u8) -> Option<Counter> {
        match slot {
            1 => Some(Counter::Unit1),
            2 => Some(Counter::Unit2),
            3 => Some(Counter::Unit3),
            4 => Some(Counter::Unit4),
            _ => None,
        }
    }
}

impl std::fmt::Display for Counter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Counter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Counter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Counter::from_name(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown counter '{}'", s)))
    }
}
