//! Races and their spy-capable units.
//!
//! A race decides which of its military unit slots count toward spy
//! strength. Weights are stored in thousandths of a spy so that ratio and
//! casualty arithmetic stays in integers.

use serde::{Deserialize, Serialize};

use super::counter::Counter;

/// Spy weight of a plain `military_spies` unit, in thousandths.
pub const SPY_WEIGHT_PERMILLE: u64 = 1000;

/// A military unit slot that counts as a fraction of a spy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpyUnit {
    /// Unit slot, 1..=4.
    pub slot: u8,
    /// Spy weight when attacking, in thousandths of a spy.
    #[serde(default)]
    pub offense: u64,
    /// Spy weight when defending, in thousandths of a spy.
    #[serde(default)]
    pub defense: u64,
}

impl SpyUnit {
    /// Returns the dominion counter this unit is stored in.
    pub fn counter(&self) -> Option<Counter> {
        Counter::military_unit_slot(self.slot)
    }
}

/// A playable race.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Race {
    pub name: String,
    #[serde(default)]
    pub spy_units: Vec<SpyUnit>,
}

impl Race {
    /// Creates a race with no spy-capable units.
    pub fn new(name: impl Into<String>) -> Self {
        Race {
            name: name.into(),
            spy_units: Vec::new(),
        }
    }

    /// Adds a spy-capable unit slot.
    pub fn with_spy_unit(mut self, slot: u8, offense: u64, defense: u64) -> Self {
        self.spy_units.push(SpyUnit {
            slot,
            offense,
            defense,
        });
        self
    }

    /// Looks up a built-in race by case-insensitive name.
    ///
    /// Accepts `dark_elf`, `dark-elf` and `darkelf` for Dark Elf.
    pub fn builtin(name: &str) -> Option<Race> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let race = match key.as_str() {
            "human" => Race::new("Human"),
            "nomad" => Race::new("Nomad"),
            "halfling" => Race::new("Halfling").with_spy_unit(3, 200, 200),
            "darkelf" => Race::new("Dark Elf").with_spy_unit(2, 100, 0),
            "spirit" => Race::new("Spirit"),
            "undead" => Race::new("Undead"),
            _ => return None,
        };
        Some(race)
    }

    /// Returns the short lowercase key used in dominion notation.
    pub fn key(&self) -> String {
        self.name
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
}
