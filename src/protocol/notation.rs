//! Compact one-line dominion notation.
//!
//! Format: `<name>:<race>[:<counter>=<value>,...]`
//!
//! Counters not listed keep the starting values of `Dominion::new`, so the
//! encoder writes `=0` for counters that start non-zero and have been
//! drained.
//! Example: `shire:halfling:military_spies=10000,military_unit3=50000`.

use crate::dominion::{Counter, Dominion, Race};

/// Errors that can occur during notation parsing.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("expected 2 or 3 sections separated by ':', got {0}")]
    WrongSectionCount(usize),

    #[error("empty dominion name")]
    EmptyName,

    #[error("unknown race '{0}'")]
    UnknownRace(String),

    #[error("unknown counter '{0}'")]
    UnknownCounter(String),

    #[error("invalid value for counter '{0}'")]
    InvalidValue(String),

    #[error("duplicate counter '{0}'")]
    DuplicateCounter(String),

    #[error("invalid counter entry: '{0}'")]
    InvalidEntry(String),
}

/// Parses one `<counter>=<value>` entry.
fn parse_entry(entry: &str) -> Result<(Counter, u64), NotationError> {
    let (name, value) = entry
        .split_once('=')
        .ok_or_else(|| NotationError::InvalidEntry(entry.to_string()))?;
    let counter = Counter::from_name(name.trim())
        .ok_or_else(|| NotationError::UnknownCounter(name.trim().to_string()))?;
    let value = value
        .trim()
        .parse::<u64>()
        .map_err(|_| NotationError::InvalidValue(name.trim().to_string()))?;
    Ok((counter, value))
}

/// Parses a dominion from notation.
pub fn parse_notation(s: &str) -> Result<Dominion, NotationError> {
    let sections: Vec<&str> = s.trim().split(':').collect();
    if sections.len() < 2 || sections.len() > 3 {
        return Err(NotationError::WrongSectionCount(sections.len()));
    }

    let name = sections[0].trim();
    if name.is_empty() {
        return Err(NotationError::EmptyName);
    }
    let race = Race::builtin(sections[1].trim())
        .ok_or_else(|| NotationError::UnknownRace(sections[1].trim().to_string()))?;

    let mut dominion = Dominion::new(name, race);
    let Some(counters) = sections.get(2) else {
        return Ok(dominion);
    };

    let mut seen = Vec::new();
    for entry in counters.split(',').filter(|e| !e.trim().is_empty()) {
        let (counter, value) = parse_entry(entry)?;
        if seen.contains(&counter) {
            return Err(NotationError::DuplicateCounter(counter.name().to_string()));
        }
        seen.push(counter);
        dominion.set(counter, value);
    }
    Ok(dominion)
}

/// Encodes a dominion, listing every non-zero counter and every counter
/// with a non-zero starting value.
pub fn encode_notation(dominion: &Dominion) -> String {
    let counters: Vec<String> = dominion
        .counters()
        .filter(|&(c, v)| v != 0 || Dominion::starting_value(c) != 0)
        .map(|(c, v)| format!("{}={}", c.name(), v))
        .collect();
    format!(
        "{}:{}:{}",
        dominion.name,
        dominion.race.key(),
        counters.join(",")
    )
}
