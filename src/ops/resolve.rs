//! Operation outcome resolution.
//!
//! Resolves one espionage operation from an attacker against a target:
//! looks up the rule, checks costs, rolls success against the strength
//! ratio, then applies casualties and damage. All changes are computed on
//! working copies and committed together, so an `Err` leaves both
//! dominions untouched.

use serde::Serialize;

use super::chance::{ChanceSource, Outcome};
use super::ratio::{compute_strength_ratio, StrengthRatio};
use super::ruleset::{LossCurve, OperationRule, Registry};
use crate::dominion::{Counter, Dominion, Race, SPY_WEIGHT_PERMILLE};

/// Errors that abort a resolution before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("insufficient {counter}: need {required}, have {available}")]
    InsufficientResources {
        counter: Counter,
        required: u64,
        available: u64,
    },
}

/// An amount added to or removed from one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterDelta {
    pub counter: Counter,
    pub amount: u64,
}

/// Everything that happened during one resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    pub operation: String,
    pub outcome: Outcome,
    pub ratio: StrengthRatio,
    pub success_chance: f64,
    /// Casualty rate applied to the attacker, in basis points.
    pub loss_rate_bp: Option<f64>,
    pub costs: Vec<CounterDelta>,
    pub attacker_losses: Vec<CounterDelta>,
    pub target_losses: Vec<CounterDelta>,
    pub attacker_gains: Vec<CounterDelta>,
}

fn amount_in(deltas: &[CounterDelta], counter: Counter) -> u64 {
    deltas
        .iter()
        .filter(|d| d.counter == counter)
        .map(|d| d.amount)
        .sum()
}

impl OperationResult {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Total cost paid from a counter.
    pub fn cost(&self, counter: Counter) -> u64 {
        amount_in(&self.costs, counter)
    }

    /// Casualties the attacker took in a counter.
    pub fn attacker_loss(&self, counter: Counter) -> u64 {
        amount_in(&self.attacker_losses, counter)
    }

    /// Damage the target took in a counter.
    pub fn target_loss(&self, counter: Counter) -> u64 {
        amount_in(&self.target_losses, counter)
    }
}

/// Resolves operations against a fixed ruleset.
#[derive(Debug, Clone, Copy)]
pub struct OperationResolver<'a> {
    registry: &'a Registry,
}

impl<'a> OperationResolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        OperationResolver { registry }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Resolves `operation_id` from `attacker` against `target`.
    ///
    /// The caller must hold exclusive access to both dominions for the
    /// duration of the call and persist them afterwards.
    pub fn perform_operation(
        &self,
        attacker: &mut Dominion,
        operation_id: &str,
        target: &mut Dominion,
        chance: &mut dyn ChanceSource,
    ) -> Result<OperationResult, OperationError> {
        let rule = self.registry.get(operation_id)?;

        let mut next_attacker = attacker.clone();
        let mut next_target = target.clone();

        let costs = pay_costs(rule, &mut next_attacker)?;

        let ratio = compute_strength_ratio(attacker, target);
        let success_chance = rule.success.probability(ratio);
        let outcome = if chance.roll(success_chance) {
            Outcome::Success
        } else {
            Outcome::Failure
        };

        let curve = match outcome {
            Outcome::Success => rule.on_success.as_ref(),
            Outcome::Failure => rule.on_failure.as_ref(),
        };
        let (loss_rate_bp, attacker_losses) = match curve {
            Some(curve) => {
                let (rate, losses) = apply_casualties(rule, curve, ratio, &mut next_attacker);
                (Some(rate), losses)
            }
            None => (None, Vec::new()),
        };

        let mut target_losses = Vec::new();
        let mut attacker_gains = Vec::new();
        if outcome == Outcome::Success {
            for damage in &rule.damage {
                let amount = damage.amount_for(&next_target);
                let removed = next_target.sub_clamped(damage.counter, amount);
                if removed == 0 {
                    continue;
                }
                target_losses.push(CounterDelta {
                    counter: damage.counter,
                    amount: removed,
                });
                if damage.transfer {
                    next_attacker.add(damage.counter, removed);
                    attacker_gains.push(CounterDelta {
                        counter: damage.counter,
                        amount: removed,
                    });
                }
            }
        }

        log::debug!(
            "{} -> {}: {} {} (ratio {}, chance {:.3})",
            attacker.name,
            target.name,
            operation_id,
            outcome.name(),
            ratio,
            success_chance
        );

        *attacker = next_attacker;
        *target = next_target;

        Ok(OperationResult {
            operation: rule.id.clone(),
            outcome,
            ratio,
            success_chance,
            loss_rate_bp,
            costs,
            attacker_losses,
            target_losses,
            attacker_gains,
        })
    }
}

/// Deducts every cost or fails without touching the other counters.
fn pay_costs(
    rule: &OperationRule,
    attacker: &mut Dominion,
) -> Result<Vec<CounterDelta>, OperationError> {
    let mut owed: Vec<CounterDelta> = Vec::new();
    for cost in &rule.costs {
        let amount = cost.amount_for(attacker);
        if amount == 0 {
            continue;
        }
        match owed.iter_mut().find(|d| d.counter == cost.counter) {
            Some(d) => d.amount = d.amount.saturating_add(amount),
            None => owed.push(CounterDelta {
                counter: cost.counter,
                amount,
            }),
        }
    }

    for d in &owed {
        let available = attacker.get(d.counter);
        if available < d.amount {
            return Err(OperationError::InsufficientResources {
                counter: d.counter,
                required: d.amount,
                available,
            });
        }
    }
    for d in &owed {
        attacker.sub_clamped(d.counter, d.amount);
    }
    Ok(owed)
}

/// Counters that take casualties, each with a weight fraction.
///
/// Without configured sources, spies die at the full rate and a race unit
/// with offense weight `w` dies at `rate * w / 2`.
fn loss_weights(rule: &OperationRule, race: &Race) -> Vec<(Counter, u64, u64)> {
    if !rule.loss_sources.is_empty() {
        return rule
            .loss_sources
            .iter()
            .map(|s| (s.counter, s.weight_permille, 1000))
            .collect();
    }
    let mut weights = vec![(Counter::Spies, 1, 1)];
    weights.extend(
        race.spy_units
            .iter()
            .filter(|u| u.offense > 0)
            .filter_map(|u| {
                u.counter()
                    .map(|c| (c, u.offense, 2 * SPY_WEIGHT_PERMILLE))
            }),
    );
    weights
}

/// Kills a share of the attacker's stock in each loss source.
fn apply_casualties(
    rule: &OperationRule,
    curve: &LossCurve,
    ratio: StrengthRatio,
    attacker: &mut Dominion,
) -> (f64, Vec<CounterDelta>) {
    let rate = curve.rate(ratio);
    let mut losses = Vec::new();

    for (counter, weight_num, weight_den) in loss_weights(rule, &attacker.race) {
        let lost = rate.casualties(attacker.get(counter), weight_num, weight_den);
        let removed = attacker.sub_clamped(counter, lost);
        if removed > 0 {
            losses.push(CounterDelta {
                counter,
                amount: removed,
            });
        }
    }

    (rate.basis_points(), losses)
}
