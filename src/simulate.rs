//! Monte Carlo estimation of an operation's odds.
//!
//! Runs many independent resolutions of the same operation on copies of
//! the two dominions. Each trial gets its own `SmallRng` seeded from the
//! base seed plus the trial index, so a given seed produces the same
//! summary regardless of the thread count.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::dominion::{Counter, Dominion};
use crate::ops::{compute_strength_ratio, OperationError, OperationResolver, SeededChance};

/// Errors from a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Number of independent resolutions.
    pub trials: usize,
    /// Worker threads; 1 runs on the calling thread.
    pub threads: usize,
    /// Base seed (0 = use entropy).
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            trials: 1000,
            threads: 4,
            seed: 0,
        }
    }
}

/// Aggregate results of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub operation: String,
    pub trials: usize,
    pub successes: usize,
    pub failures: usize,
    /// Probability the curve assigned, identical for every trial.
    pub success_chance: f64,
    /// Observed success fraction.
    pub success_rate: f64,
    /// Mean spies lost by the attacker per trial.
    pub mean_spies_lost: f64,
    /// Mean of all attacker casualties per trial.
    pub mean_units_lost: f64,
}

#[derive(Debug, Clone, Copy)]
struct Trial {
    success: bool,
    spies_lost: u64,
    units_lost: u64,
}

fn run_trial(
    resolver: &OperationResolver<'_>,
    attacker: &Dominion,
    operation_id: &str,
    target: &Dominion,
    rng: SmallRng,
) -> Result<Trial, OperationError> {
    let mut attacker = attacker.clone();
    let mut target = target.clone();
    let mut chance = SeededChance::new(rng);
    let result = resolver.perform_operation(&mut attacker, operation_id, &mut target, &mut chance)?;
    Ok(Trial {
        success: result.succeeded(),
        spies_lost: result.attacker_loss(Counter::Spies),
        units_lost: result.attacker_losses.iter().map(|d| d.amount).sum(),
    })
}

fn trial_rng(seed: u64, index: usize) -> SmallRng {
    if seed != 0 {
        SmallRng::seed_from_u64(seed.wrapping_add(index as u64))
    } else {
        SmallRng::from_entropy()
    }
}

/// Resolves `operation_id` `config.trials` times and summarizes.
///
/// Neither dominion is modified.
pub fn simulate_operation(
    resolver: &OperationResolver<'_>,
    attacker: &Dominion,
    operation_id: &str,
    target: &Dominion,
    config: &SimulationConfig,
) -> Result<SimulationSummary, SimulationError> {
    let rule = resolver.registry().get(operation_id)?;
    let success_chance = rule
        .success
        .probability(compute_strength_ratio(attacker, target));

    let trials: Vec<Trial> = if config.threads > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()?;
        pool.install(|| {
            (0..config.trials)
                .into_par_iter()
                .map(|i| run_trial(resolver, attacker, operation_id, target, trial_rng(config.seed, i)))
                .collect::<Result<Vec<_>, _>>()
        })?
    } else {
        (0..config.trials)
            .map(|i| run_trial(resolver, attacker, operation_id, target, trial_rng(config.seed, i)))
            .collect::<Result<Vec<_>, _>>()?
    };

    let successes = trials.iter().filter(|t| t.success).count();
    let n = trials.len().max(1) as f64;
    let summary = SimulationSummary {
        operation: rule.id.clone(),
        trials: trials.len(),
        successes,
        failures: trials.len() - successes,
        success_chance,
        success_rate: successes as f64 / n,
        mean_spies_lost: trials.iter().map(|t| t.spies_lost as f64).sum::<f64>() / n,
        mean_units_lost: trials.iter().map(|t| t.units_lost as f64).sum::<f64>() / n,
    };
    log::info!(
        "simulated {} x{}: {}/{} succeeded",
        summary.operation,
        summary.trials,
        summary.successes,
        summary.trials
    );
    Ok(summary)
}
