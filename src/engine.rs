//! Engine state management.
//!
//! Holds the operation ruleset, the dominions registered in the current
//! round, engine options and the session random source. Each protocol
//! command is dispatched to a handler that writes its response lines.

use std::collections::HashMap;
use std::io::{self, Write};

use crate::dominion::Dominion;
use crate::ops::{
    ChanceSource, ForcedChance, OperationResolver, OperationResult, Outcome, Registry,
    RulesetError, SeededChance,
};
use crate::protocol::notation::{encode_notation, parse_notation, NotationError};
use crate::protocol::parser::{Command, SimulateParams};
use crate::simulate::{simulate_operation, SimulationConfig, SimulationError};
use crate::store::{perform_stored_operation, DominionStore, MemoryStore, StoreError};

/// Errors reported back to the client as `error <message>` lines.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Ruleset(#[from] RulesetError),

    #[error(transparent)]
    Notation(#[from] NotationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),

    #[error("malformed dominion json: {0}")]
    DominionJson(#[from] serde_json::Error),

    #[error("invalid dominion name '{0}'")]
    InvalidName(String),

    #[error("invalid value '{value}' for option {name}")]
    InvalidOption { name: String, value: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// How `op` results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Holds the mutable state of the engine between commands.
pub struct Engine {
    pub registry: Registry,
    pub store: MemoryStore,
    pub options: HashMap<String, String>,
    forced: Option<Outcome>,
    output: OutputFormat,
    seed: u64,
    rng: SeededChance,
}

impl Engine {
    /// Creates an engine with the built-in ruleset and an entropy-seeded
    /// random source.
    pub fn new() -> Self {
        Engine {
            registry: Registry::builtin(),
            store: MemoryStore::new(),
            options: HashMap::new(),
            forced: None,
            output: OutputFormat::Text,
            seed: 0,
            rng: SeededChance::from_entropy(),
        }
    }

    /// Forgets every dominion; the ruleset and options stay.
    pub fn new_round(&mut self) {
        self.store.clear();
    }

    /// Sets an engine option.
    ///
    /// Known options are validated and take effect immediately; unknown
    /// ones are stored as-is.
    pub fn set_option(&mut self, name: String, value: Option<String>) -> Result<(), EngineError> {
        let value = value.unwrap_or_default();
        let invalid = || EngineError::InvalidOption {
            name: name.clone(),
            value: value.clone(),
        };
        match name.as_str() {
            "Seed" => {
                let seed = value.parse::<u64>().map_err(|_| invalid())?;
                self.seed = seed;
                self.rng = if seed == 0 {
                    SeededChance::from_entropy()
                } else {
                    SeededChance::from_seed(seed)
                };
            }
            "ForceOutcome" => {
                self.forced = match value.as_str() {
                    "" | "off" => None,
                    other => Some(Outcome::from_name(other).ok_or_else(invalid)?),
                };
            }
            "Output" => {
                self.output = match value.as_str() {
                    "" | "text" => OutputFormat::Text,
                    "json" => OutputFormat::Json,
                    _ => return Err(invalid()),
                };
            }
            _ => {}
        }
        self.options.insert(name, value);
        Ok(())
    }

    /// Replaces the ruleset with one loaded from a JSON file.
    pub fn load_ruleset(&mut self, path: &str) -> Result<(), EngineError> {
        self.registry = Registry::load(path)?;
        Ok(())
    }

    /// Registers or replaces a dominion described in notation.
    pub fn add_dominion(&mut self, notation: &str) -> Result<(), EngineError> {
        let dominion = parse_notation(notation)?;
        self.store.save(dominion)?;
        Ok(())
    }

    /// Registers or replaces a dominion described as JSON. Races given this
    /// way need not be built in.
    pub fn add_dominion_json(&mut self, json: &str) -> Result<(), EngineError> {
        let dominion: Dominion = serde_json::from_str(json)?;
        if dominion.name.is_empty()
            || dominion
                .name
                .contains(|c: char| c.is_whitespace() || c == ':')
        {
            return Err(EngineError::InvalidName(dominion.name));
        }
        self.store.save(dominion)?;
        Ok(())
    }

    /// Resolves one operation against the stored dominions.
    pub fn perform(
        &mut self,
        attacker: &str,
        operation: &str,
        target: &str,
    ) -> Result<OperationResult, EngineError> {
        let resolver = OperationResolver::new(&self.registry);
        let mut forced;
        let chance: &mut dyn ChanceSource = match self.forced {
            Some(outcome) => {
                forced = ForcedChance(outcome);
                &mut forced
            }
            None => &mut self.rng,
        };
        let result =
            perform_stored_operation(&mut self.store, &resolver, attacker, operation, target, chance)?;
        Ok(result)
    }

    /// Handles the handshake: writes id, options and `opiok`.
    pub fn handle_opi<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "id name dominion-ops")?;
        writeln!(out, "id author dominion-ops")?;
        writeln!(out, "option name Seed type spin default 0 min 0 max {}", u64::MAX)?;
        writeln!(
            out,
            "option name ForceOutcome type combo default off var off var success var failure"
        )?;
        writeln!(out, "option name Output type combo default text var text var json")?;
        for id in self.registry.ids() {
            writeln!(out, "operation {}", id)?;
        }
        writeln!(out, "opiok")?;
        out.flush()
    }

    /// Handles the `isready` command.
    pub fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "readyok")?;
        out.flush()
    }

    /// Handles `show <name>`. The reply is itself a `dominion` command that
    /// re-registers the same state.
    pub fn handle_show<W: Write>(&self, name: &str, out: &mut W) -> Result<(), EngineError> {
        let dominion = self.store.load(name)?;
        match self.output {
            OutputFormat::Text => writeln!(out, "dominion {}", encode_notation(&dominion))?,
            OutputFormat::Json => {
                let json = serde_json::to_string(&dominion).map_err(io::Error::from)?;
                writeln!(out, "dominion json {}", json)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Handles `op <attacker> <operation> <target>`.
    pub fn handle_op<W: Write>(
        &mut self,
        attacker: &str,
        operation: &str,
        target: &str,
        out: &mut W,
    ) -> Result<(), EngineError> {
        let result = self.perform(attacker, operation, target)?;
        match self.output {
            OutputFormat::Text => writeln!(out, "result {}", format_result(&result))?,
            OutputFormat::Json => {
                let json = serde_json::to_string(&result).map_err(io::Error::from)?;
                writeln!(out, "result {}", json)?;
            }
        }
        out.flush()?;
        Ok(())
    }

    /// Handles `simulate`. Uses the `Seed` option as the base seed.
    pub fn handle_simulate<W: Write>(
        &self,
        params: &SimulateParams,
        out: &mut W,
    ) -> Result<(), EngineError> {
        let attacker = self.store.load(&params.attacker)?;
        let target = self.store.load(&params.target)?;
        let defaults = SimulationConfig::default();
        let config = SimulationConfig {
            trials: params.trials.unwrap_or(defaults.trials),
            threads: params.threads.unwrap_or(defaults.threads),
            seed: self.seed,
        };
        let resolver = OperationResolver::new(&self.registry);
        let summary = simulate_operation(&resolver, &attacker, &params.operation, &target, &config)?;
        writeln!(
            out,
            "info operation {} trials {} successes {} chance {:.4} rate {:.4} spies_lost {:.2}",
            summary.operation,
            summary.trials,
            summary.successes,
            summary.success_chance,
            summary.success_rate,
            summary.mean_spies_lost
        )?;
        out.flush()?;
        Ok(())
    }

    /// Dispatches one command. Returns `Ok(false)` when the session should
    /// end. Command failures are written as `error` lines; only I/O errors
    /// on the output stream propagate.
    pub fn handle_command<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<bool> {
        let outcome = match cmd {
            Command::Opi => self.handle_opi(out).map_err(EngineError::from),
            Command::IsReady => self.handle_isready(out).map_err(EngineError::from),
            Command::SetOption { name, value } => self.set_option(name, value),
            Command::Ruleset { path } => self.load_ruleset(&path),
            Command::Dominion { notation } => self.add_dominion(&notation),
            Command::DominionJson { json } => self.add_dominion_json(&json),
            Command::Show { name } => self.handle_show(&name, out),
            Command::Op {
                attacker,
                operation,
                target,
            } => self.handle_op(&attacker, &operation, &target, out),
            Command::Simulate(params) => self.handle_simulate(&params, out),
            Command::NewRound => {
                self.new_round();
                Ok(())
            }
            Command::Quit => return Ok(false),
        };

        match outcome {
            Ok(()) => {}
            Err(EngineError::Io(e)) => return Err(e),
            Err(e) => {
                log::warn!("{}", e);
                writeln!(out, "error {}", e)?;
                out.flush()?;
            }
        }
        Ok(true)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

fn format_deltas(deltas: &[crate::ops::CounterDelta]) -> String {
    if deltas.is_empty() {
        return "-".to_string();
    }
    deltas
        .iter()
        .map(|d| format!("{}={}", d.counter.name(), d.amount))
        .collect::<Vec<_>>()
        .join(",")
}

/// One-line text rendering of a result.
pub fn format_result(result: &OperationResult) -> String {
    format!(
        "{} operation {} ratio {} chance {:.4} cost {} losses {} damage {} gains {}",
        result.outcome.name(),
        result.operation,
        result.ratio,
        result.success_chance,
        format_deltas(&result.costs),
        format_deltas(&result.attacker_losses),
        format_deltas(&result.target_losses),
        format_deltas(&result.attacker_gains)
    )
}
