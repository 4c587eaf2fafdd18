//! Espionage operations.
//!
//! Strength ratios, the operation ruleset, injectable random sources, and
//! the resolver that ties them together.

pub mod chance;
pub mod ratio;
pub mod resolve;
pub mod ruleset;

pub use chance::{ChanceSource, ForcedChance, Outcome, SeededChance};
pub use ratio::{compute_strength_ratio, spy_points, Side, StrengthRatio};
pub use resolve::{CounterDelta, OperationError, OperationResolver, OperationResult};
pub use ruleset::{
    DamageRule, LossCurve, LossRate, LossSource, LossTier, OperationRule, Registry, ResourceCost,
    RulesetError, SuccessCurve,
};
