//! Dominion storage.
//!
//! The resolver works on borrowed snapshots; a `DominionStore` is where
//! those snapshots come from and go back to. `MemoryStore` backs the
//! protocol engine and tests.

use std::collections::HashMap;

use crate::dominion::Dominion;
use crate::ops::{ChanceSource, OperationError, OperationResolver, OperationResult};

/// Errors from store-backed operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("unknown dominion '{0}'")]
    UnknownDominion(String),

    #[error("dominion '{0}' cannot target itself")]
    SelfTarget(String),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Read and write access to dominion snapshots by name.
///
/// Implementations must return consistent snapshots and write each
/// dominion atomically.
pub trait DominionStore {
    fn load(&self, name: &str) -> Result<Dominion, StoreError>;

    fn save(&mut self, dominion: Dominion) -> Result<(), StoreError>;

    fn contains(&self, name: &str) -> bool;
}

/// `HashMap`-backed store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    dominions: HashMap<String, Dominion>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.dominions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dominions.is_empty()
    }

    pub fn clear(&mut self) {
        self.dominions.clear();
    }
}

impl DominionStore for MemoryStore {
    fn load(&self, name: &str) -> Result<Dominion, StoreError> {
        self.dominions
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::UnknownDominion(name.to_string()))
    }

    fn save(&mut self, dominion: Dominion) -> Result<(), StoreError> {
        self.dominions.insert(dominion.name.clone(), dominion);
        Ok(())
    }

    fn contains(&self, name: &str) -> bool {
        self.dominions.contains_key(name)
    }
}

/// Loads both dominions, resolves, and writes them back on success.
///
/// Nothing is written when the resolution fails.
pub fn perform_stored_operation<S: DominionStore + ?Sized>(
    store: &mut S,
    resolver: &OperationResolver<'_>,
    attacker: &str,
    operation_id: &str,
    target: &str,
    chance: &mut dyn ChanceSource,
) -> Result<OperationResult, StoreError> {
    if attacker == target {
        return Err(StoreError::SelfTarget(attacker.to_string()));
    }
    let mut attacker = store.load(attacker)?;
    let mut target = store.load(target)?;

    let result = resolver.perform_operation(&mut attacker, operation_id, &mut target, chance)?;

    store.save(attacker)?;
    store.save(target)?;
    Ok(result)
}
