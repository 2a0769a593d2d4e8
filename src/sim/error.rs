//! Simulation error taxonomy
//!
//! Gameplay failures (collisions, missed jumps) are state transitions, not
//! errors. Only the cases below leave the normal flow.

use thiserror::Error;

use super::entity::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A required entity has no room to appear. The session turns this into
    /// an immediate `Over` instead of returning it.
    #[error("no room to spawn {what}")]
    SpawnBlocked { what: &'static str },

    /// Bookkeeping between the entity store and a level provider broke.
    /// Always fatal.
    #[error("consistency violation: {0}")]
    ConsistencyViolation(String),

    /// A level or rule configuration that cannot be built (ragged maze,
    /// unknown tile, out of range tuning).
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Lookup of an id that is not in the store.
    #[error("entity {0} not found")]
    NotFound(EntityId),
}

impl SimError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimError::ConsistencyViolation(_))
    }
}
