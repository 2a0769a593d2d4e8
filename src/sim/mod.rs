//! Deterministic simulation kernel
//!
//! All gameplay state lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID, which is insertion order)
//! - No rendering or platform dependencies

pub mod clock;
pub mod collision;
pub mod entity;
pub mod error;
pub mod grid;
pub mod input;
pub mod level;
pub mod session;

pub use clock::{Clock, Simulation};
pub use collision::{Aabb, detect_overlaps, overlapping};
pub use entity::{Entity, EntityId, EntityKind, EntityStore};
pub use error::SimError;
pub use grid::{Grid, TerrainKind, Tile};
pub use input::{Action, IntentSet, InputMapper, KeyBindings, LogicalKey};
pub use level::{
    LevelProvider, LevelWindow, NoLevel, PickupKind, ScrollingLevel, SectionGenerator, TileMap,
};
pub use session::{Phase, Rules, Session, SessionState, Snapshot, Sprite, World};
