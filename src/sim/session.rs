//! Game session: owns the world and drives one rule set through ticks
//!
//! Resolution order inside a single `update` is fixed:
//! 1. Rules apply the intent and advance physics
//! 2. Rules evaluate collisions and apply their effects
//! 3. Lose predicates, then win predicates (loss wins a tie)
//! 4. Level maintenance (generate ahead, prune behind)
//!
//! Dead entities are reaped at the end of the tick and the level/store
//! bookkeeping is audited.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityKind, EntityStore};
use super::error::SimError;
use super::input::IntentSet;
use super::level::LevelProvider;

/// Stream offset so rule RNG and level RNG never share a sequence
const RULES_RNG_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Playing,
    /// Run ended in a loss (terminal until reset)
    Over,
    /// Run ended in a win (terminal until reset)
    Won,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        self != Phase::Playing
    }
}

/// Score, lives and phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub score: u64,
    pub lives: u32,
    pub phase: Phase,
}

/// One drawable rectangle handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub kind: EntityKind,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Sprite {
    pub fn from_entity(entity: &Entity) -> Self {
        Self {
            kind: entity.kind,
            x: entity.pos.x,
            y: entity.pos.y,
            width: entity.size.x,
            height: entity.size.y,
        }
    }

    /// Sprite covering one grid cell
    pub fn cell(kind: EntityKind, column: i32, row: i32, cell_size: f32) -> Self {
        Self {
            kind,
            x: column as f32 * cell_size,
            y: row as f32 * cell_size,
            width: cell_size,
            height: cell_size,
        }
    }
}

/// Read-only view of a session for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub sprites: Vec<Sprite>,
    pub state: SessionState,
    /// World x at the left edge of the view
    pub camera_x: f32,
    pub tick: u64,
}

/// Everything a rule set may read and mutate during a tick
#[derive(Debug)]
pub struct World<L> {
    pub entities: EntityStore,
    pub level: L,
    pub state: SessionState,
    /// Seeded RNG for rule decisions (spawns, enemy choices)
    pub rng: Pcg32,
    pub tick: u64,
    defeated: bool,
}

impl<L: LevelProvider> World<L> {
    fn new(level: L, lives: u32, seed: u64) -> Self {
        Self {
            entities: EntityStore::new(),
            level,
            state: SessionState {
                score: 0,
                lives,
                phase: Phase::Playing,
            },
            rng: Pcg32::seed_from_u64(seed ^ RULES_RNG_SALT),
            tick: 0,
            defeated: false,
        }
    }

    pub fn add_score(&mut self, points: u64) {
        self.state.score += points;
    }

    /// Lose one life. Returns the lives left.
    pub fn lose_life(&mut self) -> u32 {
        self.state.lives = self.state.lives.saturating_sub(1);
        self.state.lives
    }

    /// Flag a terminal collision; the session ends the run this tick
    pub fn defeat(&mut self) {
        self.defeated = true;
    }

    pub fn is_defeated(&self) -> bool {
        self.defeated
    }
}

/// A game's rules, plugged into the kernel
///
/// Rules own per-run bookkeeping (player id, timers, active piece) and must be
/// `Clone` so the session can restore a pristine copy on reset.
pub trait Rules: Clone {
    type Level: LevelProvider;

    fn name(&self) -> &'static str;

    fn initial_lives(&self) -> u32 {
        1
    }

    /// Fresh level for a run
    fn build_level(&self, seed: u64) -> Result<Self::Level, SimError>;

    /// Spawn the initial entities
    fn setup(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError>;

    /// Step 1: apply intent, movement and physics
    fn advance(&mut self, world: &mut World<Self::Level>, intent: &IntentSet) -> Result<(), SimError>;

    /// Step 2: evaluate collisions and apply their effects
    fn resolve(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError>;

    /// Step 3a: extra loss predicate (lives and terminal collisions are checked by the session)
    fn is_lost(&self, _world: &World<Self::Level>) -> bool {
        false
    }

    /// Step 3b: completion predicate
    fn is_won(&self, _world: &World<Self::Level>) -> bool {
        false
    }

    /// Step 4: level maintenance
    fn maintain(&mut self, _world: &mut World<Self::Level>) -> Result<(), SimError> {
        Ok(())
    }

    fn camera_x(&self, _world: &World<Self::Level>) -> f32 {
        0.0
    }

    /// Sprites that are not entities (active piece, locked cells)
    fn sprites(&self, _world: &World<Self::Level>, _out: &mut Vec<Sprite>) {}
}

/// One play-through of a rule set
pub struct Session<R: Rules> {
    template: R,
    rules: R,
    world: World<R::Level>,
    seed: u64,
}

impl<R: Rules> Session<R> {
    pub fn new(rules: R, seed: u64) -> Result<Self, SimError> {
        let (working, world) = Self::fresh(&rules, seed)?;
        log::info!("{} session started with seed {}", rules.name(), seed);
        Ok(Self {
            template: rules,
            rules: working,
            world,
            seed,
        })
    }

    /// Back to the initial state of this seed
    pub fn reset(&mut self) -> Result<(), SimError> {
        let (rules, world) = Self::fresh(&self.template, self.seed)?;
        self.rules = rules;
        self.world = world;
        log::info!("{} session reset (seed {})", self.rules.name(), self.seed);
        Ok(())
    }

    /// Reset with a new seed
    pub fn reseed(&mut self, seed: u64) -> Result<(), SimError> {
        self.seed = seed;
        self.reset()
    }

    fn fresh(template: &R, seed: u64) -> Result<(R, World<R::Level>), SimError> {
        let mut rules = template.clone();
        let level = rules.build_level(seed)?;
        let mut world = World::new(level, rules.initial_lives(), seed);
        let started = rules.setup(&mut world).and_then(|()| rules.maintain(&mut world));
        Self::absorb(rules.name(), &mut world, started)?;
        Self::audit(&world)?;
        Ok((rules, world))
    }

    /// Advance one tick. A no-op once the run has ended.
    pub fn update(&mut self, intent: &IntentSet) -> Result<(), SimError> {
        if self.world.state.phase != Phase::Playing {
            return Ok(());
        }
        self.world.tick += 1;

        let stepped = match self.rules.advance(&mut self.world, intent) {
            Ok(()) => self.rules.resolve(&mut self.world),
            Err(e) => Err(e),
        };
        Self::absorb(self.rules.name(), &mut self.world, stepped)?;

        self.world.state.phase = if self.world.defeated
            || self.world.state.lives == 0
            || self.rules.is_lost(&self.world)
        {
            Phase::Over
        } else if self.rules.is_won(&self.world) {
            Phase::Won
        } else {
            Phase::Playing
        };

        let maintained = self.rules.maintain(&mut self.world);
        Self::absorb(self.rules.name(), &mut self.world, maintained)?;

        self.world.entities.reap();
        Self::audit(&self.world)?;

        if self.world.state.phase.is_terminal() {
            log::info!(
                "{} ended {:?} at tick {} with score {}",
                self.rules.name(),
                self.world.state.phase,
                self.world.tick,
                self.world.state.score
            );
        }
        Ok(())
    }

    /// Blocked spawns end the run; everything else propagates
    fn absorb(
        name: &str,
        world: &mut World<R::Level>,
        result: Result<(), SimError>,
    ) -> Result<(), SimError> {
        match result {
            Ok(()) => Ok(()),
            Err(SimError::SpawnBlocked { what }) => {
                log::info!("{name}: no room to spawn {what}");
                world.defeat();
                world.state.phase = Phase::Over;
                Ok(())
            }
            Err(e) => {
                log::error!("{name} halted: {e}");
                Err(e)
            }
        }
    }

    fn audit(world: &World<R::Level>) -> Result<(), SimError> {
        world.level.audit(&world.entities)?;
        if let Some((rider, anchor)) = world.entities.dangling_anchor() {
            log::error!("Entity {rider} anchored to missing {anchor}");
            return Err(SimError::ConsistencyViolation(format!(
                "entity {rider} anchored to missing {anchor}"
            )));
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let mut sprites = Vec::new();
        self.world.level.sprites(&mut sprites);
        sprites.extend(
            self.world
                .entities
                .for_each_alive(None)
                .map(|e| Sprite::from_entity(&e)),
        );
        self.rules.sprites(&self.world, &mut sprites);
        Snapshot {
            sprites,
            state: self.world.state,
            camera_x: self.rules.camera_x(&self.world),
            tick: self.world.tick,
        }
    }

    pub fn state(&self) -> SessionState {
        self.world.state
    }

    pub fn phase(&self) -> Phase {
        self.world.state.phase
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn world(&self) -> &World<R::Level> {
        &self.world
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    /// Direct access for tests and tools; gameplay goes through `update`
    pub fn parts_mut(&mut self) -> (&mut R, &mut World<R::Level>) {
        (&mut self.rules, &mut self.world)
    }
}
