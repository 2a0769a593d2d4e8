//! Rule sets built on the kernel
//!
//! Each game is a [`Rules`](crate::sim::Rules) implementation; [`ArcadeSession`]
//! wraps whichever one was picked so a single clock can drive it.

pub mod flappy;
pub mod gatherer;
pub mod pacman;
pub mod platformer;
pub mod tetris;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub use flappy::{Flappy, FlappyConfig};
pub use gatherer::{Gatherer, GathererConfig};
pub use pacman::{Pacman, PacmanConfig};
pub use platformer::{Platformer, PlatformerConfig};
pub use tetris::{Tetris, TetrisConfig};

use crate::consts::{BLOCK_STEP_DT, GRID_STEP_DT, SIM_DT};
use crate::sim::{
    IntentSet, KeyBindings, LogicalKey, Phase, Session, SessionState, SimError, Simulation,
    Snapshot,
};

/// Which game to run
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    #[value(alias = "bird")]
    Flappy,
    #[value(alias = "pac-man")]
    Pacman,
    Platformer,
    Tetris,
    #[value(alias = "factory")]
    Gatherer,
}

impl GameKind {
    pub const ALL: [GameKind; 5] = [
        GameKind::Flappy,
        GameKind::Pacman,
        GameKind::Platformer,
        GameKind::Tetris,
        GameKind::Gatherer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Flappy => "flappy",
            GameKind::Pacman => "pacman",
            GameKind::Platformer => "platformer",
            GameKind::Tetris => "tetris",
            GameKind::Gatherer => "gatherer",
        }
    }

    /// Seconds per tick
    pub fn default_step(&self) -> f32 {
        match self {
            GameKind::Flappy | GameKind::Platformer => SIM_DT,
            GameKind::Pacman | GameKind::Gatherer => GRID_STEP_DT,
            GameKind::Tetris => BLOCK_STEP_DT,
        }
    }

    /// Default bindings plus this game's extras
    pub fn bindings(&self) -> KeyBindings {
        let mut bindings = KeyBindings::default();
        match self {
            GameKind::Tetris => {
                bindings.bind("ArrowUp", LogicalKey::Rotate);
            }
            GameKind::Gatherer => {
                bindings
                    .bind("KeyI", LogicalKey::Primary)
                    .bind("KeyC", LogicalKey::Secondary);
            }
            GameKind::Flappy | GameKind::Pacman | GameKind::Platformer => {}
        }
        bindings
    }
}

/// A session of any game
pub enum ArcadeSession {
    Flappy(Session<Flappy>),
    Pacman(Session<Pacman>),
    Platformer(Session<Platformer>),
    Tetris(Session<Tetris>),
    Gatherer(Session<Gatherer>),
}

/// Run `$body` with `$s` bound to the inner session
macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            ArcadeSession::Flappy($s) => $body,
            ArcadeSession::Pacman($s) => $body,
            ArcadeSession::Platformer($s) => $body,
            ArcadeSession::Tetris($s) => $body,
            ArcadeSession::Gatherer($s) => $body,
        }
    };
}

impl ArcadeSession {
    /// Start `kind` with default tuning
    pub fn new(kind: GameKind, seed: u64) -> Result<Self, SimError> {
        Ok(match kind {
            GameKind::Flappy => ArcadeSession::Flappy(Session::new(Flappy::default(), seed)?),
            GameKind::Pacman => ArcadeSession::Pacman(Session::new(Pacman::default(), seed)?),
            GameKind::Platformer => {
                ArcadeSession::Platformer(Session::new(Platformer::default(), seed)?)
            }
            GameKind::Tetris => ArcadeSession::Tetris(Session::new(Tetris::default(), seed)?),
            GameKind::Gatherer => {
                ArcadeSession::Gatherer(Session::new(Gatherer::default(), seed)?)
            }
        })
    }

    pub fn kind(&self) -> GameKind {
        match self {
            ArcadeSession::Flappy(_) => GameKind::Flappy,
            ArcadeSession::Pacman(_) => GameKind::Pacman,
            ArcadeSession::Platformer(_) => GameKind::Platformer,
            ArcadeSession::Tetris(_) => GameKind::Tetris,
            ArcadeSession::Gatherer(_) => GameKind::Gatherer,
        }
    }

    pub fn state(&self) -> SessionState {
        dispatch!(self, s => s.state())
    }

    pub fn seed(&self) -> u64 {
        dispatch!(self, s => s.seed())
    }

    pub fn reset(&mut self) -> Result<(), SimError> {
        dispatch!(self, s => s.reset())
    }

    pub fn reseed(&mut self, seed: u64) -> Result<(), SimError> {
        dispatch!(self, s => s.reseed(seed))
    }
}

impl Simulation for ArcadeSession {
    fn phase(&self) -> Phase {
        dispatch!(self, s => s.phase())
    }

    fn update(&mut self, intent: &IntentSet) -> Result<(), SimError> {
        dispatch!(self, s => s.update(intent))
    }

    fn snapshot(&self) -> Snapshot {
        dispatch!(self, s => s.snapshot())
    }
}
