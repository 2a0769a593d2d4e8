//! Arcade Kernel - A deterministic 2D tile/grid game-loop kernel
//!
//! Core modules:
//! - `sim`: Deterministic simulation kernel (clock, entities, collisions, levels, input, session)
//! - `games`: Rule sets plugged into the kernel (flappy, pac-man, platformer, tetris, gatherer)
//! - `settings`: JSON configuration

pub mod games;
pub mod settings;
pub mod sim;

pub use games::{ArcadeSession, GameKind};
pub use settings::{Settings, SettingsError};

/// Kernel configuration constants
pub mod consts {
    /// Fixed simulation timestep for continuous games (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Logical step for grid-stepped games
    pub const GRID_STEP_DT: f32 = 0.15;
    /// Logical step for the falling-block game
    pub const BLOCK_STEP_DT: f32 = 0.1;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Largest frame delta fed into the accumulator (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;
}

/// Install the platform logger.
///
/// Native builds use `env_logger` (configure with `RUST_LOG`), browser builds
/// forward to the console. Safe to call more than once.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}
