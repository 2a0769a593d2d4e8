//! Arcade kernel headless driver
//!
//! Runs one game on the fixed-step clock with a scripted player and prints the
//! final state as JSON.
//!
//! ```text
//! arcade-kernel [game] [ticks] [--seed N] [--settings FILE]
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use arcade_kernel::sim::{EntityKind, InputMapper, Simulation, Snapshot};
use arcade_kernel::{ArcadeSession, GameKind, Settings, init_logging};
use clap::Parser;

const DEFAULT_TICKS: u64 = 1200;
const SETTINGS_FILE: &str = "arcade.json";
/// Directions cycled through by the scripted player on grid games
const HEADINGS: [&str; 4] = ["ArrowRight", "ArrowDown", "ArrowLeft", "ArrowUp"];

/// Run an arcade game headless with a scripted player
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Game to run
    #[arg(value_enum, ignore_case = true, default_value_t = GameKind::Flappy)]
    game: GameKind,

    /// Ticks to run before stopping
    #[arg(default_value_t = DEFAULT_TICKS)]
    ticks: u64,

    /// Fixed seed, overriding the settings file
    #[arg(long)]
    seed: Option<u64>,

    /// JSON settings file; defaults are used when it is missing
    #[arg(long, default_value = SETTINGS_FILE)]
    settings: PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
fn time_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(target_arch = "wasm32")]
fn time_seed() -> u64 {
    0
}

/// Press and release within one frame
fn tap(input: &mut InputMapper, code: &str, when: bool) {
    if when {
        input.handle_code(code, true);
        input.handle_code(code, false);
    }
}

/// Scripted player: reads the last frame, feeds key codes
fn steer(kind: GameKind, last: &Snapshot, input: &mut InputMapper) {
    let tick = last.tick;
    match kind {
        GameKind::Flappy => {
            let sinking = last
                .sprites
                .iter()
                .any(|s| s.kind == EntityKind::Player && s.y > 320.0);
            tap(input, "Space", sinking);
        }
        GameKind::Platformer => {
            input.handle_code("ArrowRight", true);
            tap(input, "Space", tick % 45 == 0);
            tap(input, "KeyX", tick % 15 == 0);
        }
        GameKind::Pacman | GameKind::Tetris | GameKind::Gatherer => {
            let heading = HEADINGS[(tick / 12) as usize % HEADINGS.len()];
            for code in HEADINGS {
                input.handle_code(code, code == heading);
            }
            tap(input, "KeyI", kind == GameKind::Gatherer && tick % 30 == 0);
        }
    }
}

fn run(args: Args) -> Result<()> {
    let settings = Settings::load_or_default(&args.settings);
    let seed = args.seed.or(settings.seed).unwrap_or_else(time_seed);
    let kind = args.game;

    let mut session = ArcadeSession::new(kind, seed)
        .with_context(|| format!("failed to start {} with seed {seed}", kind.as_str()))?;
    let mut clock = settings.clock_for(kind);
    let mut input = InputMapper::new(settings.bindings_for(kind));
    let step = clock.step();
    log::info!(
        "Running {} for {} ticks ({} s/tick, seed {seed})",
        kind.as_str(),
        args.ticks,
        step
    );

    let mut last = session.snapshot();
    while clock.is_running() && clock.ticks() < args.ticks {
        steer(kind, &last, &mut input);
        clock
            .advance(step, &mut session, &mut input, |s| last = s.clone())
            .with_context(|| format!("{} halted after {} ticks", kind.as_str(), clock.ticks()))?;

        if last.tick % 120 == 0 {
            log::debug!(
                "tick {}: score {} lives {} camera {:.0}",
                last.tick,
                last.state.score,
                last.state.lives,
                last.camera_x
            );
        }
        if last.state.phase.is_terminal() {
            break;
        }
    }

    log::info!(
        "{} finished: {:?} after {} ticks",
        kind.as_str(),
        last.state.phase,
        last.tick
    );
    println!(
        "{}",
        serde_json::to_string(&last.state).context("failed to encode final state")?
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("arcade-kernel").chain(args.iter().copied()))
    }

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.game, GameKind::Flappy);
        assert_eq!(args.ticks, DEFAULT_TICKS);
        assert_eq!(args.seed, None);
        assert_eq!(args.settings, PathBuf::from(SETTINGS_FILE));
    }

    #[test]
    fn test_positionals_and_flags() {
        let args = parse(&["Pac-Man", "300", "--seed", "9", "--settings", "alt.json"]).unwrap();
        assert_eq!(args.game, GameKind::Pacman);
        assert_eq!(args.ticks, 300);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.settings, PathBuf::from("alt.json"));
    }

    #[test]
    fn test_help_and_bad_input() {
        assert_eq!(parse(&["--help"]).unwrap_err().kind(), ErrorKind::DisplayHelp);
        assert_eq!(parse(&["wordle"]).unwrap_err().kind(), ErrorKind::InvalidValue);
        assert_eq!(parse(&["tetris", "many"]).unwrap_err().kind(), ErrorKind::ValueValidation);
        assert_eq!(parse(&["--seed"]).unwrap_err().kind(), ErrorKind::InvalidValue);
    }
}
