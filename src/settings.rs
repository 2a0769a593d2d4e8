//! Runtime settings
//!
//! Loaded from a JSON file. Every field has a default, so a partial file (or
//! none at all) is fine.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS};
use crate::games::GameKind;
use crate::sim::{Clock, KeyBindings, LogicalKey};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Kernel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed seed for reproducible runs; random when unset
    pub seed: Option<u64>,

    // === Clock ===
    /// Cap on ticks run for one frame
    pub max_substeps: u32,
    /// Largest frame delta accepted (seconds)
    pub max_frame_dt: f32,
    /// Per-game tick length overrides (seconds)
    pub steps: BTreeMap<GameKind, f32>,

    // === Input ===
    /// Key code overrides applied on top of each game's bindings
    pub bindings: BTreeMap<String, LogicalKey>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,

            max_substeps: MAX_SUBSTEPS,
            max_frame_dt: MAX_FRAME_DT,
            steps: BTreeMap::new(),

            bindings: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let settings = Self::from_json(&std::fs::read_to_string(path)?)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load, falling back to defaults when the file is missing or broken
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(settings) => settings,
            Err(SettingsError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Ignoring {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Tick length for a game (override or the game's default)
    pub fn step_for(&self, kind: GameKind) -> f32 {
        self.steps
            .get(&kind)
            .copied()
            .filter(|s| *s > 0.0)
            .unwrap_or_else(|| kind.default_step())
    }

    /// Clock configured for a game
    pub fn clock_for(&self, kind: GameKind) -> Clock {
        Clock::new(self.step_for(kind)).with_limits(self.max_substeps, self.max_frame_dt)
    }

    /// A game's bindings with the overrides applied
    pub fn bindings_for(&self, kind: GameKind) -> KeyBindings {
        let mut bindings = kind.bindings();
        bindings.merge(&self.bindings);
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{GRID_STEP_DT, SIM_DT};

    #[test]
    fn test_empty_json_gives_defaults() {
        assert_eq!(Settings::from_json("{}").unwrap(), Settings::default());
    }

    #[test]
    fn test_partial_json() {
        let settings = Settings::from_json(
            r#"{ "seed": 12, "steps": { "pacman": 0.2 }, "bindings": { "KeyW": "Up" } }"#,
        )
        .unwrap();
        assert_eq!(settings.seed, Some(12));
        assert_eq!(settings.max_substeps, MAX_SUBSTEPS);
        assert_eq!(settings.step_for(GameKind::Pacman), 0.2);
        assert_eq!(settings.step_for(GameKind::Gatherer), GRID_STEP_DT);
        assert_eq!(settings.step_for(GameKind::Flappy), SIM_DT);
        assert_eq!(
            settings.bindings_for(GameKind::Pacman).lookup("KeyW"),
            Some(LogicalKey::Up)
        );
        // Game extras survive the merge
        assert_eq!(
            settings.bindings_for(GameKind::Tetris).lookup("ArrowUp"),
            Some(LogicalKey::Rotate)
        );
    }

    #[test]
    fn test_non_positive_step_is_ignored() {
        let mut settings = Settings::default();
        settings.steps.insert(GameKind::Tetris, 0.0);
        assert_eq!(settings.step_for(GameKind::Tetris), GameKind::Tetris.default_step());
    }

    #[test]
    fn test_json_round_trip() {
        let mut settings = Settings::default();
        settings.seed = Some(5);
        settings.steps.insert(GameKind::Flappy, 0.02);
        settings.bindings.insert("KeyJ".into(), LogicalKey::Primary);
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json(&json).unwrap(), settings);
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        assert!(matches!(
            Settings::from_json("{ \"seed\": \"twelve\" }"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/nonexistent/arcade-settings.json");
        assert_eq!(settings, Settings::default());
        assert!(matches!(
            Settings::load("/nonexistent/arcade-settings.json"),
            Err(SettingsError::Io(_))
        ));
    }
}
