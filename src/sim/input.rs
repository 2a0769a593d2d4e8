//! Input mapping: raw key events to a per-tick intent
//!
//! The presentation layer feeds key codes (`"ArrowLeft"`, `"Space"`, ...) or
//! logical keys directly. Once per tick the session samples an [`IntentSet`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Layout-independent key alphabet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LogicalKey {
    Left,
    Right,
    Up,
    Down,
    Primary,
    Secondary,
    Rotate,
}

impl LogicalKey {
    #[inline]
    fn index(self) -> usize {
        self as usize
    }

    /// Keys that fire once per physical press
    pub fn is_edge_triggered(self) -> bool {
        matches!(
            self,
            LogicalKey::Primary | LogicalKey::Secondary | LogicalKey::Rotate
        )
    }
}

/// Discrete action requested this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Action {
    #[default]
    None,
    Primary,
    Secondary,
}

/// Sampled input for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IntentSet {
    /// -1 left, 0 none, 1 right
    pub move_x: i8,
    /// -1 up, 0 none, 1 down
    pub move_y: i8,
    pub action: Action,
    pub rotate: bool,
}

impl IntentSet {
    pub fn moving(move_x: i8, move_y: i8) -> Self {
        Self {
            move_x: move_x.signum(),
            move_y: move_y.signum(),
            ..Default::default()
        }
    }

    pub fn acting(action: Action) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    pub fn rotating() -> Self {
        Self {
            rotate: true,
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Key code to logical key table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    map: BTreeMap<String, LogicalKey>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self {
            map: BTreeMap::new(),
        };
        bindings
            .bind("ArrowLeft", LogicalKey::Left)
            .bind("ArrowRight", LogicalKey::Right)
            .bind("ArrowUp", LogicalKey::Up)
            .bind("ArrowDown", LogicalKey::Down)
            .bind("Space", LogicalKey::Primary)
            .bind("KeyX", LogicalKey::Secondary)
            .bind("KeyZ", LogicalKey::Rotate);
        bindings
    }
}

impl KeyBindings {
    pub fn bind(&mut self, code: impl Into<String>, key: LogicalKey) -> &mut Self {
        self.map.insert(code.into(), key);
        self
    }

    pub fn lookup(&self, code: &str) -> Option<LogicalKey> {
        self.map.get(code).copied()
    }

    /// Apply overrides on top of these bindings
    pub fn merge(&mut self, overrides: &BTreeMap<String, LogicalKey>) {
        for (code, key) in overrides {
            self.map.insert(code.clone(), *key);
        }
    }
}

/// Tracks held keys between ticks
#[derive(Debug, Clone, Default)]
pub struct InputMapper {
    /// Currently down
    held: [bool; 7],
    /// Down at any point since the last sample
    latched: [bool; 7],
    /// Unconsumed press events for edge-triggered keys
    pressed: [bool; 7],
    bindings: KeyBindings,
}

impl InputMapper {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Default::default()
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Key down. Repeats while held do not re-trigger edge actions.
    pub fn press(&mut self, key: LogicalKey) {
        let i = key.index();
        if !self.held[i] {
            self.pressed[i] = true;
        }
        self.held[i] = true;
        self.latched[i] = true;
    }

    pub fn release(&mut self, key: LogicalKey) {
        self.held[key.index()] = false;
    }

    /// Feed a raw key code. Unknown codes are ignored and return false.
    pub fn handle_code(&mut self, code: &str, down: bool) -> bool {
        let Some(key) = self.bindings.lookup(code) else {
            log::trace!("Ignoring unbound key {code}");
            return false;
        };
        if down {
            self.press(key);
        } else {
            self.release(key);
        }
        true
    }

    /// Sample the intent for this tick and consume what was read
    pub fn sample_intent(&mut self) -> IntentSet {
        let active = |key: LogicalKey| self.held[key.index()] || self.latched[key.index()];
        let axis = |neg: LogicalKey, pos: LogicalKey| active(pos) as i8 - active(neg) as i8;

        let move_x = axis(LogicalKey::Left, LogicalKey::Right);
        let move_y = axis(LogicalKey::Up, LogicalKey::Down);

        let action = if self.take_press(LogicalKey::Primary) {
            Action::Primary
        } else if self.take_press(LogicalKey::Secondary) {
            Action::Secondary
        } else {
            Action::None
        };
        let rotate = self.take_press(LogicalKey::Rotate);

        self.latched = [false; 7];
        IntentSet {
            move_x,
            move_y,
            action,
            rotate,
        }
    }

    /// Forget all key state (bindings are kept)
    pub fn clear(&mut self) {
        self.held = [false; 7];
        self.latched = [false; 7];
        self.pressed = [false; 7];
    }

    fn take_press(&mut self, key: LogicalKey) -> bool {
        std::mem::take(&mut self.pressed[key.index()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_direction_persists_across_samples() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Right);
        assert_eq!(input.sample_intent().move_x, 1);
        assert_eq!(input.sample_intent().move_x, 1);
        input.release(LogicalKey::Right);
        assert_eq!(input.sample_intent().move_x, 0);
    }

    #[test]
    fn test_tap_within_one_tick_is_visible() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Up);
        input.release(LogicalKey::Up);
        assert_eq!(input.sample_intent().move_y, -1);
        assert_eq!(input.sample_intent().move_y, 0);
    }

    #[test]
    fn test_opposite_directions_cancel() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Left);
        input.press(LogicalKey::Right);
        assert_eq!(input.sample_intent().move_x, 0);
    }

    #[test]
    fn test_edge_action_fires_once_per_press() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Primary);
        // Key auto-repeat while held
        input.press(LogicalKey::Primary);
        assert_eq!(input.sample_intent().action, Action::Primary);
        assert_eq!(input.sample_intent().action, Action::None);

        input.release(LogicalKey::Primary);
        input.press(LogicalKey::Primary);
        assert_eq!(input.sample_intent().action, Action::Primary);
    }

    #[test]
    fn test_unreported_action_is_kept() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Primary);
        input.press(LogicalKey::Secondary);
        assert_eq!(input.sample_intent().action, Action::Primary);
        assert_eq!(input.sample_intent().action, Action::Secondary);
        assert_eq!(input.sample_intent().action, Action::None);
    }

    #[test]
    fn test_rotate_is_edge_triggered() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Rotate);
        assert!(input.sample_intent().rotate);
        assert!(!input.sample_intent().rotate);
        assert!(LogicalKey::Rotate.is_edge_triggered());
        assert!(!LogicalKey::Left.is_edge_triggered());
    }

    #[test]
    fn test_handle_code_ignores_unknown() {
        let mut input = InputMapper::default();
        assert!(!input.handle_code("KeyQ", true));
        assert!(input.sample_intent().is_idle());

        assert!(input.handle_code("Space", true));
        assert_eq!(input.sample_intent().action, Action::Primary);
    }

    #[test]
    fn test_binding_overrides() {
        let mut bindings = KeyBindings::default();
        let mut overrides = BTreeMap::new();
        overrides.insert("ArrowUp".to_string(), LogicalKey::Rotate);
        bindings.merge(&overrides);

        let mut input = InputMapper::new(bindings);
        input.handle_code("ArrowUp", true);
        let intent = input.sample_intent();
        assert!(intent.rotate);
        assert_eq!(intent.move_y, 0);
    }

    #[test]
    fn test_clear_drops_pending_presses() {
        let mut input = InputMapper::default();
        input.press(LogicalKey::Primary);
        input.press(LogicalKey::Down);
        input.clear();
        assert!(input.sample_intent().is_idle());
    }
}
