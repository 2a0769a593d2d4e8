//! Side-scrolling flyer
//!
//! The bird moves right through world space at the scroll speed while pipes
//! stay put, so pipe generation and pruning are ordinary level maintenance.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::sim::collision::overlapping;
use crate::sim::level::{LevelProvider, ScrollingLevel, SectionGenerator};
use crate::sim::{
    Action, Entity, EntityId, EntityKind, EntityStore, IntentSet, Rules, SimError, World,
};

/// Tuning for the flyer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlappyConfig {
    pub view_width: f32,
    pub view_height: f32,
    /// Bird's fixed distance from the left edge of the view
    pub bird_screen_x: f32,
    pub bird_size: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    /// Vertical speed is clamped to `[-max_velocity, max_velocity]`
    pub max_velocity: f32,
    pub pipe_width: f32,
    pub pipe_gap: f32,
    pub pipe_spacing: f32,
    pub scroll_speed: f32,
}

impl Default for FlappyConfig {
    fn default() -> Self {
        Self {
            view_width: 400.0,
            view_height: 600.0,
            bird_screen_x: 50.0,
            bird_size: 30.0,
            gravity: 0.5,
            jump_velocity: -8.0,
            max_velocity: 10.0,
            pipe_width: 50.0,
            pipe_gap: 150.0,
            pipe_spacing: 200.0,
            scroll_speed: 2.0,
        }
    }
}

/// Vertical motion of the bird
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flight {
    pub velocity: f32,
    gravity: f32,
    jump_velocity: f32,
    max_velocity: f32,
}

impl Flight {
    pub fn new(config: &FlappyConfig) -> Self {
        Self {
            velocity: 0.0,
            gravity: config.gravity,
            jump_velocity: config.jump_velocity,
            max_velocity: config.max_velocity,
        }
    }

    /// Jump: velocity becomes the jump velocity whatever it was
    pub fn flap(&mut self) {
        self.velocity = self.jump_velocity;
    }

    /// One tick of gravity. Returns the vertical displacement.
    pub fn fall(&mut self) -> f32 {
        self.velocity =
            (self.velocity + self.gravity).clamp(-self.max_velocity, self.max_velocity);
        self.velocity
    }

    /// Stop against the ceiling
    pub fn halt(&mut self) {
        self.velocity = 0.0;
    }
}

/// One pipe pair per section. The bottom half is anchored to the top half.
#[derive(Debug, Clone, Copy)]
pub struct PipeField {
    config: FlappyConfig,
}

impl SectionGenerator for PipeField {
    fn section_width(&self) -> f32 {
        self.config.pipe_spacing
    }

    fn generate(&mut self, start: f32, store: &mut EntityStore, rng: &mut Pcg32) -> usize {
        let c = &self.config;
        let gap_top = rng.random_range(0.0..(c.view_height - c.pipe_gap));
        let gap_bottom = gap_top + c.pipe_gap;

        let top = store.add(Entity::new(
            EntityKind::Obstacle,
            Vec2::new(start, 0.0),
            Vec2::new(c.pipe_width, gap_top),
        ));
        store.add(
            Entity::new(
                EntityKind::Obstacle,
                Vec2::new(start, gap_bottom),
                Vec2::new(c.pipe_width, c.view_height - gap_bottom),
            )
            .anchored_to(top),
        );
        2
    }
}

#[derive(Debug, Clone)]
pub struct Flappy {
    config: FlappyConfig,
    bird: Option<EntityId>,
    flight: Flight,
}

impl Default for Flappy {
    fn default() -> Self {
        Self::new(FlappyConfig::default())
    }
}

impl Flappy {
    pub fn new(config: FlappyConfig) -> Self {
        Self {
            config,
            bird: None,
            flight: Flight::new(&config),
        }
    }

    pub fn config(&self) -> &FlappyConfig {
        &self.config
    }

    pub fn flight(&self) -> &Flight {
        &self.flight
    }

    pub fn bird(&self) -> Option<EntityId> {
        self.bird
    }

    fn bird_id(&self) -> Result<EntityId, SimError> {
        self.bird
            .ok_or_else(|| SimError::ConsistencyViolation("flappy: no bird".into()))
    }
}

impl Rules for Flappy {
    type Level = ScrollingLevel<PipeField>;

    fn name(&self) -> &'static str {
        "flappy"
    }

    fn build_level(&self, seed: u64) -> Result<Self::Level, SimError> {
        // First pipe enters at the right edge of the view
        let field = PipeField {
            config: self.config,
        };
        Ok(ScrollingLevel::new(field, seed, self.config.view_width))
    }

    fn setup(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError> {
        let c = &self.config;
        let pos = Vec2::new(c.bird_screen_x, c.view_height / 2.0);
        self.bird = Some(world.entities.add(Entity::new(
            EntityKind::Player,
            pos,
            Vec2::splat(c.bird_size),
        )));
        self.flight = Flight::new(c);
        Ok(())
    }

    fn advance(&mut self, world: &mut World<Self::Level>, intent: &IntentSet) -> Result<(), SimError> {
        if intent.action == Action::Primary {
            self.flight.flap();
        }
        let dy = self.flight.fall();

        let bird = world.entities.get_mut(self.bird_id()?)?;
        bird.pos += Vec2::new(self.config.scroll_speed, dy);
        if bird.pos.y < 0.0 {
            bird.pos.y = 0.0;
            self.flight.halt();
        }
        bird.vel = Vec2::new(self.config.scroll_speed, self.flight.velocity);
        Ok(())
    }

    fn resolve(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError> {
        let id = self.bird_id()?;
        let floor = self.config.view_height;
        let bird = world.entities.get_mut(id)?;
        if bird.bottom() > floor {
            bird.pos.y = floor - bird.size.y;
            world.defeat();
        }
        if !overlapping(&world.entities, id, &[EntityKind::Obstacle]).is_empty() {
            world.defeat();
        }
        Ok(())
    }

    fn maintain(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError> {
        let c = self.config;
        let x = world.entities.get(self.bird_id()?)?.pos.x;
        world
            .level
            .ensure_generated(x, c.view_width - c.bird_screen_x, &mut world.entities);

        // A pipe scores once its top half leaves the view
        let passed = world
            .level
            .prune(x, c.bird_screen_x, &mut world.entities)
            .iter()
            .filter(|e| e.kind == EntityKind::Obstacle && e.anchor.is_none())
            .count();
        world.add_score(passed as u64);
        Ok(())
    }

    fn camera_x(&self, world: &World<Self::Level>) -> f32 {
        self.bird
            .and_then(|id| world.entities.get(id).ok())
            .map_or(0.0, |b| b.pos.x - self.config.bird_screen_x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Phase, Session};

    fn config() -> FlappyConfig {
        FlappyConfig::default()
    }

    #[test]
    fn test_gravity_from_rest() {
        let mut flight = Flight::new(&config());
        assert_eq!(flight.fall(), 0.5);
        assert_eq!(flight.velocity, 0.5);
    }

    #[test]
    fn test_velocity_is_clamped() {
        let mut flight = Flight::new(&config());
        for _ in 0..100 {
            flight.fall();
        }
        assert_eq!(flight.velocity, 10.0);

        flight.velocity = -30.0;
        flight.fall();
        assert_eq!(flight.velocity, -10.0);
    }

    #[test]
    fn test_flap_sets_exact_velocity() {
        let mut flight = Flight::new(&config());
        flight.velocity = 7.25;
        flight.flap();
        assert_eq!(flight.velocity, -8.0);
        flight.velocity = -3.0;
        flight.flap();
        assert_eq!(flight.velocity, -8.0);
    }

    #[test]
    fn test_bird_falls_to_floor_and_run_ends() {
        let mut session = Session::new(Flappy::default(), 3).unwrap();
        let idle = IntentSet::default();
        for _ in 0..200 {
            session.update(&idle).unwrap();
            if session.phase() != Phase::Playing {
                break;
            }
        }
        assert_eq!(session.phase(), Phase::Over);

        let rules = session.rules();
        let bird = session.world().entities.get(rules.bird().unwrap()).unwrap();
        assert_eq!(bird.bottom(), config().view_height);
    }

    #[test]
    fn test_ceiling_stops_bird() {
        let mut session = Session::new(Flappy::default(), 3).unwrap();
        let flap = IntentSet::acting(Action::Primary);
        for _ in 0..40 {
            session.update(&flap).unwrap();
            if session.phase() != Phase::Playing {
                break;
            }
            let bird = session.world().entities.get(session.rules().bird().unwrap()).unwrap();
            assert!(bird.pos.y >= 0.0);
        }
    }

    #[test]
    fn test_passed_pipes_score() {
        let mut session = Session::new(Flappy::default(), 11).unwrap();
        let (rules, world) = session.parts_mut();
        let bird = rules.bird().unwrap();
        // Between the pipes at 1000 and 1200
        world.entities.get_mut(bird).unwrap().pos.x = 1060.0;

        session.update(&IntentSet::default()).unwrap();
        assert_eq!(session.phase(), Phase::Playing);
        // Pipes at 400, 600 and 800 are behind the view
        assert_eq!(session.state().score, 3);
        assert!(session.world().level.window().generated_up_to >= 1062.0 + 350.0);
    }

    #[test]
    fn test_pipe_halves_leave_a_gap() {
        let mut store = EntityStore::new();
        let mut level = ScrollingLevel::new(PipeField { config: config() }, 5, 0.0);
        level.ensure_generated(0.0, 1000.0, &mut store);

        let pipes: Vec<_> = store.for_each_alive(Some(EntityKind::Obstacle)).collect();
        assert_eq!(pipes.len(), 10);
        for pair in pipes.chunks(2) {
            let (top, bottom) = (pair[0], pair[1]);
            assert_eq!(bottom.anchor, Some(top.id));
            assert!((bottom.pos.y - top.bottom() - config().pipe_gap).abs() < 1e-3);
            assert!((bottom.bottom() - config().view_height).abs() < 1e-3);
        }
    }
}
