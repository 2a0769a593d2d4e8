//! Endless side-scrolling platformer
//!
//! Terrain comes in sections of platforms plus a ground strip. Enemies are
//! anchored to the platform they patrol, so pruning a platform always takes
//! its enemies with it.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use crate::sim::collision::{detect_overlaps, overlapping};
use crate::sim::{
    Action, Entity, EntityId, EntityKind, EntityStore, IntentSet, LevelProvider, Rules,
    ScrollingLevel, SectionGenerator, SimError, World,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlatformerConfig {
    pub view_width: f32,
    pub view_height: f32,
    pub player_size: Vec2,
    pub player_start: Vec2,
    pub run_speed: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
    pub section_width: f32,
    pub platforms_per_section: usize,
    pub enemies_per_section: usize,
    /// Platform top edges fall in `[min, max)`
    pub platform_y: (f32, f32),
    pub platform_width: (f32, f32),
    pub platform_height: f32,
    pub ground_height: f32,
    pub enemy_size: f32,
    pub enemy_speed: f32,
    pub bullet_size: Vec2,
    pub bullet_speed: f32,
    /// Ticks between shots
    pub shot_cooldown: u32,
    pub lives: u32,
    pub enemy_points: u64,
    /// How far back the player reappears after losing a life
    pub respawn_backoff: f32,
    /// Ticks of immunity after a respawn
    pub respawn_grace: u32,
}

impl Default for PlatformerConfig {
    fn default() -> Self {
        Self {
            view_width: 800.0,
            view_height: 600.0,
            player_size: Vec2::new(40.0, 60.0),
            player_start: Vec2::new(50.0, 0.0),
            run_speed: 5.0,
            gravity: 0.6,
            jump_velocity: 15.0,
            section_width: 2400.0,
            platforms_per_section: 5,
            enemies_per_section: 3,
            platform_y: (200.0, 500.0),
            platform_width: (100.0, 300.0),
            platform_height: 20.0,
            ground_height: 20.0,
            enemy_size: 30.0,
            enemy_speed: 2.0,
            bullet_size: Vec2::new(10.0, 5.0),
            bullet_speed: 10.0,
            shot_cooldown: 20,
            lives: 3,
            enemy_points: 10,
            respawn_backoff: 200.0,
            respawn_grace: 60,
        }
    }
}

impl PlatformerConfig {
    pub fn ground_y(&self) -> f32 {
        self.view_height - self.ground_height
    }
}

/// Random platforms with patrolling enemies over a continuous ground strip
#[derive(Debug, Clone, Copy)]
pub struct Terrain {
    config: PlatformerConfig,
}

impl Terrain {
    pub fn new(config: PlatformerConfig) -> Self {
        Self { config }
    }
}

impl SectionGenerator for Terrain {
    fn section_width(&self) -> f32 {
        self.config.section_width
    }

    fn generate(&mut self, start: f32, store: &mut EntityStore, rng: &mut Pcg32) -> usize {
        let c = &self.config;
        let mut platforms = Vec::with_capacity(c.platforms_per_section);
        for _ in 0..c.platforms_per_section {
            let x = start + rng.random_range(0.0..c.section_width);
            let y = rng.random_range(c.platform_y.0..c.platform_y.1);
            let width = rng.random_range(c.platform_width.0..c.platform_width.1);
            let platform = Entity::new(
                EntityKind::Obstacle,
                Vec2::new(x, y),
                Vec2::new(width, c.platform_height),
            );
            platforms.push((store.add(platform), platform));
        }

        let mut enemies = 0;
        if !platforms.is_empty() {
            for _ in 0..c.enemies_per_section {
                let (id, platform) = platforms[rng.random_range(0..platforms.len())];
                let slack = (platform.size.x - c.enemy_size).max(0.0);
                let x = platform.pos.x + rng.random_range(0.0..=slack);
                let enemy = Entity::new(
                    EntityKind::Enemy,
                    Vec2::new(x, platform.pos.y - c.enemy_size),
                    Vec2::splat(c.enemy_size),
                )
                .with_velocity(Vec2::new(c.enemy_speed, 0.0))
                .anchored_to(id);
                store.add(enemy);
                enemies += 1;
            }
        }

        store.add(Entity::new(
            EntityKind::Obstacle,
            Vec2::new(start, c.ground_y()),
            Vec2::new(c.section_width, c.ground_height),
        ));
        platforms.len() + enemies + 1
    }
}

#[derive(Debug, Clone)]
pub struct Platformer {
    config: PlatformerConfig,
    player: Option<EntityId>,
    /// 1 right, -1 left
    facing: f32,
    grounded: bool,
    cooldown: u32,
    grace: u32,
}

impl Default for Platformer {
    fn default() -> Self {
        Self::new(PlatformerConfig::default())
    }
}

impl Platformer {
    pub fn new(config: PlatformerConfig) -> Self {
        Self {
            config,
            player: None,
            facing: 1.0,
            grounded: false,
            cooldown: 0,
            grace: 0,
        }
    }

    pub fn config(&self) -> &PlatformerConfig {
        &self.config
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    fn player_id(&self) -> Result<EntityId, SimError> {
        self.player
            .ok_or_else(|| SimError::ConsistencyViolation("platformer: no player".into()))
    }

    fn fire(&mut self, world: &mut World<ScrollingLevel<Terrain>>, player: &Entity) {
        let c = &self.config;
        let x = if self.facing > 0.0 {
            player.right()
        } else {
            player.pos.x
        };
        let bullet = Entity::new(
            EntityKind::Projectile,
            Vec2::new(x, player.pos.y + player.size.y / 2.0),
            c.bullet_size,
        )
        .with_velocity(Vec2::new(c.bullet_speed * self.facing, 0.0));
        world.entities.add(bullet);
        self.cooldown = c.shot_cooldown;
    }

    /// Fall under gravity and land on the highest platform top crossed
    fn fall(&mut self, world: &mut World<ScrollingLevel<Terrain>>, id: EntityId) -> Result<(), SimError> {
        let platforms = world.entities.for_each_alive(Some(EntityKind::Obstacle));
        let player = world.entities.get_mut(id)?;
        let previous_bottom = player.bottom();

        player.vel.y += self.config.gravity;
        player.pos.y += player.vel.y;

        self.grounded = false;
        if player.vel.y < 0.0 {
            return Ok(());
        }
        let bounds = player.bounds();
        let landing = platforms
            .filter(|p| {
                bounds.overlaps_x(&p.bounds()) && previous_bottom <= p.pos.y && bounds.bottom() >= p.pos.y
            })
            .map(|p| p.pos.y)
            .reduce(f32::min);
        if let Some(top) = landing {
            player.pos.y = top - player.size.y;
            player.vel.y = 0.0;
            self.grounded = true;
        }
        Ok(())
    }

    /// Patrol back and forth within the anchor platform
    fn patrol(world: &mut World<ScrollingLevel<Terrain>>) -> Result<(), SimError> {
        for enemy in world.entities.for_each_alive(Some(EntityKind::Enemy)) {
            let Some(anchor) = enemy.anchor else {
                continue;
            };
            let platform = *world.entities.get(anchor)?;
            let rider = world.entities.get_mut(enemy.id)?;
            rider.pos.x += rider.vel.x;
            let (left, right) = (platform.pos.x, platform.right() - rider.size.x);
            if rider.pos.x <= left || rider.pos.x >= right {
                rider.vel.x = -rider.vel.x;
                rider.pos.x = rider.pos.x.clamp(left, right.max(left));
            }
        }
        Ok(())
    }

    fn lose_life(&mut self, world: &mut World<ScrollingLevel<Terrain>>, id: EntityId) -> Result<(), SimError> {
        let left = world.lose_life();
        log::debug!("Player hit, {left} lives left");
        if left == 0 {
            return Ok(());
        }
        let c = &self.config;
        let floor = world.level.window().origin.max(c.player_start.x);
        let player = world.entities.get_mut(id)?;
        player.pos = Vec2::new((player.pos.x - c.respawn_backoff).max(floor), c.player_start.y);
        player.vel = Vec2::ZERO;
        self.grace = c.respawn_grace;
        Ok(())
    }
}

impl Rules for Platformer {
    type Level = ScrollingLevel<Terrain>;

    fn name(&self) -> &'static str {
        "platformer"
    }

    fn initial_lives(&self) -> u32 {
        self.config.lives
    }

    fn build_level(&self, seed: u64) -> Result<Self::Level, SimError> {
        Ok(ScrollingLevel::new(Terrain::new(self.config), seed, 0.0))
    }

    fn setup(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError> {
        let c = &self.config;
        self.player = Some(world.entities.add(Entity::new(
            EntityKind::Player,
            c.player_start,
            c.player_size,
        )));
        Ok(())
    }

    fn advance(&mut self, world: &mut World<Self::Level>, intent: &IntentSet) -> Result<(), SimError> {
        let id = self.player_id()?;
        let origin = world.level.window().origin;
        {
            let player = world.entities.get_mut(id)?;
            if intent.move_x != 0 {
                self.facing = intent.move_x as f32;
                player.pos.x = (player.pos.x + self.facing * self.config.run_speed).max(origin);
            }
            if intent.action == Action::Primary && self.grounded {
                player.vel.y = -self.config.jump_velocity;
            }
        }
        if intent.action == Action::Secondary && self.cooldown == 0 {
            let player = *world.entities.get(id)?;
            self.fire(world, &player);
        } else {
            self.cooldown = self.cooldown.saturating_sub(1);
        }
        self.grace = self.grace.saturating_sub(1);

        self.fall(world, id)?;
        Self::patrol(world)?;
        for bullet in world.entities.for_each_alive(Some(EntityKind::Projectile)) {
            world.entities.get_mut(bullet.id)?.pos.x += bullet.vel.x;
        }
        Ok(())
    }

    fn resolve(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError> {
        let id = self.player_id()?;
        let player = *world.entities.get(id)?;
        let reach = self.config.view_width;

        for bullet in world.entities.for_each_alive(Some(EntityKind::Projectile)) {
            if bullet.pos.x < player.pos.x - reach || bullet.pos.x > player.pos.x + reach {
                world.entities.kill(bullet.id);
            }
        }

        for (bullet, enemy) in
            detect_overlaps(&world.entities, &[EntityKind::Projectile], &[EntityKind::Enemy])
        {
            let live = |id| world.entities.get(id).is_ok_and(|e| e.alive);
            if live(bullet) && live(enemy) {
                world.entities.kill(bullet);
                world.entities.kill(enemy);
                world.add_score(self.config.enemy_points);
            }
        }

        let fell = player.pos.y > self.config.view_height;
        let hit = self.grace == 0 && !overlapping(&world.entities, id, &[EntityKind::Enemy]).is_empty();
        if fell || hit {
            self.lose_life(world, id)?;
        }
        Ok(())
    }

    fn maintain(&mut self, world: &mut World<Self::Level>) -> Result<(), SimError> {
        let c = self.config;
        let x = world.entities.get(self.player_id()?)?.pos.x;
        world
            .level
            .ensure_generated(x, c.section_width + c.view_width, &mut world.entities);
        world.level.prune(x, c.view_width, &mut world.entities);
        Ok(())
    }

    fn camera_x(&self, world: &World<Self::Level>) -> f32 {
        self.player
            .and_then(|id| world.entities.get(id).ok())
            .map_or(0.0, |p| p.pos.x - self.config.view_width / 2.0)
    }
}
