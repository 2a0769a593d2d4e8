//! Resource gatherer on a small grid
//!
//! Walk over iron and copper to collect them, spend them on mines that
//! produce more over time, and stay away from the chasers. Chasers only move
//! when the player does.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::sim::collision::overlapping;
use crate::sim::{
    Action, Entity, EntityId, EntityKind, IntentSet, LevelProvider, PickupKind, Rules, SimError,
    TerrainKind, TileMap, World,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GathererConfig {
    pub size: usize,
    pub cell_size: f32,
    /// Chance that a cell starts with a resource
    pub resource_chance: f64,
    pub enemies: usize,
    /// Units of a resource needed to build a mine for it
    pub mine_cost: u32,
    /// Ticks between production rounds
    pub production_ticks: u32,
}

impl GathererConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.size == 0 {
            return Err(SimError::InvalidConfig("gatherer: grid size is 0".into()));
        }
        if self.cell_size.is_nan() || self.cell_size <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "gatherer: cell size {} is not positive",
                self.cell_size
            )));
        }
        if !(0.0..=1.0).contains(&self.resource_chance) {
            return Err(SimError::InvalidConfig(format!(
                "gatherer: resource chance {} is outside [0, 1]",
                self.resource_chance
            )));
        }
        Ok(())
    }
}

impl Default for GathererConfig {
    fn default() -> Self {
        Self {
            size: 10,
            cell_size: 40.0,
            resource_chance: 0.3,
            enemies: 3,
            mine_cost: 5,
            // About one second at the grid step
            production_ticks: 7,
        }
    }
}

/// Collected resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub iron: u32,
    pub copper: u32,
}

impl Inventory {
    fn slot(&mut self, kind: PickupKind) -> Option<&mut u32> {
        match kind {
            PickupKind::Iron => Some(&mut self.iron),
            PickupKind::Copper => Some(&mut self.copper),
            PickupKind::Dot => None,
        }
    }

    pub fn add(&mut self, kind: PickupKind, amount: u32) {
        if let Some(slot) = self.slot(kind) {
            *slot += amount;
        }
    }

    /// Take `amount` if there is enough
    pub fn spend(&mut self, kind: PickupKind, amount: u32) -> bool {
        match self.slot(kind) {
            Some(slot) if *slot >= amount => {
                *slot -= amount;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mine {
    pub id: EntityId,
    pub column: i32,
    pub row: i32,
    pub produces: PickupKind,
}

#[derive(Debug, Clone, Default)]
pub struct Gatherer {
    config: GathererConfig,
    player: Option<EntityId>,
    enemies: Vec<EntityId>,
    mines: Vec<Mine>,
    inventory: Inventory,
    production_timer: u32,
    moved: bool,
}

impl Gatherer {
    pub fn new(config: GathererConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn mines(&self) -> &[Mine] {
        &self.mines
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    fn player_id(&self) -> Result<EntityId, SimError> {
        self.player
            .ok_or_else(|| SimError::ConsistencyViolation("gatherer: no player".into()))
    }

    fn cell(world: &World<TileMap>, id: EntityId) -> Result<(i32, i32), SimError> {
        Ok(world.level.cell_of(world.entities.get(id)?.pos))
    }

    fn clamp_cell(&self, column: i32, row: i32) -> (i32, i32) {
        let last = self.config.size as i32 - 1;
        (column.clamp(0, last), row.clamp(0, last))
    }

    /// Mine on the player's cell, if the cell is bare and the cost is covered
    fn build(&mut self, world: &mut World<TileMap>, produces: PickupKind) -> Result<(), SimError> {
        let (column, row) = Self::cell(world, self.player_id()?)?;
        let bare = world
            .level
            .tile(column, row)
            .is_some_and(|t| t.terrain == TerrainKind::Empty);
        let taken = self.mines.iter().any(|m| (m.column, m.row) == (column, row));
        if !bare || taken {
            return Ok(());
        }
        if !self.inventory.spend(produces, self.config.mine_cost) {
            log::debug!("Cannot afford a {produces:?} mine");
            return Ok(());
        }
        let size = Vec2::splat(world.level.cell_size());
        let pos = world.level.cell_origin(column, row);
        let id = world.entities.add(Entity::new(EntityKind::Obstacle, pos, size));
        self.mines.push(Mine {
            id,
            column,
            row,
            produces,
        });
        log::debug!("Built {produces:?} mine at ({column}, {row})");
        Ok(())
    }

    /// Every chaser steps one cell (diagonals allowed) toward the player
    fn chase(&self, world: &mut World<TileMap>, target: (i32, i32)) -> Result<(), SimError> {
        for &enemy in &self.enemies {
            let (column, row) = Self::cell(world, enemy)?;
            let next = self.clamp_cell(
                column + (target.0 - column).signum(),
                row + (target.1 - row).signum(),
            );
            let pos = world.level.cell_origin(next.0, next.1);
            world.entities.get_mut(enemy)?.pos = pos;
        }
        Ok(())
    }
}

impl Rules for Gatherer {
    type Level = TileMap;

    fn name(&self) -> &'static str {
        "gatherer"
    }

    fn build_level(&self, _seed: u64) -> Result<TileMap, SimError> {
        self.config.validate()?;
        Ok(TileMap::new(
            self.config.size,
            self.config.size,
            self.config.cell_size,
        ))
    }

    fn setup(&mut self, world: &mut World<TileMap>) -> Result<(), SimError> {
        let c = self.config;
        let size = Vec2::splat(c.cell_size);
        let n = c.size as i32;

        for row in 0..n {
            for column in 0..n {
                if (column, row) == (0, 0) || !world.rng.random_bool(c.resource_chance) {
                    continue;
                }
                let kind = if world.rng.random_bool(0.5) {
                    PickupKind::Iron
                } else {
                    PickupKind::Copper
                };
                world
                    .level
                    .place_pickup(column, row, kind, &mut world.entities);
            }
        }

        let origin = world.level.cell_origin(0, 0);
        self.player = Some(world.entities.add(Entity::new(EntityKind::Player, origin, size)));

        // Chasers start on bare cells, apart from each other and the player
        self.enemies.clear();
        let mut taken = vec![(0, 0)];
        for _ in 0..c.enemies {
            let (column, row) = world
                .level
                .random_empty_cell(&mut world.rng, &taken)
                .ok_or(SimError::SpawnBlocked { what: "chaser" })?;
            taken.push((column, row));
            let pos = world.level.cell_origin(column, row);
            self.enemies
                .push(world.entities.add(Entity::new(EntityKind::Enemy, pos, size)));
        }
        Ok(())
    }

    fn advance(&mut self, world: &mut World<TileMap>, intent: &IntentSet) -> Result<(), SimError> {
        let id = self.player_id()?;
        let from = Self::cell(world, id)?;
        let step = if intent.move_x != 0 {
            (intent.move_x as i32, 0)
        } else {
            (0, intent.move_y as i32)
        };
        let to = self.clamp_cell(from.0 + step.0, from.1 + step.1);

        self.moved = to != from;
        if self.moved {
            let pos = world.level.cell_origin(to.0, to.1);
            world.entities.get_mut(id)?.pos = pos;
            self.chase(world, to)?;
        }

        match intent.action {
            Action::Primary => self.build(world, PickupKind::Iron)?,
            Action::Secondary => self.build(world, PickupKind::Copper)?,
            Action::None => {}
        }

        self.production_timer += 1;
        if self.production_timer >= self.config.production_ticks {
            self.production_timer = 0;
            for mine in &self.mines {
                self.inventory.add(mine.produces, 1);
            }
            world.add_score(self.mines.len() as u64);
        }
        Ok(())
    }

    fn resolve(&mut self, world: &mut World<TileMap>) -> Result<(), SimError> {
        let id = self.player_id()?;
        if self.moved {
            let (column, row) = Self::cell(world, id)?;
            if let Some(kind) = world
                .level
                .consume_pickup_at(column, row, &mut world.entities)
            {
                self.inventory.add(kind, 1);
                world.add_score(1);
            }
        }
        if !overlapping(&world.entities, id, &[EntityKind::Enemy]).is_empty() {
            log::debug!("Caught by a chaser");
            world.defeat();
        }
        Ok(())
    }
}
