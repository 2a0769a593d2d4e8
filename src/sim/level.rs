//! Level providers: where terrain and obstacles come from
//!
//! Two shapes are supported:
//! - Scrolling levels extend content ahead of the player in fixed-width
//!   sections and prune what has fallen behind the viewport.
//! - Static tile maps never extend; they answer walkability and pickup queries
//!   instead.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entity::{Entity, EntityId, EntityKind, EntityStore};
use super::error::SimError;
use super::grid::{Grid, TerrainKind, Tile};
use super::session::Sprite;

/// Things a pickup entity can be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupKind {
    Dot,
    Iron,
    Copper,
}

/// The scrolling frontier of generated content (world x offsets)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelWindow {
    /// Everything left of this has been pruned
    pub origin: f32,
    /// Content exists up to (not including) this offset
    pub generated_up_to: f32,
}

impl LevelWindow {
    pub fn starting_at(offset: f32) -> Self {
        Self {
            origin: 0.0,
            generated_up_to: offset,
        }
    }

    /// True when the frontier is closer than `margin` ahead of `ahead_of`
    #[inline]
    pub fn needs_extension(&self, ahead_of: f32, margin: f32) -> bool {
        self.generated_up_to < ahead_of + margin
    }
}

/// Supplies and maintains the level geometry around the player
pub trait LevelProvider {
    fn window(&self) -> LevelWindow {
        LevelWindow::default()
    }

    /// Generate content until the frontier is at least `margin` ahead of
    /// `ahead_of`. Returns the number of entities created; a second call
    /// without the player advancing creates none.
    fn ensure_generated(&mut self, _ahead_of: f32, _margin: f32, _store: &mut EntityStore) -> usize {
        0
    }

    /// Remove everything whose right edge is at or behind `behind - viewport`.
    /// Returns the removed records.
    fn prune(&mut self, _behind: f32, _viewport: f32, _store: &mut EntityStore) -> Vec<Entity> {
        Vec::new()
    }

    fn is_walkable(&self, _column: i32, _row: i32) -> bool {
        true
    }

    /// Take the pickup at a cell, removing its entity
    fn consume_pickup_at(
        &mut self,
        _column: i32,
        _row: i32,
        _store: &mut EntityStore,
    ) -> Option<PickupKind> {
        None
    }

    /// Verify bookkeeping against the entity store
    fn audit(&self, _store: &EntityStore) -> Result<(), SimError> {
        Ok(())
    }

    /// Static geometry that is not backed by entities
    fn sprites(&self, _out: &mut Vec<Sprite>) {}
}

/// Level for games whose geometry is owned entirely by their rules
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLevel;

impl LevelProvider for NoLevel {}

/// Produces one band of a scrolling level
pub trait SectionGenerator {
    /// Width of one band in world units
    fn section_width(&self) -> f32;

    /// Populate `[start, start + section_width)`, returning entities created
    fn generate(&mut self, start: f32, store: &mut EntityStore, rng: &mut Pcg32) -> usize;
}

/// Endless level built from sections, with a seeded generator
#[derive(Debug, Clone)]
pub struct ScrollingLevel<G> {
    generator: G,
    window: LevelWindow,
    rng: Pcg32,
    seed: u64,
}

impl<G: SectionGenerator> ScrollingLevel<G> {
    /// `first_offset` is where the first section starts
    pub fn new(generator: G, seed: u64, first_offset: f32) -> Self {
        Self {
            generator,
            window: LevelWindow::starting_at(first_offset),
            rng: Pcg32::seed_from_u64(seed),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl<G: SectionGenerator> LevelProvider for ScrollingLevel<G> {
    fn window(&self) -> LevelWindow {
        self.window
    }

    fn ensure_generated(&mut self, ahead_of: f32, margin: f32, store: &mut EntityStore) -> usize {
        let width = self.generator.section_width();
        if width <= 0.0 {
            return 0;
        }
        let mut created = 0;
        while self.window.needs_extension(ahead_of, margin) {
            let start = self.window.generated_up_to;
            created += self.generator.generate(start, store, &mut self.rng);
            self.window.generated_up_to = start + width;
            log::debug!("Generated section at {start} ({created} entities so far)");
        }
        created
    }

    fn prune(&mut self, behind: f32, viewport: f32, store: &mut EntityStore) -> Vec<Entity> {
        let cutoff = behind - viewport;
        if cutoff <= self.window.origin {
            return Vec::new();
        }
        let removed = store.remove_where(|e| e.kind != EntityKind::Player && e.right() <= cutoff);
        self.window.origin = cutoff;
        if !removed.is_empty() {
            log::debug!("Pruned {} entities behind {cutoff}", removed.len());
        }
        removed
    }
}

/// Static grid of terrain with pickup entities linked to their cells
#[derive(Debug, Clone)]
pub struct TileMap {
    tiles: Grid<Tile>,
    loot: Grid<Option<PickupKind>>,
    cell_size: f32,
}

impl TileMap {
    pub fn new(columns: usize, rows: usize, cell_size: f32) -> Self {
        let mut tiles = Grid::new(
            columns,
            rows,
            Tile {
                column: 0,
                row: 0,
                terrain: TerrainKind::Empty,
                occupant: None,
            },
        );
        for row in 0..rows as i32 {
            for column in 0..columns as i32 {
                if let Some(tile) = tiles.get_mut(column, row) {
                    tile.column = column;
                    tile.row = row;
                }
            }
        }
        Self {
            tiles,
            loot: Grid::new(columns, rows, None),
            cell_size,
        }
    }

    /// Parse rows of digits: `0` wall, `1` empty, `2` collectible of `pickup`
    pub fn from_digits(rows: &[&str], cell_size: f32, pickup: PickupKind) -> Result<Self, SimError> {
        let columns = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != columns) {
            return Err(SimError::InvalidConfig("ragged tile map".into()));
        }
        let mut map = Self::new(columns, rows.len(), cell_size);
        for (row, line) in rows.iter().enumerate() {
            for (column, ch) in line.chars().enumerate() {
                let (column, row) = (column as i32, row as i32);
                match ch {
                    '0' => {
                        map.set_terrain(column, row, TerrainKind::Wall);
                    }
                    '1' => {}
                    '2' => {
                        map.set_terrain(column, row, TerrainKind::Collectible);
                        map.loot.set(column, row, Some(pickup));
                    }
                    other => {
                        return Err(SimError::InvalidConfig(format!(
                            "unknown tile '{other}' at ({column}, {row})"
                        )));
                    }
                }
            }
        }
        Ok(map)
    }

    pub fn columns(&self) -> usize {
        self.tiles.columns()
    }

    pub fn rows(&self) -> usize {
        self.tiles.rows()
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn tile(&self, column: i32, row: i32) -> Option<&Tile> {
        self.tiles.get(column, row)
    }

    /// World position of a cell's top-left corner
    pub fn cell_origin(&self, column: i32, row: i32) -> Vec2 {
        Vec2::new(column as f32, row as f32) * self.cell_size
    }

    /// Cell containing a world position
    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        let cell = (pos / self.cell_size).floor();
        (cell.x as i32, cell.y as i32)
    }

    pub fn set_terrain(&mut self, column: i32, row: i32, terrain: TerrainKind) -> bool {
        match self.tiles.get_mut(column, row) {
            Some(tile) => {
                tile.terrain = terrain;
                true
            }
            None => false,
        }
    }

    /// Put a pickup on an empty, unoccupied cell. Returns the new entity.
    pub fn place_pickup(
        &mut self,
        column: i32,
        row: i32,
        kind: PickupKind,
        store: &mut EntityStore,
    ) -> Option<EntityId> {
        let origin = self.cell_origin(column, row);
        let size = Vec2::splat(self.cell_size);
        let tile = self.tiles.get_mut(column, row)?;
        if tile.terrain != TerrainKind::Empty || tile.occupant.is_some() {
            return None;
        }
        let id = store.add(Entity::new(EntityKind::Pickup, origin, size));
        tile.terrain = TerrainKind::Collectible;
        tile.occupant = Some(id);
        self.loot.set(column, row, Some(kind));
        Some(id)
    }

    /// Spawn entities for every collectible tile that has none yet
    pub fn populate(&mut self, store: &mut EntityStore) -> usize {
        let size = Vec2::splat(self.cell_size);
        let cell_size = self.cell_size;
        let mut created = 0;
        for row in 0..self.tiles.rows() as i32 {
            for column in 0..self.tiles.columns() as i32 {
                let Some(tile) = self.tiles.get_mut(column, row) else {
                    continue;
                };
                if tile.terrain == TerrainKind::Collectible && tile.occupant.is_none() {
                    let origin = Vec2::new(column as f32, row as f32) * cell_size;
                    tile.occupant = Some(store.add(Entity::new(EntityKind::Pickup, origin, size)));
                    created += 1;
                }
            }
        }
        created
    }

    /// Collectible tiles left on the map
    pub fn remaining_pickups(&self) -> usize {
        self.tiles.count(|t| t.terrain == TerrainKind::Collectible)
    }

    /// Random empty cell from `rng`, never one in `exclude`
    pub fn random_empty_cell(
        &self,
        rng: &mut Pcg32,
        exclude: &[(i32, i32)],
    ) -> Option<(i32, i32)> {
        use rand::Rng;

        let free: Vec<_> = self
            .tiles
            .iter()
            .filter(|(c, r, t)| t.terrain == TerrainKind::Empty && !exclude.contains(&(*c, *r)))
            .map(|(c, r, _)| (c, r))
            .collect();
        if free.is_empty() {
            return None;
        }
        Some(free[rng.random_range(0..free.len())])
    }
}

impl LevelProvider for TileMap {
    fn is_walkable(&self, column: i32, row: i32) -> bool {
        self.tiles
            .get(column, row)
            .is_some_and(|t| t.terrain != TerrainKind::Wall)
    }

    fn consume_pickup_at(
        &mut self,
        column: i32,
        row: i32,
        store: &mut EntityStore,
    ) -> Option<PickupKind> {
        let tile = self.tiles.get_mut(column, row)?;
        if tile.terrain != TerrainKind::Collectible {
            return None;
        }
        tile.terrain = TerrainKind::Empty;
        if let Some(id) = tile.occupant.take() {
            store.remove(id);
        }
        self.loot.get_mut(column, row).and_then(Option::take)
    }

    fn audit(&self, store: &EntityStore) -> Result<(), SimError> {
        for (column, row, tile) in self.tiles.iter() {
            let Some(id) = tile.occupant else {
                continue;
            };
            let linked = store.get(id).map(|e| e.alive && e.kind == EntityKind::Pickup);
            if linked != Ok(true) {
                return Err(SimError::ConsistencyViolation(format!(
                    "tile ({column}, {row}) points at missing pickup {id}"
                )));
            }
            if tile.terrain != TerrainKind::Collectible {
                return Err(SimError::ConsistencyViolation(format!(
                    "tile ({column}, {row}) has occupant {id} but no collectible"
                )));
            }
        }
        Ok(())
    }

    fn sprites(&self, out: &mut Vec<Sprite>) {
        out.extend(
            self.tiles
                .iter()
                .filter(|(_, _, t)| t.terrain == TerrainKind::Wall)
                .map(|(c, r, _)| Sprite::cell(EntityKind::Obstacle, c, r, self.cell_size)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::Rng;

    /// One 10-wide obstacle per 100-wide section
    struct Posts;

    impl SectionGenerator for Posts {
        fn section_width(&self) -> f32 {
            100.0
        }

        fn generate(&mut self, start: f32, store: &mut EntityStore, rng: &mut Pcg32) -> usize {
            let y = rng.random_range(0.0..50.0);
            store.add(Entity::new(
                EntityKind::Obstacle,
                Vec2::new(start, y),
                Vec2::new(10.0, 10.0),
            ));
            1
        }
    }

    #[test]
    fn test_ensure_generated_is_idempotent() {
        let mut store = EntityStore::new();
        let mut level = ScrollingLevel::new(Posts, 7, 0.0);

        let created = level.ensure_generated(0.0, 250.0, &mut store);
        assert_eq!(created, 3);
        assert!(level.window().generated_up_to >= 250.0);
        assert_eq!(level.ensure_generated(0.0, 250.0, &mut store), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_prune_removes_only_behind_viewport() {
        let mut store = EntityStore::new();
        let player = store.add(Entity::new(EntityKind::Player, Vec2::ZERO, Vec2::ONE));
        let mut level = ScrollingLevel::new(Posts, 7, 0.0);
        level.ensure_generated(500.0, 100.0, &mut store);

        // Posts at 0..=500; cutoff at 500 - 300 = 200 removes posts at 0 and 100
        let removed = level.prune(500.0, 300.0, &mut store);
        assert_eq!(removed.len(), 2);
        for entity in &removed {
            assert!(store.get(entity.id).is_err());
            assert!(entity.right() <= 200.0);
        }
        assert!(store.get(player).is_ok());
        assert_eq!(level.window().origin, 200.0);

        // Nothing new to prune at the same position
        assert!(level.prune(500.0, 300.0, &mut store).is_empty());
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = EntityStore::new();
        let mut b = EntityStore::new();
        ScrollingLevel::new(Posts, 42, 0.0).ensure_generated(0.0, 1000.0, &mut a);
        ScrollingLevel::new(Posts, 42, 0.0).ensure_generated(0.0, 1000.0, &mut b);
        let ya: Vec<_> = a.for_each_alive(None).map(|e| e.pos).collect();
        let yb: Vec<_> = b.for_each_alive(None).map(|e| e.pos).collect();
        assert_eq!(ya, yb);
    }

    const SMALL_MAZE: [&str; 4] = ["0000", "0210", "0120", "0000"];

    #[test]
    fn test_tile_map_walkability() {
        let map = TileMap::from_digits(&SMALL_MAZE, 20.0, PickupKind::Dot).unwrap();
        assert!(!map.is_walkable(0, 0));
        assert!(map.is_walkable(1, 1));
        assert!(map.is_walkable(2, 1));
        // Outside the map is never walkable
        assert!(!map.is_walkable(-1, 1));
        assert!(!map.is_walkable(4, 1));
    }

    #[test]
    fn test_consume_pickup_clears_occupant() {
        let mut store = EntityStore::new();
        let mut map = TileMap::from_digits(&SMALL_MAZE, 20.0, PickupKind::Dot).unwrap();
        assert_eq!(map.populate(&mut store), 2);
        assert_eq!(map.populate(&mut store), 0);
        map.audit(&store).unwrap();

        let occupant = map.tile(1, 1).and_then(|t| t.occupant).unwrap();
        assert_eq!(map.consume_pickup_at(1, 1, &mut store), Some(PickupKind::Dot));
        assert!(store.get(occupant).is_err());
        assert_eq!(map.consume_pickup_at(1, 1, &mut store), None);
        assert_eq!(map.remaining_pickups(), 1);
        map.audit(&store).unwrap();
    }

    #[test]
    fn test_audit_detects_dangling_occupant() {
        let mut store = EntityStore::new();
        let mut map = TileMap::from_digits(&SMALL_MAZE, 20.0, PickupKind::Dot).unwrap();
        map.populate(&mut store);
        let occupant = map.tile(2, 2).and_then(|t| t.occupant).unwrap();
        store.remove(occupant);
        assert!(matches!(
            map.audit(&store),
            Err(SimError::ConsistencyViolation(_))
        ));
    }

    #[test]
    fn test_from_digits_rejects_bad_input() {
        assert!(matches!(
            TileMap::from_digits(&["00", "0"], 1.0, PickupKind::Dot),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(matches!(
            TileMap::from_digits(&["0x"], 1.0, PickupKind::Dot),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_random_empty_cell_skips_excluded_and_filled() {
        let mut rng = Pcg32::seed_from_u64(4);
        let map = TileMap::from_digits(&["012", "111"], 1.0, PickupKind::Dot).unwrap();
        for _ in 0..50 {
            let cell = map.random_empty_cell(&mut rng, &[(1, 0)]).unwrap();
            assert!(cell.1 == 1, "{cell:?}");
        }
        let walled = TileMap::from_digits(&["02"], 1.0, PickupKind::Dot).unwrap();
        assert_eq!(walled.random_empty_cell(&mut rng, &[]), None);
    }

    proptest! {
        #[test]
        fn prop_frontier_stays_ahead(seed in any::<u64>(), steps in proptest::collection::vec(0.0f32..400.0, 1..20)) {
            let mut store = EntityStore::new();
            let mut level = ScrollingLevel::new(Posts, seed, 0.0);
            let mut x = 0.0;
            for step in steps {
                x += step;
                level.ensure_generated(x, 300.0, &mut store);
                prop_assert!(level.window().generated_up_to >= x + 300.0);
                prop_assert_eq!(level.ensure_generated(x, 300.0, &mut store), 0);

                let removed = level.prune(x, 200.0, &mut store);
                for entity in removed {
                    prop_assert!(store.get(entity.id).is_err());
                }
                prop_assert!(store.for_each_alive(None).all(|e| e.right() > x - 200.0));
            }
        }
    }
}
