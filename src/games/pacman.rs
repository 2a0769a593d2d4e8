//! Maze chase
//!
//! Player and ghosts move one cell per tick on a static tile map. Dots are
//! pickup entities linked to their tiles; clearing them all wins the run.

use glam::Vec2;
use rand::Rng;

use crate::sim::collision::overlapping;
use crate::sim::{
    Entity, EntityId, EntityKind, IntentSet, LevelProvider, PickupKind, Rules, SimError,
    TileMap, World,
};

/// `0` wall, `1` empty, `2` dot
pub const MAZE: [&str; 20] = [
    "00000000000000000000",
    "02222222200222222220",
    "02002000200200020020",
    "02002000200200020020",
    "02222222222222222220",
    "02002020000002020020",
    "02222022200222022220",
    "00002000100100020000",
    "01102011111111020110",
    "00002010011001020000",
    "22222110111101122222",
    "00002010000001020000",
    "01102011111111020110",
    "00002010000001020000",
    "02222222200222222220",
    "02002000200200020020",
    "02202222222222220220",
    "00202020000002020200",
    "02222022200222022220",
    "00000000000000000000",
];

/// Ghost step choices, in the order they are considered
const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

#[derive(Debug, Clone, PartialEq)]
pub struct PacmanConfig {
    pub maze: Vec<String>,
    pub cell_size: f32,
    pub player_start: (i32, i32),
    pub ghost_starts: Vec<(i32, i32)>,
    pub lives: u32,
    pub dot_points: u64,
}

impl Default for PacmanConfig {
    fn default() -> Self {
        Self {
            maze: MAZE.iter().map(|row| row.to_string()).collect(),
            cell_size: 20.0,
            player_start: (1, 1),
            ghost_starts: vec![(18, 1), (1, 18), (18, 18)],
            lives: 1,
            dot_points: 10,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pacman {
    config: PacmanConfig,
    player: Option<EntityId>,
    ghosts: Vec<EntityId>,
}

impl Pacman {
    pub fn new(config: PacmanConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn ghosts(&self) -> &[EntityId] {
        &self.ghosts
    }

    fn player_id(&self) -> Result<EntityId, SimError> {
        self.player
            .ok_or_else(|| SimError::ConsistencyViolation("pacman: no player".into()))
    }

    /// Current cell of an entity
    fn cell(world: &World<TileMap>, id: EntityId) -> Result<(i32, i32), SimError> {
        Ok(world.level.cell_of(world.entities.get(id)?.pos))
    }

    fn place(world: &mut World<TileMap>, id: EntityId, (column, row): (i32, i32)) -> Result<(), SimError> {
        let pos = world.level.cell_origin(column, row);
        world.entities.get_mut(id)?.pos = pos;
        Ok(())
    }

    /// Everyone back to their start cells after a lost life
    fn respawn(&self, world: &mut World<TileMap>) -> Result<(), SimError> {
        Self::place(world, self.player_id()?, self.config.player_start)?;
        for (&ghost, &start) in self.ghosts.iter().zip(&self.config.ghost_starts) {
            Self::place(world, ghost, start)?;
        }
        Ok(())
    }
}

impl Rules for Pacman {
    type Level = TileMap;

    fn name(&self) -> &'static str {
        "pacman"
    }

    fn initial_lives(&self) -> u32 {
        self.config.lives
    }

    fn build_level(&self, _seed: u64) -> Result<TileMap, SimError> {
        let rows: Vec<&str> = self.config.maze.iter().map(String::as_str).collect();
        TileMap::from_digits(&rows, self.config.cell_size, PickupKind::Dot)
    }

    fn setup(&mut self, world: &mut World<TileMap>) -> Result<(), SimError> {
        let size = Vec2::splat(self.config.cell_size);
        let dots = world.level.populate(&mut world.entities);
        log::debug!("Maze has {dots} dots");

        let (column, row) = self.config.player_start;
        if !world.level.is_walkable(column, row) {
            return Err(SimError::SpawnBlocked { what: "player" });
        }
        let pos = world.level.cell_origin(column, row);
        self.player = Some(world.entities.add(Entity::new(EntityKind::Player, pos, size)));

        self.ghosts.clear();
        for &(column, row) in &self.config.ghost_starts {
            if !world.level.is_walkable(column, row) {
                return Err(SimError::SpawnBlocked { what: "ghost" });
            }
            let pos = world.level.cell_origin(column, row);
            self.ghosts
                .push(world.entities.add(Entity::new(EntityKind::Enemy, pos, size)));
        }
        Ok(())
    }

    fn advance(&mut self, world: &mut World<TileMap>, intent: &IntentSet) -> Result<(), SimError> {
        // One axis per step; horizontal wins
        let step = if intent.move_x != 0 {
            (intent.move_x as i32, 0)
        } else {
            (0, intent.move_y as i32)
        };
        if step != (0, 0) {
            let id = self.player_id()?;
            let (column, row) = Self::cell(world, id)?;
            let target = (column + step.0, row + step.1);
            if world.level.is_walkable(target.0, target.1) {
                Self::place(world, id, target)?;
            }
        }

        for &ghost in &self.ghosts {
            let (column, row) = Self::cell(world, ghost)?;
            let open: Vec<_> = DIRECTIONS
                .iter()
                .map(|&(dx, dy)| (column + dx, row + dy))
                .filter(|&(c, r)| world.level.is_walkable(c, r))
                .collect();
            if !open.is_empty() {
                let target = open[world.rng.random_range(0..open.len())];
                Self::place(world, ghost, target)?;
            }
        }
        Ok(())
    }

    fn resolve(&mut self, world: &mut World<TileMap>) -> Result<(), SimError> {
        let id = self.player_id()?;
        if !overlapping(&world.entities, id, &[EntityKind::Enemy]).is_empty() {
            let left = world.lose_life();
            log::debug!("Caught by a ghost, {left} lives left");
            if left > 0 {
                self.respawn(world)?;
            }
            return Ok(());
        }

        let (column, row) = Self::cell(world, id)?;
        if world
            .level
            .consume_pickup_at(column, row, &mut world.entities)
            .is_some()
        {
            world.add_score(self.config.dot_points);
        }
        Ok(())
    }

    fn is_won(&self, world: &World<TileMap>) -> bool {
        world.level.remaining_pickups() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Phase, Session, TerrainKind};

    /// No ghosts, so runs are fully scripted
    fn solo() -> Pacman {
        Pacman::new(PacmanConfig {
            ghost_starts: Vec::new(),
            ..Default::default()
        })
    }

    fn player_cell(session: &Session<Pacman>) -> (i32, i32) {
        let id = session.rules().player().unwrap();
        session.world().level.cell_of(session.world().entities.get(id).unwrap().pos)
    }

    #[test]
    fn test_maze_layout() {
        let session = Session::new(Pacman::default(), 1).unwrap();
        let level = &session.world().level;
        assert_eq!((level.columns(), level.rows()), (20, 20));
        assert!(!level.is_walkable(0, 0));
        assert!(level.is_walkable(1, 1));
        let dots = MAZE.iter().flat_map(|r| r.chars()).filter(|&c| c == '2').count();
        assert_eq!(level.remaining_pickups(), dots);
        assert_eq!(
            session.world().entities.for_each_alive(Some(EntityKind::Pickup)).len(),
            dots
        );
        assert_eq!(session.rules().ghosts().len(), 3);
    }

    #[test]
    fn test_start_in_wall_is_over() {
        let pacman = Pacman::new(PacmanConfig {
            player_start: (0, 0),
            ..Default::default()
        });
        let session = Session::new(pacman, 1).unwrap();
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.rules().player(), None);
    }

    #[test]
    fn test_wall_blocks_move() {
        let mut session = Session::new(solo(), 1).unwrap();
        session.update(&IntentSet::moving(0, -1)).unwrap();
        assert_eq!(player_cell(&session), (1, 1));
        session.update(&IntentSet::moving(-1, 0)).unwrap();
        assert_eq!(player_cell(&session), (1, 1));
    }

    #[test]
    fn test_eating_dots_scores() {
        let mut session = Session::new(solo(), 1).unwrap();
        // Start cell dot is eaten on the first tick
        session.update(&IntentSet::default()).unwrap();
        assert_eq!(session.state().score, 10);

        session.update(&IntentSet::moving(1, 0)).unwrap();
        assert_eq!(player_cell(&session), (2, 1));
        assert_eq!(session.state().score, 20);
        let tile = session.world().level.tile(2, 1).unwrap();
        assert_eq!(tile.terrain, TerrainKind::Empty);
        assert!(tile.occupant.is_none());
    }

    #[test]
    fn test_horizontal_preferred() {
        let mut session = Session::new(solo(), 1).unwrap();
        session.update(&IntentSet::moving(1, 1)).unwrap();
        assert_eq!(player_cell(&session), (2, 1));
    }

    #[test]
    fn test_last_dot_wins() {
        let config = PacmanConfig {
            maze: vec!["0000".into(), "0120".into(), "0000".into()],
            ghost_starts: Vec::new(),
            ..Default::default()
        };
        let mut session = Session::new(Pacman::new(config), 1).unwrap();
        session.update(&IntentSet::moving(1, 0)).unwrap();
        assert_eq!(session.phase(), Phase::Won);
        assert_eq!(session.state().score, 10);
    }

    #[test]
    fn test_ghost_contact_ends_run() {
        let config = PacmanConfig {
            maze: vec!["00000".into(), "01120".into(), "00000".into()],
            ghost_starts: vec![(3, 1)],
            ..Default::default()
        };
        let mut session = Session::new(Pacman::new(config), 1).unwrap();
        // The ghost's only move is onto (2, 1); the player steps there too
        session.update(&IntentSet::moving(1, 0)).unwrap();
        assert_eq!(session.phase(), Phase::Over);
        assert_eq!(session.state().lives, 0);
    }

    #[test]
    fn test_spare_life_respawns() {
        let config = PacmanConfig {
            maze: vec!["00000".into(), "01120".into(), "00000".into()],
            ghost_starts: vec![(3, 1)],
            lives: 2,
            ..Default::default()
        };
        let mut session = Session::new(Pacman::new(config), 1).unwrap();
        session.update(&IntentSet::moving(1, 0)).unwrap();
        assert_eq!(session.phase(), Phase::Playing);
        assert_eq!(session.state().lives, 1);
        assert_eq!(player_cell(&session), (1, 1));
    }

    #[test]
    fn test_ghosts_stay_in_maze() {
        let mut session = Session::new(Pacman::default(), 77).unwrap();
        for _ in 0..300 {
            session.update(&IntentSet::default()).unwrap();
            if session.phase() != Phase::Playing {
                break;
            }
            for &ghost in session.rules().ghosts() {
                let pos = session.world().entities.get(ghost).unwrap().pos;
                let (c, r) = session.world().level.cell_of(pos);
                assert!(session.world().level.is_walkable(c, r));
            }
        }
    }

    #[test]
    fn test_same_seed_same_ghost_paths() {
        let run = |seed| {
            let mut session = Session::new(Pacman::default(), seed).unwrap();
            for _ in 0..50 {
                session.update(&IntentSet::default()).unwrap();
            }
            session.snapshot()
        };
        assert_eq!(run(5), run(5));
    }
}
