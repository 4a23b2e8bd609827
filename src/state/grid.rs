use std::collections::{BTreeSet, HashSet};

use tracing::warn;

use crate::infra::Position;
use crate::state::{Tile, TileKind};

/// Visible fraction above which a chest-less, boss-less board counts as mid exploration.
const INTERMEDIATE_VISIBLE_FRACTION: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplorationPhase {
    Initial,
    Intermediate,
    ChestsVisible,
    BossVisible,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplorationStatus {
    pub total: usize,
    pub visible: usize,
    pub visited: usize,
    pub percentage: f64,
}

/// Read-only snapshot of the dungeon board with derived indices.
#[derive(Debug, Clone)]
pub struct Grid {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    player: Option<Position>,
    boss: Option<Position>,
    chests: Vec<Position>,
    enemies: Vec<Position>,
    visited: HashSet<Position>,
    visible: HashSet<Position>,
}

impl Grid {
    /// Builds a grid from row-major tile kinds. Returns `None` when the kinds do not fill a
    /// `width` x `height` rectangle.
    pub fn new(width: i32, height: i32, kinds: Vec<TileKind>) -> Option<Self> {
        if width <= 0 || height <= 0 || kinds.len() != (width * height) as usize {
            return None;
        }

        let mut grid = Grid {
            width,
            height,
            tiles: Vec::with_capacity(kinds.len()),
            player: None,
            boss: None,
            chests: Vec::new(),
            enemies: Vec::new(),
            visited: HashSet::new(),
            visible: HashSet::new(),
        };

        for (index, mut kind) in kinds.into_iter().enumerate() {
            let position = Position::new(index as i32 % width, index as i32 / width);
            match kind {
                TileKind::Player if grid.player.is_some() => {
                    warn!("Second player tile at {}, treating it as visited", position);
                    kind = TileKind::Visited;
                }
                TileKind::Player => grid.player = Some(position),
                TileKind::Boss if grid.boss.is_some() => {
                    warn!("Second boss tile at {}, ignoring it", position);
                }
                TileKind::Boss => grid.boss = Some(position),
                TileKind::Chest { .. } => grid.chests.push(position),
                TileKind::Enemy { .. } => grid.enemies.push(position),
                _ => {}
            }

            let tile = Tile::new(position, kind);
            if tile.visited {
                grid.visited.insert(position);
            }
            if tile.visible {
                grid.visible.insert(position);
            }
            grid.tiles.push(tile);
        }

        Some(grid)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: &Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn get(&self, pos: &Position) -> Option<&Tile> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.tiles.get((pos.y * self.width + pos.x) as usize)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn player(&self) -> Option<Position> {
        self.player
    }

    pub fn boss(&self) -> Option<Position> {
        self.boss
    }

    pub fn chests(&self) -> &[Position] {
        &self.chests
    }

    pub fn enemies(&self) -> &[Position] {
        &self.enemies
    }

    pub fn visited(&self) -> &HashSet<Position> {
        &self.visited
    }

    pub fn visible(&self) -> &HashSet<Position> {
        &self.visible
    }

    pub fn is_visited(&self, pos: &Position) -> bool {
        self.visited.contains(pos)
    }

    pub fn is_accessible(&self, pos: &Position) -> bool {
        self.get(pos).is_some_and(|tile| tile.accessible)
    }

    pub fn is_enemy(&self, pos: &Position) -> bool {
        self.get(pos).is_some_and(|tile| tile.kind.is_enemy())
    }

    /// In-bounds 4-neighbours of `pos`.
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        pos.neighbors()
            .into_iter()
            .filter(move |neighbor| self.in_bounds(neighbor))
    }

    /// Counts hidden tiles within Manhattan `radius` of `pos`, excluding `pos` itself.
    pub fn unexplored_within(&self, pos: Position, radius: i32) -> usize {
        let mut count = 0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if (dx == 0 && dy == 0) || dx.abs() + dy.abs() > radius {
                    continue;
                }
                let candidate = Position::new(pos.x + dx, pos.y + dy);
                if self
                    .get(&candidate)
                    .is_some_and(|tile| tile.kind.is_unexplored())
                {
                    count += 1;
                }
            }
        }
        count
    }

    /// Visited tiles adjacent to `target`, the player's tile first, then in row-major order.
    pub fn access_points(&self, target: Position) -> Vec<Position> {
        let mut points: Vec<Position> = self
            .neighbors(target)
            .filter(|pos| self.is_visited(pos))
            .collect();
        points.sort_by_key(|pos| (Some(*pos) != self.player, pos.y, pos.x));
        points
    }

    /// Unvisited accessible tiles adjacent to at least one visited tile, in row-major order.
    pub fn frontier(&self) -> Vec<Position> {
        let mut frontier = BTreeSet::new();
        for visited in &self.visited {
            for neighbor in self.neighbors(*visited) {
                if !self.is_visited(&neighbor) && self.is_accessible(&neighbor) {
                    frontier.insert((neighbor.y, neighbor.x));
                }
            }
        }
        frontier
            .into_iter()
            .map(|(y, x)| Position::new(x, y))
            .collect()
    }

    /// Distance to the geometric centre, doubled so odd dimensions stay integral.
    pub fn doubled_center_distance(&self, pos: &Position) -> i32 {
        (2 * pos.x - (self.width - 1)).abs() + (2 * pos.y - (self.height - 1)).abs()
    }

    pub fn status(&self) -> ExplorationStatus {
        let total = self.tiles.len();
        let visible = self.visible.len();
        ExplorationStatus {
            total,
            visible,
            visited: self.visited.len(),
            percentage: if total > 0 {
                visible as f64 * 100.0 / total as f64
            } else {
                0.0
            },
        }
    }

    pub fn phase(&self) -> ExplorationPhase {
        if self.boss.is_some() {
            ExplorationPhase::BossVisible
        } else if !self.chests.is_empty() {
            ExplorationPhase::ChestsVisible
        } else if self.visible.len() as f64 > self.tiles.len() as f64 * INTERMEDIATE_VISIBLE_FRACTION
        {
            ExplorationPhase::Intermediate
        } else {
            ExplorationPhase::Initial
        }
    }

    pub fn draw_ascii_map(&self) -> String {
        let mut output = String::new();
        for y in 0..self.height {
            for x in 0..self.width {
                let symbol = match self.get(&Position::new(x, y)).map(|tile| tile.kind) {
                    Some(TileKind::Player) => '@',
                    Some(TileKind::Boss) => 'B',
                    Some(TileKind::Chest { .. }) => 'C',
                    Some(TileKind::Enemy { .. }) => 'e',
                    Some(TileKind::Empty) => '.',
                    Some(TileKind::Visited) => 'v',
                    Some(TileKind::Wall) => '#',
                    Some(TileKind::Invisible) => '?',
                    Some(TileKind::Unknown) | None => '·',
                };
                output.push(symbol);
            }
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::BoardSnapshot;
    use crate::state::MapAnalyzer;

    fn grid(rows: &[&str]) -> Grid {
        MapAnalyzer::new()
            .build(&BoardSnapshot::from_ascii(rows))
            .expect("valid grid")
    }

    #[test]
    fn test_boss_wins_over_chests() {
        let grid = grid(&["PC?", "?B?", "C??"]);
        assert_eq!(grid.phase(), ExplorationPhase::BossVisible);
    }

    #[test]
    fn test_chests_without_boss() {
        let grid = grid(&["PC?", "???", "???"]);
        assert_eq!(grid.phase(), ExplorationPhase::ChestsVisible);
    }

    #[test]
    fn test_intermediate_above_thirty_percent_visible() {
        // 4 of 9 tiles visible
        let grid = grid(&["Pv.", ".??", "???"]);
        assert_eq!(grid.phase(), ExplorationPhase::Intermediate);
    }

    #[test]
    fn test_initial_when_mostly_hidden() {
        // 2 of 9 tiles visible
        let grid = grid(&["P.?", "???", "???"]);
        assert_eq!(grid.phase(), ExplorationPhase::Initial);
    }

    #[test]
    fn test_derived_indices() {
        let grid = grid(&["vP.", "E?C", "#vB"]);
        assert_eq!(grid.player(), Some(Position::new(1, 0)));
        assert_eq!(grid.boss(), Some(Position::new(2, 2)));
        assert_eq!(grid.chests(), &[Position::new(2, 1)]);
        assert_eq!(grid.enemies(), &[Position::new(0, 1)]);
        assert_eq!(grid.visited().len(), 3);
        for pos in grid.visited().iter().chain(grid.visible()) {
            assert!(grid.get(pos).is_some());
        }

        let status = grid.status();
        assert_eq!(status.total, 9);
        assert_eq!(status.visible, 8);
        assert_eq!(status.visited, 3);
    }

    #[test]
    fn test_access_points_prefer_player() {
        let grid = grid(&["v.?", "P.?", "v??"]);
        let points = grid.access_points(Position::new(1, 1));
        assert_eq!(points, vec![Position::new(0, 1)]);

        let points = grid.access_points(Position::new(0, 0));
        assert_eq!(points, vec![Position::new(0, 1)]);
    }

    #[test]
    fn test_frontier_skips_blocked_tiles() {
        let grid = grid(&["P.#", "???", "???"]);
        assert_eq!(grid.frontier(), vec![Position::new(1, 0)]);
    }

    #[test]
    fn test_unexplored_within_radius() {
        let grid = grid(&["P..", ".??", "???"]);
        assert_eq!(grid.unexplored_within(Position::new(1, 1), 1), 2);
        assert_eq!(grid.unexplored_within(Position::new(0, 0), 2), 2);
    }
}
