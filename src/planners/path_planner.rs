//! Grid pathfinding for the exploration engine.
//!
//! Every mode first tries the cheap short-circuits (goal directly clickable, or an access tile
//! next to the start) before running a full A* search.

use std::cell::Cell;

use tracing::debug;

use crate::infra::{AStar, Position};
use crate::state::{Grid, Path};

#[derive(Debug)]
pub struct PathPlanner {
    searches: Cell<usize>,
    enemy_avoidance_cost: u32,
}

impl Default for PathPlanner {
    fn default() -> Self {
        Self::new(20)
    }
}

impl PathPlanner {
    pub fn new(enemy_avoidance_cost: u32) -> Self {
        Self {
            searches: Cell::new(0),
            enemy_avoidance_cost,
        }
    }

    /// Number of full A* searches run so far.
    pub fn search_count(&self) -> usize {
        self.searches.get()
    }

    /// Whether `goal` can be clicked straight from `start`.
    pub fn direct_access(&self, start: Position, goal: Position, grid: &Grid) -> bool {
        start.is_adjacent(&goal)
            && (grid.player() == Some(start) || grid.is_visited(&start))
            && grid.is_accessible(&goal)
    }

    pub fn access_point(&self, goal: Position, grid: &Grid) -> Option<Position> {
        grid.access_points(goal).first().copied()
    }

    #[tracing::instrument(level = "debug", skip(self, grid))]
    pub fn shortest_path(&self, start: Position, goal: Position, grid: &Grid) -> Option<Path> {
        if !self.is_target(start, goal, grid) {
            return None;
        }
        self.short_circuit(start, goal, grid)
            .or_else(|| self.search(start, goal, grid, false, None))
    }

    /// Like [`PathPlanner::shortest_path`], but intermediate steps stay on visited tiles.
    #[tracing::instrument(level = "debug", skip(self, grid))]
    pub fn shortest_path_via_visited(
        &self,
        start: Position,
        goal: Position,
        grid: &Grid,
    ) -> Option<Path> {
        if !self.is_target(start, goal, grid) {
            return None;
        }
        self.short_circuit(start, goal, grid)
            .or_else(|| self.search(start, goal, grid, true, None))
    }

    #[tracing::instrument(level = "debug", skip(self, grid))]
    pub fn shortest_path_avoiding_enemies(
        &self,
        start: Position,
        goal: Position,
        grid: &Grid,
    ) -> Option<Path> {
        if !self.is_target(start, goal, grid) {
            return None;
        }
        self.search(start, goal, grid, false, Some(self.enemy_avoidance_cost))
    }

    fn is_target(&self, start: Position, goal: Position, grid: &Grid) -> bool {
        start != goal && grid.in_bounds(&start) && grid.is_accessible(&goal)
    }

    fn short_circuit(&self, start: Position, goal: Position, grid: &Grid) -> Option<Path> {
        if self.direct_access(start, goal, grid) {
            return Path::new(vec![goal]);
        }
        let access = self.access_point(goal, grid)?;
        if access.is_adjacent(&start) {
            debug!("Reaching {} through access tile {}", goal, access);
            return Path::new(vec![access, goal]);
        }
        None
    }

    fn search(
        &self,
        start: Position,
        goal: Position,
        grid: &Grid,
        visited_only: bool,
        enemy_cost: Option<u32>,
    ) -> Option<Path> {
        self.searches.set(self.searches.get() + 1);

        let steps = AStar::find_path(
            grid,
            start,
            goal,
            |pos| {
                *pos == goal
                    || (grid.is_accessible(pos) && (!visited_only || grid.is_visited(pos)))
            },
            |pos| match grid.get(pos) {
                Some(tile) if tile.kind.is_enemy() => enemy_cost.unwrap_or(tile.cost),
                Some(tile) => tile.cost,
                None => u32::MAX,
            },
        );

        if steps.is_none() {
            debug!("No path from {} to {}", start, goal);
        }
        steps.and_then(Path::new)
    }
}
