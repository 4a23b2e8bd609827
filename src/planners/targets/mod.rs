//! Target selection: boss first, then the most promising chest, then the exploration frontier.

mod access;
mod boss;
mod chest;
mod frontier;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::infra::Position;
use crate::planners::PathPlanner;
use crate::state::{ExplorationPhase, Grid, Move};

pub use access::{AccessKind, AccessPlan, plan_access};
use boss::BossTarget;
use chest::ChestTarget;
use frontier::{FrontierTarget, RandomStep};

/// Everything a target strategy may look at during one selection.
pub struct TargetContext<'a> {
    pub grid: &'a Grid,
    pub planner: &'a PathPlanner,
    pub player: Position,
}

pub trait SelectTarget {
    fn name(&self) -> &'static str;

    fn try_select(&mut self, ctx: &TargetContext) -> Option<Move>;
}

pub struct TargetSelector {
    boss: BossTarget,
    chest: ChestTarget,
    frontier: FrontierTarget,
    random: RandomStep,
}

impl TargetSelector {
    pub fn new(early_visible_tiles: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            boss: BossTarget,
            chest: ChestTarget,
            frontier: FrontierTarget::new(early_visible_tiles),
            random: RandomStep::new(rng),
        }
    }

    /// Picks the next move for the current board, or `None` when nothing is reachable.
    pub fn select_next_move(&mut self, grid: &Grid, planner: &PathPlanner) -> Option<Move> {
        let Some(player) = grid.player() else {
            debug!("No player on the board, nothing to select");
            return None;
        };
        let ctx = TargetContext {
            grid,
            planner,
            player,
        };

        let phase = grid.phase();
        let strategies: Vec<&mut dyn SelectTarget> = match phase {
            ExplorationPhase::BossVisible => {
                vec![&mut self.boss, &mut self.frontier, &mut self.random]
            }
            ExplorationPhase::ChestsVisible => {
                vec![&mut self.chest, &mut self.frontier, &mut self.random]
            }
            ExplorationPhase::Initial | ExplorationPhase::Intermediate => {
                vec![&mut self.frontier, &mut self.random]
            }
        };

        for strategy in strategies {
            if let Some(next) = strategy.try_select(&ctx) {
                debug!("[{}] {:?} -> {:?}", strategy.name(), phase, next);
                return Some(next);
            }
        }

        debug!("No target found in phase {:?}", phase);
        None
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
    fn test_boss_beats_chests() {
        let grid = grid(&["CP.", "?B?", "???"]);
        let mut selector = TargetSelector::new(10, Some(1));
        let next = selector
            .select_next_move(&grid, &PathPlanner::default())
            .expect("boss reachable");
        assert_eq!(next.destination(), Position::new(1, 1));
    }

    #[test]
    fn test_chest_with_more_hidden_tiles_wins() {
        let grid = grid(&["??...", "?C.C.", "..P.."]);
        let mut selector = TargetSelector::new(10, Some(1));
        let next = selector
            .select_next_move(&grid, &PathPlanner::default())
            .expect("chest reachable");
        assert_eq!(next.destination(), Position::new(1, 1));
    }

    #[test]
    fn test_early_exploration_steps_into_revealed_tile() {
        let grid = grid(&["???", "?P.", "???"]);
        let mut selector = TargetSelector::new(10, Some(1));
        let next = selector
            .select_next_move(&grid, &PathPlanner::default())
            .expect("one open neighbour");
        assert_eq!(
            next,
            Move::Direct {
                target: Position::new(2, 1),
                next_target: None
            }
        );
    }

    #[test]
    fn test_walled_in_player_has_no_move() {
        let grid = grid(&["?#?", "#P#", "?#?"]);
        let mut selector = TargetSelector::new(10, Some(1));
        assert!(
            selector
                .select_next_move(&grid, &PathPlanner::default())
                .is_none()
        );
    }

    #[test]
    fn test_no_player_no_move() {
        let grid = grid(&["...", "..."]);
        let mut selector = TargetSelector::new(10, None);
        assert!(
            selector
                .select_next_move(&grid, &PathPlanner::default())
                .is_none()
        );
    }
}
