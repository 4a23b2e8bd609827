use tracing::debug;

use crate::infra::Position;
use crate::planners::targets::{AccessPlan, SelectTarget, TargetContext, plan_access};
use crate::state::{Grid, Move};

/// Chests compared on their access kind after the strategic pre-selection.
const SHORTLIST: usize = 3;
const SCORING_RADIUS: i32 = 2;

pub struct ChestTarget;

/// Lower is better: close chests in unexplored areas and near other chests come first.
fn strategic_score(grid: &Grid, player: Position, chest: Position) -> i32 {
    let distance = player.distance(&chest);
    let unexplored = grid.unexplored_within(chest, SCORING_RADIUS) as i32;
    let nearest_other = grid
        .chests()
        .iter()
        .filter(|other| **other != chest)
        .map(|other| chest.distance(other))
        .min()
        .unwrap_or(0);
    distance - (2 * unexplored + nearest_other)
}

impl SelectTarget for ChestTarget {
    fn name(&self) -> &'static str {
        "ChestTarget"
    }

    fn try_select(&mut self, ctx: &TargetContext) -> Option<Move> {
        let mut candidates: Vec<(i32, Position, AccessPlan)> = ctx
            .grid
            .chests()
            .iter()
            .filter_map(|chest| {
                let plan = plan_access(ctx, *chest)?;
                Some((strategic_score(ctx.grid, ctx.player, *chest), *chest, plan))
            })
            .collect();

        candidates.sort_by_key(|(score, _, _)| *score);
        candidates.truncate(SHORTLIST);
        candidates.sort_by_key(|(score, _, plan)| (plan.kind, *score));

        let (score, chest, plan) = candidates.into_iter().next()?;
        debug!(
            "Chest at {} (score {}) reachable as {:?}",
            chest, score, plan.kind
        );
        Some(Move::from_path(plan.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::BoardSnapshot;
    use crate::state::MapAnalyzer;

    #[test]
    fn test_strategic_score() {
        let grid = MapAnalyzer::new()
            .build(&BoardSnapshot::from_ascii(&["??...", "?C.C.", "..P.."]))
            .expect("valid grid");
        let player = Position::new(2, 2);
        assert_eq!(strategic_score(&grid, player, Position::new(1, 1)), -6);
        assert_eq!(strategic_score(&grid, player, Position::new(3, 1)), 0);
    }

    #[test]
    fn test_lone_chest_has_no_neighbour_bonus() {
        let grid = MapAnalyzer::new()
            .build(&BoardSnapshot::from_ascii(&["P..C"]))
            .expect("valid grid");
        assert_eq!(strategic_score(&grid, Position::new(0, 0), Position::new(3, 0)), 3);
    }
}
