use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::infra::Position;
use crate::planners::targets::{SelectTarget, TargetContext};
use crate::state::{Move, Path};

const VISITED_PENALTY: i32 = -10;
const TOWARD_CENTER_BONUS: i32 = 3;
const REVEALED_BONUS: i32 = 5;

const CHEST_BONUS: f64 = 10.0;
const ENEMY_PENALTY: f64 = 1.0;
const DISTANCE_WEIGHT: f64 = 0.5;

/// Pushes the explored area outward.
pub struct FrontierTarget {
    early_visible_tiles: usize,
}

impl FrontierTarget {
    pub fn new(early_visible_tiles: usize) -> Self {
        Self {
            early_visible_tiles,
        }
    }

    /// While almost nothing is visible, step to the most promising neighbour of the player.
    fn early_step(&self, ctx: &TargetContext) -> Option<Move> {
        let grid = ctx.grid;
        let player_center = grid.doubled_center_distance(&ctx.player);

        let mut best: Option<(i32, Position)> = None;
        for neighbor in grid.neighbors(ctx.player) {
            let Some(tile) = grid.get(&neighbor) else {
                continue;
            };
            if !tile.accessible {
                continue;
            }

            let mut score = 0;
            if tile.visited {
                score += VISITED_PENALTY;
            }
            if grid.doubled_center_distance(&neighbor) < player_center {
                score += TOWARD_CENTER_BONUS;
            }
            if tile.visible {
                score += REVEALED_BONUS;
            }

            if score > 0 && best.is_none_or(|(best_score, _)| score > best_score) {
                best = Some((score, neighbor));
            }
        }

        let (score, target) = best?;
        debug!("Early step to {} (score {})", target, score);
        Some(Move::Direct {
            target,
            next_target: None,
        })
    }

    fn frontier_score(ctx: &TargetContext, tile: Position) -> f64 {
        let grid = ctx.grid;
        let mut score = grid.unexplored_within(tile, 1) as f64
            - DISTANCE_WEIGHT * ctx.player.distance(&tile) as f64;
        if grid.get(&tile).is_some_and(|t| t.kind.is_chest()) {
            score += CHEST_BONUS;
        }
        if grid.is_enemy(&tile) {
            score -= ENEMY_PENALTY;
        }
        score
    }
}

impl SelectTarget for FrontierTarget {
    fn name(&self) -> &'static str {
        "FrontierTarget"
    }

    fn try_select(&mut self, ctx: &TargetContext) -> Option<Move> {
        if ctx.grid.visible().len() < self.early_visible_tiles
            && let Some(next) = self.early_step(ctx)
        {
            return Some(next);
        }

        let mut candidates: Vec<(f64, Position)> = ctx
            .grid
            .frontier()
            .into_iter()
            .map(|tile| (Self::frontier_score(ctx, tile), tile))
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

        for (score, tile) in candidates {
            if let Some(path) = ctx
                .planner
                .shortest_path_via_visited(ctx.player, tile, ctx.grid)
            {
                debug!("Frontier tile {} (score {:.1})", tile, score);
                return Some(Move::from_path(path));
            }
        }
        None
    }
}

/// Last resort: a uniformly random accessible neighbour of the player.
pub struct RandomStep {
    rng: StdRng,
}

impl RandomStep {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }
}

impl SelectTarget for RandomStep {
    fn name(&self) -> &'static str {
        "RandomStep"
    }

    fn try_select(&mut self, ctx: &TargetContext) -> Option<Move> {
        let options: Vec<Position> = ctx
            .grid
            .neighbors(ctx.player)
            .filter(|pos| ctx.grid.is_accessible(pos))
            .collect();
        let target = *options.choose(&mut self.rng)?;
        Path::new(vec![target]).map(Move::from_path)
    }
}
