use tracing::debug;

use crate::infra::Position;
use crate::planners::targets::TargetContext;
use crate::state::{Grid, Path};

/// How a target is reached, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccessKind {
    /// Clickable straight from the player's tile
    Adjacent,
    /// One click onto a visited tile next to both the player and the target
    AccessTileAdjacent,
    /// Routed to a visited tile next to the target
    AccessTileRouted,
    /// Routed over any accessible tiles
    Routed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPlan {
    pub kind: AccessKind,
    pub path: Path,
}

fn enemies_on(grid: &Grid, path: &Path) -> usize {
    path.iter().filter(|pos| grid.is_enemy(pos)).count()
}

/// Plans how to reach `target` from the player, or `None` when it cannot be reached.
pub fn plan_access(ctx: &TargetContext, target: Position) -> Option<AccessPlan> {
    let TargetContext {
        grid,
        planner,
        player,
    } = *ctx;

    if planner.direct_access(player, target, grid) {
        return Some(AccessPlan {
            kind: AccessKind::Adjacent,
            path: Path::new(vec![target])?,
        });
    }

    let access_points = grid.access_points(target);
    if let Some(access) = access_points.iter().find(|pos| pos.is_adjacent(&player)) {
        return Some(AccessPlan {
            kind: AccessKind::AccessTileAdjacent,
            path: Path::new(vec![*access, target])?,
        });
    }

    let routed_access = access_points
        .iter()
        .filter(|access| **access != player)
        .filter_map(|access| {
            planner
                .shortest_path_via_visited(player, *access, grid)
                .or_else(|| planner.shortest_path(player, *access, grid))
        })
        .min_by_key(|route| (enemies_on(grid, route), route.len()));
    if let Some(route) = routed_access {
        let mut steps: Vec<Position> = route.into();
        steps.push(target);
        debug!("Reaching {} over access tile in {} steps", target, steps.len());
        return Some(AccessPlan {
            kind: AccessKind::AccessTileRouted,
            path: Path::new(steps)?,
        });
    }

    planner
        .shortest_path_avoiding_enemies(player, target, grid)
        .or_else(|| planner.shortest_path(player, target, grid))
        .map(|path| AccessPlan {
            kind: AccessKind::Routed,
            path,
        })
}
