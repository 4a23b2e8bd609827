use tracing::debug;

use crate::planners::targets::{SelectTarget, TargetContext, plan_access};
use crate::state::Move;

pub struct BossTarget;

impl SelectTarget for BossTarget {
    fn name(&self) -> &'static str {
        "BossTarget"
    }

    fn try_select(&mut self, ctx: &TargetContext) -> Option<Move> {
        let boss = ctx.grid.boss()?;
        let plan = plan_access(ctx, boss)?;
        debug!("Boss at {} reachable as {:?}", boss, plan.kind);
        Some(Move::from_path(plan.path))
    }
}
