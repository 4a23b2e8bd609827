mod path_planner;
mod targets;

pub use path_planner::PathPlanner;
pub use targets::{AccessKind, TargetSelector};
