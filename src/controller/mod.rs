mod battle;
mod exploration;
mod profile;
mod recovery;
mod stats;

pub use battle::BattleOutcome;
pub use exploration::{ExplorationController, RunOutcome};
pub use profile::DungeonProfile;
pub use recovery::{RecoveryAction, StallTracker};
pub use stats::RunStats;
