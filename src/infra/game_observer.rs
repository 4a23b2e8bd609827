use crate::controller::{DungeonProfile, RecoveryAction, RunOutcome, RunStats};
use crate::infra::GameState;
use crate::session::SessionStats;
use crate::state::{ChestRarity, ExplorationPhase, ExplorationStatus, Grid, Move};

/// Trait for observing exploration events during a session
pub trait GameObserver {
    /// Called once when the session worker starts
    fn on_session_start(&mut self, max_dungeons: u32);

    /// Called when a dungeon run has read its profile
    fn on_dungeon_start(&mut self, profile: &DungeonProfile);

    /// Called when the exploration phase of the board changes
    fn on_phase_changed(
        &mut self,
        previous: Option<ExplorationPhase>,
        phase: ExplorationPhase,
        status: &ExplorationStatus,
    );

    /// Called when a move is selected
    fn on_move_selected(&mut self, _next: &Move, _grid: &Grid) {
        // Default implementation does nothing
    }

    fn on_chest_opened(&mut self, rarity: ChestRarity, reward: Option<&str>);

    /// Called once per run when the dungeon's minimum chest count is reached
    fn on_min_chests_reached(&mut self, opened: u32, minimum: u32);

    /// Called every time the stuck counter grows
    fn on_stall_detected(&mut self, state: GameState, stuck_count: u32);

    fn on_recovery(&mut self, action: &RecoveryAction);

    /// Called when a dungeon run ends, successfully or not
    fn on_dungeon_finished(&mut self, dungeon: u32, outcome: &RunOutcome, stats: &RunStats);

    fn on_session_finished(&mut self, stats: &SessionStats);

    /// Short human readable status line
    fn on_status(&mut self, _status: &str) {}
}
