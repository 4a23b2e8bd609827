use tracing::{debug, info, warn};

use crate::controller::{DungeonProfile, RecoveryAction, RunOutcome, RunStats};
use crate::infra::{GameObserver, GameState};
use crate::session::SessionStats;
use crate::state::{ChestRarity, ExplorationPhase, ExplorationStatus, Grid, Move};

pub struct DefaultObserver;

impl GameObserver for DefaultObserver {
    fn on_session_start(&mut self, max_dungeons: u32) {
        if max_dungeons == 0 {
            info!("Session started, running until stopped");
        } else {
            info!("Session started, {} dungeons", max_dungeons);
        }
    }

    fn on_dungeon_start(&mut self, profile: &DungeonProfile) {
        info!("Dungeon {} started", profile.name);
        info!("- difficulty: {:?}", profile.difficulty);
        info!("- minimum chests: {}", profile.min_chests);
        info!(
            "- budget: {} attempts, {}s",
            profile.budget.max_attempts,
            profile.budget.timeout.as_secs()
        );
    }

    fn on_phase_changed(
        &mut self,
        previous: Option<ExplorationPhase>,
        phase: ExplorationPhase,
        status: &ExplorationStatus,
    ) {
        info!(
            "Phase {:?} -> {:?} ({}/{} visible, {:.1}%)",
            previous, phase, status.visible, status.total, status.percentage
        );
    }

    fn on_move_selected(&mut self, next: &Move, grid: &Grid) {
        debug!("move: {:?}", next);
        debug!("\n{}", grid.draw_ascii_map());
    }

    fn on_chest_opened(&mut self, rarity: ChestRarity, reward: Option<&str>) {
        info!("Opened {:?} chest: {}", rarity, reward.unwrap_or("no reward text"));
    }

    fn on_min_chests_reached(&mut self, opened: u32, minimum: u32) {
        info!("Minimum chest count reached ({}/{})", opened, minimum);
    }

    fn on_stall_detected(&mut self, state: GameState, stuck_count: u32) {
        warn!("No progress in {:?}, stuck count {}", state, stuck_count);
    }

    fn on_recovery(&mut self, action: &RecoveryAction) {
        warn!("Recovery: {:?}", action);
    }

    fn on_dungeon_finished(&mut self, dungeon: u32, outcome: &RunOutcome, stats: &RunStats) {
        match outcome {
            RunOutcome::Completed => info!("Dungeon {} completed", dungeon),
            RunOutcome::Failed(reason) => warn!("Dungeon {} failed: {}", dungeon, reason),
        }
        info!(
            "- chests: {} ({} rare), enemies: {}, tiles revealed: {}, moves: {} ({} without effect)",
            stats.chests_opened,
            stats.rare_chests_opened,
            stats.enemies_defeated,
            stats.tiles_revealed,
            stats.moves_made,
            stats.non_productive_moves
        );
    }

    fn on_session_finished(&mut self, stats: &SessionStats) {
        info!(
            "Session finished: {} attempted, {} completed, {} failed, {} chests",
            stats.dungeons_attempted,
            stats.dungeons_completed,
            stats.dungeons_failed,
            stats.total_chests_found
        );
    }
}
