use std::sync::Arc;

use time::{OffsetDateTime, format_description};

use crate::controller::{DungeonProfile, RecoveryAction, RunOutcome, RunStats};
use crate::infra::{GameObserver, GameState};
use crate::session::SessionStats;
use crate::state::{ChestRarity, ExplorationPhase, ExplorationStatus};

pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Forwards session events to user supplied callbacks as timestamped text lines.
pub struct CallbackObserver {
    on_log: LogCallback,
    on_status: StatusCallback,
}

impl CallbackObserver {
    pub fn new(on_log: LogCallback, on_status: StatusCallback) -> Self {
        Self { on_log, on_status }
    }

    fn log(&self, message: &str) {
        (self.on_log)(&format!("[{}] {}", timestamp(), message));
    }
}

fn timestamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    format_description::parse("[hour]:[minute]:[second]")
        .ok()
        .and_then(|format| now.format(&format).ok())
        .unwrap_or_else(|| "--:--:--".to_string())
}

impl GameObserver for CallbackObserver {
    fn on_session_start(&mut self, max_dungeons: u32) {
        if max_dungeons == 0 {
            self.log("Starting session (no dungeon limit)");
        } else {
            self.log(&format!("Starting session ({} dungeons)", max_dungeons));
        }
    }

    fn on_dungeon_start(&mut self, profile: &DungeonProfile) {
        self.log(&format!(
            "Entered {} ({:?}, at least {} chests)",
            profile.name, profile.difficulty, profile.min_chests
        ));
    }

    fn on_phase_changed(
        &mut self,
        _previous: Option<ExplorationPhase>,
        phase: ExplorationPhase,
        status: &ExplorationStatus,
    ) {
        self.log(&format!("Phase {:?}, {:.0}% explored", phase, status.percentage));
    }

    fn on_chest_opened(&mut self, rarity: ChestRarity, reward: Option<&str>) {
        let kind = match rarity {
            ChestRarity::Common => "chest",
            ChestRarity::Rare => "rare chest",
        };
        match reward {
            Some(reward) => self.log(&format!("Opened {}: {}", kind, reward)),
            None => self.log(&format!("Opened {}", kind)),
        }
    }

    fn on_min_chests_reached(&mut self, opened: u32, minimum: u32) {
        self.log(&format!("Chest goal reached ({}/{})", opened, minimum));
    }

    fn on_stall_detected(&mut self, state: GameState, stuck_count: u32) {
        self.log(&format!("Stuck in {:?} ({})", state, stuck_count));
    }

    fn on_recovery(&mut self, action: &RecoveryAction) {
        let text = match action {
            RecoveryAction::Unstick(state) => format!("Trying to get unstuck in {:?}", state),
            RecoveryAction::ForcedSweep => "Sweeping the frontier".to_string(),
            RecoveryAction::FullReset => "Resetting exploration".to_string(),
        };
        self.log(&text);
    }

    fn on_dungeon_finished(&mut self, dungeon: u32, outcome: &RunOutcome, stats: &RunStats) {
        match outcome {
            RunOutcome::Completed => self.log(&format!(
                "Dungeon {} completed: {} chests, {} enemies",
                dungeon, stats.chests_opened, stats.enemies_defeated
            )),
            RunOutcome::Failed(reason) => {
                self.log(&format!("Dungeon {} failed: {}", dungeon, reason))
            }
        }
    }

    fn on_session_finished(&mut self, stats: &SessionStats) {
        self.log(&format!(
            "Session finished: {}/{} dungeons completed, {} chests",
            stats.dungeons_completed, stats.dungeons_attempted, stats.total_chests_found
        ));
        (self.on_status)("Idle");
    }

    fn on_status(&mut self, status: &str) {
        (self.on_status)(status);
    }
}
