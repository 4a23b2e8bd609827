use crate::controller::{DungeonProfile, RecoveryAction, RunOutcome, RunStats};
use crate::infra::{GameObserver, GameState};
use crate::session::SessionStats;
use crate::state::{ChestRarity, ExplorationPhase, ExplorationStatus, Grid, Move};

pub struct CompositeObserver {
    observers: Vec<Box<dyn GameObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Box<dyn GameObserver>>) -> Self {
        Self { observers }
    }
}

impl GameObserver for CompositeObserver {
    fn on_session_start(&mut self, max_dungeons: u32) {
        for observer in &mut self.observers {
            observer.on_session_start(max_dungeons);
        }
    }

    fn on_dungeon_start(&mut self, profile: &DungeonProfile) {
        for observer in &mut self.observers {
            observer.on_dungeon_start(profile);
        }
    }

    fn on_phase_changed(
        &mut self,
        previous: Option<ExplorationPhase>,
        phase: ExplorationPhase,
        status: &ExplorationStatus,
    ) {
        for observer in &mut self.observers {
            observer.on_phase_changed(previous, phase, status);
        }
    }

    fn on_move_selected(&mut self, next: &Move, grid: &Grid) {
        for observer in &mut self.observers {
            observer.on_move_selected(next, grid);
        }
    }

    fn on_chest_opened(&mut self, rarity: ChestRarity, reward: Option<&str>) {
        for observer in &mut self.observers {
            observer.on_chest_opened(rarity, reward);
        }
    }

    fn on_min_chests_reached(&mut self, opened: u32, minimum: u32) {
        for observer in &mut self.observers {
            observer.on_min_chests_reached(opened, minimum);
        }
    }

    fn on_stall_detected(&mut self, state: GameState, stuck_count: u32) {
        for observer in &mut self.observers {
            observer.on_stall_detected(state, stuck_count);
        }
    }

    fn on_recovery(&mut self, action: &RecoveryAction) {
        for observer in &mut self.observers {
            observer.on_recovery(action);
        }
    }

    fn on_dungeon_finished(&mut self, dungeon: u32, outcome: &RunOutcome, stats: &RunStats) {
        for observer in &mut self.observers {
            observer.on_dungeon_finished(dungeon, outcome, stats);
        }
    }

    fn on_session_finished(&mut self, stats: &SessionStats) {
        for observer in &mut self.observers {
            observer.on_session_finished(stats);
        }
    }

    fn on_status(&mut self, status: &str) {
        for observer in &mut self.observers {
            observer.on_status(status);
        }
    }
}
