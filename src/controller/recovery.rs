use std::time::{Duration, Instant};

use rand::seq::IndexedRandom;
use tracing::{debug, warn};

use crate::controller::ExplorationController;
use crate::infra::{ExplorationConfig, ExplorationError, GameState, Position};
use crate::state::{Grid, TileKind};

const UNSTICK_ATTACKS: u32 = 3;
const RESET_RANDOM_MOVES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Nudge the game in a way that fits the state it is stuck in
    Unstick(GameState),
    /// Force a move onto every frontier tile
    ForcedSweep,
    /// Dismiss dialogs, go back to the entrance and wander randomly
    FullReset,
}

/// Watches state and visible tile count for lack of progress.
#[derive(Debug, Clone)]
pub struct StallTracker {
    stall_window: Duration,
    unstick_threshold: u32,
    sweep_threshold: u32,
    reveal_timeout: Duration,
    reset_timeout: Duration,

    last_state: Option<GameState>,
    last_visible: Option<usize>,
    last_change: Instant,
    stuck_count: u32,
    stalls: u32,
    last_reveal: Instant,
    last_escalation: Option<Instant>,
}

impl StallTracker {
    pub fn new(config: &ExplorationConfig, now: Instant) -> Self {
        Self {
            stall_window: config.stall_window,
            unstick_threshold: config.unstick_threshold,
            sweep_threshold: config.sweep_threshold,
            reveal_timeout: config.reveal_timeout,
            reset_timeout: config.reset_timeout,
            last_state: None,
            last_visible: None,
            last_change: now,
            stuck_count: 0,
            stalls: 0,
            last_reveal: now,
            last_escalation: None,
        }
    }

    pub fn stuck_count(&self) -> u32 {
        self.stuck_count
    }

    /// Total number of stalls seen since the tracker was created.
    pub fn stalls(&self) -> u32 {
        self.stalls
    }

    pub fn record_reveal(&mut self, now: Instant) {
        self.last_reveal = now;
        self.last_escalation = None;
    }

    /// Feeds one observation and returns the recovery actions that are now due.
    pub fn observe(
        &mut self,
        state: GameState,
        visible: Option<usize>,
        now: Instant,
    ) -> Vec<RecoveryAction> {
        let mut actions = Vec::new();

        let changed = self.last_state != Some(state) || self.last_visible != visible;
        self.last_state = Some(state);
        self.last_visible = visible;

        if changed {
            self.last_change = now;
            self.stuck_count = 0;
        } else if now.duration_since(self.last_change) >= self.stall_window {
            self.last_change = now;
            self.stuck_count += 1;
            self.stalls += 1;

            if self.stuck_count >= self.sweep_threshold {
                self.stuck_count = 0;
                actions.push(RecoveryAction::ForcedSweep);
            } else if self.stuck_count >= self.unstick_threshold {
                actions.push(RecoveryAction::Unstick(state));
            }
        }

        // Battles and prompts legitimately reveal nothing
        if state == GameState::Exploring && !actions.contains(&RecoveryAction::ForcedSweep) {
            let since_reveal = now.duration_since(self.last_reveal);
            let rate_limited = self
                .last_escalation
                .is_some_and(|at| now.duration_since(at) < self.reveal_timeout);
            if !rate_limited {
                if since_reveal > self.reset_timeout {
                    self.last_escalation = Some(now);
                    actions.push(RecoveryAction::FullReset);
                } else if since_reveal > self.reveal_timeout {
                    self.last_escalation = Some(now);
                    actions.push(RecoveryAction::ForcedSweep);
                }
            }
        }

        actions
    }
}

/// Unvisited, non-wall tiles next to a visited tile, hidden ones included.
fn sweep_targets(grid: &Grid) -> Vec<Position> {
    let mut targets: Vec<Position> = grid
        .tiles()
        .iter()
        .filter(|tile| !tile.visited && tile.kind != TileKind::Wall)
        .map(|tile| tile.position)
        .filter(|pos| grid.neighbors(*pos).any(|n| grid.is_visited(&n)))
        .collect();
    targets.sort_by_key(|pos| (pos.y, pos.x));
    targets
}

impl ExplorationController<'_> {
    pub(super) fn recover(
        &mut self,
        action: RecoveryAction,
        grid: Option<&Grid>,
    ) -> Result<(), ExplorationError> {
        self.stats.recovery_actions += 1;
        self.observer.on_recovery(&action);

        match action {
            RecoveryAction::Unstick(state) => self.unstick(state, grid),
            RecoveryAction::ForcedSweep => self.sweep(grid),
            RecoveryAction::FullReset => self.full_reset(grid),
        }
    }

    fn unstick(&mut self, state: GameState, grid: Option<&Grid>) -> Result<(), ExplorationError> {
        match state {
            GameState::Exploring => {
                let Some((grid, player)) = grid.and_then(|g| g.player().map(|p| (g, p))) else {
                    return Ok(());
                };
                let options: Vec<Position> = grid
                    .neighbors(player)
                    .filter(|pos| grid.get(pos).is_some_and(|t| t.kind != TileKind::Wall))
                    .collect();
                if let Some(target) = options.choose(&mut self.rng).copied() {
                    debug!("Forcing a move to {}", target);
                    if let Err(e) = self.game.force_move(target) {
                        debug!("Forced move failed: {}", e);
                    }
                }
            }
            GameState::Battle => {
                for _ in 0..UNSTICK_ATTACKS {
                    if let Err(e) = self.game.click_attack() {
                        debug!("Unstick attack failed: {}", e);
                    }
                }
            }
            GameState::Chest => {
                if let Err(e) = self.game.click_chest() {
                    debug!("Chest re-trigger failed: {}", e);
                }
            }
            GameState::Boss => {
                if let Err(e) = self.game.click_boss() {
                    debug!("Boss re-trigger failed: {}", e);
                }
            }
            GameState::Unknown => {
                let closed = self.game.dismiss_dialogs();
                debug!("Dismissed {} dialogs", closed);
            }
        }
        Ok(())
    }

    fn sweep(&mut self, grid: Option<&Grid>) -> Result<(), ExplorationError> {
        let Some(grid) = grid else {
            return Ok(());
        };
        let targets = sweep_targets(grid);
        warn!("Sweeping {} frontier tiles", targets.len());

        for target in targets {
            if self.cancel.is_cancelled() {
                return Err(ExplorationError::SessionAborted);
            }
            if self.game.force_move(target).is_ok() {
                self.stats.moves_made += 1;
            }
            if self.game.classify_state() != GameState::Exploring {
                debug!("Sweep interrupted at {}", target);
                break;
            }
            if !self.cancel.sleep(self.config.settle_delay) {
                return Err(ExplorationError::SessionAborted);
            }
        }
        Ok(())
    }

    fn full_reset(&mut self, grid: Option<&Grid>) -> Result<(), ExplorationError> {
        let closed = self.game.dismiss_dialogs();
        warn!("Resetting exploration, {} dialogs dismissed", closed);

        if let Some(entrance) = self.entrance
            && let Err(e) = self.game.force_move(entrance)
        {
            debug!("Could not return to the entrance {}: {}", entrance, e);
        }

        let Some(grid) = grid else {
            return Ok(());
        };
        let targets = sweep_targets(grid);
        for _ in 0..RESET_RANDOM_MOVES {
            if self.cancel.is_cancelled() {
                return Err(ExplorationError::SessionAborted);
            }
            let Some(target) = targets.choose(&mut self.rng).copied() else {
                break;
            };
            if let Err(e) = self.game.force_move(target) {
                debug!("Reset move to {} failed: {}", target, e);
            }
            if self.game.classify_state() != GameState::Exploring {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{BoardSnapshot, CancelToken, DefaultObserver, GameInterface, StateSignals};

    fn tracker() -> StallTracker {
        let config = ExplorationConfig {
            stall_window: Duration::from_secs(3),
            ..ExplorationConfig::default()
        };
        StallTracker::new(&config, Instant::now())
    }

    #[test]
    fn test_stuck_counter_escalates() {
        let start = Instant::now();
        let mut tracker = tracker();
        let at = |secs: u64| start + Duration::from_secs(secs);

        assert!(tracker.observe(GameState::Battle, Some(4), at(0)).is_empty());
        assert!(tracker.observe(GameState::Battle, Some(4), at(1)).is_empty());
        assert_eq!(tracker.stuck_count(), 0);

        assert!(tracker.observe(GameState::Battle, Some(4), at(3)).is_empty());
        assert!(tracker.observe(GameState::Battle, Some(4), at(6)).is_empty());
        assert_eq!(tracker.stuck_count(), 2);
        assert_eq!(
            tracker.observe(GameState::Battle, Some(4), at(9)),
            vec![RecoveryAction::Unstick(GameState::Battle)]
        );
        assert_eq!(
            tracker.observe(GameState::Battle, Some(4), at(12)),
            vec![RecoveryAction::Unstick(GameState::Battle)]
        );
        assert_eq!(
            tracker.observe(GameState::Battle, Some(4), at(15)),
            vec![RecoveryAction::ForcedSweep]
        );
        assert_eq!(tracker.stuck_count(), 0);
        assert_eq!(tracker.stalls(), 5);
    }

    #[test]
    fn test_change_resets_counter() {
        let start = Instant::now();
        let mut tracker = tracker();
        let at = |secs: u64| start + Duration::from_secs(secs);

        tracker.observe(GameState::Battle, Some(4), at(0));
        tracker.observe(GameState::Battle, Some(4), at(3));
        assert_eq!(tracker.stuck_count(), 1);
        tracker.observe(GameState::Battle, Some(5), at(4));
        assert_eq!(tracker.stuck_count(), 0);
    }

    #[test]
    fn test_reveal_timeouts_are_rate_limited() {
        let start = Instant::now();
        let config = ExplorationConfig::default();
        let mut tracker = StallTracker::new(&config, start);
        let at = |secs: u64| start + Duration::from_secs(secs);

        // Alternate the visible count so only the reveal timer can fire
        assert!(tracker.observe(GameState::Exploring, Some(1), at(10)).is_empty());
        assert_eq!(
            tracker.observe(GameState::Exploring, Some(2), at(16)),
            vec![RecoveryAction::ForcedSweep]
        );
        assert!(tracker.observe(GameState::Exploring, Some(1), at(20)).is_empty());
        assert_eq!(
            tracker.observe(GameState::Exploring, Some(2), at(41)),
            vec![RecoveryAction::FullReset]
        );

        tracker.record_reveal(at(42));
        assert!(tracker.observe(GameState::Exploring, Some(1), at(50)).is_empty());
    }

    /// Rejects every command but keeps counting them.
    struct RejectingGame {
        attacks: u32,
        force_moves: u32,
    }

    impl GameInterface for RejectingGame {
        fn state_signals(&mut self) -> Option<StateSignals> {
            Some(StateSignals {
                board: true,
                ..Default::default()
            })
        }

        fn snapshot_grid(&mut self) -> Option<BoardSnapshot> {
            None
        }

        fn click(&mut self, position: Position) -> Result<(), ExplorationError> {
            Err(ExplorationError::ActionRejected(position))
        }

        fn click_boss(&mut self) -> Result<(), ExplorationError> {
            Err(ExplorationError::NoPathFound)
        }

        fn click_chest(&mut self) -> Result<(), ExplorationError> {
            Err(ExplorationError::NoPathFound)
        }

        fn click_attack(&mut self) -> Result<(), ExplorationError> {
            self.attacks += 1;
            Err(ExplorationError::NoPathFound)
        }

        fn find_dungeon_completion_control(&mut self) -> bool {
            false
        }

        fn start_dungeon(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn force_move(&mut self, position: Position) -> Result<(), ExplorationError> {
            self.force_moves += 1;
            Err(ExplorationError::ActionRejected(position))
        }
    }

    #[test]
    fn test_rejected_recovery_commands_do_not_abort() {
        let mut game = RejectingGame {
            attacks: 0,
            force_moves: 0,
        };
        let mut observer = DefaultObserver;
        let grid = crate::state::MapAnalyzer::new()
            .build(&BoardSnapshot::from_ascii(&["P.", ".."]))
            .expect("valid grid");
        let mut controller = ExplorationController::new(
            &mut game,
            &mut observer,
            ExplorationConfig::without_delays(),
            CancelToken::new(),
        );

        assert_eq!(
            controller.recover(RecoveryAction::Unstick(GameState::Battle), Some(&grid)),
            Ok(())
        );
        assert_eq!(controller.recover(RecoveryAction::FullReset, Some(&grid)), Ok(()));
        assert_eq!(controller.stats().recovery_actions, 2);
        drop(controller);

        assert_eq!(game.attacks, UNSTICK_ATTACKS);
        assert_eq!(game.force_moves as usize, RESET_RANDOM_MOVES);
    }
}
