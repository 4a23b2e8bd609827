//! Per-dungeon state machine.
//!
//! Every tick the controller reads the board, looks for stalls and then acts on the coarse game
//! state: fight, open the chest, engage the boss, explore, or wait.

use std::thread;
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::controller::{BattleOutcome, DungeonProfile, RecoveryAction, RunStats, StallTracker};
use crate::infra::{
    CancelToken, ExplorationConfig, ExplorationError, GameInterface, GameObserver, GameState,
    Position,
};
use crate::planners::{PathPlanner, TargetSelector};
use crate::state::{ChestRarity, ExplorationPhase, Grid, MapAnalyzer, TileKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(ExplorationError),
}

pub struct ExplorationController<'a> {
    pub(super) game: &'a mut dyn GameInterface,
    pub(super) observer: &'a mut dyn GameObserver,
    pub(super) config: ExplorationConfig,
    pub(super) cancel: CancelToken,
    pub(super) stats: RunStats,
    pub(super) rng: StdRng,
    pub(super) entrance: Option<Position>,

    analyzer: MapAnalyzer,
    planner: PathPlanner,
    selector: TargetSelector,
    tracker: StallTracker,
    profile: Option<DungeonProfile>,
    attempts: u32,
    consecutive_failures: u32,
    last_phase: Option<ExplorationPhase>,
    max_visible: Option<usize>,
    last_clicked: Option<TileKind>,
    min_chests_announced: bool,
    started: Instant,
}

impl<'a> ExplorationController<'a> {
    pub fn new(
        game: &'a mut dyn GameInterface,
        observer: &'a mut dyn GameObserver,
        config: ExplorationConfig,
        cancel: CancelToken,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let now = Instant::now();
        Self {
            game,
            observer,
            cancel,
            stats: RunStats::default(),
            rng,
            entrance: None,
            analyzer: MapAnalyzer::new(),
            planner: PathPlanner::new(config.enemy_avoidance_cost),
            selector: TargetSelector::new(config.early_visible_tiles, config.seed),
            tracker: StallTracker::new(&config, now),
            profile: None,
            attempts: 0,
            consecutive_failures: 0,
            last_phase: None,
            max_visible: None,
            last_clicked: None,
            min_chests_announced: false,
            started: now,
            config,
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn profile(&self) -> Option<&DungeonProfile> {
        self.profile.as_ref()
    }

    /// Runs the dungeon to its end.
    ///
    /// Dungeon-level failures come back as `Ok(RunOutcome::Failed(..))`. Only cancellation and a
    /// game that cannot be driven at all are returned as errors.
    pub fn run(&mut self) -> Result<RunOutcome, ExplorationError> {
        if !self.game.is_ready() {
            return Err(ExplorationError::InterfaceUnavailable(
                "game is not ready".to_string(),
            ));
        }

        self.started = Instant::now();
        self.tracker = StallTracker::new(&self.config, self.started);

        loop {
            if let Some(outcome) = self.tick()? {
                info!("Run finished after {} ticks: {:?}", self.attempts, outcome);
                return Ok(outcome);
            }
            if !self.cancel.sleep(self.config.tick_interval) {
                return Err(ExplorationError::SessionAborted);
            }
        }
    }

    /// One observe-decide-act step. `Ok(Some(..))` ends the run.
    pub fn tick(&mut self) -> Result<Option<RunOutcome>, ExplorationError> {
        if self.cancel.is_cancelled() {
            return Err(ExplorationError::SessionAborted);
        }
        self.attempts += 1;

        let grid = self.analyzer.analyze(&mut *self.game);
        if self.profile.is_none() {
            self.load_profile(grid.as_ref());
        }
        let budget = self.budget();
        if self.attempts > budget.max_attempts {
            return Ok(Some(RunOutcome::Failed(
                ExplorationError::AttemptExhausted {
                    attempts: budget.max_attempts,
                },
            )));
        }
        if self.started.elapsed() > budget.timeout {
            return Ok(Some(RunOutcome::Failed(ExplorationError::Timeout {
                seconds: budget.timeout.as_secs(),
            })));
        }

        let now = Instant::now();
        if let Some(grid) = &grid {
            self.track_grid(grid, now);
        }

        let state = self.game.classify_state();
        let visible = grid.as_ref().map(|g| g.visible().len());
        let stalls_before = self.tracker.stalls();
        let actions = self.tracker.observe(state, visible, now);
        if self.tracker.stalls() > stalls_before {
            self.stats.stalls_detected = self.tracker.stalls();
            self.observer
                .on_stall_detected(state, self.tracker.stuck_count().max(1));
        }
        if !actions.is_empty() {
            for action in actions {
                self.recover(action, grid.as_ref())?;
            }
            return Ok(None);
        }

        match state {
            GameState::Battle => {
                self.observer.on_status("Fighting");
                if let BattleOutcome::Won { .. } = self.run_battle()? {
                    self.stats.enemies_defeated += 1;
                }
                Ok(None)
            }
            GameState::Chest => self.open_chest().map(|_| None),
            GameState::Boss => self.engage_boss(),
            GameState::Exploring => self.explore(grid.as_ref()).map(|_| None),
            GameState::Unknown => {
                if self.game.find_dungeon_completion_control() {
                    return Ok(Some(RunOutcome::Completed));
                }
                debug!("Unknown screen, waiting");
                if !self.cancel.sleep(self.config.unknown_wait) {
                    return Err(ExplorationError::SessionAborted);
                }
                Ok(None)
            }
        }
    }

    fn load_profile(&mut self, grid: Option<&Grid>) {
        let descriptor = self.game.detect_dungeon_descriptor();
        if descriptor.is_none() && grid.is_none() {
            return;
        }
        let profile = DungeonProfile::detect(descriptor, grid, &self.config);
        self.observer.on_dungeon_start(&profile);
        self.profile = Some(profile);
    }

    fn budget(&self) -> crate::infra::DungeonBudget {
        match &self.profile {
            Some(profile) => profile.budget,
            None => self.config.normal,
        }
    }

    fn track_grid(&mut self, grid: &Grid, now: Instant) {
        if self.entrance.is_none() {
            self.entrance = grid.player();
        }

        let phase = grid.phase();
        if self.last_phase != Some(phase) {
            if self.last_phase.is_some() {
                self.stats.phase_transitions += 1;
            }
            self.observer
                .on_phase_changed(self.last_phase, phase, &grid.status());
            self.last_phase = Some(phase);
        }

        let visible = grid.visible().len();
        match self.max_visible {
            Some(max) if visible > max => {
                self.stats.tiles_revealed += (visible - max) as u32;
                self.max_visible = Some(visible);
                self.tracker.record_reveal(now);
            }
            None => self.max_visible = Some(visible),
            _ => {}
        }
    }

    fn open_chest(&mut self) -> Result<(), ExplorationError> {
        if let Err(e) = self.game.click_chest() {
            debug!("Chest did not open: {}", e);
            return Ok(());
        }
        if !self.cancel.sleep(self.config.chest_settle) {
            return Err(ExplorationError::SessionAborted);
        }

        let rarity = match self.last_clicked.take() {
            Some(TileKind::Chest { rarity }) => rarity,
            _ => ChestRarity::Common,
        };
        let reward = self.game.reward_text();
        self.stats.chests_opened += 1;
        if rarity == ChestRarity::Rare {
            self.stats.rare_chests_opened += 1;
        }
        self.observer.on_chest_opened(rarity, reward.as_deref());

        if let Some(profile) = &self.profile
            && !self.min_chests_announced
            && profile.min_chests > 0
            && self.stats.chests_opened >= profile.min_chests
        {
            self.min_chests_announced = true;
            self.observer
                .on_min_chests_reached(self.stats.chests_opened, profile.min_chests);
        }
        Ok(())
    }

    fn engage_boss(&mut self) -> Result<Option<RunOutcome>, ExplorationError> {
        self.observer.on_status("Engaging the boss");
        if let Err(e) = self.game.click_boss() {
            debug!("Boss did not respond: {}", e);
            return Ok(None);
        }
        if !self.cancel.sleep(self.config.boss_engage_delay) {
            return Err(ExplorationError::SessionAborted);
        }

        match self.game.classify_state() {
            GameState::Battle => match self.run_battle()? {
                BattleOutcome::Won { attacks } => {
                    info!("Boss defeated after {} attacks", attacks);
                    self.stats.enemies_defeated += 1;
                    Ok(Some(RunOutcome::Completed))
                }
                BattleOutcome::Exhausted { .. } => {
                    Ok(Some(RunOutcome::Failed(ExplorationError::BossNotDefeated)))
                }
            },
            _ if self.game.find_dungeon_completion_control() => Ok(Some(RunOutcome::Completed)),
            _ => Ok(None),
        }
    }

    fn explore(&mut self, grid: Option<&Grid>) -> Result<(), ExplorationError> {
        let Some(grid) = grid else {
            debug!("{}", ExplorationError::ObservationUnavailable);
            return Ok(());
        };

        let Some(next) = self.selector.select_next_move(grid, &self.planner) else {
            self.consecutive_failures += 1;
            debug!(
                "{} ({} in a row)",
                ExplorationError::NoPathFound,
                self.consecutive_failures
            );
            if self.consecutive_failures >= self.config.max_consecutive_failures {
                warn!("No target for {} ticks", self.consecutive_failures);
                self.consecutive_failures = 0;
                self.recover(RecoveryAction::ForcedSweep, Some(grid))?;
            }
            return Ok(());
        };
        self.consecutive_failures = 0;
        self.observer.on_move_selected(&next, grid);
        self.stats.moves_made += 1;

        let before = grid.visible().len();
        let target = next.first_click();
        if let Err(e) = self.game.click(target) {
            debug!("{}", e);
            self.stats.non_productive_moves += 1;
            return Ok(());
        }
        self.last_clicked = grid.get(&target).map(|tile| tile.kind);

        // The follow-up depends on the first click, so it is not cut short by cancellation
        if let Some(follow_up) = next.follow_up() {
            thread::sleep(self.config.follow_up_delay);
            if self.game.classify_state() == GameState::Exploring {
                match self.game.click(follow_up) {
                    Ok(()) => self.last_clicked = grid.get(&follow_up).map(|tile| tile.kind),
                    Err(e) => debug!("Follow-up click failed: {}", e),
                }
            }
        }

        if !self.cancel.sleep(self.config.settle_delay) {
            return Err(ExplorationError::SessionAborted);
        }

        let state = self.game.classify_state();
        let after = self
            .analyzer
            .analyze(&mut *self.game)
            .map(|g| g.visible().len());
        let revealed = after.is_some_and(|after| after > before);
        if state != GameState::Exploring || revealed {
            debug!("Move to {} made progress", next.destination());
        } else {
            self.stats.non_productive_moves += 1;
            debug!("{}", ExplorationError::ActionRejected(target));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::controller::DungeonProfile;
    use crate::infra::{BoardSnapshot, Difficulty, EnemyHealth, StateSignals};
    use crate::session::SessionStats;
    use crate::state::{ExplorationStatus, Move};

    struct SilentObserver;

    impl GameObserver for SilentObserver {
        fn on_session_start(&mut self, _max_dungeons: u32) {}
        fn on_dungeon_start(&mut self, _profile: &DungeonProfile) {}
        fn on_phase_changed(
            &mut self,
            _previous: Option<ExplorationPhase>,
            _phase: ExplorationPhase,
            _status: &ExplorationStatus,
        ) {
        }
        fn on_move_selected(&mut self, _next: &Move, _grid: &Grid) {}
        fn on_chest_opened(&mut self, _rarity: ChestRarity, _reward: Option<&str>) {}
        fn on_min_chests_reached(&mut self, _opened: u32, _minimum: u32) {}
        fn on_stall_detected(&mut self, _state: GameState, _stuck_count: u32) {}
        fn on_recovery(&mut self, _action: &RecoveryAction) {}
        fn on_dungeon_finished(&mut self, _dungeon: u32, _outcome: &RunOutcome, _stats: &RunStats) {
        }
        fn on_session_finished(&mut self, _stats: &SessionStats) {}
    }

    /// A game that never reacts to anything.
    struct FrozenGame {
        signals: StateSignals,
        board: Vec<&'static str>,
        clicks: Vec<Position>,
        attacks: u32,
        force_moves: u32,
        cancel_on_click: Option<CancelToken>,
    }

    impl FrozenGame {
        fn new(signals: StateSignals) -> Self {
            Self {
                signals,
                board: vec!["???", "?P.", "???"],
                clicks: Vec::new(),
                attacks: 0,
                force_moves: 0,
                cancel_on_click: None,
            }
        }
    }

    impl GameInterface for FrozenGame {
        fn state_signals(&mut self) -> Option<StateSignals> {
            Some(self.signals)
        }

        fn snapshot_grid(&mut self) -> Option<BoardSnapshot> {
            Some(BoardSnapshot::from_ascii(&self.board))
        }

        fn click(&mut self, position: Position) -> Result<(), ExplorationError> {
            self.clicks.push(position);
            if let Some(cancel) = &self.cancel_on_click {
                cancel.cancel();
            }
            Ok(())
        }

        fn click_boss(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn click_chest(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn click_attack(&mut self) -> Result<(), ExplorationError> {
            self.attacks += 1;
            Ok(())
        }

        fn find_dungeon_completion_control(&mut self) -> bool {
            false
        }

        fn start_dungeon(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn enemy_health(&mut self) -> Option<EnemyHealth> {
            Some(EnemyHealth {
                current: 100.0,
                max: 100.0,
            })
        }

        fn force_move(&mut self, _position: Position) -> Result<(), ExplorationError> {
            self.force_moves += 1;
            Ok(())
        }
    }

    fn exploring() -> StateSignals {
        StateSignals {
            board: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_frozen_game_escalates_before_sixth_tick() {
        let mut game = FrozenGame::new(exploring());
        let mut observer = SilentObserver;
        let config = ExplorationConfig {
            stall_window: Duration::ZERO,
            ..ExplorationConfig::without_delays()
        };
        let mut controller =
            ExplorationController::new(&mut game, &mut observer, config, CancelToken::new());

        for _ in 0..5 {
            assert_eq!(controller.tick(), Ok(None));
        }
        let stats = *controller.stats();
        drop(controller);

        assert!(game.force_moves > 0);
        assert!(stats.stalls_detected >= 3);
        assert!(stats.recovery_actions >= 1);
        assert!(stats.non_productive_moves >= 1);
    }

    #[test]
    fn test_battle_gives_up_at_attack_cap() {
        let battle = StateSignals {
            battle: true,
            board: true,
            ..Default::default()
        };
        let mut game = FrozenGame::new(battle);
        let mut observer = SilentObserver;
        let config = ExplorationConfig {
            max_attack_attempts: 12,
            ..ExplorationConfig::without_delays()
        };
        let mut controller =
            ExplorationController::new(&mut game, &mut observer, config, CancelToken::new());

        assert_eq!(controller.tick(), Ok(None));
        assert_eq!(controller.stats().enemies_defeated, 0);
        drop(controller);
        assert_eq!(game.attacks, 12);
    }

    #[test]
    fn test_attempt_ceiling_fails_run() {
        let mut game = FrozenGame::new(StateSignals::default());
        let mut observer = SilentObserver;
        let mut config = ExplorationConfig::without_delays();
        config.easy.max_attempts = 3;
        config.unknown_wait = Duration::ZERO;
        let mut controller =
            ExplorationController::new(&mut game, &mut observer, config, CancelToken::new());

        assert_eq!(
            controller.run(),
            Ok(RunOutcome::Failed(ExplorationError::AttemptExhausted {
                attempts: 3
            }))
        );
    }

    #[test]
    fn test_cancelled_run_is_an_error() {
        let mut game = FrozenGame::new(exploring());
        let mut observer = SilentObserver;
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut controller = ExplorationController::new(
            &mut game,
            &mut observer,
            ExplorationConfig::without_delays(),
            cancel,
        );
        assert_eq!(controller.run(), Err(ExplorationError::SessionAborted));
    }

    #[test]
    fn test_cancellation_finishes_access_tile_pair() {
        let cancel = CancelToken::new();
        let mut game = FrozenGame::new(exploring());
        game.board = vec!["vP", "C?"];
        game.cancel_on_click = Some(cancel.clone());
        let mut observer = SilentObserver;
        let mut controller = ExplorationController::new(
            &mut game,
            &mut observer,
            ExplorationConfig::without_delays(),
            cancel,
        );

        assert_eq!(controller.tick(), Err(ExplorationError::SessionAborted));
        assert_eq!(
            controller.profile().map(|profile| profile.difficulty),
            Some(Difficulty::Easy)
        );
        drop(controller);
        assert_eq!(game.clicks, vec![Position::new(0, 0), Position::new(0, 1)]);
    }
}
