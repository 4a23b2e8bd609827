//! Runs the exploration controller over a series of dungeons on a worker thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::controller::{ExplorationController, RunOutcome, RunStats};
use crate::infra::{
    CallbackObserver, CancelToken, CompositeObserver, DefaultObserver, ExplorationConfig,
    ExplorationError, GameInterface, GameObserver, LogCallback, StatusCallback,
};

pub type SharedGame = Arc<Mutex<Box<dyn GameInterface>>>;

/// Totals across the dungeons of one session. Only completed dungeons add to the
/// chest, enemy and tile totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub dungeons_attempted: u32,
    pub dungeons_completed: u32,
    pub dungeons_failed: u32,
    pub total_chests_found: u32,
    pub total_rare_chests: u32,
    pub total_enemies_defeated: u32,
    pub total_tiles_revealed: u32,
    pub current_dungeon: Option<u32>,
    pub running: bool,
}

impl SessionStats {
    fn record(&mut self, outcome: &RunOutcome, run: &RunStats) {
        match outcome {
            RunOutcome::Completed => {
                self.dungeons_completed += 1;
                self.total_chests_found += run.chests_opened;
                self.total_rare_chests += run.rare_chests_opened;
                self.total_enemies_defeated += run.enemies_defeated;
                self.total_tiles_revealed += run.tiles_revealed;
            }
            RunOutcome::Failed(_) => self.dungeons_failed += 1,
        }
    }
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct DungeonSession {
    game: SharedGame,
    config: ExplorationConfig,
    cancel: CancelToken,
    stats: Arc<Mutex<SessionStats>>,
    worker: Option<JoinHandle<()>>,
}

impl DungeonSession {
    pub fn new(game: Box<dyn GameInterface>, config: ExplorationConfig) -> Self {
        Self {
            game: Arc::new(Mutex::new(game)),
            config,
            cancel: CancelToken::new(),
            stats: Arc::new(Mutex::new(SessionStats::default())),
            worker: None,
        }
    }

    /// Starts a worker running up to `max_dungeons` dungeons, `0` meaning until stopped.
    /// Returns `false` when a session is already running or the game is not ready.
    pub fn start(
        &mut self,
        max_dungeons: u32,
        on_log: LogCallback,
        on_status: StatusCallback,
    ) -> bool {
        if self.is_running() {
            warn!("Session already running");
            return false;
        }
        self.join();

        {
            let mut game = match self.game.try_lock() {
                Ok(game) => game,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    warn!("Game interface is busy");
                    return false;
                }
            };
            if !game.is_ready() {
                warn!("Game is not ready, session not started");
                return false;
            }
        }

        self.cancel = CancelToken::new();
        *lock(&self.stats) = SessionStats {
            running: true,
            ..SessionStats::default()
        };

        let worker = Worker {
            game: Arc::clone(&self.game),
            config: self.config.clone(),
            cancel: self.cancel.clone(),
            stats: Arc::clone(&self.stats),
            max_dungeons,
        };
        self.worker = Some(thread::spawn(move || worker.run(on_log, on_status)));
        true
    }

    /// Asks the worker to stop without waiting for it; `join` waits.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn stats(&self) -> SessionStats {
        lock(&self.stats).clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Waits for the current worker, if any.
    pub fn join(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("Session worker panicked");
            let mut stats = lock(&self.stats);
            stats.running = false;
            stats.current_dungeon = None;
        }
    }

    /// Token that stops the running worker when cancelled.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Drop for DungeonSession {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

struct Worker {
    game: SharedGame,
    config: ExplorationConfig,
    cancel: CancelToken,
    stats: Arc<Mutex<SessionStats>>,
    max_dungeons: u32,
}

impl Worker {
    fn run(self, on_log: LogCallback, on_status: StatusCallback) {
        let observers: Vec<Box<dyn GameObserver>> = vec![
            Box::new(DefaultObserver),
            Box::new(CallbackObserver::new(on_log, on_status)),
        ];
        let mut observer = CompositeObserver::new(observers);
        let mut game = lock(&self.game);

        observer.on_session_start(self.max_dungeons);
        if let Err(e) = self.run_dungeons(&mut **game, &mut observer) {
            warn!("Session ended early: {}", e);
        }

        let final_stats = {
            let mut stats = lock(&self.stats);
            stats.running = false;
            stats.current_dungeon = None;
            stats.clone()
        };
        observer.on_session_finished(&final_stats);
    }

    fn run_dungeons(
        &self,
        game: &mut dyn GameInterface,
        observer: &mut CompositeObserver,
    ) -> Result<(), ExplorationError> {
        let mut dungeon = 0;
        while self.max_dungeons == 0 || dungeon < self.max_dungeons {
            if self.cancel.is_cancelled() {
                return Err(ExplorationError::SessionAborted);
            }
            dungeon += 1;

            self.start_dungeon(game, observer, dungeon)?;
            {
                let mut stats = lock(&self.stats);
                stats.dungeons_attempted += 1;
                stats.current_dungeon = Some(dungeon);
            }

            let mut controller = ExplorationController::new(
                &mut *game,
                &mut *observer,
                self.config.clone(),
                self.cancel.clone(),
            );
            let result = controller.run();
            let run_stats = *controller.stats();

            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    game.exit_dungeon();
                    return Err(e);
                }
            };
            lock(&self.stats).record(&outcome, &run_stats);
            observer.on_dungeon_finished(dungeon, &outcome, &run_stats);
            if let RunOutcome::Failed(_) = outcome {
                game.exit_dungeon();
            }

            let more = self.max_dungeons == 0 || dungeon < self.max_dungeons;
            if more && !self.cancel.sleep(self.config.between_dungeons) {
                return Err(ExplorationError::SessionAborted);
            }
        }
        Ok(())
    }

    /// Starts the next dungeon, retrying a few times before giving up on the game.
    fn start_dungeon(
        &self,
        game: &mut dyn GameInterface,
        observer: &mut CompositeObserver,
        dungeon: u32,
    ) -> Result<(), ExplorationError> {
        let mut failures = 0;
        loop {
            if self.max_dungeons == 0 {
                observer.on_status(&format!("Starting dungeon {}", dungeon));
            } else {
                observer.on_status(&format!(
                    "Starting dungeon {}/{}",
                    dungeon, self.max_dungeons
                ));
            }

            match game.start_dungeon() {
                Ok(()) => {
                    info!("Dungeon {} started", dungeon);
                    return Ok(());
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        "Could not start dungeon ({}/{}): {}",
                        failures, self.config.max_start_failures, e
                    );
                    if failures >= self.config.max_start_failures {
                        return Err(ExplorationError::InterfaceUnavailable(format!(
                            "dungeon did not start after {} tries: {}",
                            failures, e
                        )));
                    }
                }
            }

            if !self.cancel.sleep(self.config.start_retry_delay) {
                return Err(ExplorationError::SessionAborted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::infra::{BoardSnapshot, DungeonLayout, Position, SimulatedDungeon, StateSignals};

    fn quiet() -> LogCallback {
        Arc::new(|_: &str| {})
    }

    fn layouts(maps: &[&[&str]]) -> Vec<DungeonLayout> {
        maps.iter()
            .map(|rows| DungeonLayout::from_ascii(rows).expect("valid layout"))
            .collect()
    }

    #[test]
    fn test_failed_dungeon_is_not_folded_into_totals() {
        let game = SimulatedDungeon::new(layouts(&[
            &["B", "C", "P"],
            &["B", "#", "C", "P"],
            &["B", "C", "P"],
        ]));
        let mut session = DungeonSession::new(Box::new(game), ExplorationConfig::without_delays());

        assert!(session.start(3, quiet(), quiet()));
        session.join();

        let stats = session.stats();
        assert_eq!(stats.dungeons_attempted, 3);
        assert_eq!(stats.dungeons_completed, 2);
        assert_eq!(stats.dungeons_failed, 1);
        assert_eq!(stats.total_chests_found, 2);
        assert_eq!(stats.total_enemies_defeated, 2);
        assert!(!stats.running);
        assert_eq!(stats.current_dungeon, None);
    }

    #[test]
    fn test_second_start_is_refused_while_running() {
        let game = SimulatedDungeon::random(7, 6);
        let mut session = DungeonSession::new(Box::new(game), ExplorationConfig::default());

        assert!(session.start(0, quiet(), quiet()));
        assert!(!session.start(1, quiet(), quiet()));
        session.stop();
        session.join();

        assert!(!session.is_running());
        assert!(!session.stats().running);
    }

    #[test]
    fn test_missing_dungeons_end_the_session() {
        let game = SimulatedDungeon::new(Vec::new());
        let mut config = ExplorationConfig::without_delays();
        config.max_start_failures = 2;
        let mut session = DungeonSession::new(Box::new(game), config);

        assert!(session.start(2, quiet(), quiet()));
        session.join();

        let stats = session.stats();
        assert_eq!(stats.dungeons_attempted, 0);
        assert!(!stats.running);
    }

    #[test]
    fn test_log_callback_receives_lines() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = Arc::clone(&lines);
        let on_log: LogCallback = Arc::new(move |line: &str| lock(&sink).push(line.to_string()));

        let game = SimulatedDungeon::new(layouts(&[&["B", "C", "P"]]));
        let mut session = DungeonSession::new(Box::new(game), ExplorationConfig::without_delays());
        assert!(session.start(1, on_log, quiet()));
        session.join();

        let lines = lock(&lines);
        assert!(lines.iter().any(|line| line.contains("Dungeon 1 completed")));
        assert!(lines.iter().any(|line| line.contains("Opened chest")));
    }

    /// Takes a long time to answer every state query.
    struct SlowGame;

    impl GameInterface for SlowGame {
        fn state_signals(&mut self) -> Option<StateSignals> {
            thread::sleep(Duration::from_millis(800));
            None
        }

        fn snapshot_grid(&mut self) -> Option<BoardSnapshot> {
            None
        }

        fn click(&mut self, _position: Position) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn click_boss(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn click_chest(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn click_attack(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }

        fn find_dungeon_completion_control(&mut self) -> bool {
            false
        }

        fn start_dungeon(&mut self) -> Result<(), ExplorationError> {
            Ok(())
        }
    }

    #[test]
    fn test_stop_does_not_wait_for_worker() {
        let mut session =
            DungeonSession::new(Box::new(SlowGame), ExplorationConfig::without_delays());
        assert!(session.start(1, quiet(), quiet()));
        thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        session.stop();
        assert!(start.elapsed() < Duration::from_millis(200));

        session.join();
        assert!(!session.is_running());
        assert!(!session.stats().running);
    }
}
