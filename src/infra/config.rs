use std::env;
use std::time::Duration;

use crate::infra::Difficulty;

/// Attempt ceiling and wall-clock budget for one dungeon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DungeonBudget {
    pub max_attempts: u32,
    pub timeout: Duration,
}

/// Tunable thresholds of the exploration engine.
#[derive(Debug, Clone)]
pub struct ExplorationConfig {
    /// Pause between two controller ticks
    pub tick_interval: Duration,
    /// Pause between attacks in a normal battle
    pub attack_interval: Duration,
    /// Pause between attacks against tough or nearly defeated enemies
    pub fast_attack_interval: Duration,
    /// Max health above which an enemy is attacked at the fast interval from the start
    pub tough_enemy_health: f64,
    /// Minimum spacing between two battle stall checks
    pub battle_stall_interval: Duration,
    pub battle_stuck_threshold: u32,
    pub max_attack_attempts: u32,
    pub burst_attacks: u32,
    /// Wait before clicking the follow-up target of a move
    pub follow_up_delay: Duration,
    /// Wait after a move before re-observing the board
    pub settle_delay: Duration,
    pub chest_settle: Duration,
    pub boss_engage_delay: Duration,
    pub unknown_wait: Duration,

    /// How long state and visible tiles may stay unchanged before a tick counts as stuck
    pub stall_window: Duration,
    pub unstick_threshold: u32,
    pub sweep_threshold: u32,
    /// No tile revealed for this long forces an exploration sweep
    pub reveal_timeout: Duration,
    /// No tile revealed for this long forces a full reset
    pub reset_timeout: Duration,
    pub max_consecutive_failures: u32,

    pub enemy_avoidance_cost: u32,
    pub early_visible_tiles: usize,

    pub easy: DungeonBudget,
    pub normal: DungeonBudget,
    pub hard: DungeonBudget,

    pub start_retry_delay: Duration,
    pub max_start_failures: u32,
    pub between_dungeons: Duration,

    pub seed: Option<u64>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            attack_interval: Duration::from_millis(50),
            fast_attack_interval: Duration::from_millis(20),
            tough_enemy_health: 10_000.0,
            battle_stall_interval: Duration::from_millis(500),
            battle_stuck_threshold: 2,
            max_attack_attempts: 150,
            burst_attacks: 10,
            follow_up_delay: Duration::from_millis(300),
            settle_delay: Duration::from_millis(100),
            chest_settle: Duration::from_millis(500),
            boss_engage_delay: Duration::from_secs(1),
            unknown_wait: Duration::from_secs(1),
            stall_window: Duration::from_secs(3),
            unstick_threshold: 3,
            sweep_threshold: 5,
            reveal_timeout: Duration::from_secs(15),
            reset_timeout: Duration::from_secs(40),
            max_consecutive_failures: 3,
            enemy_avoidance_cost: 20,
            early_visible_tiles: 10,
            easy: DungeonBudget {
                max_attempts: 150,
                timeout: Duration::from_secs(300),
            },
            normal: DungeonBudget {
                max_attempts: 250,
                timeout: Duration::from_secs(600),
            },
            hard: DungeonBudget {
                max_attempts: 350,
                timeout: Duration::from_secs(900),
            },
            start_retry_delay: Duration::from_secs(5),
            max_start_failures: 5,
            between_dungeons: Duration::from_secs(2),
            seed: None,
        }
    }
}

impl ExplorationConfig {
    /// Same thresholds with every sleep removed, for simulated games.
    pub fn without_delays() -> Self {
        Self {
            tick_interval: Duration::ZERO,
            attack_interval: Duration::ZERO,
            fast_attack_interval: Duration::ZERO,
            follow_up_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            chest_settle: Duration::ZERO,
            boss_engage_delay: Duration::ZERO,
            unknown_wait: Duration::ZERO,
            start_retry_delay: Duration::ZERO,
            between_dungeons: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Applies `DELVE_*` environment overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(ms) = get_env_var::<u64>("DELVE_TICK_MS") {
            self.tick_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = get_env_var::<u64>("DELVE_STALL_WINDOW_SECS") {
            self.stall_window = Duration::from_secs(secs);
        }
        if let Some(count) = get_env_var::<u32>("DELVE_UNSTICK_THRESHOLD") {
            self.unstick_threshold = count;
        }
        if let Some(count) = get_env_var::<u32>("DELVE_SWEEP_THRESHOLD") {
            self.sweep_threshold = count;
        }
        if let Some(secs) = get_env_var::<u64>("DELVE_REVEAL_TIMEOUT_SECS") {
            self.reveal_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = get_env_var::<u64>("DELVE_RESET_TIMEOUT_SECS") {
            self.reset_timeout = Duration::from_secs(secs);
        }
        if let Some(cost) = get_env_var::<u32>("DELVE_ENEMY_AVOIDANCE_COST") {
            self.enemy_avoidance_cost = cost;
        }
        if let Some(seed) = get_env_var::<u64>("DELVE_SEED") {
            self.seed = Some(seed);
        }
        self
    }

    /// Default thresholds, or zero delays when `DELVE_FAST` is set, then environment overrides.
    pub fn from_env() -> Self {
        let base = if is_fast() {
            Self::without_delays()
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    pub fn budget(&self, difficulty: Difficulty) -> DungeonBudget {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Normal => self.normal,
            Difficulty::Hard => self.hard,
        }
    }
}

/// Whether `DELVE_FAST` asks for a run without delays.
pub fn is_fast() -> bool {
    fast_flag(env::var("DELVE_FAST").ok().as_deref())
}

/// Any value turns fast mode on except an explicit off.
fn fast_flag(value: Option<&str>) -> bool {
    value.is_some_and(|value| {
        !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off")
    })
}

pub fn get_env_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|val| val.parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_scales_with_difficulty() {
        let config = ExplorationConfig::default();
        assert_eq!(config.budget(Difficulty::Easy).max_attempts, 150);
        assert_eq!(config.budget(Difficulty::Normal).max_attempts, 250);
        assert_eq!(config.budget(Difficulty::Hard).max_attempts, 350);
        assert!(config.budget(Difficulty::Hard).timeout > config.budget(Difficulty::Easy).timeout);
    }

    #[test]
    fn test_without_delays_keeps_thresholds() {
        let config = ExplorationConfig::without_delays();
        assert_eq!(config.tick_interval, Duration::ZERO);
        assert_eq!(config.unstick_threshold, 3);
        assert_eq!(config.stall_window, Duration::from_secs(3));
    }

    #[test]
    fn test_fast_flag_treats_presence_as_on() {
        assert!(fast_flag(Some("1")));
        assert!(fast_flag(Some("true")));
        assert!(fast_flag(Some("")));
        assert!(!fast_flag(Some("0")));
        assert!(!fast_flag(Some("false")));
        assert!(!fast_flag(None));
    }
}
