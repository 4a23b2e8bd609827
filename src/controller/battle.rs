use std::time::Instant;

use tracing::{debug, warn};

use crate::controller::ExplorationController;
use crate::infra::{ExplorationError, GameState};

/// Health fraction below which attacks switch to the fast interval.
const FINISHING_FRACTION: f64 = 0.2;
const EXTRA_ATTACKS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    /// The game left the battle screen
    Won { attacks: u32 },
    /// Attack cap reached while still in battle
    Exhausted { attacks: u32 },
}

impl ExplorationController<'_> {
    /// Attacks until the battle screen disappears or the attack cap is hit.
    pub(super) fn run_battle(&mut self) -> Result<BattleOutcome, ExplorationError> {
        let mut attacks = 0;
        let mut stalls = 0;
        let mut interval = self.config.attack_interval;
        let mut last_health = None;
        let mut last_health_change = Instant::now();
        let mut last_check = Instant::now();

        if let Some(health) = self.game.enemy_health()
            && health.max > self.config.tough_enemy_health
        {
            debug!("Tough enemy with {} health", health.max);
            interval = self.config.fast_attack_interval;
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(ExplorationError::SessionAborted);
            }
            if self.game.classify_state() != GameState::Battle {
                debug!("Battle over after {} attacks", attacks);
                return Ok(BattleOutcome::Won { attacks });
            }
            if !self.strike(&mut attacks) {
                warn!("Giving up battle after {} attacks", attacks);
                return Ok(BattleOutcome::Exhausted { attacks });
            }

            let now = Instant::now();
            if let Some(health) = self.game.enemy_health() {
                if health.fraction() < FINISHING_FRACTION {
                    interval = self.config.fast_attack_interval;
                }
                if last_health != Some(health.current) {
                    last_health = Some(health.current);
                    last_health_change = now;
                }
            }

            if now.duration_since(last_check) >= self.config.battle_stall_interval {
                last_check = now;
                if now.duration_since(last_health_change) >= self.config.battle_stall_interval {
                    stalls += 1;
                    if stalls >= self.config.battle_stuck_threshold {
                        let tier = stalls - self.config.battle_stuck_threshold;
                        if self.escalate_battle(tier, &mut attacks) {
                            stalls = 0;
                        }
                    }
                }
            }

            if !self.cancel.sleep(interval) {
                return Err(ExplorationError::SessionAborted);
            }
        }
    }

    /// One attack, unless the cap is reached.
    fn strike(&mut self, attacks: &mut u32) -> bool {
        if *attacks >= self.config.max_attack_attempts {
            return false;
        }
        if let Err(e) = self.game.click_attack() {
            debug!("Attack failed: {}", e);
        }
        *attacks += 1;
        true
    }

    /// Returns `true` once the last tier ran and the stall count should start over.
    fn escalate_battle(&mut self, tier: u32, attacks: &mut u32) -> bool {
        self.stats.recovery_actions += 1;
        match tier {
            0 => {
                warn!("Enemy health not moving, forcing extra attacks");
                for _ in 0..EXTRA_ATTACKS {
                    self.strike(attacks);
                }
                false
            }
            1 => {
                warn!("Enemy health still not moving, refocusing the battle");
                if let Err(e) = self.game.click_elsewhere() {
                    debug!("Click elsewhere failed: {}", e);
                }
                self.strike(attacks);
                false
            }
            _ => {
                warn!("Battle stuck, bursting {} attacks", self.config.burst_attacks);
                for _ in 0..self.config.burst_attacks {
                    if !self.strike(attacks) {
                        break;
                    }
                }
                true
            }
        }
    }
}
