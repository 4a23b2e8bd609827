//! Failure taxonomy of the exploration engine.

use thiserror::Error;

use crate::infra::Position;

/// Errors raised while exploring a dungeon.
///
/// Most variants are transient and absorbed by the controller's recovery logic. Only
/// [`ExplorationError::SessionAborted`] and [`ExplorationError::InterfaceUnavailable`] ever leave
/// [`crate::controller::ExplorationController::run`] as an `Err`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExplorationError {
    #[error("no observation available this tick")]
    ObservationUnavailable,

    #[error("no path or target found")]
    NoPathFound,

    #[error("action at {0} had no effect")]
    ActionRejected(Position),

    #[error("exploration ceiling reached after {attempts} attempts")]
    AttemptExhausted { attempts: u32 },

    #[error("dungeon timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("boss battle was not won")]
    BossNotDefeated,

    #[error("session aborted")]
    SessionAborted,

    #[error("game interface unavailable: {0}")]
    InterfaceUnavailable(String),
}

impl ExplorationError {
    /// Whether this error should end the whole session rather than a single tick or dungeon.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExplorationError::SessionAborted | ExplorationError::InterfaceUnavailable(_)
        )
    }
}
