use crate::infra::Position;
use crate::state::Path;

/// What the controller should click next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    /// Click `target`, then `next_target` if the game is still exploring.
    Direct {
        target: Position,
        next_target: Option<Position>,
    },
    /// Click `step`, the first tile of a longer route to `final_target`.
    Routed {
        step: Position,
        final_target: Position,
        path: Path,
    },
}

impl Move {
    pub fn from_path(path: Path) -> Self {
        match path.len() {
            1 => Move::Direct {
                target: path.first(),
                next_target: None,
            },
            2 => Move::Direct {
                target: path.first(),
                next_target: Some(path.last()),
            },
            _ => Move::Routed {
                step: path.first(),
                final_target: path.last(),
                path,
            },
        }
    }

    pub fn first_click(&self) -> Position {
        match self {
            Move::Direct { target, .. } => *target,
            Move::Routed { step, .. } => *step,
        }
    }

    pub fn follow_up(&self) -> Option<Position> {
        match self {
            Move::Direct { next_target, .. } => *next_target,
            Move::Routed { .. } => None,
        }
    }

    pub fn destination(&self) -> Position {
        match self {
            Move::Direct {
                target,
                next_target,
            } => next_target.unwrap_or(*target),
            Move::Routed { final_target, .. } => *final_target,
        }
    }
}
