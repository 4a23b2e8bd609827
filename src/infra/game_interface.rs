use crate::infra::{ExplorationError, Position};
use crate::state::{ChestRarity, EnemyStrength};

/// Coarse game state as seen by the exploration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Battle,
    Chest,
    Boss,
    Exploring,
    Unknown,
}

/// Raw indicators read from the game screen in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateSignals {
    pub battle: bool,
    pub chest: bool,
    pub boss: bool,
    pub board: bool,
}

impl GameState {
    /// Classification precedence is battle > chest > boss > exploring > unknown. An open battle
    /// hides every other prompt, a chest prompt hides the boss button, and the board alone means
    /// free exploration.
    pub fn classify(signals: &StateSignals) -> GameState {
        if signals.battle {
            GameState::Battle
        } else if signals.chest {
            GameState::Chest
        } else if signals.boss {
            GameState::Boss
        } else if signals.board {
            GameState::Exploring
        } else {
            GameState::Unknown
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonDescriptor {
    pub name: String,
    pub difficulty: Difficulty,
    pub min_chests: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyHealth {
    pub current: f64,
    pub max: f64,
}

impl EnemyHealth {
    pub fn fraction(&self) -> f64 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

/// A visible marker on a rendered board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marker {
    Player,
    Boss,
    Chest(ChestRarity),
    Enemy(EnemyStrength),
    Empty,
    Visited,
    Invisible,
    Wall,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedCell {
    pub markers: Vec<Marker>,
}

impl RenderedCell {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self { markers }
    }

    pub fn has(&self, marker: Marker) -> bool {
        self.markers.contains(&marker)
    }
}

/// The board exactly as the game currently renders it, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub rows: Vec<Vec<RenderedCell>>,
}

impl BoardSnapshot {
    pub fn new(rows: Vec<Vec<RenderedCell>>) -> Self {
        Self { rows }
    }

    /// Builds a snapshot from a text picture, one string per row.
    ///
    /// `P` player, `B` boss, `C` chest, `R` rare chest, `E` enemy, `S` strong enemy, `.` empty,
    /// `v` visited, `?` invisible, `#` wall. Any other character renders a cell without markers.
    pub fn from_ascii(rows: &[&str]) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                row.chars()
                    .map(|c| {
                        let markers = match c {
                            'P' => vec![Marker::Player, Marker::Visited],
                            'B' => vec![Marker::Boss],
                            'C' => vec![Marker::Chest(ChestRarity::Common)],
                            'R' => vec![Marker::Chest(ChestRarity::Rare)],
                            'E' => vec![Marker::Enemy(EnemyStrength::Standard)],
                            'S' => vec![Marker::Enemy(EnemyStrength::Strong)],
                            '.' => vec![Marker::Empty],
                            'v' => vec![Marker::Visited],
                            '?' => vec![Marker::Invisible],
                            '#' => vec![Marker::Wall],
                            _ => Vec::new(),
                        };
                        RenderedCell::new(markers)
                    })
                    .collect()
            })
            .collect();
        Self { rows }
    }
}

/// Capabilities the exploration engine needs from the running game.
///
/// Expected absences (no board, no health bar, a click that did nothing) are reported through
/// `Option` and `Result`, never by panicking.
pub trait GameInterface: Send {
    /// Whether the game is loaded and able to accept commands.
    fn is_ready(&mut self) -> bool {
        true
    }

    /// Reads the raw state indicators, `None` when the screen could not be read.
    fn state_signals(&mut self) -> Option<StateSignals>;

    fn classify_state(&mut self) -> GameState {
        self.state_signals()
            .map(|signals| GameState::classify(&signals))
            .unwrap_or(GameState::Unknown)
    }

    fn snapshot_grid(&mut self) -> Option<BoardSnapshot>;

    fn click(&mut self, position: Position) -> Result<(), ExplorationError>;

    fn click_boss(&mut self) -> Result<(), ExplorationError>;

    fn click_chest(&mut self) -> Result<(), ExplorationError>;

    fn click_attack(&mut self) -> Result<(), ExplorationError>;

    fn find_dungeon_completion_control(&mut self) -> bool;

    fn detect_dungeon_descriptor(&mut self) -> Option<DungeonDescriptor> {
        None
    }

    fn start_dungeon(&mut self) -> Result<(), ExplorationError>;

    /// Leaves the current dungeon after a failed run.
    fn exit_dungeon(&mut self) {}

    fn enemy_health(&mut self) -> Option<EnemyHealth> {
        None
    }

    fn reward_text(&mut self) -> Option<String> {
        None
    }

    /// Clicks somewhere neutral on the screen.
    fn click_elsewhere(&mut self) -> Result<(), ExplorationError> {
        Ok(())
    }

    /// Closes open dialogs, returning how many were closed.
    fn dismiss_dialogs(&mut self) -> usize {
        0
    }

    /// Moves the player through the game engine, bypassing the rendered board.
    fn force_move(&mut self, position: Position) -> Result<(), ExplorationError> {
        Err(ExplorationError::ActionRejected(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_precedence() {
        let all = StateSignals {
            battle: true,
            chest: true,
            boss: true,
            board: true,
        };
        assert_eq!(GameState::classify(&all), GameState::Battle);

        let no_battle = StateSignals { battle: false, ..all };
        assert_eq!(GameState::classify(&no_battle), GameState::Chest);

        let boss_only = StateSignals {
            boss: true,
            board: true,
            ..Default::default()
        };
        assert_eq!(GameState::classify(&boss_only), GameState::Boss);

        let board_only = StateSignals {
            board: true,
            ..Default::default()
        };
        assert_eq!(GameState::classify(&board_only), GameState::Exploring);
        assert_eq!(GameState::classify(&StateSignals::default()), GameState::Unknown);
    }

    #[test]
    fn test_snapshot_from_ascii() {
        let snapshot = BoardSnapshot::from_ascii(&["P?", "#R"]);
        assert_eq!(snapshot.rows.len(), 2);
        assert!(snapshot.rows[0][0].has(Marker::Player));
        assert!(snapshot.rows[0][1].has(Marker::Invisible));
        assert!(snapshot.rows[1][0].has(Marker::Wall));
        assert!(snapshot.rows[1][1].has(Marker::Chest(ChestRarity::Rare)));
    }
}
