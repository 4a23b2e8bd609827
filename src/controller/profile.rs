use crate::infra::{Difficulty, DungeonBudget, DungeonDescriptor, ExplorationConfig};
use crate::state::Grid;

const EASY_MAX_TILES: usize = 25;
const NORMAL_MAX_TILES: usize = 49;

/// What the controller knows about the dungeon it is running in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DungeonProfile {
    pub name: String,
    pub difficulty: Difficulty,
    pub min_chests: u32,
    pub budget: DungeonBudget,
    /// Whether the difficulty was guessed from the board instead of read from the game
    pub estimated: bool,
}

impl DungeonProfile {
    /// Uses the game's own descriptor when there is one, otherwise guesses from the board size.
    /// Without either the dungeon is treated as normal.
    pub fn detect(
        descriptor: Option<DungeonDescriptor>,
        grid: Option<&Grid>,
        config: &ExplorationConfig,
    ) -> Self {
        if let Some(descriptor) = descriptor {
            return Self {
                budget: config.budget(descriptor.difficulty),
                name: descriptor.name,
                difficulty: descriptor.difficulty,
                min_chests: descriptor.min_chests,
                estimated: false,
            };
        }

        let difficulty = grid
            .map(|grid| Self::estimate_difficulty(grid.tiles().len()))
            .unwrap_or(Difficulty::Normal);
        Self {
            name: "Unknown dungeon".to_string(),
            difficulty,
            min_chests: Self::estimated_min_chests(difficulty),
            budget: config.budget(difficulty),
            estimated: true,
        }
    }

    pub fn estimate_difficulty(tiles: usize) -> Difficulty {
        if tiles <= EASY_MAX_TILES {
            Difficulty::Easy
        } else if tiles <= NORMAL_MAX_TILES {
            Difficulty::Normal
        } else {
            Difficulty::Hard
        }
    }

    fn estimated_min_chests(difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => 2,
            Difficulty::Normal => 3,
            Difficulty::Hard => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::BoardSnapshot;
    use crate::state::MapAnalyzer;

    #[test]
    fn test_difficulty_from_board_size() {
        assert_eq!(DungeonProfile::estimate_difficulty(25), Difficulty::Easy);
        assert_eq!(DungeonProfile::estimate_difficulty(26), Difficulty::Normal);
        assert_eq!(DungeonProfile::estimate_difficulty(49), Difficulty::Normal);
        assert_eq!(DungeonProfile::estimate_difficulty(64), Difficulty::Hard);
    }

    #[test]
    fn test_descriptor_wins_over_estimate() {
        let config = ExplorationConfig::default();
        let grid = MapAnalyzer::new()
            .build(&BoardSnapshot::from_ascii(&["P.."]))
            .expect("valid grid");
        let descriptor = DungeonDescriptor {
            name: "Crypt".to_string(),
            difficulty: Difficulty::Hard,
            min_chests: 5,
        };

        let profile = DungeonProfile::detect(Some(descriptor), Some(&grid), &config);
        assert_eq!(profile.difficulty, Difficulty::Hard);
        assert_eq!(profile.budget.max_attempts, 350);
        assert!(!profile.estimated);

        let profile = DungeonProfile::detect(None, Some(&grid), &config);
        assert_eq!(profile.difficulty, Difficulty::Easy);
        assert_eq!(profile.min_chests, 2);
        assert!(profile.estimated);
    }
}
