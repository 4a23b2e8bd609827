use tracing::debug;

use crate::infra::{BoardSnapshot, GameInterface, Marker, RenderedCell};
use crate::state::{ChestRarity, EnemyStrength, Grid, TileKind};

/// Turns the rendered board into a typed [`Grid`].
#[derive(Debug, Default, Clone, Copy)]
pub struct MapAnalyzer;

impl MapAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Reads the current board from the game. `None` means nothing could be observed this tick.
    pub fn analyze(&self, game: &mut dyn GameInterface) -> Option<Grid> {
        let snapshot = game.snapshot_grid()?;
        self.build(&snapshot)
    }

    pub fn build(&self, snapshot: &BoardSnapshot) -> Option<Grid> {
        let height = snapshot.rows.len();
        let width = snapshot.rows.first().map_or(0, |row| row.len());
        if width == 0 || height == 0 {
            return None;
        }
        if snapshot.rows.iter().any(|row| row.len() != width) {
            debug!("Ignoring ragged board snapshot");
            return None;
        }

        let kinds = snapshot
            .rows
            .iter()
            .flat_map(|row| row.iter().map(classify))
            .collect();

        Grid::new(width as i32, height as i32, kinds)
    }
}

/// Maps the markers of one cell to a tile kind.
///
/// Precedence: player, boss, chest, visited, invisible, wall, enemy, empty. A cell with none of
/// these markers is unknown.
pub fn classify(cell: &RenderedCell) -> TileKind {
    if cell.has(Marker::Player) {
        return TileKind::Player;
    }
    if cell.has(Marker::Boss) {
        return TileKind::Boss;
    }
    if cell.has(Marker::Chest(ChestRarity::Rare)) {
        return TileKind::Chest {
            rarity: ChestRarity::Rare,
        };
    }
    if cell.has(Marker::Chest(ChestRarity::Common)) {
        return TileKind::Chest {
            rarity: ChestRarity::Common,
        };
    }
    if cell.has(Marker::Visited) {
        return TileKind::Visited;
    }
    if cell.has(Marker::Invisible) {
        return TileKind::Invisible;
    }
    if cell.has(Marker::Wall) {
        return TileKind::Wall;
    }
    if cell.has(Marker::Enemy(EnemyStrength::Strong)) {
        return TileKind::Enemy {
            strength: EnemyStrength::Strong,
        };
    }
    if cell.has(Marker::Enemy(EnemyStrength::Standard)) {
        return TileKind::Enemy {
            strength: EnemyStrength::Standard,
        };
    }
    if cell.has(Marker::Empty) {
        return TileKind::Empty;
    }
    TileKind::Unknown
}
