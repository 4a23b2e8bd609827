mod grid;
mod map_analyzer;
mod moves;
mod path;
mod tile;

pub use grid::{ExplorationPhase, ExplorationStatus, Grid};
pub use map_analyzer::MapAnalyzer;
pub use moves::Move;
pub use path::Path;
pub use tile::{BLOCKED_COST, ChestRarity, EnemyStrength, Tile, TileKind};
