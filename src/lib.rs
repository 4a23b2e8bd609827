pub mod controller;
pub mod infra;
pub mod planners;
pub mod session;
pub mod state;

// Re-export commonly used types for convenience
pub use controller::{ExplorationController, RunOutcome, RunStats};
pub use infra::{ExplorationConfig, ExplorationError, GameInterface, Position, SimulatedDungeon};
pub use session::{DungeonSession, SessionStats};
pub use state::{Grid, MapAnalyzer};
