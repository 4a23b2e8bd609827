mod callback_observer;
mod cancel;
mod composite_observer;
mod config;
mod default_observer;
mod error;
mod game_interface;
mod game_observer;
mod pathfinding;
mod simulator;
mod types;

pub use callback_observer::{CallbackObserver, LogCallback, StatusCallback};
pub use cancel::CancelToken;
pub use composite_observer::CompositeObserver;
pub use config::{DungeonBudget, ExplorationConfig, get_env_var, is_fast};
pub use default_observer::DefaultObserver;
pub use error::ExplorationError;
pub use game_interface::{
    BoardSnapshot, Difficulty, DungeonDescriptor, EnemyHealth, GameInterface, GameState, Marker,
    RenderedCell, StateSignals,
};
pub use game_observer::GameObserver;
pub use pathfinding::AStar;
pub use simulator::{DungeonLayout, SimulatedDungeon, SimulatorCounters};
pub use types::Position;
