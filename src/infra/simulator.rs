//! An in-process dungeon that follows the rules of the real game closely enough to drive the
//! exploration engine without a screen.

use std::collections::{HashSet, VecDeque};

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::controller::DungeonProfile;
use crate::infra::{
    BoardSnapshot, Difficulty, DungeonDescriptor, EnemyHealth, ExplorationError, GameInterface,
    Marker, Position, RenderedCell, StateSignals,
};
use crate::state::{ChestRarity, EnemyStrength};

const ATTACK_DAMAGE: f64 = 25.0;
const ENEMY_HEALTH: f64 = 50.0;
const STRONG_ENEMY_HEALTH: f64 = 100.0;
const BOSS_HEALTH: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Floor,
    Wall,
    Chest(ChestRarity),
    Enemy(EnemyStrength),
    Boss,
}

/// Static description of one dungeon.
#[derive(Debug, Clone)]
pub struct DungeonLayout {
    name: String,
    difficulty: Difficulty,
    min_chests: u32,
    width: i32,
    height: i32,
    features: Vec<Feature>,
    entrance: Position,
}

impl DungeonLayout {
    /// Parses a layout, one string per row.
    ///
    /// `P` entrance, `B` boss, `C` chest, `R` rare chest, `E` enemy, `S` strong enemy, `.` floor,
    /// `#` wall. Returns `None` for ragged rows, unknown characters or a missing entrance.
    pub fn from_ascii(rows: &[&str]) -> Option<Self> {
        let width = rows.first()?.chars().count();
        let mut features = Vec::with_capacity(width * rows.len());
        let mut entrance = None;

        for (y, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return None;
            }
            for (x, c) in row.chars().enumerate() {
                let feature = match c {
                    'P' => {
                        entrance = Some(Position::new(x as i32, y as i32));
                        Feature::Floor
                    }
                    'B' => Feature::Boss,
                    'C' => Feature::Chest(ChestRarity::Common),
                    'R' => Feature::Chest(ChestRarity::Rare),
                    'E' => Feature::Enemy(EnemyStrength::Standard),
                    'S' => Feature::Enemy(EnemyStrength::Strong),
                    '.' => Feature::Floor,
                    '#' => Feature::Wall,
                    _ => return None,
                };
                features.push(feature);
            }
        }

        let min_chests = features
            .iter()
            .filter(|feature| matches!(feature, Feature::Chest(_)))
            .count() as u32;
        Some(Self {
            name: "Simulated dungeon".to_string(),
            difficulty: DungeonProfile::estimate_difficulty(features.len()),
            min_chests,
            width: width as i32,
            height: rows.len() as i32,
            features,
            entrance: entrance?,
        })
    }

    /// Random connected `size` x `size` layout carved by a random walk from the bottom edge.
    /// The boss sits on the floor tile farthest from the entrance.
    pub fn generate(rng: &mut StdRng, size: i32) -> Self {
        let size = size.max(3);
        let tiles = (size * size) as usize;
        let mut features = vec![Feature::Wall; tiles];
        let index = |pos: Position| (pos.y * size + pos.x) as usize;
        let in_bounds = |pos: &Position| pos.x >= 0 && pos.x < size && pos.y >= 0 && pos.y < size;

        let entrance = Position::new(size / 2, size - 1);
        features[index(entrance)] = Feature::Floor;

        let target_floor = tiles * 11 / 20;
        let mut floor = 1;
        let mut current = entrance;
        let mut steps = 0;
        while floor < target_floor && steps < tiles * 50 {
            steps += 1;
            let Some(next) = current.neighbors().choose(rng).copied() else {
                break;
            };
            if !in_bounds(&next) {
                continue;
            }
            current = next;
            if features[index(current)] == Feature::Wall {
                features[index(current)] = Feature::Floor;
                floor += 1;
            }
        }

        // Breadth-first order from the entrance, the last tile is the farthest one
        let mut order = vec![entrance];
        let mut seen = HashSet::from([entrance]);
        let mut queue = VecDeque::from([entrance]);
        while let Some(pos) = queue.pop_front() {
            for neighbor in pos.neighbors() {
                if in_bounds(&neighbor)
                    && features[index(neighbor)] == Feature::Floor
                    && seen.insert(neighbor)
                {
                    order.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        let mut free: Vec<Position> = order[1..].to_vec();
        if let Some(boss) = free.pop() {
            features[index(boss)] = Feature::Boss;
        }
        free.shuffle(rng);

        let chests = rng.random_range(2..=4usize).min(free.len());
        for pos in free.drain(..chests) {
            let rarity = if rng.random_range(0..4) == 0 {
                ChestRarity::Rare
            } else {
                ChestRarity::Common
            };
            features[index(pos)] = Feature::Chest(rarity);
        }

        let enemies = ((size / 2) as usize).min(free.len());
        for pos in free.drain(..enemies) {
            let strength = if rng.random_range(0..3) == 0 {
                EnemyStrength::Strong
            } else {
                EnemyStrength::Standard
            };
            features[index(pos)] = Feature::Enemy(strength);
        }

        Self {
            name: format!("Generated {}x{}", size, size),
            difficulty: DungeonProfile::estimate_difficulty(tiles),
            min_chests: chests as u32,
            width: size,
            height: size,
            features,
            entrance,
        }
    }

    pub fn descriptor(&self) -> DungeonDescriptor {
        DungeonDescriptor {
            name: self.name.clone(),
            difficulty: self.difficulty,
            min_chests: self.min_chests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Exploring,
    Battle {
        at: Position,
        boss: bool,
        health: f64,
        max: f64,
    },
    ChestPrompt(Position),
    BossPrompt(Position),
    Complete,
}

struct Run {
    layout: DungeonLayout,
    player: Position,
    visited: HashSet<Position>,
    revealed: HashSet<Position>,
    mode: Mode,
    reward: Option<String>,
}

impl Run {
    fn in_bounds(&self, pos: &Position) -> bool {
        pos.x >= 0 && pos.x < self.layout.width && pos.y >= 0 && pos.y < self.layout.height
    }

    fn feature(&self, pos: &Position) -> Option<Feature> {
        if !self.in_bounds(pos) {
            return None;
        }
        self.layout
            .features
            .get((pos.y * self.layout.width + pos.x) as usize)
            .copied()
    }

    fn clear(&mut self, pos: Position) {
        if self.in_bounds(&pos) {
            let index = (pos.y * self.layout.width + pos.x) as usize;
            self.layout.features[index] = Feature::Floor;
        }
    }

    fn can_enter(&self, pos: Position, require_revealed: bool) -> bool {
        self.mode == Mode::Exploring
            && pos != self.player
            && self.feature(&pos).is_some_and(|feature| feature != Feature::Wall)
            && (!require_revealed || self.revealed.contains(&pos))
            && (pos.is_adjacent(&self.player)
                || pos.neighbors().iter().any(|n| self.visited.contains(n)))
    }

    fn move_to(&mut self, pos: Position) {
        self.player = pos;
        self.visited.insert(pos);
        self.revealed.insert(pos);
        for neighbor in pos.neighbors() {
            if self.in_bounds(&neighbor) {
                self.revealed.insert(neighbor);
            }
        }

        self.mode = match self.feature(&pos) {
            Some(Feature::Enemy(strength)) => {
                let health = match strength {
                    EnemyStrength::Standard => ENEMY_HEALTH,
                    EnemyStrength::Strong => STRONG_ENEMY_HEALTH,
                };
                Mode::Battle {
                    at: pos,
                    boss: false,
                    health,
                    max: health,
                }
            }
            Some(Feature::Chest(_)) => Mode::ChestPrompt(pos),
            Some(Feature::Boss) => Mode::BossPrompt(pos),
            _ => Mode::Exploring,
        };
    }

    fn render(&self, pos: Position) -> RenderedCell {
        if !self.revealed.contains(&pos) {
            return RenderedCell::new(vec![Marker::Invisible]);
        }
        if pos == self.player {
            return RenderedCell::new(vec![Marker::Player, Marker::Visited]);
        }
        let markers = match self.feature(&pos) {
            Some(Feature::Wall) => vec![Marker::Wall],
            Some(Feature::Boss) => vec![Marker::Boss],
            Some(Feature::Chest(rarity)) => vec![Marker::Chest(rarity)],
            Some(Feature::Enemy(strength)) => vec![Marker::Enemy(strength)],
            Some(Feature::Floor) if self.visited.contains(&pos) => vec![Marker::Visited],
            Some(Feature::Floor) => vec![Marker::Empty],
            None => Vec::new(),
        };
        RenderedCell::new(markers)
    }
}

/// Counts of the commands the simulator received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorCounters {
    pub starts: u32,
    pub clicks: u32,
    pub rejected_clicks: u32,
    pub attacks: u32,
    pub force_moves: u32,
}

pub struct SimulatedDungeon {
    layouts: VecDeque<DungeonLayout>,
    generated_size: Option<i32>,
    rng: StdRng,
    run: Option<Run>,
    counters: SimulatorCounters,
}

impl SimulatedDungeon {
    /// Plays the given layouts in order, then refuses to start more dungeons.
    pub fn new(layouts: Vec<DungeonLayout>) -> Self {
        Self {
            layouts: layouts.into(),
            generated_size: None,
            rng: StdRng::seed_from_u64(0),
            run: None,
            counters: SimulatorCounters::default(),
        }
    }

    /// Generates a fresh random layout for every dungeon.
    pub fn random(seed: u64, size: i32) -> Self {
        Self {
            layouts: VecDeque::new(),
            generated_size: Some(size),
            rng: StdRng::seed_from_u64(seed),
            run: None,
            counters: SimulatorCounters::default(),
        }
    }

    pub fn counters(&self) -> SimulatorCounters {
        self.counters
    }

    fn rejected(&self) -> ExplorationError {
        let at = self
            .run
            .as_ref()
            .map_or(Position::new(0, 0), |run| run.player);
        ExplorationError::ActionRejected(at)
    }
}

impl GameInterface for SimulatedDungeon {
    fn state_signals(&mut self) -> Option<StateSignals> {
        let Some(run) = &self.run else {
            return Some(StateSignals::default());
        };
        let signals = match run.mode {
            Mode::Exploring => StateSignals {
                board: true,
                ..Default::default()
            },
            Mode::Battle { .. } => StateSignals {
                battle: true,
                board: true,
                ..Default::default()
            },
            Mode::ChestPrompt(_) => StateSignals {
                chest: true,
                board: true,
                ..Default::default()
            },
            Mode::BossPrompt(_) => StateSignals {
                boss: true,
                board: true,
                ..Default::default()
            },
            Mode::Complete => StateSignals::default(),
        };
        Some(signals)
    }

    fn snapshot_grid(&mut self) -> Option<BoardSnapshot> {
        let run = self.run.as_ref()?;
        let rows = (0..run.layout.height)
            .map(|y| {
                (0..run.layout.width)
                    .map(|x| run.render(Position::new(x, y)))
                    .collect()
            })
            .collect();
        Some(BoardSnapshot::new(rows))
    }

    fn click(&mut self, position: Position) -> Result<(), ExplorationError> {
        self.counters.clicks += 1;
        match self.run.as_mut() {
            Some(run) if run.can_enter(position, true) => {
                run.move_to(position);
                Ok(())
            }
            _ => {
                self.counters.rejected_clicks += 1;
                Err(ExplorationError::ActionRejected(position))
            }
        }
    }

    fn click_boss(&mut self) -> Result<(), ExplorationError> {
        let error = self.rejected();
        let run = self.run.as_mut().ok_or(error.clone())?;
        let Mode::BossPrompt(at) = run.mode else {
            return Err(error);
        };
        run.mode = Mode::Battle {
            at,
            boss: true,
            health: BOSS_HEALTH,
            max: BOSS_HEALTH,
        };
        Ok(())
    }

    fn click_chest(&mut self) -> Result<(), ExplorationError> {
        let error = self.rejected();
        let run = self.run.as_mut().ok_or(error.clone())?;
        let Mode::ChestPrompt(at) = run.mode else {
            return Err(error);
        };
        let gold = match run.feature(&at) {
            Some(Feature::Chest(ChestRarity::Rare)) => 100,
            _ => 20,
        };
        run.clear(at);
        run.reward = Some(format!("{} gold", gold));
        run.mode = Mode::Exploring;
        Ok(())
    }

    fn click_attack(&mut self) -> Result<(), ExplorationError> {
        let error = self.rejected();
        let run = self.run.as_mut().ok_or(error.clone())?;
        let Mode::Battle {
            at,
            boss,
            health,
            max,
        } = run.mode
        else {
            return Err(error);
        };
        self.counters.attacks += 1;

        let health = health - ATTACK_DAMAGE;
        if health > 0.0 {
            run.mode = Mode::Battle {
                at,
                boss,
                health,
                max,
            };
        } else {
            run.clear(at);
            run.mode = if boss { Mode::Complete } else { Mode::Exploring };
        }
        Ok(())
    }

    fn find_dungeon_completion_control(&mut self) -> bool {
        self.run
            .as_ref()
            .is_some_and(|run| run.mode == Mode::Complete)
    }

    fn detect_dungeon_descriptor(&mut self) -> Option<DungeonDescriptor> {
        self.run.as_ref().map(|run| run.layout.descriptor())
    }

    fn start_dungeon(&mut self) -> Result<(), ExplorationError> {
        let layout = match (self.layouts.pop_front(), self.generated_size) {
            (Some(layout), _) => layout,
            (None, Some(size)) => DungeonLayout::generate(&mut self.rng, size),
            (None, None) => {
                return Err(ExplorationError::InterfaceUnavailable(
                    "no dungeon left to start".to_string(),
                ));
            }
        };
        self.counters.starts += 1;
        debug!("Starting {} ({:?})", layout.name, layout.difficulty);

        let entrance = layout.entrance;
        let mut run = Run {
            layout,
            player: entrance,
            visited: HashSet::new(),
            revealed: HashSet::new(),
            mode: Mode::Exploring,
            reward: None,
        };
        run.move_to(entrance);
        self.run = Some(run);
        Ok(())
    }

    fn exit_dungeon(&mut self) {
        self.run = None;
    }

    fn enemy_health(&mut self) -> Option<EnemyHealth> {
        match self.run.as_ref()?.mode {
            Mode::Battle { health, max, .. } => Some(EnemyHealth {
                current: health.max(0.0),
                max,
            }),
            _ => None,
        }
    }

    fn reward_text(&mut self) -> Option<String> {
        self.run.as_mut()?.reward.take()
    }

    fn dismiss_dialogs(&mut self) -> usize {
        match self.run.as_mut() {
            Some(run) if matches!(run.mode, Mode::ChestPrompt(_)) => {
                run.mode = Mode::Exploring;
                1
            }
            _ => 0,
        }
    }

    fn force_move(&mut self, position: Position) -> Result<(), ExplorationError> {
        self.counters.force_moves += 1;
        match self.run.as_mut() {
            Some(run) if run.can_enter(position, false) => {
                run.move_to(position);
                Ok(())
            }
            _ => Err(ExplorationError::ActionRejected(position)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::GameState;
    use crate::state::{MapAnalyzer, TileKind};

    fn dungeon(rows: &[&str]) -> SimulatedDungeon {
        let mut game = SimulatedDungeon::new(vec![DungeonLayout::from_ascii(rows).expect("layout")]);
        game.start_dungeon().expect("layout queued");
        game
    }

    #[test]
    fn test_invalid_layouts() {
        assert!(DungeonLayout::from_ascii(&["..", "."]).is_none());
        assert!(DungeonLayout::from_ascii(&["..", ".."]).is_none());
        assert!(DungeonLayout::from_ascii(&["P.", ".x"]).is_none());
    }

    #[test]
    fn test_entrance_reveals_neighbours() {
        let mut game = dungeon(&["...", ".P.", "..."]);
        let grid = MapAnalyzer::new().analyze(&mut game).expect("board");
        assert_eq!(grid.player(), Some(Position::new(1, 1)));
        assert_eq!(grid.visible().len(), 5);
        assert_eq!(
            grid.get(&Position::new(0, 0)).map(|tile| tile.kind),
            Some(TileKind::Invisible)
        );
    }

    #[test]
    fn test_click_rules() {
        let mut game = dungeon(&["...", ".P#", "..."]);
        // Hidden tile
        assert!(game.click(Position::new(0, 0)).is_err());
        // Wall
        assert!(game.click(Position::new(2, 1)).is_err());
        assert!(game.click(Position::new(1, 0)).is_ok());
        // Adjacent to the visited entrance, not to the player
        assert!(game.click(Position::new(1, 2)).is_ok());
        assert_eq!(game.counters().rejected_clicks, 2);
    }

    #[test]
    fn test_force_move_needs_visited_neighbour() {
        let mut game = dungeon(&["P..", "..."]);
        assert!(game.force_move(Position::new(2, 0)).is_err());
        assert!(game.force_move(Position::new(1, 1)).is_err());
        assert!(game.force_move(Position::new(1, 0)).is_ok());
        assert!(game.force_move(Position::new(2, 0)).is_ok());
    }

    #[test]
    fn test_boss_fight_completes_dungeon() {
        let mut game = dungeon(&["PB"]);
        game.click(Position::new(1, 0)).expect("boss revealed");
        assert_eq!(game.classify_state(), GameState::Boss);
        game.click_boss().expect("boss prompt");
        assert_eq!(game.classify_state(), GameState::Battle);

        let mut attacks = 0;
        while game.classify_state() == GameState::Battle {
            game.click_attack().expect("in battle");
            attacks += 1;
        }
        assert_eq!(attacks, 8);
        assert!(game.find_dungeon_completion_control());
        assert_eq!(game.classify_state(), GameState::Unknown);
    }

    #[test]
    fn test_chest_prompt_gives_reward() {
        let mut game = dungeon(&["PR"]);
        game.click(Position::new(1, 0)).expect("chest revealed");
        assert_eq!(game.classify_state(), GameState::Chest);
        game.click_chest().expect("chest prompt");
        assert_eq!(game.reward_text().as_deref(), Some("100 gold"));
        assert_eq!(game.classify_state(), GameState::Exploring);
    }

    #[test]
    fn test_generated_layout_is_playable() {
        let mut rng = StdRng::seed_from_u64(42);
        let layout = DungeonLayout::generate(&mut rng, 7);
        assert_eq!(layout.features.len(), 49);
        assert_eq!(
            layout
                .features
                .iter()
                .filter(|feature| **feature == Feature::Boss)
                .count(),
            1
        );
        assert_eq!(layout.features[(6 * 7 + 3) as usize], Feature::Floor);
        assert!(layout.min_chests >= 2);
    }
}
