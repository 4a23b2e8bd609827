use crate::infra::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChestRarity {
    Common,
    Rare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyStrength {
    Standard,
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Player,
    Boss,
    Chest { rarity: ChestRarity },
    Enemy { strength: EnemyStrength },
    Empty,
    Visited,
    Wall,
    Invisible,
    Unknown,
}

/// Cost charged for tiles the player can never step on.
pub const BLOCKED_COST: u32 = 999;

impl TileKind {
    pub fn cost(&self) -> u32 {
        match self {
            TileKind::Player | TileKind::Boss | TileKind::Chest { .. } | TileKind::Empty => 1,
            TileKind::Visited => 2,
            TileKind::Enemy {
                strength: EnemyStrength::Standard,
            } => 5,
            TileKind::Enemy {
                strength: EnemyStrength::Strong,
            } => 8,
            TileKind::Wall | TileKind::Invisible => BLOCKED_COST,
            TileKind::Unknown => 10,
        }
    }

    pub fn is_accessible(&self) -> bool {
        !matches!(self, TileKind::Wall | TileKind::Invisible)
    }

    pub fn is_visited(&self) -> bool {
        matches!(self, TileKind::Visited | TileKind::Player)
    }

    pub fn is_visible(&self) -> bool {
        !matches!(self, TileKind::Invisible | TileKind::Unknown)
    }

    /// Tiles whose content is still hidden from the player.
    pub fn is_unexplored(&self) -> bool {
        matches!(self, TileKind::Invisible | TileKind::Unknown)
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self, TileKind::Enemy { .. })
    }

    pub fn is_chest(&self) -> bool {
        matches!(self, TileKind::Chest { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub kind: TileKind,
    pub accessible: bool,
    pub cost: u32,
    pub visited: bool,
    pub visible: bool,
}

impl Tile {
    pub fn new(position: Position, kind: TileKind) -> Self {
        Self {
            position,
            kind,
            accessible: kind.is_accessible(),
            cost: kind.cost(),
            visited: kind.is_visited(),
            visible: kind.is_visible(),
        }
    }
}
