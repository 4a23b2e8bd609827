/// Counters collected during one dungeon run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub chests_opened: u32,
    pub rare_chests_opened: u32,
    pub enemies_defeated: u32,
    pub tiles_revealed: u32,
    pub phase_transitions: u32,
    pub moves_made: u32,
    /// Moves after which neither the state nor the visible tile count changed
    pub non_productive_moves: u32,
    pub stalls_detected: u32,
    pub recovery_actions: u32,
}
