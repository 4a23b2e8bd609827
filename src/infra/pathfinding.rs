use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::infra::Position;
use crate::state::Grid;

#[derive(Clone, Eq, PartialEq)]
struct Node {
    pos: Position,
    f_score: u32,
    seq: u64, // Insertion order, breaks ties between equal f scores
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub struct AStar;

impl AStar {
    /// Find the cheapest 4-connected path from `start` to `goal`.
    /// `passable` decides which tiles may be entered, `cost_fn` returns the cost of entering one.
    /// The returned path excludes `start` and ends at `goal`.
    pub fn find_path<F, C>(
        grid: &Grid,
        start: Position,
        goal: Position,
        passable: F,
        cost_fn: C,
    ) -> Option<Vec<Position>>
    where
        F: Fn(&Position) -> bool,
        C: Fn(&Position) -> u32,
    {
        if start == goal || !grid.in_bounds(&start) || !grid.in_bounds(&goal) {
            return None;
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut g_score: HashMap<Position, u32> = HashMap::new();
        let mut closed_set: HashSet<Position> = HashSet::new();
        let mut seq = 0;

        g_score.insert(start, 0);
        open_set.push(Node {
            pos: start,
            f_score: heuristic(start, goal),
            seq,
        });

        while let Some(Node { pos: current, .. }) = open_set.pop() {
            if current == goal {
                return Some(reconstruct_path(&came_from, current));
            }

            if !closed_set.insert(current) {
                continue;
            }

            let current_g_score = g_score.get(&current).copied().unwrap_or(0);

            for neighbor in grid.neighbors(current) {
                if closed_set.contains(&neighbor) || !passable(&neighbor) {
                    continue;
                }

                let tentative_g = current_g_score.saturating_add(cost_fn(&neighbor));
                if tentative_g < g_score.get(&neighbor).copied().unwrap_or(u32::MAX) {
                    came_from.insert(neighbor, current);
                    g_score.insert(neighbor, tentative_g);
                    seq += 1;
                    open_set.push(Node {
                        pos: neighbor,
                        f_score: tentative_g.saturating_add(heuristic(neighbor, goal)),
                        seq,
                    });
                }
            }
        }

        None
    }
}

fn heuristic(a: Position, b: Position) -> u32 {
    a.distance(&b).unsigned_abs()
}

fn reconstruct_path(came_from: &HashMap<Position, Position>, mut current: Position) -> Vec<Position> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    // Drop the start tile
    path.pop();
    path.reverse();
    path
}
