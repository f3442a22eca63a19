//! Open-set entries for the A* search.

use std::cmp::Ordering;

/// An open-set entry: a partial path ending in one connection.
///
/// Ordered for a max-heap so that the lowest `f_score` pops first, with
/// earlier insertions winning ties.
#[derive(Debug, Clone, Copy)]
pub struct PathCandidate {
    /// Index into the search's entry arena.
    pub entry: usize,
    /// Estimated total cost: accumulated cost plus heuristic.
    pub f_score: f32,
    /// Insertion sequence number.
    pub sequence: u64,
}

impl PathCandidate {
    /// Create a new candidate.
    pub fn new(entry: usize, f_score: f32, sequence: u64) -> Self {
        Self {
            entry,
            f_score,
            sequence,
        }
    }
}

impl PartialEq for PathCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for PathCandidate {}

impl PartialOrd for PathCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PathCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Primary: lower f_score first
        // Secondary: earlier insertion first
        match other.f_score.total_cmp(&self.f_score) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}
