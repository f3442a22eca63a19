//! Resumable, time-sliced A* over connections.
//!
//! ## Algorithm
//!
//! The open set holds partial paths keyed by their last connection. Each
//! selection pops the entry with the lowest `g + h`, where `g` is the
//! accumulated connection cost and `h` the straight-line distance from the
//! entry's destination to the end node. A connection enters the open set at
//! most once per search.
//!
//! Expanding a node considers its own outgoing connections, its target's
//! connections when it is a grid node, and the connections of every grid
//! node that targets it.
//!
//! ## Time Slicing
//!
//! [`SearchState::step`] always performs at least one selection, then checks
//! the budget at the top of every further iteration and suspends with
//! [`SearchStatus::Running`] once it is spent. Open and closed sets survive
//! between steps.

use glam::Vec3;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use super::candidate::PathCandidate;
use super::filter::ResolvedFilter;
use crate::clock::Clock;
use crate::graph::{Collection, GraphError};
use crate::types::{ConnectionId, NodeId};

/// Result of driving a search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStatus {
    /// Budget spent; call `step` again.
    Running,
    /// Path found, as a connection sequence from start to end.
    Completed(Vec<ConnectionId>),
    /// Open set exhausted or search stopped.
    Failed,
}

/// Counters describing search progress.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchStats {
    /// Calls to `step`.
    pub steps: u64,
    /// Entries popped from the open set.
    pub selections: u64,
    /// Entries pushed onto the open set.
    pub pushes: u64,
    /// `g + h` of the most recent selection.
    pub last_f_score: Option<f32>,
}

#[derive(Debug, Clone, Copy)]
struct SearchEntry {
    connection: ConnectionId,
    parent: Option<usize>,
    g: f32,
    depth: usize,
}

/// Check whether a connection may be traversed by an agent of radius
/// `clearance` under `filter`.
pub fn is_traversable(
    collection: &Collection,
    connection: ConnectionId,
    clearance: f32,
    filter: &ResolvedFilter,
) -> bool {
    let Ok(edge) = collection.connection(connection) else {
        return false;
    };
    let Ok(destination) = collection.node(edge.to) else {
        return false;
    };
    edge.enabled
        && destination.enabled
        && edge.admits(clearance)
        && filter.passes(&edge.tags)
        && filter.passes(&destination.tags)
}

/// Explicit state of one A* search.
#[derive(Debug, Clone)]
pub struct SearchState {
    start: NodeId,
    end: NodeId,
    end_position: Vec3,
    clearance: f32,
    filter: ResolvedFilter,
    entries: Vec<SearchEntry>,
    open: BinaryHeap<PathCandidate>,
    open_set: HashSet<ConnectionId>,
    closed: HashSet<ConnectionId>,
    sequence: u64,
    stop_requested: bool,
    stats: SearchStats,
}

impl SearchState {
    /// Prepare a search and seed the open set with the start node's
    /// traversable outgoing connections.
    pub fn new(
        collection: &Collection,
        start: NodeId,
        end: NodeId,
        clearance: f32,
        filter: ResolvedFilter,
    ) -> Result<Self, GraphError> {
        let end_position = collection.node_position(end)?;
        let mut state = Self {
            start,
            end,
            end_position,
            clearance,
            filter,
            entries: Vec::new(),
            open: BinaryHeap::new(),
            open_set: HashSet::new(),
            closed: HashSet::new(),
            sequence: 0,
            stop_requested: false,
            stats: SearchStats::default(),
        };

        for connection in collection.outgoing(start)?.to_vec() {
            state.push(collection, connection, None);
        }
        tracing::trace!(start = %start, end = %end, seeded = state.open.len(), "Seeded search");
        Ok(state)
    }

    /// Start node.
    pub fn start(&self) -> NodeId {
        self.start
    }

    /// End node.
    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Progress counters.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Number of entries currently open.
    pub fn open_len(&self) -> usize {
        self.open.len()
    }

    /// Number of connections closed so far.
    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    /// Ask the search to end as failed at its next loop iteration.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Run the search until it finishes or `budget` is spent.
    pub fn step(&mut self, collection: &Collection, clock: &dyn Clock, budget: Duration) -> SearchStatus {
        self.stats.steps += 1;
        let started = clock.now();
        let mut first = true;

        loop {
            if self.stop_requested {
                tracing::debug!(start = %self.start, end = %self.end, "Search stopped");
                return self.fail();
            }
            if !first && clock.now().saturating_sub(started) >= budget {
                tracing::trace!(open = self.open.len(), closed = self.closed.len(), "Search suspended");
                return SearchStatus::Running;
            }
            first = false;

            let Some(candidate) = self.open.pop() else {
                return self.fail();
            };
            let entry = self.entries[candidate.entry];
            self.open_set.remove(&entry.connection);
            self.stats.selections += 1;
            self.stats.last_f_score = Some(candidate.f_score);

            // Connections removed since they were queued are skipped.
            let Ok(edge) = collection.connection(entry.connection) else {
                continue;
            };
            if edge.to == self.end {
                return SearchStatus::Completed(self.path_to(candidate.entry));
            }
            self.closed.insert(entry.connection);
            let (origin, destination) = (edge.from, edge.to);

            for connection in self.expansion(collection, destination) {
                if entry.depth >= 2 {
                    let leads_back = collection
                        .connection(connection)
                        .is_ok_and(|next| next.to == origin);
                    if leads_back {
                        continue;
                    }
                }
                self.push(collection, connection, Some(candidate.entry));
            }
        }
    }

    /// Connections reachable from `node`, grid indirection included.
    fn expansion(&self, collection: &Collection, node: NodeId) -> Vec<ConnectionId> {
        let Ok(current) = collection.node(node) else {
            return Vec::new();
        };
        let mut out = current.connections.clone();
        if let Some(target) = current.grid_target() {
            if let Ok(target) = collection.node(target) {
                out.extend_from_slice(&target.connections);
            }
        }
        for grid in collection.grid_nodes_targeting(node) {
            if let Ok(grid) = collection.node(grid) {
                out.extend_from_slice(&grid.connections);
            }
        }
        out
    }

    fn push(&mut self, collection: &Collection, connection: ConnectionId, parent: Option<usize>) {
        if self.closed.contains(&connection) || self.open_set.contains(&connection) {
            return;
        }
        if !is_traversable(collection, connection, self.clearance, &self.filter) {
            return;
        }
        let (Ok(cost), Ok(edge)) = (
            collection.connection_cost(connection),
            collection.connection(connection),
        ) else {
            return;
        };
        let Ok(destination) = collection.node_position(edge.to) else {
            return;
        };

        let (base, depth) = match parent {
            Some(idx) => (self.entries[idx].g, self.entries[idx].depth + 1),
            None => (0.0, 1),
        };
        let g = base + cost;
        let h = destination.distance(self.end_position);

        self.entries.push(SearchEntry {
            connection,
            parent,
            g,
            depth,
        });
        self.open
            .push(PathCandidate::new(self.entries.len() - 1, g + h, self.sequence));
        self.open_set.insert(connection);
        self.sequence += 1;
        self.stats.pushes += 1;
    }

    fn path_to(&self, mut idx: usize) -> Vec<ConnectionId> {
        let mut path = Vec::with_capacity(self.entries[idx].depth);
        loop {
            let entry = self.entries[idx];
            path.push(entry.connection);
            match entry.parent {
                Some(parent) => idx = parent,
                None => break,
            }
        }
        path.reverse();
        path
    }

    fn fail(&mut self) -> SearchStatus {
        self.open.clear();
        self.open_set.clear();
        SearchStatus::Failed
    }

    /// Estimated total cost of the entry that would be selected next.
    pub fn peek_f_score(&self) -> Option<f32> {
        self.open.peek().map(|c| c.f_score)
    }
}
