//! Seekers: one pathfinding request each.
//!
//! A seeker is created through
//! [`Control::create_seeker`](crate::control::Control::create_seeker), which
//! resolves its endpoints against the loaded graph and registers it as idle.
//! Control owns every seeker and drives its search from `tick`.

use glam::Vec3;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::astar::{SearchState, SearchStats};
use super::filter::SeekFilter;
use super::monitor::SearchMonitor;
use crate::control::{CacheLifespan, Footprint};
use crate::types::{ConnectionId, NodeId, SeekerId};

/// Opaque caller data carried by a seeker.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Lifecycle state of a seeker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekerState {
    /// Registered, not searching.
    Idle,
    /// Search in progress.
    Seeking,
    /// Solution found.
    Completed,
    /// No solution, or stopped.
    Failed,
    /// The graph changed under a completed solution.
    Invalidated,
}

/// Parameters for a new seeker.
#[derive(Clone)]
pub struct SeekRequest {
    /// World-space point to start from.
    pub start_point: Vec3,
    /// World-space point to reach.
    pub end_point: Vec3,
    /// Tag requirements.
    pub filter: SeekFilter,
    /// Agent radius; connections narrower than twice this are skipped.
    pub clearance: f32,
    /// Per-step time budget. Defaults to the control's configured budget.
    pub frame_budget: Option<Duration>,
    /// Cache lifespan of the result. Defaults to the control's lifespan.
    pub cache_lifespan: Option<CacheLifespan>,
    /// Caller data handed back through monitors.
    pub payload: Option<Payload>,
}

impl SeekRequest {
    /// Request a path between two world points with default settings.
    pub fn new(start_point: Vec3, end_point: Vec3) -> Self {
        Self {
            start_point,
            end_point,
            filter: SeekFilter::default(),
            clearance: 0.0,
            frame_budget: None,
            cache_lifespan: None,
            payload: None,
        }
    }

    /// Set the tag filter.
    pub fn with_filter(mut self, filter: SeekFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the agent radius.
    pub fn with_clearance(mut self, clearance: f32) -> Self {
        self.clearance = clearance;
        self
    }

    /// Set the per-step budget.
    pub fn with_frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget = Some(budget);
        self
    }

    /// Set the cache lifespan.
    pub fn with_cache_lifespan(mut self, lifespan: CacheLifespan) -> Self {
        self.cache_lifespan = Some(lifespan);
        self
    }

    /// Attach caller data.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }
}

impl fmt::Debug for SeekRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeekRequest")
            .field("start_point", &self.start_point)
            .field("end_point", &self.end_point)
            .field("filter", &self.filter)
            .field("clearance", &self.clearance)
            .field("frame_budget", &self.frame_budget)
            .field("cache_lifespan", &self.cache_lifespan)
            .field("payload", &self.payload.is_some())
            .finish()
    }
}

/// One pathfinding request and its result.
pub struct Seeker {
    pub(crate) id: SeekerId,
    pub(crate) start: Option<NodeId>,
    pub(crate) end: Option<NodeId>,
    pub(crate) start_point: Vec3,
    pub(crate) end_point: Vec3,
    pub(crate) filter: SeekFilter,
    pub(crate) clearance: f32,
    pub(crate) frame_budget: Duration,
    pub(crate) cache_lifespan: CacheLifespan,
    pub(crate) state: SeekerState,
    pub(crate) solution: Vec<ConnectionId>,
    pub(crate) search: Option<SearchState>,
    pub(crate) monitors: Vec<Arc<dyn SearchMonitor>>,
    pub(crate) payload: Option<Payload>,
    pub(crate) last_stats: SearchStats,
    pub(crate) footprint: Option<Footprint>,
}

impl Seeker {
    pub(crate) fn new(
        id: SeekerId,
        request: SeekRequest,
        start: Option<NodeId>,
        end: Option<NodeId>,
        frame_budget: Duration,
        cache_lifespan: CacheLifespan,
    ) -> Self {
        Self {
            id,
            start,
            end,
            start_point: request.start_point,
            end_point: request.end_point,
            filter: request.filter,
            clearance: request.clearance,
            frame_budget: request.frame_budget.unwrap_or(frame_budget),
            cache_lifespan: request.cache_lifespan.unwrap_or(cache_lifespan),
            state: SeekerState::Idle,
            solution: Vec::new(),
            search: None,
            monitors: Vec::new(),
            payload: request.payload,
            last_stats: SearchStats::default(),
            footprint: None,
        }
    }

    /// Handle of this seeker.
    pub fn id(&self) -> SeekerId {
        self.id
    }

    /// Resolved start node.
    pub fn start(&self) -> Option<NodeId> {
        self.start
    }

    /// Resolved end node.
    pub fn end(&self) -> Option<NodeId> {
        self.end
    }

    /// World point the start node was resolved from.
    pub fn start_point(&self) -> Vec3 {
        self.start_point
    }

    /// World point the end node was resolved from.
    pub fn end_point(&self) -> Vec3 {
        self.end_point
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SeekerState {
        self.state
    }

    /// Connection sequence of the last completed search; empty otherwise.
    pub fn solution(&self) -> &[ConnectionId] {
        &self.solution
    }

    /// Tag filter.
    pub fn filter(&self) -> &SeekFilter {
        &self.filter
    }

    /// Replace the tag filter. Takes effect on the next search.
    pub fn set_filter(&mut self, filter: SeekFilter) {
        self.filter = filter;
    }

    /// Agent radius.
    pub fn clearance(&self) -> f32 {
        self.clearance
    }

    /// Change the agent radius. Takes effect on the next search.
    pub fn set_clearance(&mut self, clearance: f32) {
        self.clearance = clearance;
    }

    /// Per-step time budget.
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Change the per-step time budget.
    pub fn set_frame_budget(&mut self, budget: Duration) {
        self.frame_budget = budget;
    }

    /// How long a completed result stays cached.
    pub fn cache_lifespan(&self) -> CacheLifespan {
        self.cache_lifespan
    }

    /// Change the cache lifespan of future results.
    pub fn set_cache_lifespan(&mut self, lifespan: CacheLifespan) {
        self.cache_lifespan = lifespan;
    }

    /// Caller data.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Downcast the caller data.
    pub fn payload_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.as_ref()?.downcast_ref::<T>()
    }

    /// Progress counters of the current or last search.
    pub fn stats(&self) -> SearchStats {
        self.search
            .as_ref()
            .map(SearchState::stats)
            .unwrap_or(self.last_stats)
    }

    /// Attach a monitor.
    pub fn add_monitor(&mut self, monitor: Arc<dyn SearchMonitor>) {
        self.monitors.push(monitor);
    }

    /// Detach a monitor by identity. Returns whether it was attached.
    pub fn remove_monitor(&mut self, monitor: &Arc<dyn SearchMonitor>) -> bool {
        let before = self.monitors.len();
        self.monitors.retain(|m| !Arc::ptr_eq(m, monitor));
        before != self.monitors.len()
    }

    /// Detach every monitor.
    pub fn clear_monitors(&mut self) {
        self.monitors.clear();
    }

    /// Number of attached monitors.
    pub fn monitor_count(&self) -> usize {
        self.monitors.len()
    }

    /// Total traversal cost of the current solution.
    pub fn solution_cost(&self, collection: &crate::graph::Collection) -> f32 {
        self.solution
            .iter()
            .filter_map(|c| collection.connection_cost(*c).ok())
            .sum()
    }

    pub(crate) fn finish_search(&mut self) {
        if let Some(search) = self.search.take() {
            self.last_stats = search.stats();
        }
    }

    pub(crate) fn notify_completed(&self) {
        for monitor in &self.monitors {
            monitor.on_search_completed(self);
        }
    }

    pub(crate) fn notify_failed(&self) {
        for monitor in &self.monitors {
            monitor.on_search_failed(self);
        }
    }

    pub(crate) fn notify_invalidated(&self) {
        for monitor in &self.monitors {
            monitor.on_seeker_invalidated(self);
        }
    }
}

impl fmt::Debug for Seeker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seeker")
            .field("id", &self.id)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("state", &self.state)
            .field("solution", &self.solution)
            .field("cache_lifespan", &self.cache_lifespan)
            .field("monitors", &self.monitors.len())
            .finish()
    }
}
