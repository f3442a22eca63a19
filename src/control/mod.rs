//! Control: the orchestrator that owns the loaded graph and drives seekers.
//!
//! ## Lifecycle
//!
//! A [`Control`] is constructed explicitly and must be [`init`](Control::init)ed
//! before it steps searches. [`shutdown`](Control::shutdown) kills every
//! seeker, clears the result cache and unloads the graph.
//!
//! ## Tick
//!
//! The host calls [`Control::tick`] once per frame:
//!
//! 1. Pending graph events are drained; with `auto_recalculate` set, cached
//!    results and completed seekers depending on a disabled or removed
//!    entity are invalidated.
//! 2. Every active seeker is stepped once with its own frame budget.
//! 3. Expired cache entries are swept.
//!
//! ## Pools
//!
//! Seekers move between three pools, see [`pools`]. Only seekers in the used
//! pool are invalidated by graph changes.

pub mod cache;
pub mod config;
pub mod pools;
pub mod spatial;

pub use cache::{CacheLifespan, CacheStats, CachedPath, Footprint, PathCache};
pub use config::{CacheConfig, ControlConfig};
pub use pools::{Pool, PoolCounts, SeekerPools};
pub use spatial::nearest_node;

use glam::Vec3;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::canonical::graph_fingerprint;
use crate::clock::{Clock, SystemClock};
use crate::graph::{Collection, EventSubject, GraphError};
use crate::search::{
    is_traversable, SearchMonitor, SearchState, SearchStatus, SeekFilter, SeekRequest, Seeker,
    SeekerState,
};
use crate::store::{CodecError, CollectionStore, StoreError};
use crate::types::{ConnectionId, HandleCounter, NetworkId, NodeId, SeekerId};

/// Errors raised by [`Control`].
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// No seeker is registered under this handle.
    #[error("Seeker not found: {0}")]
    SeekerNotFound(SeekerId),

    /// The seeker is already searching.
    #[error("Seeker {0} is already seeking")]
    SeekerBusy(SeekerId),

    /// `init` has not been called, or `shutdown` has.
    #[error("Control is not initialized")]
    NotInitialized,

    /// Graph model error.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Blob encoding error.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Store backend error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Work done by one invalidation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Cache entries dropped.
    pub purged: usize,
    /// Used seekers moved back to idle.
    pub invalidated: usize,
}

impl Invalidation {
    fn absorb(&mut self, other: Invalidation) {
        self.purged += other.purged;
        self.invalidated += other.invalidated;
    }
}

/// Summary of one [`Control::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Graph events drained.
    pub events: usize,
    /// Cache entries dropped by invalidation.
    pub purged: usize,
    /// Used seekers invalidated.
    pub invalidated: usize,
    /// Active seekers stepped.
    pub stepped: usize,
    /// Seekers that completed this tick.
    pub completed: usize,
    /// Seekers that failed this tick.
    pub failed: usize,
    /// Cache entries that expired.
    pub expired: usize,
}

/// Orchestrator owning the graph, the seekers and the result cache.
pub struct Control {
    config: ControlConfig,
    clock: Arc<dyn Clock>,
    collection: Collection,
    seekers: BTreeMap<SeekerId, Seeker>,
    pools: SeekerPools,
    cache: PathCache,
    seeker_ids: HandleCounter,
    initialized: bool,
}

impl Control {
    /// Create a control on the system clock.
    pub fn new(config: ControlConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a control on a caller-supplied clock.
    pub fn with_clock(config: ControlConfig, clock: Arc<dyn Clock>) -> Self {
        let cache = PathCache::new(config.cache);
        Self {
            config,
            clock,
            collection: Collection::new(),
            seekers: BTreeMap::new(),
            pools: SeekerPools::default(),
            cache,
            seeker_ids: HandleCounter::default(),
            initialized: false,
        }
    }

    /// Allow searches to run.
    pub fn init(&mut self) {
        if !self.initialized {
            self.initialized = true;
            tracing::info!(
                cache_lifespan = ?self.config.cache_lifespan,
                auto_recalculate = self.config.auto_recalculate,
                "Control initialized"
            );
        }
    }

    /// Kill every seeker, clear the cache and unload the graph.
    pub fn shutdown(&mut self) {
        let ids: Vec<SeekerId> = self.seekers.keys().copied().collect();
        for id in ids {
            // Every id was just read from the map.
            let _ = self.kill_seeker(id);
        }
        self.pools.clear();
        self.cache.clear();
        self.collection = Collection::new();
        self.initialized = false;
        tracing::info!("Control shut down");
    }

    /// Check whether `init` has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn require_init(&self) -> Result<(), ControlError> {
        if self.initialized {
            Ok(())
        } else {
            Err(ControlError::NotInitialized)
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────

    /// Current configuration.
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// Toggle invalidation on graph events.
    pub fn set_auto_recalculate(&mut self, enabled: bool) {
        self.config.auto_recalculate = enabled;
    }

    /// Lifespan given to seekers created from now on.
    pub fn set_default_cache_lifespan(&mut self, lifespan: CacheLifespan) {
        self.config.cache_lifespan = lifespan;
    }

    /// Frame budget given to seekers created from now on.
    pub fn set_default_frame_budget(&mut self, budget: Duration) {
        self.config.frame_budget = budget;
    }

    /// Move the owning transform. Existing seekers keep their endpoints.
    pub fn set_origin(&mut self, origin: Vec3) {
        self.config.origin = origin;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Graph
    // ─────────────────────────────────────────────────────────────────────

    /// Loaded graph.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Edit the graph, then process the events the edit queued.
    pub fn edit<R, F>(&mut self, edit: F) -> R
    where
        F: FnOnce(&mut Collection) -> R,
    {
        let result = edit(&mut self.collection);
        self.process_events();
        result
    }

    /// Merge a collection into the loaded graph. Returns the network
    /// handle mapping.
    pub fn load_graph(&mut self, collection: Collection) -> BTreeMap<NetworkId, NetworkId> {
        let (networks, nodes, connections) = collection.counts();
        let mapping = self.collection.absorb(collection);
        tracing::info!(networks, nodes, connections, "Loaded collection");
        mapping
    }

    /// Decode a blob and merge it into the loaded graph.
    pub fn load_collection(&mut self, bytes: &[u8]) -> Result<BTreeMap<NetworkId, NetworkId>, ControlError> {
        let collection = Collection::from_bytes(bytes)?;
        Ok(self.load_graph(collection))
    }

    /// Load a blob from a store and merge it into the loaded graph.
    pub fn load_from_store(
        &mut self,
        store: &dyn CollectionStore,
        key: &str,
    ) -> Result<BTreeMap<NetworkId, NetworkId>, ControlError> {
        let bytes = store.load(key)?;
        tracing::debug!(key, bytes = bytes.len(), "Read collection blob");
        self.load_collection(&bytes)
    }

    /// Encode the loaded graph.
    pub fn export_collection(&self) -> Result<Vec<u8>, ControlError> {
        Ok(self.collection.to_bytes()?)
    }

    /// Encode the loaded graph into a store.
    pub fn save_to_store(&self, store: &dyn CollectionStore, key: &str) -> Result<(), ControlError> {
        let bytes = self.export_collection()?;
        store.save(key, &bytes)?;
        Ok(())
    }

    /// Remove a network and everything in it.
    pub fn unload_network(&mut self, network: NetworkId) -> Result<(), ControlError> {
        self.collection.remove_network(network)?;
        self.process_events();
        Ok(())
    }

    /// First network with the given name.
    pub fn network_by_name(&self, name: &str) -> Option<NetworkId> {
        self.collection.network_by_name(name)
    }

    /// All networks with the given name.
    pub fn networks_named(&self, name: &str) -> Vec<NetworkId> {
        self.collection.networks_named(name)
    }

    /// All grid networks.
    pub fn grid_networks(&self) -> Vec<NetworkId> {
        self.collection.grid_networks()
    }

    /// Grid nodes whose target is `node`.
    pub fn grid_nodes_targeting(&self, node: NodeId) -> Vec<NodeId> {
        self.collection.grid_nodes_targeting(node)
    }

    /// World position of a node under the configured origin.
    pub fn world_position(&self, node: NodeId) -> Result<Vec3, ControlError> {
        Ok(self.collection.world_position(node, self.config.origin)?)
    }

    /// Fingerprint of the loaded graph.
    pub fn graph_fingerprint(&self) -> Result<String, ControlError> {
        graph_fingerprint(&self.collection).map_err(|e| ControlError::Codec(CodecError::from(e)))
    }

    /// Enable or disable a network.
    pub fn set_network_enabled(&mut self, network: NetworkId, enabled: bool) -> Result<(), ControlError> {
        self.collection.set_network_enabled(network, enabled)?;
        self.process_events();
        Ok(())
    }

    /// Enable or disable a node.
    pub fn set_node_enabled(&mut self, node: NodeId, enabled: bool) -> Result<(), ControlError> {
        self.collection.set_node_enabled(node, enabled)?;
        self.process_events();
        Ok(())
    }

    /// Enable or disable a connection.
    pub fn set_connection_enabled(&mut self, connection: ConnectionId, enabled: bool) -> Result<(), ControlError> {
        self.collection.set_connection_enabled(connection, enabled)?;
        self.process_events();
        Ok(())
    }

    /// Nearest enabled node to a world point that passes `filter`.
    pub fn nearest_node(&self, point: Vec3, filter: &SeekFilter) -> Option<NodeId> {
        let resolved = filter.resolve(self.collection.tags());
        nearest_node(&self.collection, point, &resolved, self.config.origin)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Seekers
    // ─────────────────────────────────────────────────────────────────────

    /// Register a seeker, resolving its endpoints against the loaded graph.
    pub fn create_seeker(&mut self, request: SeekRequest) -> SeekerId {
        let id = SeekerId::new(self.seeker_ids.next());
        let start = self.nearest_node(request.start_point, &request.filter);
        let end = self.nearest_node(request.end_point, &request.filter);
        tracing::debug!(seeker = %id, ?start, ?end, "Registered seeker");

        let seeker = Seeker::new(
            id,
            request,
            start,
            end,
            self.config.frame_budget(),
            self.config.cache_lifespan,
        );
        self.seekers.insert(id, seeker);
        self.pools.move_to(id, Pool::Idle);
        id
    }

    /// Move a seeker's query points and resolve them again.
    pub fn retarget_seeker(&mut self, id: SeekerId, start_point: Vec3, end_point: Vec3) -> Result<(), ControlError> {
        let filter = self.seeker(id)?.filter.clone();
        if self.seeker(id)?.state == SeekerState::Seeking {
            tracing::error!(seeker = %id, "Cannot retarget a seeker while it is seeking");
            return Err(ControlError::SeekerBusy(id));
        }
        let start = self.nearest_node(start_point, &filter);
        let end = self.nearest_node(end_point, &filter);
        let seeker = self.seeker_mut(id)?;
        seeker.start_point = start_point;
        seeker.end_point = end_point;
        seeker.start = start;
        seeker.end = end;
        Ok(())
    }

    /// Look up a seeker.
    pub fn seeker(&self, id: SeekerId) -> Result<&Seeker, ControlError> {
        self.seekers.get(&id).ok_or(ControlError::SeekerNotFound(id))
    }

    /// Look up a seeker for configuration.
    pub fn seeker_mut(&mut self, id: SeekerId) -> Result<&mut Seeker, ControlError> {
        self.seekers.get_mut(&id).ok_or(ControlError::SeekerNotFound(id))
    }

    /// Iterate over registered seekers in handle order.
    pub fn seekers(&self) -> impl Iterator<Item = &Seeker> {
        self.seekers.values()
    }

    /// Pool a seeker currently sits in.
    pub fn pool_of(&self, id: SeekerId) -> Option<Pool> {
        self.pools.pool_of(id)
    }

    /// Attach a monitor to a seeker.
    pub fn add_monitor(&mut self, id: SeekerId, monitor: Arc<dyn SearchMonitor>) -> Result<(), ControlError> {
        self.seeker_mut(id)?.add_monitor(monitor);
        Ok(())
    }

    /// Start a seeker's search.
    ///
    /// Unresolved endpoints fail immediately; `start == end` and cache hits
    /// complete immediately. Otherwise the seeker becomes active and is
    /// stepped by [`tick`](Self::tick).
    pub fn start_seeker(&mut self, id: SeekerId) -> Result<SeekerState, ControlError> {
        self.require_init()?;
        let now = self.clock.now();
        let seeker = self.seekers.get_mut(&id).ok_or(ControlError::SeekerNotFound(id))?;
        if seeker.state == SeekerState::Seeking {
            tracing::error!(seeker = %id, "Seeker started while already seeking");
            return Err(ControlError::SeekerBusy(id));
        }

        let (Some(start), Some(end)) = (seeker.start, seeker.end) else {
            tracing::warn!(
                seeker = %id,
                start_point = ?seeker.start_point,
                end_point = ?seeker.end_point,
                "Seeker endpoints did not resolve to nodes"
            );
            self.fail(id);
            return Ok(SeekerState::Failed);
        };

        if start == end {
            self.complete(id, Vec::new());
            return Ok(SeekerState::Completed);
        }

        let filter = seeker.filter.resolve(self.collection.tags());
        let clearance = seeker.clearance;
        let previous = seeker.cache_lifespan;
        let collection = &self.collection;
        let hit = self.cache.find(start, end, now, previous, |solution| {
            solution
                .iter()
                .all(|c| is_traversable(collection, *c, clearance, &filter))
        });
        if let Some(solution) = hit {
            seeker.cache_lifespan = CacheLifespan::NoCache;
            tracing::debug!(seeker = %id, %start, %end, length = solution.len(), "Served from cache");
            self.complete(id, solution);
            return Ok(SeekerState::Completed);
        }

        match SearchState::new(&self.collection, start, end, clearance, filter) {
            Ok(search) => {
                seeker.search = Some(search);
                seeker.state = SeekerState::Seeking;
                seeker.solution.clear();
                seeker.footprint = None;
                self.pools.move_to(id, Pool::Active);
                tracing::debug!(seeker = %id, %start, %end, "Search started");
                Ok(SeekerState::Seeking)
            }
            Err(err) => {
                tracing::warn!(seeker = %id, error = %err, "Search could not start");
                self.fail(id);
                Ok(SeekerState::Failed)
            }
        }
    }

    /// Step one active seeker outside the tick. Inactive seekers report their
    /// state unchanged.
    pub fn step_seeker(&mut self, id: SeekerId) -> Result<SeekerState, ControlError> {
        self.require_init()?;
        if self.pools.pool_of(id) != Some(Pool::Active) {
            return Ok(self.seeker(id)?.state);
        }
        self.advance(id)
    }

    /// Ask a seeker's search to stop. It ends as failed on its next step.
    /// Returns whether a search was running.
    pub fn stop_seeker(&mut self, id: SeekerId) -> Result<bool, ControlError> {
        let seeker = self.seeker_mut(id)?;
        match seeker.search.as_mut() {
            Some(search) => {
                search.request_stop();
                tracing::debug!(seeker = %id, "Stop requested");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Unregister a seeker, detaching its monitors. Returns the seeker.
    pub fn kill_seeker(&mut self, id: SeekerId) -> Result<Seeker, ControlError> {
        let mut seeker = self.seekers.remove(&id).ok_or(ControlError::SeekerNotFound(id))?;
        self.pools.remove(id);
        seeker.finish_search();
        seeker.clear_monitors();
        tracing::debug!(seeker = %id, "Seeker killed");
        Ok(seeker)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tick and invalidation
    // ─────────────────────────────────────────────────────────────────────

    /// Run one frame: process graph events, step active seekers, sweep the
    /// cache.
    pub fn tick(&mut self) -> Result<TickReport, ControlError> {
        self.require_init()?;
        let (events, invalidation) = self.process_events();
        let mut report = TickReport {
            events,
            purged: invalidation.purged,
            invalidated: invalidation.invalidated,
            ..TickReport::default()
        };

        for id in self.pools.active().to_vec() {
            report.stepped += 1;
            match self.advance(id)? {
                SeekerState::Completed => report.completed += 1,
                SeekerState::Failed => report.failed += 1,
                _ => {}
            }
        }

        report.expired = self.cache.sweep(self.clock.now());
        tracing::trace!(?report, "Tick");
        Ok(report)
    }

    /// Drain queued graph events, invalidating dependents when
    /// `auto_recalculate` is set. Returns the number of events drained.
    pub fn process_events(&mut self) -> (usize, Invalidation) {
        let events = self.collection.drain_events();
        let mut total = Invalidation::default();
        if self.config.auto_recalculate {
            for event in &events {
                total.absorb(self.recalculate(event.subject));
            }
        }
        (events.len(), total)
    }

    /// Invalidate everything depending on a network.
    pub fn recalculate_network(&mut self, network: NetworkId) -> Invalidation {
        self.recalculate(EventSubject::Network(network))
    }

    /// Invalidate everything depending on a node.
    pub fn recalculate_node(&mut self, node: NodeId) -> Invalidation {
        self.recalculate(EventSubject::Node(node))
    }

    /// Invalidate everything depending on a connection.
    pub fn recalculate_connection(&mut self, connection: ConnectionId) -> Invalidation {
        self.recalculate(EventSubject::Connection(connection))
    }

    /// Purge cache entries and invalidate used seekers depending on
    /// `subject`. Idle and active seekers are left alone.
    pub fn recalculate(&mut self, subject: EventSubject) -> Invalidation {
        let purged = self.cache.purge(subject);
        let dependents: Vec<SeekerId> = self
            .pools
            .used()
            .filter(|id| {
                self.seekers
                    .get(id)
                    .and_then(|s| s.footprint.as_ref())
                    .is_some_and(|f| f.uses(subject))
            })
            .collect();
        for id in &dependents {
            self.invalidate(*id);
        }
        if purged > 0 || !dependents.is_empty() {
            tracing::debug!(?subject, purged, invalidated = dependents.len(), "Invalidated dependents");
        }
        Invalidation {
            purged,
            invalidated: dependents.len(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Stats
    // ─────────────────────────────────────────────────────────────────────

    /// Pool sizes and cached result count.
    pub fn pool_counts(&self) -> PoolCounts {
        self.pools.counts(self.cache.len())
    }

    /// Result cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Cached results, most recently used first.
    pub fn cached_paths(&self) -> impl Iterator<Item = &CachedPath> {
        self.cache.entries()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────

    fn advance(&mut self, id: SeekerId) -> Result<SeekerState, ControlError> {
        let seeker = self.seekers.get_mut(&id).ok_or(ControlError::SeekerNotFound(id))?;
        let Some(search) = seeker.search.as_mut() else {
            return Ok(seeker.state);
        };
        match search.step(&self.collection, self.clock.as_ref(), seeker.frame_budget) {
            SearchStatus::Running => Ok(SeekerState::Seeking),
            SearchStatus::Completed(solution) => {
                self.complete(id, solution);
                Ok(SeekerState::Completed)
            }
            SearchStatus::Failed => {
                self.fail(id);
                Ok(SeekerState::Failed)
            }
        }
    }

    fn complete(&mut self, id: SeekerId, solution: Vec<ConnectionId>) {
        let now = self.clock.now();
        let Some(seeker) = self.seekers.get_mut(&id) else {
            return;
        };
        seeker.finish_search();
        let (Some(start), Some(end)) = (seeker.start, seeker.end) else {
            return;
        };

        let footprint = Footprint::new(&self.collection, end, &solution);
        if !solution.is_empty()
            && self.cache.store(start, end, solution.clone(), footprint.clone(), seeker.cache_lifespan, now)
        {
            tracing::trace!(seeker = %id, lifespan = ?seeker.cache_lifespan, "Cached solution");
        }

        tracing::debug!(seeker = %id, length = solution.len(), stats = ?seeker.last_stats, "Search completed");
        seeker.solution = solution;
        seeker.state = SeekerState::Completed;
        seeker.footprint = Some(footprint);
        self.pools.move_to(id, Pool::Used);
        seeker.notify_completed();
    }

    fn fail(&mut self, id: SeekerId) {
        let Some(seeker) = self.seekers.get_mut(&id) else {
            return;
        };
        seeker.finish_search();
        seeker.solution.clear();
        seeker.state = SeekerState::Failed;
        seeker.footprint = None;
        self.pools.move_to(id, Pool::Idle);
        tracing::debug!(seeker = %id, stats = ?seeker.last_stats, "Search failed");
        seeker.notify_failed();
    }

    fn invalidate(&mut self, id: SeekerId) {
        let Some(seeker) = self.seekers.get_mut(&id) else {
            return;
        };
        seeker.state = SeekerState::Invalidated;
        seeker.footprint = None;
        self.pools.move_to(id, Pool::Idle);
        seeker.notify_invalidated();
    }
}
