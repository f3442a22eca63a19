//! # pathgraph-kernel
//!
//! Time-sliced A* pathfinding over heterogeneous spatial graphs.
//!
//! A loaded graph mixes three kinds of network:
//!
//! - **Waypoint** networks of spheres joined by free connections
//! - **Navmesh** networks of triangulated cells joined across shared edges
//! - **Grid** networks whose nodes alias nodes in other networks
//!
//! ## Architecture
//!
//! ```text
//! SeekRequest → Control::create_seeker → nearest_node (start, end)
//!                      ↓
//!               Control::start_seeker → PathCache hit? ──yes──► Completed
//!                      ↓ no
//!               Control::tick → SearchState::step(budget) → Completed | Failed
//!                      ↑
//!          Collection events (disable/remove) → invalidation
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Handles are never reused within a collection
//! - Open-set ties resolve by insertion order
//! - Entity maps are ordered, so graph fingerprints are stable across
//!   persistence round trips

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod clock;
pub mod control;
pub mod graph;
pub mod search;
pub mod store;
pub mod types;

// Re-exports
pub use types::{
    Bounds, CellShape, Connection, ConnectionId, GridLink, Network, NetworkId, NetworkKind, Node,
    NodeId, NodeKind, SeekerId, TagId, TagRegistry, TagSet, Triangle, WaypointShape,
};
pub use graph::{
    Collection, EventKind, EventSubject, GraphError, GraphEvent, LayerMask, NavmeshReport,
    NoObstruction, Obstruction, SharedPointFailure, TaggedEntity,
};
pub use search::{
    MonitorEvent, RecordingMonitor, SearchMonitor, SearchState, SearchStatus, SeekFilter,
    SeekRequest, Seeker, SeekerState,
};
pub use control::{
    CacheConfig, CacheLifespan, CacheStats, Control, ControlConfig, ControlError, Pool,
    PoolCounts, TickReport,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{
    CodecError, CollectionStore, FileCollectionStore, InMemoryCollectionStore, StoreError,
    SCHEMA_VERSION,
};
pub use canonical::{canonical_hash, canonical_hash_hex, graph_fingerprint, to_canonical_bytes};
