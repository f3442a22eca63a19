//! Graph model: the collection arena and its editing operations.
//!
//! ## Layout
//!
//! ```text
//! Collection
//!   ├── TagRegistry
//!   ├── Network ── nodes: [NodeId]
//!   ├── Node ───── connections: [ConnectionId]
//!   └── Connection (from → to)
//! ```
//!
//! Every entity lives in an ordered map keyed by a stable handle, so
//! iteration order is deterministic and stale handles fail to resolve.

pub mod collection;
pub mod editing;
pub mod events;
pub mod navmesh;
pub mod waypoints;

pub use collection::{Collection, TaggedEntity};
pub use events::{EventKind, EventSubject, GraphEvent};
pub use navmesh::{NavmeshReport, SharedPointFailure};
pub use waypoints::{LayerMask, NoObstruction, Obstruction};

use crate::types::{ConnectionId, NetworkId, NodeId};

/// Errors raised by graph model operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// Network handle does not resolve.
    #[error("Network not found: {0}")]
    NetworkNotFound(NetworkId),

    /// Node handle does not resolve.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Connection handle does not resolve.
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    /// A node with the same name already exists in the network.
    #[error("Duplicate node name '{name}' in {network}")]
    DuplicateName {
        /// Network that already holds the name.
        network: NetworkId,
        /// Rejected name.
        name: String,
    },

    /// Operation requires a different kind of network.
    #[error("{network} is a {actual}, expected a {expected}")]
    WrongNetworkKind {
        /// Offending network.
        network: NetworkId,
        /// Required kind.
        expected: &'static str,
        /// Actual kind.
        actual: &'static str,
    },

    /// Operation requires a different kind of node.
    #[error("{node} is a {actual}, expected a {expected}")]
    WrongNodeKind {
        /// Offending node.
        node: NodeId,
        /// Required kind.
        expected: &'static str,
        /// Actual kind.
        actual: &'static str,
    },

    /// Grid nodes cannot target other grid nodes.
    #[error("Grid node {grid} cannot target grid node {target}")]
    GridTargetIsGrid {
        /// Grid node being edited.
        grid: NodeId,
        /// Rejected target.
        target: NodeId,
    },

    /// Merge called with no cells.
    #[error("Cannot merge an empty set of cells")]
    EmptyMerge,

    /// Merge called with cells from different networks.
    #[error("Cannot merge cells from different networks: {0} and {1}")]
    MixedMerge(NetworkId, NetworkId),

    /// Tag name is not registered.
    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    /// Connection widths must be finite and non-negative.
    #[error("Invalid connection width: {0}")]
    InvalidWidth(f32),

    /// Connection weight factors must be finite and non-negative.
    #[error("Invalid connection weight factor: {0}")]
    InvalidWeight(f32),

    /// Mesh input cannot be turned into cells.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}
