//! Core data model types: handles, tags, geometry, nodes, connections and
//! networks.

pub mod ids;
pub mod tags;
pub mod geometry;
pub mod connection;
pub mod node;
pub mod network;

pub use ids::{ConnectionId, HandleCounter, NetworkId, NodeId, SeekerId, TagId};
pub use tags::{TagRegistry, TagSet};
pub use geometry::{Bounds, CellShape, GridLink, Triangle, WaypointShape};
pub use connection::{Connection, DEFAULT_WEIGHT_FACTOR};
pub use node::{Node, NodeKind};
pub use network::{Network, NetworkKind, DEFAULT_NETWORK_SIZE};
