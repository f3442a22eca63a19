//! Graph nodes and their kind-specific shapes.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::geometry::{CellShape, GridLink, WaypointShape};
use super::ids::{ConnectionId, NetworkId, NodeId};
use super::tags::TagSet;

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Free-standing waypoint with a radius.
    Waypoint(WaypointShape),
    /// Navmesh cell made of triangles.
    Cell(CellShape),
    /// Indirection to a node in another network.
    Grid(GridLink),
}

impl NodeKind {
    /// Short label used in errors and logs.
    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Waypoint(_) => "waypoint",
            NodeKind::Cell(_) => "cell",
            NodeKind::Grid(_) => "grid node",
        }
    }
}

/// A node of a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Display name, unique within the owning network.
    pub name: String,
    /// Owning network.
    pub network: NetworkId,
    /// Disabled nodes are never entered by a search.
    pub enabled: bool,
    /// Network-local position. Grid nodes resolve their position through
    /// their target, so the stored value is unused for them.
    pub position: Vec3,
    /// Outgoing connections in creation order.
    pub connections: Vec<ConnectionId>,
    /// Tags used by seeker filters.
    pub tags: TagSet,
    /// Kind-specific shape.
    pub kind: NodeKind,
}

impl Node {
    /// Create an enabled node with no connections.
    pub fn new(name: impl Into<String>, network: NetworkId, position: Vec3, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            network,
            enabled: true,
            position,
            connections: Vec::new(),
            tags: TagSet::new(),
            kind,
        }
    }

    /// Grid target, if this is a grid node with one.
    pub fn grid_target(&self) -> Option<NodeId> {
        match &self.kind {
            NodeKind::Grid(link) => link.target,
            _ => None,
        }
    }

    /// Check whether this is a grid node.
    pub fn is_grid(&self) -> bool {
        matches!(self.kind, NodeKind::Grid(_))
    }

    /// Waypoint shape, if this is a waypoint.
    pub fn as_waypoint(&self) -> Option<&WaypointShape> {
        match &self.kind {
            NodeKind::Waypoint(shape) => Some(shape),
            _ => None,
        }
    }

    /// Cell shape, if this is a navmesh cell.
    pub fn as_cell(&self) -> Option<&CellShape> {
        match &self.kind {
            NodeKind::Cell(shape) => Some(shape),
            _ => None,
        }
    }

    /// Deterministic listing order: by name, then by network.
    pub fn listing_order(&self, other: &Node) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.network.cmp(&other.network))
    }
}
