//! Networks: named groups of nodes of a single kind.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::geometry::Bounds;
use super::ids::NodeId;
use super::tags::TagSet;

/// Default bounding size of a new network along each axis.
pub const DEFAULT_NETWORK_SIZE: f32 = 10.0;

/// The kind of nodes a network holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkKind {
    /// Free waypoint graph.
    Waypoint,
    /// Triangulated navigation mesh.
    Navmesh,
    /// Grid indirection network.
    Grid,
}

impl NetworkKind {
    /// Short label used in errors and logs.
    pub fn label(&self) -> &'static str {
        match self {
            NetworkKind::Waypoint => "waypoint network",
            NetworkKind::Navmesh => "navmesh",
            NetworkKind::Grid => "grid network",
        }
    }
}

/// A network of nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Display name. Not required to be unique.
    pub name: String,
    /// Disabled networks are skipped by nearest-node queries.
    pub enabled: bool,
    /// Position relative to the owning transform.
    pub position: Vec3,
    /// Bounding box size, centred at `position`.
    pub size: Vec3,
    /// Tags used by seeker filters.
    pub tags: TagSet,
    /// Node kind held by this network.
    pub kind: NetworkKind,
    /// Member nodes in insertion order.
    pub nodes: Vec<NodeId>,
}

impl Network {
    /// Create an empty, enabled network at the origin.
    pub fn new(name: impl Into<String>, kind: NetworkKind) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            position: Vec3::ZERO,
            size: Vec3::splat(DEFAULT_NETWORK_SIZE),
            tags: TagSet::new(),
            kind,
            nodes: Vec::new(),
        }
    }

    /// World-space bounds given the owning transform's origin.
    pub fn bounds(&self, origin: Vec3) -> Bounds {
        Bounds::new(self.position + origin, self.size)
    }

    /// Translation from network-local to world space.
    pub fn offset(&self, origin: Vec3) -> Vec3 {
        self.position + origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_network_defaults() {
        let network = Network::new("ground", NetworkKind::Navmesh);
        assert!(network.enabled);
        assert_eq!(network.size, Vec3::splat(10.0));
        assert!(network.nodes.is_empty());
    }

    #[test]
    fn test_bounds_follow_origin() {
        let mut network = Network::new("ground", NetworkKind::Waypoint);
        network.position = Vec3::new(20.0, 0.0, 0.0);
        let bounds = network.bounds(Vec3::new(0.0, 0.0, 100.0));
        assert!(bounds.contains(Vec3::new(24.0, 0.0, 104.0)));
        assert!(!bounds.contains(Vec3::new(4.0, 0.0, 104.0)));
    }
}
