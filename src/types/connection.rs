//! Directed, weighted edges between nodes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::ids::NodeId;
use super::tags::TagSet;

/// Default multiplier applied to connection length.
pub const DEFAULT_WEIGHT_FACTOR: f32 = 1.0;

/// A directed edge `from → to`.
///
/// The cost of traversing a connection is the distance between the two
/// node positions scaled by `weight_factor`. Positions live on the nodes, so
/// cost is computed by the owning collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Origin node.
    pub from: NodeId,
    /// Destination node.
    pub to: NodeId,
    /// Minimum clearance an agent needs to use this edge (diameter).
    pub width: f32,
    /// Cost multiplier.
    pub weight_factor: f32,
    /// Disabled connections are never traversed.
    pub enabled: bool,
    /// Tags used by seeker filters.
    pub tags: TagSet,
}

impl Connection {
    /// Create an enabled connection with the default weight factor.
    pub fn new(from: NodeId, to: NodeId, width: f32) -> Self {
        Self {
            from,
            to,
            width,
            weight_factor: DEFAULT_WEIGHT_FACTOR,
            enabled: true,
            tags: TagSet::new(),
        }
    }

    /// Traversal cost given the resolved positions of both endpoints.
    pub fn cost_between(&self, from: Vec3, to: Vec3) -> f32 {
        (from - to).length() * self.weight_factor
    }

    /// Check whether an agent of the given radius fits through.
    pub fn admits(&self, clearance_radius: f32) -> bool {
        self.width >= clearance_radius * 2.0
    }

    /// Check whether this connection joins the given ordered pair.
    pub fn joins(&self, from: NodeId, to: NodeId) -> bool {
        self.from == from && self.to == to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_scales_with_weight() {
        let mut connection = Connection::new(NodeId::new(0), NodeId::new(1), 2.0);
        let cost = connection.cost_between(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0));
        assert_eq!(cost, 5.0);

        connection.weight_factor = 2.5;
        assert_eq!(connection.cost_between(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0)), 12.5);
    }

    #[test]
    fn test_width_admits_diameter() {
        let connection = Connection::new(NodeId::new(0), NodeId::new(1), 2.0);
        assert!(connection.admits(1.0));
        assert!(!connection.admits(1.01));
    }
}
