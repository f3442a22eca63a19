//! Automatic line-of-sight connection of waypoint networks.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::collection::Collection;
use super::GraphError;
use crate::types::{NetworkId, NetworkKind, NodeId};

/// Bit mask of blocking layers passed through to the obstruction query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer blocks.
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    /// Nothing blocks.
    pub const NONE: LayerMask = LayerMask(0);

    /// Check whether a layer bit is set.
    pub fn includes(&self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Line-of-sight query supplied by the host physics engine.
pub trait Obstruction {
    /// Check whether a ray from `origin` along `direction` hits anything on
    /// `mask` within `distance`.
    fn is_blocked(&self, origin: Vec3, direction: Vec3, distance: f32, mask: LayerMask) -> bool;
}

/// Obstruction query for an empty world.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstruction;

impl Obstruction for NoObstruction {
    fn is_blocked(&self, _origin: Vec3, _direction: Vec3, _distance: f32, _mask: LayerMask) -> bool {
        false
    }
}

impl<F> Obstruction for F
where
    F: Fn(Vec3, Vec3, f32, LayerMask) -> bool,
{
    fn is_blocked(&self, origin: Vec3, direction: Vec3, distance: f32, mask: LayerMask) -> bool {
        self(origin, direction, distance, mask)
    }
}

struct Sphere {
    id: NodeId,
    centre: Vec3,
    radius: f32,
}

impl Collection {
    /// Connect every ordered pair of enabled waypoints with a clear line of
    /// sight between the edges of their radii.
    ///
    /// Existing connections are kept. Returns the number created.
    pub fn auto_connect<O>(
        &mut self,
        network: NetworkId,
        obstruction: &O,
        mask: LayerMask,
        width: f32,
        origin: Vec3,
    ) -> Result<usize, GraphError>
    where
        O: Obstruction + ?Sized,
    {
        self.expect_network_kind(network, NetworkKind::Waypoint)?;

        let mut spheres = Vec::new();
        for id in self.nodes_of(network)? {
            let node = self.node(*id)?;
            if let (true, Some(shape)) = (node.enabled, node.as_waypoint()) {
                spheres.push(Sphere {
                    id: *id,
                    centre: self.world_position(*id, origin)?,
                    radius: shape.radius,
                });
            }
        }

        let mut created = 0;
        for from in &spheres {
            for to in &spheres {
                if from.id == to.id || self.connection_between(from.id, to.id).is_some() {
                    continue;
                }
                let direction = to.centre - from.centre;
                let heading = direction.normalize_or_zero();
                let start = from.centre + heading * from.radius;
                let distance = direction.length() - from.radius - to.radius;

                if distance > 0.0 && obstruction.is_blocked(start, heading, distance, mask) {
                    tracing::trace!(from = %from.id, to = %to.id, "Line of sight blocked");
                    continue;
                }
                if self.connect(from.id, to.id, width)?.is_some() {
                    created += 1;
                }
            }
        }

        tracing::debug!(network = %network, created, "Auto-connected waypoints");
        Ok(created)
    }
}
