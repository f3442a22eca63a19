//! Nearest-node lookup.

use glam::Vec3;

use crate::graph::Collection;
use crate::search::ResolvedFilter;
use crate::types::{NetworkKind, NodeId};

/// Find the enabled node nearest to a world point.
///
/// Grid networks are never searched directly. Disabled networks, networks
/// whose bounds exclude the point, and (when the filter validates networks)
/// networks failing the filter are skipped. Nodes must be enabled and pass
/// the filter. Ties keep the first node found in handle order.
pub fn nearest_node(
    collection: &Collection,
    point: Vec3,
    filter: &ResolvedFilter,
    origin: Vec3,
) -> Option<NodeId> {
    let mut best: Option<(NodeId, f32)> = None;

    for (_, network) in collection.networks() {
        if network.kind == NetworkKind::Grid
            || !network.enabled
            || !filter.passes_network(&network.tags)
            || !network.bounds(origin).contains(point)
        {
            continue;
        }
        let offset = network.offset(origin);
        for id in &network.nodes {
            let Ok(node) = collection.node(*id) else {
                continue;
            };
            if !node.enabled || !filter.passes(&node.tags) {
                continue;
            }
            let distance = (node.position + offset).distance_squared(point);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((*id, distance));
            }
        }
    }

    best.map(|(id, _)| id)
}
