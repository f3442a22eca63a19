//! Structural edits: network duplication, collection absorption and cell
//! merging.

use std::collections::{BTreeMap, BTreeSet};

use super::collection::Collection;
use super::events::{EventSubject, GraphEvent};
use super::GraphError;
use crate::types::{CellShape, ConnectionId, NetworkId, Node, NodeId, NodeKind, TagSet};

impl Collection {
    /// Deep-copy a network under a new name.
    ///
    /// Every node and intra-network connection is copied with fresh handles.
    /// Connections leaving the network keep their external destination, and
    /// grid targets are preserved.
    pub fn duplicate_network(&mut self, id: NetworkId, new_name: &str) -> Result<NetworkId, GraphError> {
        let source = self.network(id)?.clone();
        let copy_id = self.add_network(new_name, source.kind);
        {
            let copy = self.network_mut(copy_id)?;
            copy.enabled = source.enabled;
            copy.position = source.position;
            copy.size = source.size;
            copy.tags = source.tags.clone();
        }

        let mut remap: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for old in &source.nodes {
            let mut node = self.node(*old)?.clone();
            node.network = copy_id;
            node.connections.clear();
            let new = self.insert_node(node)?;
            remap.insert(*old, new);
        }

        for old in &source.nodes {
            let outgoing = self.node(*old)?.connections.clone();
            for cid in outgoing {
                let original = self.connection(cid)?.clone();
                let from = remap[old];
                let to = remap.get(&original.to).copied().unwrap_or(original.to);
                if let Some(new_cid) = self.connect(from, to, original.width)? {
                    if let Some(copied) = self.connections.get_mut(&new_cid) {
                        copied.weight_factor = original.weight_factor;
                        copied.enabled = original.enabled;
                        copied.tags = original.tags;
                    }
                }
            }
        }

        tracing::debug!(source = %id, copy = %copy_id, nodes = remap.len(), "Duplicated network");
        Ok(copy_id)
    }

    /// Move every entity of another collection into this one.
    ///
    /// Handles are reallocated and tags are re-resolved by name. Returns the
    /// mapping from the other collection's network handles to the new ones.
    pub fn absorb(&mut self, other: Collection) -> BTreeMap<NetworkId, NetworkId> {
        let tag_map: BTreeMap<_, _> = other
            .tags
            .iter()
            .map(|(old, name)| (old, self.tags.add(name)))
            .collect();
        let retag = |set: &TagSet| -> TagSet {
            set.iter().filter_map(|tag| tag_map.get(&tag).copied()).collect()
        };

        let networks: BTreeMap<NetworkId, NetworkId> = other
            .networks
            .keys()
            .map(|old| (*old, NetworkId::new(self.network_ids.next())))
            .collect();
        let nodes: BTreeMap<NodeId, NodeId> = other
            .nodes
            .keys()
            .map(|old| (*old, NodeId::new(self.node_ids.next())))
            .collect();
        let connections: BTreeMap<ConnectionId, ConnectionId> = other
            .connections
            .keys()
            .map(|old| (*old, ConnectionId::new(self.connection_ids.next())))
            .collect();

        for (old, mut network) in other.networks {
            network.tags = retag(&network.tags);
            network.nodes = network
                .nodes
                .iter()
                .filter_map(|n| nodes.get(n).copied())
                .collect();
            self.networks.insert(networks[&old], network);
        }

        for (old, mut node) in other.nodes {
            // Every node belongs to a network of the same collection.
            let Some(network) = networks.get(&node.network) else {
                continue;
            };
            node.network = *network;
            node.tags = retag(&node.tags);
            node.connections = node
                .connections
                .iter()
                .filter_map(|c| connections.get(c).copied())
                .collect();
            if let NodeKind::Grid(link) = &mut node.kind {
                link.target = link.target.and_then(|t| nodes.get(&t).copied());
            }
            self.nodes.insert(nodes[&old], node);
        }

        for (old, mut connection) in other.connections {
            let (Some(from), Some(to)) = (nodes.get(&connection.from), nodes.get(&connection.to)) else {
                continue;
            };
            connection.from = *from;
            connection.to = *to;
            connection.tags = retag(&connection.tags);
            self.connections.insert(connections[&old], connection);
        }

        networks
    }

    /// Merge several cells of one navmesh into a single new cell.
    ///
    /// The new cell takes the first cell's name, position and slot in the
    /// network, the concatenated triangles and the union of tags. Connections
    /// are rewired onto the new cell; connections between merged cells are
    /// dropped, as are redirected connections that would duplicate an
    /// existing pair. Grid nodes targeting a merged cell retarget the new one.
    pub fn merge_cells(&mut self, cells: &[NodeId]) -> Result<NodeId, GraphError> {
        let (&first, _) = cells.split_first().ok_or(GraphError::EmptyMerge)?;

        let mut network = None;
        for id in cells {
            let node = self.node(*id)?;
            if node.as_cell().is_none() {
                return Err(GraphError::WrongNodeKind {
                    node: *id,
                    expected: "cell",
                    actual: node.kind.label(),
                });
            }
            match network {
                None => network = Some(node.network),
                Some(existing) if existing != node.network => {
                    return Err(GraphError::MixedMerge(existing, node.network));
                }
                Some(_) => {}
            }
        }
        let merged: BTreeSet<NodeId> = cells.iter().copied().collect();
        if merged.len() == 1 {
            return Ok(first);
        }
        let network = self.node(first)?.network;

        // Build the replacement cell.
        let template = self.node(first)?;
        let mut shape = CellShape::default();
        let mut tags = TagSet::new();
        for id in cells {
            let node = self.node(*id)?;
            if let Some(cell) = node.as_cell() {
                shape.triangles.extend(cell.triangles.iter().copied());
            }
            tags.extend_from(&node.tags);
        }
        let mut replacement = Node::new(
            template.name.clone(),
            network,
            template.position,
            NodeKind::Cell(shape),
        );
        replacement.enabled = template.enabled;
        replacement.tags = tags;
        let new_id = NodeId::new(self.node_ids.next());
        self.nodes.insert(new_id, replacement);

        // Outgoing connections of merged cells.
        let mut dropped: Vec<ConnectionId> = Vec::new();
        let mut kept: Vec<ConnectionId> = Vec::new();
        let mut destinations: BTreeSet<NodeId> = BTreeSet::new();
        for id in cells {
            for cid in self.node(*id)?.connections.clone() {
                let to = self.connection(cid)?.to;
                if merged.contains(&to) || !destinations.insert(to) {
                    dropped.push(cid);
                } else {
                    kept.push(cid);
                }
            }
        }
        for cid in &kept {
            if let Some(connection) = self.connections.get_mut(cid) {
                connection.from = new_id;
            }
        }

        // Incoming connections from outside nodes.
        let incoming: Vec<(ConnectionId, NodeId)> = self
            .connections
            .iter()
            .filter(|(_, c)| !merged.contains(&c.from) && c.from != new_id && merged.contains(&c.to))
            .map(|(cid, c)| (*cid, c.from))
            .collect();
        let mut sources: BTreeSet<NodeId> = BTreeSet::new();
        for (cid, from) in incoming {
            if !sources.insert(from) {
                if let Some(node) = self.nodes.get_mut(&from) {
                    node.connections.retain(|c| *c != cid);
                }
                dropped.push(cid);
            } else if let Some(connection) = self.connections.get_mut(&cid) {
                connection.to = new_id;
            }
        }

        for cid in dropped {
            self.drop_connection_record(cid);
        }
        self.node_mut(new_id)?.connections = kept;

        // Grid retargeting.
        for node in self.nodes.values_mut() {
            if let NodeKind::Grid(link) = &mut node.kind {
                if link.target.is_some_and(|t| merged.contains(&t)) {
                    link.target = Some(new_id);
                }
            }
        }

        // Slot replacement and removal of the merged cells.
        let members = &mut self.network_mut(network)?.nodes;
        let mut placed = false;
        members.retain_mut(|member| {
            if *member == first && !placed {
                *member = new_id;
                placed = true;
                true
            } else {
                !merged.contains(member)
            }
        });
        for id in &merged {
            self.nodes.remove(id);
            self.events.push(GraphEvent::removed(EventSubject::Node(*id)));
        }

        tracing::debug!(cells = merged.len(), merged = %new_id, "Merged navmesh cells");
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TaggedEntity;
    use crate::types::{NetworkKind, Triangle};
    use glam::Vec3;

    fn tri(offset: f32) -> Triangle {
        Triangle::new(
            Vec3::new(offset, 0.0, 0.0),
            Vec3::new(offset + 1.0, 0.0, 0.0),
            Vec3::new(offset, 0.0, 1.0),
        )
    }

    fn mesh() -> (Collection, NetworkId, [NodeId; 4]) {
        let mut collection = Collection::new();
        let net = collection.add_network("mesh", NetworkKind::Navmesh);
        let a = collection.add_cell(net, "A", Vec3::ZERO, vec![tri(0.0)]).unwrap();
        let b = collection.add_cell(net, "B", Vec3::X, vec![tri(1.0)]).unwrap();
        let c = collection.add_cell(net, "C", Vec3::X * 2.0, vec![tri(2.0)]).unwrap();
        let d = collection.add_cell(net, "D", Vec3::X * 3.0, vec![tri(3.0)]).unwrap();
        (collection, net, [a, b, c, d])
    }

    #[test]
    fn test_merge_empty_is_error() {
        let (mut collection, _, _) = mesh();
        assert_eq!(collection.merge_cells(&[]), Err(GraphError::EmptyMerge));
    }

    #[test]
    fn test_merge_single_returns_cell() {
        let (mut collection, _, [a, ..]) = mesh();
        assert_eq!(collection.merge_cells(&[a]), Ok(a));
    }

    #[test]
    fn test_merge_rewires_connections() {
        let (mut collection, net, [a, b, c, d]) = mesh();
        collection.connect(a, b, 1.0).unwrap();
        collection.connect(b, a, 1.0).unwrap();
        collection.connect(b, c, 1.0).unwrap();
        collection.connect(c, a, 1.0).unwrap();
        collection.connect(c, b, 1.0).unwrap();
        collection.connect(d, a, 1.0).unwrap();
        collection.add_tag(TaggedEntity::Node(b), "grass").unwrap();

        let merged = collection.merge_cells(&[a, b]).unwrap();
        let node = collection.node(merged).unwrap();
        assert_eq!(node.name, "A");
        assert_eq!(node.as_cell().unwrap().triangles.len(), 2);
        assert!(collection.has_tag(TaggedEntity::Node(merged), "grass"));

        // Internal pair dropped, outgoing B→C moved, C's two edges collapse to one.
        assert!(collection.connection_between(merged, c).is_some());
        assert!(collection.connection_between(c, merged).is_some());
        assert_eq!(collection.outgoing(c).unwrap().len(), 1);
        assert!(collection.connection_between(d, merged).is_some());
        assert_eq!(collection.counts().2, 3);

        assert_eq!(collection.nodes_of(net).unwrap(), &[merged, c, d]);
        assert!(collection.node(a).is_err());
    }

    #[test]
    fn test_merge_retargets_grid_nodes() {
        let (mut collection, _, [a, b, ..]) = mesh();
        let grid = collection.add_network("grid", NetworkKind::Grid);
        let g = collection.add_grid_node(grid, "G", Some(b)).unwrap();
        let merged = collection.merge_cells(&[a, b]).unwrap();
        assert_eq!(collection.node(g).unwrap().grid_target(), Some(merged));
    }

    #[test]
    fn test_merge_mixed_networks_rejected() {
        let (mut collection, _, [a, ..]) = mesh();
        let other = collection.add_network("other", NetworkKind::Navmesh);
        let x = collection.add_cell(other, "X", Vec3::ZERO, vec![tri(9.0)]).unwrap();
        assert!(matches!(collection.merge_cells(&[a, x]), Err(GraphError::MixedMerge(..))));
    }

    #[test]
    fn test_duplicate_network_remaps_internal_connections() {
        let (mut collection, net, [a, b, ..]) = mesh();
        let external = collection.add_network("ext", NetworkKind::Navmesh);
        let e = collection.add_cell(external, "E", Vec3::ZERO, vec![tri(7.0)]).unwrap();
        collection.connect(a, b, 2.0).unwrap();
        collection.connect(b, e, 2.0).unwrap();

        let copy = collection.duplicate_network(net, "mesh copy").unwrap();
        let a2 = collection.node_by_name(copy, "A").unwrap();
        let b2 = collection.node_by_name(copy, "B").unwrap();
        assert_ne!(a, a2);
        assert!(collection.connection_between(a2, b2).is_some());
        assert!(collection.connection_between(a2, b).is_none());
        assert!(collection.connection_between(b2, e).is_some());
        assert_eq!(collection.nodes_of(copy).unwrap().len(), 4);
    }

    #[test]
    fn test_absorb_remaps_tags_by_name() {
        let mut target = Collection::new();
        target.register_tag("water");
        let _ = target.add_network("existing", NetworkKind::Waypoint);

        let mut other = Collection::new();
        let net = other.add_network("incoming", NetworkKind::Waypoint);
        let a = other.add_waypoint(net, "A", Vec3::ZERO, 1.0).unwrap();
        let b = other.add_waypoint(net, "B", Vec3::X, 1.0).unwrap();
        let conn = other.connect(a, b, 2.0).unwrap().unwrap();
        other.add_tag(TaggedEntity::Connection(conn), "road").unwrap();
        other.add_tag(TaggedEntity::Node(a), "water").unwrap();

        let mapping = target.absorb(other);
        let new_net = mapping[&net];
        let new_a = target.node_by_name(new_net, "A").unwrap();
        let new_b = target.node_by_name(new_net, "B").unwrap();
        let new_conn = target.connection_between(new_a, new_b).unwrap();

        assert!(target.has_tag(TaggedEntity::Node(new_a), "water"));
        assert!(target.has_tag(TaggedEntity::Connection(new_conn), "road"));
        assert_eq!(target.tags().find("water").map(|t| t.raw()), Some(0));
        assert_eq!(target.counts(), (2, 2, 1));
    }
}
