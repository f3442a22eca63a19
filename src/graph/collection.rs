//! The collection arena.
//!
//! A [`Collection`] owns the tag registry and every network, node and
//! connection of one loaded graph. Entities are stored in `BTreeMap`s keyed
//! by monotonically allocated handles, which keeps iteration deterministic
//! and makes removal safe: a removed handle is never reissued.
//!
//! Mutators that disable or remove an entity queue a [`GraphEvent`]. The
//! queue is not persisted.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::events::{EventSubject, GraphEvent};
use super::GraphError;
use crate::types::{
    CellShape, Connection, ConnectionId, GridLink, HandleCounter, Network, NetworkId, NetworkKind,
    Node, NodeId, NodeKind, TagId, TagRegistry, TagSet, Triangle, WaypointShape,
};

/// Any entity that carries tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaggedEntity {
    /// A network.
    Network(NetworkId),
    /// A node.
    Node(NodeId),
    /// A connection.
    Connection(ConnectionId),
}

/// Arena holding one graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    pub(super) tags: TagRegistry,
    pub(super) networks: BTreeMap<NetworkId, Network>,
    pub(super) nodes: BTreeMap<NodeId, Node>,
    pub(super) connections: BTreeMap<ConnectionId, Connection>,
    pub(super) network_ids: HandleCounter,
    pub(super) node_ids: HandleCounter,
    pub(super) connection_ids: HandleCounter,
    #[serde(skip)]
    pub(super) events: Vec<GraphEvent>,
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.tags == other.tags
            && self.networks == other.networks
            && self.nodes == other.nodes
            && self.connections == other.connections
            && self.network_ids == other.network_ids
            && self.node_ids == other.node_ids
            && self.connection_ids == other.connection_ids
    }
}

impl Collection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tags
    // ─────────────────────────────────────────────────────────────────────

    /// Tag registry of this collection.
    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Register a tag name, returning the existing index if already present.
    pub fn register_tag(&mut self, name: &str) -> TagId {
        self.tags.add(name)
    }

    /// Remove a tag from the registry and from every entity holding it.
    ///
    /// The slot is cleared, so indices of other tags do not move.
    pub fn unregister_tag(&mut self, name: &str) -> Option<TagId> {
        let id = self.tags.remove(name)?;
        for network in self.networks.values_mut() {
            network.tags.remove(id);
        }
        for node in self.nodes.values_mut() {
            node.tags.remove(id);
        }
        for connection in self.connections.values_mut() {
            connection.tags.remove(id);
        }
        Some(id)
    }

    /// Tag an entity by name, registering the name if needed.
    pub fn add_tag(&mut self, entity: TaggedEntity, name: &str) -> Result<TagId, GraphError> {
        // Resolve first so a missing entity does not leave a stray tag.
        self.tag_set(entity)?;
        let id = self.tags.add(name);
        self.tag_set_mut(entity)?.insert(id);
        Ok(id)
    }

    /// Remove a tag from an entity. Returns whether the entity held it.
    pub fn remove_tag(&mut self, entity: TaggedEntity, name: &str) -> Result<bool, GraphError> {
        let id = self
            .tags
            .find(name)
            .ok_or_else(|| GraphError::UnknownTag(name.to_string()))?;
        Ok(self.tag_set_mut(entity)?.remove(id))
    }

    /// Check whether an entity holds a tag. Unknown names are never held.
    pub fn has_tag(&self, entity: TaggedEntity, name: &str) -> bool {
        match (self.tags.find(name), self.tag_set(entity)) {
            (Some(id), Ok(set)) => set.contains(id),
            _ => false,
        }
    }

    /// Tag set of an entity.
    pub fn tag_set(&self, entity: TaggedEntity) -> Result<&TagSet, GraphError> {
        match entity {
            TaggedEntity::Network(id) => self.network(id).map(|n| &n.tags),
            TaggedEntity::Node(id) => self.node(id).map(|n| &n.tags),
            TaggedEntity::Connection(id) => self.connection(id).map(|c| &c.tags),
        }
    }

    fn tag_set_mut(&mut self, entity: TaggedEntity) -> Result<&mut TagSet, GraphError> {
        match entity {
            TaggedEntity::Network(id) => self.network_mut(id).map(|n| &mut n.tags),
            TaggedEntity::Node(id) => self.node_mut(id).map(|n| &mut n.tags),
            TaggedEntity::Connection(id) => self
                .connections
                .get_mut(&id)
                .map(|c| &mut c.tags)
                .ok_or(GraphError::ConnectionNotFound(id)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Networks
    // ─────────────────────────────────────────────────────────────────────

    /// Create an empty network.
    pub fn add_network(&mut self, name: &str, kind: NetworkKind) -> NetworkId {
        let id = NetworkId::new(self.network_ids.next());
        self.networks.insert(id, Network::new(name, kind));
        id
    }

    /// Remove a network together with all of its nodes.
    pub fn remove_network(&mut self, id: NetworkId) -> Result<(), GraphError> {
        let members = self.network(id)?.nodes.clone();
        for node in members {
            self.remove_node(node);
        }
        self.networks.remove(&id);
        self.events
            .push(GraphEvent::removed(EventSubject::Network(id)));
        Ok(())
    }

    /// Resolve a network handle.
    pub fn network(&self, id: NetworkId) -> Result<&Network, GraphError> {
        self.networks.get(&id).ok_or(GraphError::NetworkNotFound(id))
    }

    pub(super) fn network_mut(&mut self, id: NetworkId) -> Result<&mut Network, GraphError> {
        self.networks
            .get_mut(&id)
            .ok_or(GraphError::NetworkNotFound(id))
    }

    /// Iterate over all networks in handle order.
    pub fn networks(&self) -> impl Iterator<Item = (NetworkId, &Network)> {
        self.networks.iter().map(|(id, network)| (*id, network))
    }

    /// First network with the given name.
    pub fn network_by_name(&self, name: &str) -> Option<NetworkId> {
        self.networks_named(name).into_iter().next()
    }

    /// All networks with the given name.
    pub fn networks_named(&self, name: &str) -> Vec<NetworkId> {
        self.networks
            .iter()
            .filter(|(_, network)| network.name == name)
            .map(|(id, _)| *id)
            .collect()
    }

    /// All grid networks.
    pub fn grid_networks(&self) -> Vec<NetworkId> {
        self.networks
            .iter()
            .filter(|(_, network)| network.kind == NetworkKind::Grid)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Enable or disable a network. Disabling queues an invalidation event.
    pub fn set_network_enabled(&mut self, id: NetworkId, enabled: bool) -> Result<(), GraphError> {
        let network = self.network_mut(id)?;
        let was_enabled = network.enabled;
        network.enabled = enabled;
        if was_enabled && !enabled {
            self.events
                .push(GraphEvent::disabled(EventSubject::Network(id)));
        }
        Ok(())
    }

    /// Move a network relative to the owning transform.
    pub fn set_network_position(&mut self, id: NetworkId, position: Vec3) -> Result<(), GraphError> {
        self.network_mut(id)?.position = position;
        Ok(())
    }

    /// Resize a network's bounding box.
    pub fn set_network_size(&mut self, id: NetworkId, size: Vec3) -> Result<(), GraphError> {
        self.network_mut(id)?.size = size;
        Ok(())
    }

    /// Rename a network.
    pub fn rename_network(&mut self, id: NetworkId, name: &str) -> Result<(), GraphError> {
        self.network_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub(super) fn expect_network_kind(&self, id: NetworkId, expected: NetworkKind) -> Result<(), GraphError> {
        let network = self.network(id)?;
        if network.kind != expected {
            return Err(GraphError::WrongNetworkKind {
                network: id,
                expected: expected.label(),
                actual: network.kind.label(),
            });
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Nodes
    // ─────────────────────────────────────────────────────────────────────

    /// Add a waypoint to a waypoint network.
    pub fn add_waypoint(
        &mut self,
        network: NetworkId,
        name: &str,
        position: Vec3,
        radius: f32,
    ) -> Result<NodeId, GraphError> {
        self.expect_network_kind(network, NetworkKind::Waypoint)?;
        let shape = WaypointShape {
            radius,
            disable_runtime: false,
        };
        self.insert_node(Node::new(name, network, position, NodeKind::Waypoint(shape)))
    }

    /// Add a cell to a navmesh.
    pub fn add_cell(
        &mut self,
        network: NetworkId,
        name: &str,
        position: Vec3,
        triangles: Vec<Triangle>,
    ) -> Result<NodeId, GraphError> {
        self.expect_network_kind(network, NetworkKind::Navmesh)?;
        let shape = CellShape { triangles };
        self.insert_node(Node::new(name, network, position, NodeKind::Cell(shape)))
    }

    /// Add a grid node to a grid network.
    pub fn add_grid_node(
        &mut self,
        network: NetworkId,
        name: &str,
        target: Option<NodeId>,
    ) -> Result<NodeId, GraphError> {
        self.expect_network_kind(network, NetworkKind::Grid)?;
        if let Some(target) = target {
            if self.node(target)?.is_grid() {
                return Err(GraphError::GridTargetIsGrid {
                    grid: NodeId::new(self.node_ids.peek()),
                    target,
                });
            }
        }
        self.insert_node(Node::new(
            name,
            network,
            Vec3::ZERO,
            NodeKind::Grid(GridLink { target }),
        ))
    }

    /// Append a node to its network, rejecting duplicate names.
    pub(super) fn insert_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let network = node.network;
        if self.node_by_name(network, &node.name).is_some() {
            tracing::warn!(%network, name = %node.name, "Rejected duplicate node name");
            return Err(GraphError::DuplicateName {
                network,
                name: node.name,
            });
        }
        let id = NodeId::new(self.node_ids.next());
        self.network_mut(network)?.nodes.push(id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node, severing every connection that touches it and
    /// orphaning grid nodes that target it.
    ///
    /// Returns `false` if the node does not exist.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };
        if let Some(network) = self.networks.get_mut(&node.network) {
            network.nodes.retain(|member| *member != id);
        }

        for connection in &node.connections {
            self.drop_connection_record(*connection);
        }
        let incoming: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.to == id)
            .map(|(cid, _)| *cid)
            .collect();
        for connection in incoming {
            self.remove_connection(connection);
        }

        for other in self.nodes.values_mut() {
            if let NodeKind::Grid(link) = &mut other.kind {
                if link.target == Some(id) {
                    link.target = None;
                }
            }
        }

        self.events.push(GraphEvent::removed(EventSubject::Node(id)));
        true
    }

    /// Resolve a node handle.
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Iterate over all nodes in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Member nodes of a network in insertion order.
    pub fn nodes_of(&self, network: NetworkId) -> Result<&[NodeId], GraphError> {
        Ok(&self.network(network)?.nodes)
    }

    /// Member nodes of a network ordered by name.
    pub fn sorted_nodes(&self, network: NetworkId) -> Result<Vec<NodeId>, GraphError> {
        let mut members = self.nodes_of(network)?.to_vec();
        members.sort_by(|a, b| match (self.nodes.get(a), self.nodes.get(b)) {
            (Some(x), Some(y)) => x.listing_order(y).then_with(|| a.cmp(b)),
            _ => a.cmp(b),
        });
        Ok(members)
    }

    /// Find a node by name within a network.
    pub fn node_by_name(&self, network: NetworkId, name: &str) -> Option<NodeId> {
        let members = self.networks.get(&network)?;
        members
            .nodes
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(|node| node.name == name))
    }

    /// Nodes of a network holding the given tag.
    pub fn nodes_with_tag(&self, network: NetworkId, tag: &str) -> Result<Vec<NodeId>, GraphError> {
        let members = self.nodes_of(network)?;
        let Some(tag) = self.tags.find(tag) else {
            return Ok(Vec::new());
        };
        Ok(members
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|node| node.tags.contains(tag)))
            .collect())
    }

    /// Enable or disable a node. Disabling queues an invalidation event.
    pub fn set_node_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        let was_enabled = node.enabled;
        node.enabled = enabled;
        if was_enabled && !enabled {
            self.events.push(GraphEvent::disabled(EventSubject::Node(id)));
        }
        Ok(())
    }

    /// Move a node. Grid nodes move their target instead.
    pub fn set_node_position(&mut self, id: NodeId, position: Vec3) -> Result<(), GraphError> {
        let node = self.node(id)?;
        let resolved = match (node.is_grid(), node.grid_target()) {
            (true, Some(target)) => target,
            (true, None) => return Ok(()),
            (false, _) => id,
        };
        self.node_mut(resolved)?.position = position;
        Ok(())
    }

    /// Rename a node, keeping names unique within its network.
    pub fn rename_node(&mut self, id: NodeId, name: &str) -> Result<(), GraphError> {
        let network = self.node(id)?.network;
        if let Some(existing) = self.node_by_name(network, name) {
            if existing != id {
                return Err(GraphError::DuplicateName {
                    network,
                    name: name.to_string(),
                });
            }
        }
        self.node_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Change a waypoint's radius.
    pub fn set_waypoint_radius(&mut self, id: NodeId, radius: f32) -> Result<(), GraphError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Waypoint(shape) => {
                shape.radius = radius;
                Ok(())
            }
            other => Err(GraphError::WrongNodeKind {
                node: id,
                expected: "waypoint",
                actual: other.label(),
            }),
        }
    }

    /// Point a grid node at another node, or clear its target.
    ///
    /// Targets must not themselves be grid nodes.
    pub fn set_grid_target(&mut self, grid: NodeId, target: Option<NodeId>) -> Result<(), GraphError> {
        let kind = &self.node(grid)?.kind;
        if !matches!(kind, NodeKind::Grid(_)) {
            return Err(GraphError::WrongNodeKind {
                node: grid,
                expected: "grid node",
                actual: kind.label(),
            });
        }
        if let Some(target) = target {
            if self.node(target)?.is_grid() {
                tracing::warn!(%grid, %target, "Rejected grid node target");
                return Err(GraphError::GridTargetIsGrid { grid, target });
            }
        }
        if let NodeKind::Grid(link) = &mut self.node_mut(grid)?.kind {
            link.target = target;
        }
        Ok(())
    }

    /// Grid nodes, in any grid network, whose target is `node`.
    pub fn grid_nodes_targeting(&self, node: NodeId) -> Vec<NodeId> {
        self.networks
            .values()
            .filter(|network| network.kind == NetworkKind::Grid)
            .flat_map(|network| network.nodes.iter().copied())
            .filter(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|grid| grid.grid_target() == Some(node))
            })
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connections
    // ─────────────────────────────────────────────────────────────────────

    /// Connect two nodes.
    ///
    /// Returns `Ok(None)` without changes if `from → to` already exists.
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        width: f32,
    ) -> Result<Option<ConnectionId>, GraphError> {
        let width = checked_width(width)?;
        self.node(to)?;
        if self.connection_between(from, to).is_some() {
            return Ok(None);
        }
        let id = ConnectionId::new(self.connection_ids.next());
        self.node_mut(from)?.connections.push(id);
        self.connections.insert(id, Connection::new(from, to, width));
        Ok(Some(id))
    }

    /// Existing connection `from → to`, if any.
    pub fn connection_between(&self, from: NodeId, to: NodeId) -> Option<ConnectionId> {
        self.nodes.get(&from)?.connections.iter().copied().find(|id| {
            self.connections
                .get(id)
                .is_some_and(|connection| connection.joins(from, to))
        })
    }

    /// Remove every outgoing connection of a node.
    ///
    /// Returns the number of connections removed.
    pub fn disconnect(&mut self, node: NodeId) -> Result<usize, GraphError> {
        let outgoing = std::mem::take(&mut self.node_mut(node)?.connections);
        for connection in &outgoing {
            self.drop_connection_record(*connection);
        }
        Ok(outgoing.len())
    }

    /// Disconnect every node of a network.
    pub fn disconnect_network(&mut self, network: NetworkId) -> Result<usize, GraphError> {
        let members = self.nodes_of(network)?.to_vec();
        let mut removed = 0;
        for node in members {
            removed += self.disconnect(node)?;
        }
        Ok(removed)
    }

    /// Remove one connection from its origin's list.
    ///
    /// Returns `false` if the connection does not exist.
    pub fn remove_connection(&mut self, id: ConnectionId) -> bool {
        let Some(from) = self.connections.get(&id).map(|c| c.from) else {
            return false;
        };
        if let Some(node) = self.nodes.get_mut(&from) {
            node.connections.retain(|c| *c != id);
        }
        self.drop_connection_record(id);
        true
    }

    /// Drop a connection from the arena without touching its origin's list.
    pub(super) fn drop_connection_record(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            self.events
                .push(GraphEvent::removed(EventSubject::Connection(id)));
        }
    }

    /// Resolve a connection handle.
    pub fn connection(&self, id: ConnectionId) -> Result<&Connection, GraphError> {
        self.connections
            .get(&id)
            .ok_or(GraphError::ConnectionNotFound(id))
    }

    /// Iterate over all connections in handle order.
    pub fn connections(&self) -> impl Iterator<Item = (ConnectionId, &Connection)> {
        self.connections.iter().map(|(id, c)| (*id, c))
    }

    /// Outgoing connections of a node in creation order.
    pub fn outgoing(&self, node: NodeId) -> Result<&[ConnectionId], GraphError> {
        Ok(&self.node(node)?.connections)
    }

    /// Enable or disable a connection. Disabling queues an invalidation event.
    pub fn set_connection_enabled(&mut self, id: ConnectionId, enabled: bool) -> Result<(), GraphError> {
        let connection = self
            .connections
            .get_mut(&id)
            .ok_or(GraphError::ConnectionNotFound(id))?;
        let was_enabled = connection.enabled;
        connection.enabled = enabled;
        if was_enabled && !enabled {
            self.events
                .push(GraphEvent::disabled(EventSubject::Connection(id)));
        }
        Ok(())
    }

    /// Change the clearance width of a connection.
    pub fn set_connection_width(&mut self, id: ConnectionId, width: f32) -> Result<(), GraphError> {
        let width = checked_width(width)?;
        self.connections
            .get_mut(&id)
            .ok_or(GraphError::ConnectionNotFound(id))?
            .width = width;
        Ok(())
    }

    /// Change the cost multiplier of a connection. Costs never go negative,
    /// so negative and non-finite factors are rejected.
    pub fn set_connection_weight(&mut self, id: ConnectionId, weight_factor: f32) -> Result<(), GraphError> {
        let weight_factor = checked_weight(weight_factor)?;
        self.connections
            .get_mut(&id)
            .ok_or(GraphError::ConnectionNotFound(id))?
            .weight_factor = weight_factor;
        Ok(())
    }

    /// Check every connection's width and weight factor.
    pub fn validate_connections(&self) -> Result<(), GraphError> {
        for connection in self.connections.values() {
            checked_width(connection.width)?;
            checked_weight(connection.weight_factor)?;
        }
        Ok(())
    }

    /// Traversal cost of a connection.
    pub fn connection_cost(&self, id: ConnectionId) -> Result<f32, GraphError> {
        let connection = self.connection(id)?;
        let from = self.node_position(connection.from)?;
        let to = self.node_position(connection.to)?;
        Ok(connection.cost_between(from, to))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Spatial capabilities
    // ─────────────────────────────────────────────────────────────────────

    /// Network-local position of a node. Grid nodes resolve to their target;
    /// an orphaned grid node sits at the origin.
    pub fn node_position(&self, id: NodeId) -> Result<Vec3, GraphError> {
        let node = self.node(id)?;
        match node.grid_target() {
            Some(target) => Ok(self.node(target)?.position),
            None if node.is_grid() => Ok(Vec3::ZERO),
            None => Ok(node.position),
        }
    }

    /// Resolve a grid node to its target; other nodes resolve to themselves.
    pub fn resolve(&self, id: NodeId) -> Result<NodeId, GraphError> {
        Ok(self.node(id)?.grid_target().unwrap_or(id))
    }

    /// World position: node position plus network position plus `origin`.
    pub fn world_position(&self, id: NodeId, origin: Vec3) -> Result<Vec3, GraphError> {
        let resolved = self.node(self.resolve(id)?)?;
        let network = self.network(resolved.network)?;
        Ok(resolved.position + network.offset(origin))
    }

    /// Check whether a world-space point lies inside a node's shape.
    pub fn contains_point(&self, id: NodeId, point: Vec3, origin: Vec3) -> Result<bool, GraphError> {
        let resolved = self.node(self.resolve(id)?)?;
        let offset = self.network(resolved.network)?.offset(origin);
        Ok(match &resolved.kind {
            NodeKind::Waypoint(shape) => shape.contains_point(resolved.position + offset, point),
            NodeKind::Cell(shape) => shape.contains_point(point, offset),
            NodeKind::Grid(_) => false,
        })
    }

    /// Nearest point inside a node's shape for an agent of radius `clearance`.
    pub fn nearest_point(
        &self,
        id: NodeId,
        point: Vec3,
        clearance: f32,
        origin: Vec3,
    ) -> Result<Vec3, GraphError> {
        let resolved = self.node(self.resolve(id)?)?;
        let offset = self.network(resolved.network)?.offset(origin);
        Ok(match &resolved.kind {
            NodeKind::Waypoint(shape) => {
                shape.nearest_point(resolved.position + offset, point, clearance)
            }
            NodeKind::Cell(shape) => shape.nearest_point(point, clearance, offset),
            NodeKind::Grid(_) => point,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    /// Take every queued graph event, oldest first.
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of queued graph events.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Summary counts: networks, nodes, connections.
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.networks.len(), self.nodes.len(), self.connections.len())
    }
}

fn checked_width(width: f32) -> Result<f32, GraphError> {
    if width.is_finite() && width >= 0.0 {
        Ok(width)
    } else {
        Err(GraphError::InvalidWidth(width))
    }
}

fn checked_weight(weight_factor: f32) -> Result<f32, GraphError> {
    if weight_factor.is_finite() && weight_factor >= 0.0 {
        Ok(weight_factor)
    } else {
        Err(GraphError::InvalidWeight(weight_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EventKind;

    fn line() -> (Collection, NetworkId, [NodeId; 3]) {
        let mut collection = Collection::new();
        let net = collection.add_network("line", NetworkKind::Waypoint);
        let a = collection.add_waypoint(net, "A", Vec3::new(0.0, 0.0, 0.0), 1.0).unwrap();
        let b = collection.add_waypoint(net, "B", Vec3::new(5.0, 0.0, 0.0), 1.0).unwrap();
        let c = collection.add_waypoint(net, "C", Vec3::new(10.0, 0.0, 0.0), 1.0).unwrap();
        (collection, net, [a, b, c])
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let (mut collection, net, _) = line();
        let err = collection.add_waypoint(net, "A", Vec3::ZERO, 1.0).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateName { .. }));
    }

    #[test]
    fn test_wrong_network_kind() {
        let (mut collection, net, _) = line();
        let err = collection.add_cell(net, "cell", Vec3::ZERO, Vec::new()).unwrap_err();
        assert!(matches!(err, GraphError::WrongNetworkKind { .. }));
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (mut collection, _, [a, b, _]) = line();
        let first = collection.connect(a, b, 3.0).unwrap();
        let second = collection.connect(a, b, 3.0).unwrap();
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(collection.outgoing(a).unwrap().len(), 1);
    }

    #[test]
    fn test_connection_cost_uses_positions() {
        let (mut collection, _, [a, _, c]) = line();
        let id = collection.connect(a, c, 3.0).unwrap().unwrap();
        assert_eq!(collection.connection_cost(id).unwrap(), 10.0);
        collection.set_connection_weight(id, 0.5).unwrap();
        assert_eq!(collection.connection_cost(id).unwrap(), 5.0);
    }

    #[test]
    fn test_invalid_weight_and_width_rejected() {
        let (mut collection, _, [a, b, _]) = line();
        let id = collection.connect(a, b, 3.0).unwrap().unwrap();

        for weight in [-1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                collection.set_connection_weight(id, weight),
                Err(GraphError::InvalidWeight(_))
            ));
        }
        assert!(matches!(
            collection.set_connection_width(id, -0.5),
            Err(GraphError::InvalidWidth(_))
        ));
        assert!(matches!(collection.connect(b, a, f32::NAN), Err(GraphError::InvalidWidth(_))));

        assert_eq!(collection.connection_cost(id).unwrap(), 5.0);
        assert_eq!(collection.connection(id).unwrap().width, 3.0);
        collection.set_connection_weight(id, 0.0).unwrap();
        assert_eq!(collection.connection_cost(id).unwrap(), 0.0);
        assert!(collection.validate_connections().is_ok());
    }

    #[test]
    fn test_disconnect_removes_only_outgoing() {
        let (mut collection, _, [a, b, c]) = line();
        collection.connect(a, b, 3.0).unwrap();
        collection.connect(a, c, 3.0).unwrap();
        let incoming = collection.connect(b, a, 3.0).unwrap().unwrap();

        assert_eq!(collection.disconnect(a).unwrap(), 2);
        assert!(collection.outgoing(a).unwrap().is_empty());
        assert!(collection.connection(incoming).is_ok());
        assert_eq!(collection.counts().2, 1);
    }

    #[test]
    fn test_remove_node_severs_and_preserves_order() {
        let (mut collection, net, [a, b, c]) = line();
        collection.connect(a, b, 3.0).unwrap();
        collection.connect(b, c, 3.0).unwrap();
        collection.connect(c, b, 3.0).unwrap();

        assert!(collection.remove_node(b));
        assert!(!collection.remove_node(b));
        assert_eq!(collection.nodes_of(net).unwrap(), &[a, c]);
        assert_eq!(collection.counts().2, 0);
        assert!(collection.outgoing(a).unwrap().is_empty());
        assert!(collection.outgoing(c).unwrap().is_empty());
    }

    #[test]
    fn test_remove_node_orphans_grid_nodes() {
        let (mut collection, _, [a, _, _]) = line();
        let grid = collection.add_network("grid", NetworkKind::Grid);
        let g = collection.add_grid_node(grid, "G", Some(a)).unwrap();
        assert_eq!(collection.grid_nodes_targeting(a), vec![g]);

        collection.remove_node(a);
        assert_eq!(collection.node(g).unwrap().grid_target(), None);
    }

    #[test]
    fn test_grid_target_cannot_be_grid() {
        let mut collection = Collection::new();
        let grid = collection.add_network("grid", NetworkKind::Grid);
        let g1 = collection.add_grid_node(grid, "G1", None).unwrap();
        let g2 = collection.add_grid_node(grid, "G2", None).unwrap();
        let err = collection.set_grid_target(g1, Some(g2)).unwrap_err();
        assert_eq!(err, GraphError::GridTargetIsGrid { grid: g1, target: g2 });
    }

    #[test]
    fn test_grid_position_moves_target() {
        let (mut collection, _, [a, _, _]) = line();
        let grid = collection.add_network("grid", NetworkKind::Grid);
        let g = collection.add_grid_node(grid, "G", Some(a)).unwrap();

        collection.set_node_position(g, Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(collection.node_position(a).unwrap(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(collection.node_position(g).unwrap(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_tag_removal_strips_entities() {
        let (mut collection, net, [a, b, _]) = line();
        let conn = collection.connect(a, b, 3.0).unwrap().unwrap();
        collection.add_tag(TaggedEntity::Node(a), "road").unwrap();
        let water = collection.add_tag(TaggedEntity::Connection(conn), "water").unwrap();
        collection.add_tag(TaggedEntity::Network(net), "water").unwrap();

        assert_eq!(collection.unregister_tag("road"), Some(TagId::new(0)));
        assert!(!collection.has_tag(TaggedEntity::Node(a), "road"));
        assert!(collection.has_tag(TaggedEntity::Connection(conn), "water"));
        assert_eq!(collection.tags().find("water"), Some(water));
    }

    #[test]
    fn test_disable_queues_event_once() {
        let (mut collection, _, [a, _, _]) = line();
        collection.set_node_enabled(a, false).unwrap();
        collection.set_node_enabled(a, false).unwrap();
        let events = collection.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject, EventSubject::Node(a));
        assert_eq!(events[0].kind, EventKind::Disabled);
        assert_eq!(collection.pending_events(), 0);
    }

    #[test]
    fn test_world_position_adds_offsets() {
        let (mut collection, net, [_, b, _]) = line();
        collection.set_network_position(net, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        let world = collection.world_position(b, Vec3::new(0.0, 0.0, 2.0)).unwrap();
        assert_eq!(world, Vec3::new(5.0, 1.0, 2.0));
    }

    #[test]
    fn test_sorted_nodes_by_name() {
        let mut collection = Collection::new();
        let net = collection.add_network("n", NetworkKind::Waypoint);
        let z = collection.add_waypoint(net, "Zulu", Vec3::ZERO, 1.0).unwrap();
        let a = collection.add_waypoint(net, "Alpha", Vec3::ZERO, 1.0).unwrap();
        assert_eq!(collection.sorted_nodes(net).unwrap(), vec![a, z]);
    }
}
