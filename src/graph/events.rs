//! Graph mutation events.
//!
//! The collection queues an event whenever an entity is disabled or removed.
//! [`Control`](crate::control::Control) drains the queue and invalidates any
//! cached or completed search that depended on the entity.

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, NetworkId, NodeId};

/// Entity affected by a graph event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSubject {
    /// A network.
    Network(NetworkId),
    /// A node.
    Node(NodeId),
    /// A connection.
    Connection(ConnectionId),
}

/// Why the subject stopped being usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// Enabled flag switched off.
    Disabled,
    /// Entity deleted from the collection.
    Removed,
}

/// A queued graph mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Affected entity.
    pub subject: EventSubject,
    /// What happened to it.
    pub kind: EventKind,
}

impl GraphEvent {
    /// Event for a disabled entity.
    pub fn disabled(subject: EventSubject) -> Self {
        Self {
            subject,
            kind: EventKind::Disabled,
        }
    }

    /// Event for a removed entity.
    pub fn removed(subject: EventSubject) -> Self {
        Self {
            subject,
            kind: EventKind::Removed,
        }
    }
}
