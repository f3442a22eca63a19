//! Stable handles for graph entities.
//!
//! Every entity of a [`Collection`](crate::graph::Collection) is addressed by
//! a small integer handle allocated monotonically by the collection. Handles
//! are never reused within a collection, so a stale handle simply fails to
//! resolve instead of aliasing a newer entity.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from its raw index.
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw index.
            pub const fn raw(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }
    };
}

handle!(
    /// Handle of a network within a collection.
    NetworkId,
    "network"
);

handle!(
    /// Handle of a node within a collection.
    NodeId,
    "node"
);

handle!(
    /// Handle of a connection within a collection.
    ConnectionId,
    "connection"
);

handle!(
    /// Index of a tag slot in a collection's tag registry.
    TagId,
    "tag"
);

handle!(
    /// Handle of a seeker registered with a [`Control`](crate::control::Control).
    SeekerId,
    "seeker"
);

/// Monotonic handle allocator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleCounter(u32);

impl HandleCounter {
    /// Allocate the next raw handle value.
    pub fn next(&mut self) -> u32 {
        let raw = self.0;
        self.0 += 1;
        raw
    }

    /// Peek at the value the next allocation will return.
    pub fn peek(&self) -> u32 {
        self.0
    }
}
