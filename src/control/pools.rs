//! Seeker pool bookkeeping.
//!
//! ```text
//! register ──► idle ──start──► active ──completed──► used
//!               ▲                 │                    │
//!               └────failed───────┘◄───invalidated─────┘
//! ```

use std::collections::BTreeSet;

use crate::types::SeekerId;

/// Which pool a seeker sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pool {
    /// Registered and not searching.
    Idle,
    /// Searching; stepped every tick.
    Active,
    /// Completed; watched for invalidation.
    Used,
}

/// Pool sizes plus the number of cached results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolCounts {
    /// Idle seekers.
    pub idle: usize,
    /// Active seekers.
    pub active: usize,
    /// Used seekers.
    pub used: usize,
    /// Cached results.
    pub cached: usize,
}

/// Membership of every registered seeker.
#[derive(Debug, Clone, Default)]
pub struct SeekerPools {
    idle: BTreeSet<SeekerId>,
    active: Vec<SeekerId>,
    used: BTreeSet<SeekerId>,
}

impl SeekerPools {
    /// Move a seeker into `pool`, leaving whichever pool it was in.
    pub fn move_to(&mut self, id: SeekerId, pool: Pool) {
        self.remove(id);
        match pool {
            Pool::Idle => {
                self.idle.insert(id);
            }
            Pool::Active => self.active.push(id),
            Pool::Used => {
                self.used.insert(id);
            }
        }
    }

    /// Remove a seeker from every pool.
    pub fn remove(&mut self, id: SeekerId) {
        self.idle.remove(&id);
        self.active.retain(|a| *a != id);
        self.used.remove(&id);
    }

    /// Pool currently holding a seeker.
    pub fn pool_of(&self, id: SeekerId) -> Option<Pool> {
        if self.idle.contains(&id) {
            Some(Pool::Idle)
        } else if self.active.contains(&id) {
            Some(Pool::Active)
        } else if self.used.contains(&id) {
            Some(Pool::Used)
        } else {
            None
        }
    }

    /// Active seekers in the order they started.
    pub fn active(&self) -> &[SeekerId] {
        &self.active
    }

    /// Used seekers in handle order.
    pub fn used(&self) -> impl Iterator<Item = SeekerId> + '_ {
        self.used.iter().copied()
    }

    /// Pool sizes; `cached` is supplied by the caller.
    pub fn counts(&self, cached: usize) -> PoolCounts {
        PoolCounts {
            idle: self.idle.len(),
            active: self.active.len(),
            used: self.used.len(),
            cached,
        }
    }

    /// Empty every pool.
    pub fn clear(&mut self) {
        self.idle.clear();
        self.active.clear();
        self.used.clear();
    }
}
