//! Result cache for completed searches.
//!
//! ## Expiry
//!
//! Each entry carries a [`CacheLifespan`]. `Seconds(s)` entries expire `s`
//! seconds after they were stored or last matched; `Indefinite` entries only
//! leave through invalidation or LRU eviction. `NoCache` results are never
//! stored.
//!
//! ## Invalidation
//!
//! Every entry records a [`Footprint`] of the graph entities its solution
//! depends on, so purging on a graph event needs no graph lookups.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::time::Duration;

use super::config::CacheConfig;
use crate::graph::{Collection, EventSubject};
use crate::types::{ConnectionId, NetworkId, NodeId};

/// How long a completed search result stays cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheLifespan {
    /// Never cached.
    #[default]
    NoCache,
    /// Cached until invalidated or evicted.
    Indefinite,
    /// Cached for this many seconds after storage or last match.
    Seconds(f32),
}

impl CacheLifespan {
    /// Map a seconds value: zero or NaN means no caching, negative or
    /// infinite means forever.
    pub fn from_secs(secs: f32) -> Self {
        if secs == 0.0 || secs.is_nan() {
            CacheLifespan::NoCache
        } else if secs < 0.0 || secs.is_infinite() {
            CacheLifespan::Indefinite
        } else {
            CacheLifespan::Seconds(secs)
        }
    }

    /// Check whether results with this lifespan are stored.
    pub fn is_cached(&self) -> bool {
        !matches!(self, CacheLifespan::NoCache)
    }

    /// Spans too long for `Duration` never expire by time.
    fn expiry(&self, now: Duration) -> Option<Duration> {
        match self {
            CacheLifespan::Seconds(secs) => Duration::try_from_secs_f32(secs.max(0.0))
                .ok()
                .and_then(|span| now.checked_add(span)),
            _ => None,
        }
    }
}

/// Graph entities a solution depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    end: Option<NodeId>,
    origins: BTreeSet<NodeId>,
    networks: BTreeSet<NetworkId>,
    connections: BTreeSet<ConnectionId>,
}

impl Footprint {
    /// Record the end node and each connection's origin node and network.
    pub fn new(collection: &Collection, end: NodeId, solution: &[ConnectionId]) -> Self {
        let mut footprint = Footprint {
            end: Some(end),
            ..Footprint::default()
        };
        if let Ok(node) = collection.node(end) {
            footprint.networks.insert(node.network);
        }
        for id in solution {
            footprint.connections.insert(*id);
            if let Ok(connection) = collection.connection(*id) {
                footprint.origins.insert(connection.from);
                if let Ok(origin) = collection.node(connection.from) {
                    footprint.networks.insert(origin.network);
                }
            }
        }
        footprint
    }

    /// Check whether the solution depends on an entity.
    pub fn uses(&self, subject: EventSubject) -> bool {
        match subject {
            EventSubject::Network(id) => self.networks.contains(&id),
            EventSubject::Node(id) => self.end == Some(id) || self.origins.contains(&id),
            EventSubject::Connection(id) => self.connections.contains(&id),
        }
    }
}

/// A stored search result.
#[derive(Debug, Clone)]
pub struct CachedPath {
    /// Start node of the search.
    pub start: NodeId,
    /// End node of the search.
    pub end: NodeId,
    /// Connection sequence.
    pub solution: Vec<ConnectionId>,
    /// Entities the solution depends on.
    pub footprint: Footprint,
    lifespan: CacheLifespan,
    expires_at: Option<Duration>,
}

impl CachedPath {
    /// Check whether the entry is still alive at `now`.
    pub fn is_valid(&self, now: Duration) -> bool {
        self.expires_at.map_or(true, |end| now < end)
    }

    /// Lifespan the entry was last (re)started with.
    pub fn lifespan(&self) -> CacheLifespan {
        self.lifespan
    }

    fn restart(&mut self, lifespan: CacheLifespan, now: Duration) {
        self.lifespan = lifespan;
        self.expires_at = lifespan.expiry(now);
    }
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    /// Current number of entries in the cache.
    pub len: usize,
    /// Maximum capacity of the cache.
    pub cap: usize,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
}

/// Bounded store of completed search results.
#[derive(Debug)]
pub struct PathCache {
    entries: Option<LruCache<u64, CachedPath>>,
    next_key: u64,
    hits: u64,
    misses: u64,
}

impl PathCache {
    /// Create a cache; a disabled configuration stores nothing.
    pub fn new(config: CacheConfig) -> Self {
        let entries = config.enabled.then(|| {
            let size = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
            LruCache::new(size)
        });
        Self {
            entries,
            next_key: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Store a result. Returns `false` if the lifespan or configuration
    /// forbids caching.
    pub fn store(
        &mut self,
        start: NodeId,
        end: NodeId,
        solution: Vec<ConnectionId>,
        footprint: Footprint,
        lifespan: CacheLifespan,
        now: Duration,
    ) -> bool {
        let Some(entries) = self.entries.as_mut() else {
            return false;
        };
        if !lifespan.is_cached() {
            return false;
        }
        let key = self.next_key;
        self.next_key += 1;
        if let Some((_, evicted)) = entries.push(
            key,
            CachedPath {
                start,
                end,
                solution,
                footprint,
                lifespan,
                expires_at: lifespan.expiry(now),
            },
        ) {
            tracing::trace!(start = %evicted.start, end = %evicted.end, "Evicted cached path");
        }
        true
    }

    /// Find a live entry for `(start, end)` whose solution `accept` approves.
    ///
    /// On a match the entry is promoted and, unless `restart_with` is
    /// `NoCache`, its timer restarts with that lifespan.
    pub fn find<F>(
        &mut self,
        start: NodeId,
        end: NodeId,
        now: Duration,
        restart_with: CacheLifespan,
        accept: F,
    ) -> Option<Vec<ConnectionId>>
    where
        F: Fn(&[ConnectionId]) -> bool,
    {
        let entries = self.entries.as_mut()?;
        let key = entries
            .iter()
            .find(|(_, entry)| {
                entry.start == start
                    && entry.end == end
                    && entry.is_valid(now)
                    && accept(&entry.solution)
            })
            .map(|(key, _)| *key);

        let Some(entry) = key.and_then(|key| entries.get_mut(&key)) else {
            self.misses += 1;
            return None;
        };
        if restart_with.is_cached() {
            entry.restart(restart_with, now);
        }
        self.hits += 1;
        Some(entry.solution.clone())
    }

    /// Drop every entry depending on `subject`. Returns the number dropped.
    pub fn purge(&mut self, subject: EventSubject) -> usize {
        self.remove_where(|entry| entry.footprint.uses(subject))
    }

    /// Drop expired entries. Returns the number dropped.
    pub fn sweep(&mut self, now: Duration) -> usize {
        self.remove_where(|entry| !entry.is_valid(now))
    }

    fn remove_where<F: Fn(&CachedPath) -> bool>(&mut self, predicate: F) -> usize {
        let Some(entries) = self.entries.as_mut() else {
            return 0;
        };
        let doomed: Vec<u64> = entries
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(key, _)| *key)
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    /// Check whether the cache holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over entries, most recently used first.
    pub fn entries(&self) -> impl Iterator<Item = &CachedPath> {
        self.entries.iter().flat_map(|entries| entries.iter().map(|(_, e)| e))
    }

    /// Size, capacity and hit counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            len: self.len(),
            cap: self.entries.as_ref().map_or(0, |e| e.cap().get()),
            hits: self.hits,
            misses: self.misses,
        }
    }
}
