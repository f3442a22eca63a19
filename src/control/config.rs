//! Control configuration.
//!
//! ## Environment
//!
//! [`ControlConfig::with_env_overrides`] reads:
//! - `PATHGRAPH_CACHE_LIFESPAN`: seconds; `0` disables caching, negative
//!   or infinite caches indefinitely (default: `0`)
//! - `PATHGRAPH_AUTO_RECALCULATE`: `true`/`false` (default: `true`)
//! - `PATHGRAPH_FRAME_BUDGET_MS`: per-step search budget, fractional
//!   milliseconds allowed (default: `5`)
//! - `PATHGRAPH_CACHE_MAX_ENTRIES`: result cache capacity (default: `10000`)

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

use super::cache::CacheLifespan;

/// Configuration for the bounded result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached paths; least recently used entries are
    /// evicted beyond this.
    pub max_entries: usize,
    /// Whether results are cached at all.
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            enabled: true,
        }
    }
}

/// Configuration for a [`Control`](super::Control).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Lifespan given to new seekers' results.
    pub cache_lifespan: CacheLifespan,
    /// Invalidate dependent searches when the graph is disabled or removed
    /// under them.
    pub auto_recalculate: bool,
    /// Offset of the owning transform, applied to every network.
    pub origin: Vec3,
    /// Default per-step search budget. Serialized as fractional
    /// milliseconds under `frame_budget_ms`.
    #[serde(
        rename = "frame_budget_ms",
        serialize_with = "serialize_budget_ms",
        deserialize_with = "deserialize_budget_ms"
    )]
    pub frame_budget: Duration,
    /// Result cache settings.
    pub cache: CacheConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            cache_lifespan: CacheLifespan::NoCache,
            auto_recalculate: true,
            origin: Vec3::ZERO,
            frame_budget: Duration::from_millis(5),
            cache: CacheConfig::default(),
        }
    }
}

impl ControlConfig {
    /// Load defaults overridden from the environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Apply environment variable overrides on top of this configuration.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(secs) = env_parse::<f32>("PATHGRAPH_CACHE_LIFESPAN") {
            self.cache_lifespan = CacheLifespan::from_secs(secs);
        }
        if let Some(flag) = env_parse::<bool>("PATHGRAPH_AUTO_RECALCULATE") {
            self.auto_recalculate = flag;
        }
        if let Some(ms) = env_parse::<f64>("PATHGRAPH_FRAME_BUDGET_MS") {
            match budget_from_ms(ms) {
                Some(budget) => self.frame_budget = budget,
                None => tracing::warn!(ms, "Ignoring out of range frame budget"),
            }
        }
        if let Some(max) = env_parse::<usize>("PATHGRAPH_CACHE_MAX_ENTRIES") {
            self.cache.max_entries = max;
        }
        self
    }

    /// Default per-step budget.
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Small configuration for tests: indefinite caching, tiny cache.
    #[cfg(test)]
    pub fn minimal() -> Self {
        Self {
            cache_lifespan: CacheLifespan::Indefinite,
            cache: CacheConfig {
                max_entries: 8,
                enabled: true,
            },
            ..Self::default()
        }
    }
}

/// Negative budgets clamp to zero; NaN and overflowing values are rejected.
fn budget_from_ms(ms: f64) -> Option<Duration> {
    if ms.is_nan() {
        return None;
    }
    Duration::try_from_secs_f64(ms.max(0.0) / 1_000.0).ok()
}

fn serialize_budget_ms<S: Serializer>(budget: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(budget.as_secs_f64() * 1_000.0)
}

fn deserialize_budget_ms<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let ms = f64::deserialize(deserializer)?;
    budget_from_ms(ms).ok_or_else(|| serde::de::Error::custom(format!("frame budget out of range: {ms}ms")))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
