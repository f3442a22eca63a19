//! Tag filters applied by seekers to networks, nodes and connections.

use serde::{Deserialize, Serialize};

use crate::types::{TagId, TagRegistry, TagSet};

/// Tag requirements of a seeker, by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeekFilter {
    /// Every one of these tags must be present.
    pub required_tags: Vec<String>,
    /// None of these tags may be present.
    pub excluded_tags: Vec<String>,
    /// Also apply the filter to networks during nearest-node lookup.
    pub validate_networks: bool,
}

impl SeekFilter {
    /// Filter that accepts everything.
    pub fn any() -> Self {
        Self::default()
    }

    /// Add a required tag.
    pub fn require(mut self, tag: impl Into<String>) -> Self {
        self.required_tags.push(tag.into());
        self
    }

    /// Add an excluded tag.
    pub fn exclude(mut self, tag: impl Into<String>) -> Self {
        self.excluded_tags.push(tag.into());
        self
    }

    /// Enable network validation.
    pub fn validating_networks(mut self) -> Self {
        self.validate_networks = true;
        self
    }

    /// Resolve names against a registry.
    ///
    /// A required tag that is not registered can never be satisfied;
    /// unknown excluded tags are ignored.
    pub fn resolve(&self, registry: &TagRegistry) -> ResolvedFilter {
        let mut unsatisfiable = false;
        let required = self
            .required_tags
            .iter()
            .filter_map(|name| {
                let found = registry.find(name);
                unsatisfiable |= found.is_none();
                found
            })
            .collect();
        let excluded = self
            .excluded_tags
            .iter()
            .filter_map(|name| registry.find(name))
            .collect();
        ResolvedFilter {
            required,
            excluded,
            unsatisfiable,
            validate_networks: self.validate_networks,
        }
    }
}

/// A [`SeekFilter`] with names resolved to tag indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilter {
    required: Vec<TagId>,
    excluded: Vec<TagId>,
    unsatisfiable: bool,
    validate_networks: bool,
}

impl ResolvedFilter {
    /// Check a tag set: all required present, no excluded present.
    pub fn passes(&self, tags: &TagSet) -> bool {
        !self.unsatisfiable
            && self.required.iter().all(|t| tags.contains(*t))
            && !self.excluded.iter().any(|t| tags.contains(*t))
    }

    /// Check a network's tags, honouring `validate_networks`.
    pub fn passes_network(&self, tags: &TagSet) -> bool {
        !self.validate_networks || self.passes(tags)
    }
}
