//! Name registries and the zone manager.

use hashbrown::HashMap;

use crate::timezone::TimeZone;
use crate::types::ZoneInfo;

/// Name-to-record lookup over compiler-emitted registries.
///
/// The compiler emits two arrays of records sorted by name: the true
/// zones, and the zones together with their links. Lookup is a binary
/// search; link resolution never recurses because links always point
/// at true zones.
#[derive(Debug, Clone, Copy)]
pub struct ZoneRegistry {
    zones: &'static [&'static ZoneInfo],
    zones_and_links: &'static [&'static ZoneInfo],
}

impl ZoneRegistry {
    /// Wrap a pair of sorted registries.
    pub const fn new(
        zones: &'static [&'static ZoneInfo],
        zones_and_links: &'static [&'static ZoneInfo],
    ) -> Self {
        Self {
            zones,
            zones_and_links,
        }
    }

    /// Look a record up by name, links included.
    pub fn get(&self, name: &str) -> Option<&'static ZoneInfo> {
        self.zones_and_links
            .binary_search_by(|info| info.name.cmp(name))
            .ok()
            .map(|index| self.zones_and_links[index])
    }

    /// Look a true zone up by name.
    pub fn get_zone(&self, name: &str) -> Option<&'static ZoneInfo> {
        self.zones
            .binary_search_by(|info| info.name.cmp(name))
            .ok()
            .map(|index| self.zones[index])
    }

    /// Names of the true zones, in sorted order.
    pub fn zone_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.zones.iter().map(|info| info.name)
    }

    /// Names of zones and links, in sorted order.
    pub fn zone_and_link_ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.zones_and_links.iter().map(|info| info.name)
    }

    /// Number of records, links included.
    pub fn len(&self) -> usize {
        self.zones_and_links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones_and_links.is_empty()
    }
}

/// Creates and memoises one [`TimeZone`] per requested name.
///
/// Repeated lookups hand out clones of the cached adapter, so a year
/// cache computed through one handle is shared with later requests.
#[derive(Debug)]
pub struct ZoneManager {
    registry: ZoneRegistry,
    cache: HashMap<&'static str, TimeZone>,
}

impl ZoneManager {
    pub fn new(registry: ZoneRegistry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// A timezone adapter for the named zone or link, or `None` for an
    /// unknown name.
    pub fn timezone(&mut self, name: &str) -> Option<TimeZone> {
        let Some(info) = self.registry.get(name) else {
            #[cfg(feature = "log")]
            log::debug!("unknown zone requested: {name}");
            return None;
        };
        Some(
            self.cache
                .entry(info.name)
                .or_insert_with(|| TimeZone::new(info))
                .clone(),
        )
    }
}
