//! Resolver configuration.
//!
//! Hosts embed [`ResolverConfig`] in their own configuration files; every
//! field has a default so an empty table is valid.

use std::time::Duration;

use serde::Deserialize;

use crate::domain::records::RecordStatus;

// Default values for resolver configuration
const DEFAULT_FOUND_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_ABSENT_TTL_SECS: u64 = 60 * 60;

/// Tunables for the cache-aside override lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How long a found record id stays cached. Presence is stable, so this
    /// is long.
    pub found_ttl_secs: u64,
    /// How long the confirmed-absent sentinel stays cached. Absence is
    /// common and cheap to re-derive, so this is short.
    pub absent_ttl_secs: u64,
    /// Publication states an override record may be in to count as a match.
    pub record_statuses: Vec<RecordStatus>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            found_ttl_secs: DEFAULT_FOUND_TTL_SECS,
            absent_ttl_secs: DEFAULT_ABSENT_TTL_SECS,
            record_statuses: vec![RecordStatus::Published],
        }
    }
}

impl ResolverConfig {
    pub fn found_ttl(&self) -> Duration {
        Duration::from_secs(self.found_ttl_secs)
    }

    pub fn absent_ttl(&self) -> Duration {
        Duration::from_secs(self.absent_ttl_secs)
    }
}
