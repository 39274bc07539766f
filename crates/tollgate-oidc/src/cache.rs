use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use serde::Deserialize;

use crate::jwks::KeySet;

/// Subset of the OpenID provider metadata the verifier uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoveryDocument {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
}

/// Discovery documents keyed by issuer and key sets keyed by JWKS URI.
///
/// Clones share entries, so one cache can back several verifiers. Concurrent
/// misses for the same key wait on a single fetch.
#[derive(Clone)]
pub struct VerifierCache {
    pub(crate) discovery: Cache<String, Arc<DiscoveryDocument>>,
    pub(crate) key_sets: Cache<String, Arc<KeySet>>,
}

impl VerifierCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            discovery: Cache::builder().max_capacity(32).time_to_live(ttl).build(),
            key_sets: Cache::builder().max_capacity(32).time_to_live(ttl).build(),
        }
    }

    /// Drop every cached document; the next verification refetches.
    pub fn invalidate_all(&self) {
        self.discovery.invalidate_all();
        self.key_sets.invalidate_all();
    }
}

impl fmt::Debug for VerifierCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierCache")
            .field("discovery_entries", &self.discovery.entry_count())
            .field("key_set_entries", &self.key_sets.entry_count())
            .finish()
    }
}
