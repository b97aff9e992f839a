//! Vendor lookup cache
//!
//! Vendor names come from an external OUI database behind [`VendorLookup`].
//! Results are cached per prefix, separately for network-role and
//! client-role lookups since the same prefix can be named differently for
//! access points and stations. Failed lookups are cached as unknown so a
//! dead backend is queried once per prefix, not once per frame.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::VendorLookupError;
use crate::types::{MacAddr, OuiPrefix};

/// Which side of the link an address was seen on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VendorRole {
    Network,
    Client,
}

/// A vendor name with the lookup service's confidence in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorMatch {
    pub name: String,
    pub score: u8,
}

/// External OUI lookup service
pub trait VendorLookup: Send + Sync {
    /// Resolve a prefix. `Ok(None)` means the prefix is not in the database.
    fn lookup(
        &self,
        role: VendorRole,
        prefix: OuiPrefix,
    ) -> Result<Option<VendorMatch>, VendorLookupError>;
}

/// Lookup backend that knows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVendorLookup;

impl VendorLookup for NoVendorLookup {
    fn lookup(
        &self,
        _role: VendorRole,
        _prefix: OuiPrefix,
    ) -> Result<Option<VendorMatch>, VendorLookupError> {
        Ok(None)
    }
}

/// In-memory table, handy for hosts that preload a manufacturer list
#[derive(Debug, Default, Clone)]
pub struct StaticVendorTable {
    entries: HashMap<(VendorRole, OuiPrefix), VendorMatch>,
}

impl StaticVendorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, role: VendorRole, prefix: OuiPrefix, name: &str, score: u8) {
        self.entries.insert(
            (role, prefix),
            VendorMatch {
                name: name.to_string(),
                score,
            },
        );
    }

    /// Register the same name for both roles
    pub fn insert_both(&mut self, prefix: OuiPrefix, name: &str, score: u8) {
        self.insert(VendorRole::Network, prefix, name, score);
        self.insert(VendorRole::Client, prefix, name, score);
    }
}

impl VendorLookup for StaticVendorTable {
    fn lookup(
        &self,
        role: VendorRole,
        prefix: OuiPrefix,
    ) -> Result<Option<VendorMatch>, VendorLookupError> {
        Ok(self.entries.get(&(role, prefix)).cloned())
    }
}

/// Index of a cached vendor entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VendorHandle(u32);

impl VendorHandle {
    /// Shared entry every unknown or failed prefix points at
    pub const UNKNOWN: VendorHandle = VendorHandle(0);

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A record's link into the cache. The cache owns the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VendorRef {
    pub handle: VendorHandle,
    pub score: u8,
}

impl VendorRef {
    pub const UNKNOWN: VendorRef = VendorRef {
        handle: VendorHandle::UNKNOWN,
        score: 0,
    };

    pub fn is_known(&self) -> bool {
        self.handle != VendorHandle::UNKNOWN
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorEntry {
    pub name: String,
    pub score: u8,
}

/// Cache counters
#[derive(Debug, Default, Clone, Serialize)]
pub struct VendorCacheStats {
    pub lookups: u64,
    pub hits: u64,
    pub misses: u64,
    pub failures: u64,
}

impl VendorCacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Per-role prefix cache in front of a [`VendorLookup`]
pub struct VendorCache {
    backend: Arc<dyn VendorLookup>,
    enabled: bool,
    entries: Vec<VendorEntry>,
    network_map: HashMap<OuiPrefix, VendorRef>,
    client_map: HashMap<OuiPrefix, VendorRef>,
    stats: VendorCacheStats,
}

impl std::fmt::Debug for VendorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VendorCache")
            .field("enabled", &self.enabled)
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish()
    }
}

impl VendorCache {
    pub fn new(backend: Arc<dyn VendorLookup>, enabled: bool) -> Self {
        Self {
            backend,
            enabled,
            entries: vec![VendorEntry {
                name: "Unknown".to_string(),
                score: 0,
            }],
            network_map: HashMap::new(),
            client_map: HashMap::new(),
            stats: VendorCacheStats::default(),
        }
    }

    /// Resolve the vendor for `mac` in `role`, asking the backend at most
    /// once per (role, prefix).
    pub fn resolve(&mut self, role: VendorRole, mac: MacAddr) -> VendorRef {
        if !self.enabled {
            return VendorRef::UNKNOWN;
        }

        let prefix = mac.oui();
        self.stats.lookups += 1;

        let cached = match role {
            VendorRole::Network => self.network_map.get(&prefix),
            VendorRole::Client => self.client_map.get(&prefix),
        };
        if let Some(vref) = cached {
            self.stats.hits += 1;
            return *vref;
        }

        self.stats.misses += 1;
        let vref = match self.backend.lookup(role, prefix) {
            Ok(Some(found)) => self.intern(found),
            Ok(None) => {
                debug!("No vendor for {} ({:?})", prefix, role);
                VendorRef::UNKNOWN
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!("Vendor lookup for {} failed, caching as unknown: {}", prefix, e);
                VendorRef::UNKNOWN
            }
        };

        match role {
            VendorRole::Network => self.network_map.insert(prefix, vref),
            VendorRole::Client => self.client_map.insert(prefix, vref),
        };
        vref
    }

    /// Reuse an existing entry with the same name and score
    fn intern(&mut self, found: VendorMatch) -> VendorRef {
        let score = found.score;
        let idx = match self
            .entries
            .iter()
            .skip(1)
            .position(|e| e.name == found.name && e.score == score)
        {
            Some(pos) => pos + 1,
            None => {
                self.entries.push(VendorEntry {
                    name: found.name,
                    score,
                });
                self.entries.len() - 1
            }
        };
        VendorRef {
            handle: VendorHandle(idx as u32),
            score,
        }
    }

    pub fn entry(&self, handle: VendorHandle) -> Option<&VendorEntry> {
        self.entries.get(handle.index())
    }

    /// Vendor name behind a record's reference
    pub fn name_of(&self, vref: VendorRef) -> &str {
        self.entry(vref.handle).map_or("Unknown", |e| e.name.as_str())
    }

    pub fn cached_prefixes(&self, role: VendorRole) -> usize {
        match role {
            VendorRole::Network => self.network_map.len(),
            VendorRole::Client => self.client_map.len(),
        }
    }

    pub fn stats(&self) -> &VendorCacheStats {
        &self.stats
    }
}
