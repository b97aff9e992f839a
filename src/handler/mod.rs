//! Frame classification handlers
//!
//! `Tracker` is the per-session tracking context. Frames go in one at a time
//! through [`Tracker::handle_frame`]; everything else on it is read-only.

mod data;
mod management;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::TrackerSettings;
use crate::crypto::{analyze_iv, apply_crypt};
use crate::error::Result;
use crate::frame::{FrameCategory, FrameRecord};
use crate::probe::ProbeResolver;
use crate::registry::{
    ClientHandle, ClientRecord, ClientRegistry, NetworkHandle, NetworkRecord, NetworkRegistry,
    NetworkRole,
};
use crate::types::{CryptType, IpGuess, MacAddr};
use crate::vendor::{VendorCache, VendorLookup, VendorRole};

/// How a frame was handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Disposition {
    #[default]
    Tracked,
    /// Category the tracker doesn't follow (control and friends)
    Ignored,
    /// Missing the addresses needed to file it
    Malformed,
}

/// What one call to [`Tracker::handle_frame`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    pub disposition: Disposition,
    pub network: Option<NetworkHandle>,
    pub client: Option<ClientHandle>,
    pub new_network: bool,
    pub new_client: bool,
    /// Network an undirected probe got bound to
    pub probe_bound: Option<NetworkHandle>,
    pub cloak_revealed: bool,
    pub weak_iv: bool,
    pub duplicate_iv: bool,
}

impl FrameOutcome {
    fn ignored() -> Self {
        Self {
            disposition: Disposition::Ignored,
            ..Default::default()
        }
    }

    fn malformed() -> Self {
        Self {
            disposition: Disposition::Malformed,
            ..Default::default()
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.disposition == Disposition::Tracked
    }
}

/// Session counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackerStats {
    pub frames_processed: u64,
    pub management_frames: u64,
    pub data_frames: u64,
    pub other_frames: u64,
    pub malformed_frames: u64,
    pub unparseable_ivs: u64,
    pub invalid_gps: u64,
    pub weak_ivs: u64,
    pub duplicate_ivs: u64,
    pub iv_evictions: u64,
    pub cloaks_revealed: u64,
    pub vendor_lookup_failures: u64,
    /// Network records, the unassociated bucket excluded
    pub networks: usize,
    pub clients: usize,
    /// Clients filed under the unassociated bucket
    pub unassociated_clients: usize,
}

/// Tracking context for one capture session
pub struct Tracker {
    settings: TrackerSettings,
    networks: NetworkRegistry,
    clients: ClientRegistry,
    probes: ProbeResolver,
    vendors: VendorCache,
    /// Last IP guess per network address, kept across removal
    ip_cache: HashMap<MacAddr, IpGuess>,
    stats: TrackerStats,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("networks", &self.networks.len())
            .field("clients", &self.clients.len())
            .field("vendors", &self.vendors)
            .finish()
    }
}

impl Tracker {
    pub fn new(settings: TrackerSettings, vendor_lookup: Arc<dyn VendorLookup>) -> Result<Self> {
        settings.validate()?;

        let vendors = VendorCache::new(vendor_lookup, settings.vendor_lookups);
        Ok(Self {
            networks: NetworkRegistry::new(settings.iv_capacity()),
            clients: ClientRegistry::new(),
            probes: ProbeResolver::new(),
            vendors,
            ip_cache: HashMap::new(),
            stats: TrackerStats::default(),
            settings,
        })
    }

    /// Feed one decoded frame. Frames must arrive in capture order.
    pub fn handle_frame(&mut self, frame: &FrameRecord) -> FrameOutcome {
        self.stats.frames_processed += 1;

        let outcome = match frame.category {
            FrameCategory::Management => {
                self.stats.management_frames += 1;
                self.handle_management(frame)
            }
            FrameCategory::Data => {
                self.stats.data_frames += 1;
                self.handle_data(frame)
            }
            FrameCategory::Control | FrameCategory::Other => {
                self.stats.other_frames += 1;
                FrameOutcome::ignored()
            }
        };

        if outcome.disposition == Disposition::Malformed {
            self.stats.malformed_frames += 1;
            debug!("Ignoring {:?} frame without usable addresses", frame.subtype);
        }
        if outcome.cloak_revealed {
            self.stats.cloaks_revealed += 1;
        }
        outcome
    }

    /// Retire a network on an external aging signal
    pub fn mark_removed(&mut self, bssid: &MacAddr) -> Result<NetworkHandle> {
        self.networks.mark_removed(bssid)
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn networks(&self) -> impl Iterator<Item = &NetworkRecord> {
        self.networks.iter().skip(1)
    }

    pub fn network(&self, bssid: &MacAddr) -> Option<&NetworkRecord> {
        self.networks.lookup(bssid).and_then(|h| self.networks.get(h))
    }

    pub fn network_by_handle(&self, handle: NetworkHandle) -> Option<&NetworkRecord> {
        self.networks.get(handle)
    }

    /// The bucket holding clients with no resolvable network
    pub fn unassociated(&self) -> &NetworkRecord {
        self.networks.unassociated()
    }

    pub fn clients_of(&self, network: NetworkHandle) -> impl Iterator<Item = &ClientRecord> + '_ {
        self.networks
            .get(network)
            .into_iter()
            .flat_map(|net| net.clients())
            .filter_map(|(_, &h)| self.clients.get(h))
    }

    pub fn client(&self, bssid: &MacAddr, client: &MacAddr) -> Option<&ClientRecord> {
        let net = self.networks.lookup(bssid)?;
        let handle = self.clients.lookup(net, client)?;
        self.clients.get(handle)
    }

    pub fn client_by_handle(&self, handle: ClientHandle) -> Option<&ClientRecord> {
        self.clients.get(handle)
    }

    /// Network an undirected probe from `client` was bound to
    pub fn probe_association(&self, client: &MacAddr) -> Option<&NetworkRecord> {
        self.probes
            .association(client)
            .and_then(|h| self.networks.get(h))
    }

    /// Last name known for a network, hidden or not
    pub fn cached_ssid(&self, bssid: &MacAddr) -> Option<&str> {
        let handle = self.networks.lookup(bssid)?;
        self.probes.cached_name(handle)
    }

    pub fn vendor_name(&self, vref: crate::vendor::VendorRef) -> &str {
        self.vendors.name_of(vref)
    }

    pub fn vendors(&self) -> &VendorCache {
        &self.vendors
    }

    /// Snapshot of the session counters
    pub fn stats(&self) -> TrackerStats {
        let mut stats = self.stats.clone();
        stats.networks = self.networks.len() - 1;
        stats.clients = self.clients.len();
        stats.unassociated_clients = self.networks.unassociated().client_count();
        stats.vendor_lookup_failures = self.vendors.stats().failures;
        stats
    }

    // Shared steps used by both handlers

    fn file_network(
        &mut self,
        bssid: MacAddr,
        role: NetworkRole,
        ts: DateTime<Utc>,
        outcome: &mut FrameOutcome,
    ) -> NetworkHandle {
        let (handle, created) = self.networks.upsert(bssid, role, ts);
        if created {
            let vendor = self.vendors.resolve(VendorRole::Network, bssid);
            let net = self.networks.record_mut(handle);
            net.vendor = vendor;
            if let Some(guess) = self.ip_cache.get(&bssid) {
                net.activity.ip = *guess;
            }
        }
        outcome.network = Some(handle);
        outcome.new_network = created;
        handle
    }

    fn file_client(
        &mut self,
        network: NetworkHandle,
        mac: MacAddr,
        ts: DateTime<Utc>,
        outcome: &mut FrameOutcome,
    ) -> ClientHandle {
        // The bucket isn't touched by upsert, so stamp it here
        if network == NetworkRegistry::UNASSOCIATED {
            self.networks.record_mut(network).activity.touch(ts);
        }

        let (handle, created) = self.clients.upsert(network, mac, ts);
        if created {
            let vendor = self.vendors.resolve(VendorRole::Client, mac);
            self.clients.record_mut(handle).vendor = vendor;
            self.networks.record_mut(network).attach_client(mac, handle);
            if network == NetworkRegistry::UNASSOCIATED {
                info!("Client {} filed as unassociated", mac);
            }
        }
        outcome.client = Some(handle);
        outcome.new_client = created;
        handle
    }

    /// Credit the frame's crypt type and IV to the network and, if given,
    /// the client.
    fn apply_encryption(
        &mut self,
        crypt: CryptType,
        iv: Option<&[u8]>,
        network: NetworkHandle,
        client: Option<ClientHandle>,
        outcome: &mut FrameOutcome,
    ) {
        let net = self.networks.record_mut(network);
        if apply_crypt(&mut net.activity.crypt_set, &mut net.activity.last_crypt, crypt) {
            net.activity.crypt_packets += 1;
        }

        let verdict = match iv {
            Some(bytes) => {
                let verdict = analyze_iv(bytes, net.iv_history.as_mut());
                if verdict.is_none() {
                    self.stats.unparseable_ivs += 1;
                }
                verdict
            }
            None => None,
        };

        if let Some(v) = verdict {
            if v.weak {
                net.activity.weak_packets += 1;
                self.stats.weak_ivs += 1;
            }
            if v.duplicate {
                net.activity.dupe_packets += 1;
                self.stats.duplicate_ivs += 1;
            }
            if v.evicted {
                self.stats.iv_evictions += 1;
            }
            outcome.weak_iv = v.weak;
            outcome.duplicate_iv = v.duplicate;
        }

        if let Some(ch) = client {
            let cli = self.clients.record_mut(ch);
            if apply_crypt(&mut cli.activity.crypt_set, &mut cli.activity.last_crypt, crypt) {
                cli.activity.crypt_packets += 1;
            }
            if let Some(v) = verdict {
                if v.weak {
                    cli.activity.weak_packets += 1;
                }
                if v.duplicate {
                    cli.activity.dupe_packets += 1;
                }
            }
        }
    }

    /// Count a GPS fix that was present but unusable
    fn check_gps(&mut self, frame: &FrameRecord) {
        if matches!(frame.gps, Some(ref fix) if !fix.is_usable()) {
            self.stats.invalid_gps += 1;
        }
    }
}
