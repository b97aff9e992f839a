//! Probe association and cloaked SSID recovery
//!
//! Keeps the last name known for each network (including names recorded
//! before the network started hiding it) and binds anonymous probe senders
//! to the cloaked network whose name they asked for.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::registry::{NetworkHandle, NetworkRecord, NetworkRegistry};
use crate::types::MacAddr;

/// A successful probe binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeBinding {
    pub network: NetworkHandle,
    /// The bound network's name was hidden until now
    pub revealed: bool,
}

#[derive(Debug, Default)]
pub struct ProbeResolver {
    /// Last known name per network, survives removal
    cloak_cache: HashMap<NetworkHandle, String>,
    /// Probe sender to the network it was bound to
    associations: HashMap<MacAddr, NetworkHandle>,
}

impl ProbeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// An advertisement hid the network's name.
    pub fn note_cloaked(&mut self, net: &mut NetworkRecord) {
        if !net.cloaked {
            debug!("Network {} is cloaked", net.bssid);
        }
        net.cloaked = true;

        if !net.ssid.is_empty() && !net.uncloaked {
            self.cloak_cache.insert(net.handle, std::mem::take(&mut net.ssid));
        }
    }

    /// An advertisement carried a visible name.
    pub fn note_advertised(&mut self, net: &mut NetworkRecord, name: &str) -> bool {
        if net.cloaked && !net.uncloaked {
            return self.reveal(net, name);
        }
        if net.ssid != name {
            net.ssid = name.to_string();
        }
        self.cloak_cache.insert(net.handle, name.to_string());
        false
    }

    /// A frame aimed at `net` (probe, probe response, association) named
    /// it. Returns true when this uncloaked the network.
    pub fn note_directed(&mut self, net: &mut NetworkRecord, name: &str) -> bool {
        if net.cloaked && !net.uncloaked {
            return self.reveal(net, name);
        }
        false
    }

    fn reveal(&mut self, net: &mut NetworkRecord, name: &str) -> bool {
        net.uncloaked = true;
        net.ssid = name.to_string();
        self.cloak_cache.insert(net.handle, name.to_string());
        info!("Cloaked network {} revealed as '{}'", net.bssid, name);
        true
    }

    /// Bind an undirected probe for `name` from `client` to a cloaked
    /// network known under that name.
    ///
    /// Several matches resolve to the most recently active network, then
    /// to the one created first. An empty name never resolves.
    pub fn resolve(
        &mut self,
        client: MacAddr,
        name: &str,
        networks: &mut NetworkRegistry,
    ) -> Option<ProbeBinding> {
        if name.is_empty() {
            return None;
        }

        let handle = self
            .cloak_cache
            .iter()
            .filter(|(_, cached)| cached.as_str() == name)
            .filter_map(|(&h, _)| networks.get(h))
            .filter(|net| net.cloaked && !net.is_removed())
            .max_by(|a, b| {
                a.activity
                    .last_seen
                    .cmp(&b.activity.last_seen)
                    .then_with(|| b.handle.cmp(&a.handle))
            })
            .map(|net| net.handle)?;

        if self.associations.insert(client, handle) != Some(handle) {
            debug!("Probe from {} bound to network #{}", client, handle.index());
        }

        let revealed = self.note_directed(networks.record_mut(handle), name);
        Some(ProbeBinding {
            network: handle,
            revealed,
        })
    }

    /// Network a probe sender was last bound to
    pub fn association(&self, client: &MacAddr) -> Option<NetworkHandle> {
        self.associations.get(client).copied()
    }

    pub fn cached_name(&self, network: NetworkHandle) -> Option<&str> {
        self.cloak_cache.get(&network).map(String::as_str)
    }

    pub fn association_count(&self) -> usize {
        self.associations.len()
    }
}
