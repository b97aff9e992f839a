//! Network registry
//!
//! One record per network hardware address. Index 0 is the reserved bucket
//! for clients whose network can't be resolved.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::client::ClientHandle;
use super::Activity;
use crate::crypto::IvHistory;
use crate::error::{Result, TrackerError};
use crate::types::{DecayingCounter, MacAddr};
use crate::vendor::VendorRef;

/// Handle to a network record, stable for the registry's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NetworkHandle(u32);

impl NetworkHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// What kind of network a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NetworkRole {
    /// Infrastructure access point
    Ap,
    /// Independent BSS
    AdHoc,
    /// Only seen as the source of undirected probe requests
    Probe,
    Turbocell,
    /// Only seen through data or non-advertising management traffic
    Data,
    /// Retired by the host; kept queryable
    Removed,
}

impl NetworkRole {
    fn rank(self) -> u8 {
        match self {
            NetworkRole::Removed => 0,
            NetworkRole::Probe => 1,
            NetworkRole::Data => 2,
            NetworkRole::Ap | NetworkRole::AdHoc | NetworkRole::Turbocell => 3,
        }
    }

    pub fn is_infrastructure(self) -> bool {
        self.rank() == 3
    }

    /// Role after a frame hinting `hint`. Infrastructure hints replace
    /// weaker roles; probe/data hints never downgrade. A removed record
    /// takes whatever the reviving frame says.
    pub fn merge(self, hint: NetworkRole) -> NetworkRole {
        if hint == NetworkRole::Removed {
            return self;
        }
        if hint.rank() >= self.rank() {
            hint
        } else {
            self
        }
    }
}

/// Aggregated state for one network
#[derive(Debug, Clone, Serialize)]
pub struct NetworkRecord {
    pub handle: NetworkHandle,
    pub bssid: MacAddr,
    pub role: NetworkRole,

    /// Visible name; empty while unknown or hidden
    pub ssid: String,
    /// Advertisements were seen with a hidden name
    pub cloaked: bool,
    /// A directed frame revealed the hidden name
    pub uncloaked: bool,

    pub beacon_interval: Option<u16>,
    pub beacon_info: Option<String>,
    /// Last BSS timestamp from an advertisement
    pub bss_timestamp: Option<u64>,

    pub activity: Activity,
    /// Deauth/disassoc frames, decaying per second of capture time
    pub disconnects: DecayingCounter,

    pub vendor: VendorRef,

    #[serde(skip)]
    pub(crate) iv_history: Option<IvHistory>,

    clients: BTreeMap<MacAddr, ClientHandle>,
}

impl NetworkRecord {
    fn new(
        handle: NetworkHandle,
        bssid: MacAddr,
        role: NetworkRole,
        activity: Activity,
        iv_capacity: Option<usize>,
    ) -> Self {
        Self {
            handle,
            bssid,
            role,
            ssid: String::new(),
            cloaked: false,
            uncloaked: false,
            beacon_interval: None,
            beacon_info: None,
            bss_timestamp: None,
            activity,
            disconnects: DecayingCounter::new(),
            vendor: VendorRef::UNKNOWN,
            iv_history: iv_capacity.map(IvHistory::new),
            clients: BTreeMap::new(),
        }
    }

    pub fn is_removed(&self) -> bool {
        self.role == NetworkRole::Removed
    }

    /// Clients filed under this network, by address
    pub fn clients(&self) -> impl Iterator<Item = (&MacAddr, &ClientHandle)> {
        self.clients.iter()
    }

    pub fn client(&self, mac: &MacAddr) -> Option<ClientHandle> {
        self.clients.get(mac).copied()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn iv_history(&self) -> Option<&IvHistory> {
        self.iv_history.as_ref()
    }

    pub(crate) fn attach_client(&mut self, mac: MacAddr, handle: ClientHandle) {
        self.clients.entry(mac).or_insert(handle);
    }

    /// Tombstone: drop crypt and IV state, keep identity, clients and
    /// aggregates.
    fn retire(&mut self) {
        self.role = NetworkRole::Removed;
        self.activity.clear_crypt();
        self.disconnects.reset();
        if let Some(history) = self.iv_history.as_mut() {
            history.clear();
        }
    }
}

/// Owns every network record
#[derive(Debug)]
pub struct NetworkRegistry {
    records: Vec<NetworkRecord>,
    index: HashMap<MacAddr, NetworkHandle>,
    iv_capacity: Option<usize>,
}

impl NetworkRegistry {
    /// The reserved bucket for unresolvable clients
    pub const UNASSOCIATED: NetworkHandle = NetworkHandle(0);

    /// `iv_capacity` of `None` disables IV history tracking.
    pub fn new(iv_capacity: Option<usize>) -> Self {
        let bucket = NetworkRecord::new(
            Self::UNASSOCIATED,
            MacAddr::ZERO,
            NetworkRole::Data,
            Activity::dormant(),
            None,
        );

        let mut index = HashMap::new();
        index.insert(MacAddr::ZERO, Self::UNASSOCIATED);

        Self {
            records: vec![bucket],
            index,
            iv_capacity,
        }
    }

    /// Find or create the record for `bssid`. The flag is true on creation.
    pub fn upsert(
        &mut self,
        bssid: MacAddr,
        role_hint: NetworkRole,
        ts: DateTime<Utc>,
    ) -> (NetworkHandle, bool) {
        if let Some(&handle) = self.index.get(&bssid) {
            let record = &mut self.records[handle.index()];
            if handle != Self::UNASSOCIATED {
                let role = record.role.merge(role_hint);
                if record.is_removed() && role != NetworkRole::Removed {
                    debug!("Network {} seen again after removal as {:?}", bssid, role);
                }
                record.role = role;
            }
            record.activity.touch(ts);
            return (handle, false);
        }

        let handle = NetworkHandle(self.records.len() as u32);
        let role = if role_hint == NetworkRole::Removed {
            NetworkRole::Data
        } else {
            role_hint
        };
        debug!("New network {} ({:?})", bssid, role);

        self.records.push(NetworkRecord::new(
            handle,
            bssid,
            role,
            Activity::new(ts),
            self.iv_capacity,
        ));
        self.index.insert(bssid, handle);
        (handle, true)
    }

    pub fn lookup(&self, bssid: &MacAddr) -> Option<NetworkHandle> {
        self.index.get(bssid).copied()
    }

    pub fn get(&self, handle: NetworkHandle) -> Option<&NetworkRecord> {
        self.records.get(handle.index())
    }

    pub fn unassociated(&self) -> &NetworkRecord {
        &self.records[Self::UNASSOCIATED.index()]
    }

    /// Mutable access for the handler pipeline.
    ///
    /// Handles are only minted by this registry, so indexing can't miss.
    pub(crate) fn record_mut(&mut self, handle: NetworkHandle) -> &mut NetworkRecord {
        &mut self.records[handle.index()]
    }

    /// Retire a network on an external aging signal. The record stays
    /// queryable with role `Removed`.
    pub fn mark_removed(&mut self, bssid: &MacAddr) -> Result<NetworkHandle> {
        let handle = self
            .lookup(bssid)
            .ok_or(TrackerError::UnknownNetwork(*bssid))?;

        if handle == Self::UNASSOCIATED {
            debug!("Ignoring removal of the unassociated bucket");
            return Ok(handle);
        }

        let record = &mut self.records[handle.index()];
        if !record.is_removed() {
            record.retire();
            info!("Network {} marked removed", bssid);
        }
        Ok(handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkRecord> {
        self.records.iter()
    }

    /// Number of records, the unassociated bucket included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.len() <= 1
    }
}
