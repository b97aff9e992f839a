//! Client registry
//!
//! Clients are scoped by network: the same station seen under two networks
//! gets two records, and a record's network never changes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::network::NetworkHandle;
use super::Activity;
use crate::frame::DsFlags;
use crate::types::MacAddr;
use crate::vendor::VendorRef;

/// Handle to a client record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClientHandle(u32);

impl ClientHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Direction a client's traffic has been seen travelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ClientType {
    #[default]
    Unknown,
    /// Destination of frames leaving the distribution system
    FromDs,
    /// Source of frames entering the distribution system
    ToDs,
    /// Seen inside a WDS link
    InterDs,
    /// Seen in both directions
    Established,
}

impl ClientType {
    /// Direction implied by a single data frame's DS bits
    pub fn from_ds_flags(ds: DsFlags) -> Self {
        match (ds.to_ds, ds.from_ds) {
            (true, true) => ClientType::InterDs,
            (true, false) => ClientType::ToDs,
            (false, true) => ClientType::FromDs,
            (false, false) => ClientType::Unknown,
        }
    }

    /// Combine the current classification with a new observation
    pub fn merge(self, observed: ClientType) -> ClientType {
        use ClientType::*;

        match (self, observed) {
            (Established, _) | (InterDs, _) => self,
            (_, InterDs) => InterDs,
            (Unknown, o) => o,
            (c, Unknown) => c,
            (FromDs, ToDs) | (ToDs, FromDs) => Established,
            (c, _) => c,
        }
    }
}

/// Aggregated state for one client within one network
#[derive(Debug, Clone, Serialize)]
pub struct ClientRecord {
    pub handle: ClientHandle,
    pub mac: MacAddr,
    /// Owning network, fixed at creation
    pub network: NetworkHandle,
    pub client_type: ClientType,
    pub activity: Activity,
    pub vendor: VendorRef,
}

/// Owns every client record
#[derive(Debug, Default)]
pub struct ClientRegistry {
    records: Vec<ClientRecord>,
    index: HashMap<(NetworkHandle, MacAddr), ClientHandle>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the record for `mac` under `network`. The flag is true
    /// on creation.
    pub fn upsert(
        &mut self,
        network: NetworkHandle,
        mac: MacAddr,
        ts: DateTime<Utc>,
    ) -> (ClientHandle, bool) {
        if let Some(&handle) = self.index.get(&(network, mac)) {
            self.records[handle.index()].activity.touch(ts);
            return (handle, false);
        }

        let handle = ClientHandle(self.records.len() as u32);
        debug!("New client {} under network #{}", mac, network.index());

        self.records.push(ClientRecord {
            handle,
            mac,
            network,
            client_type: ClientType::Unknown,
            activity: Activity::new(ts),
            vendor: VendorRef::UNKNOWN,
        });
        self.index.insert((network, mac), handle);
        (handle, true)
    }

    pub fn lookup(&self, network: NetworkHandle, mac: &MacAddr) -> Option<ClientHandle> {
        self.index.get(&(network, *mac)).copied()
    }

    pub fn get(&self, handle: ClientHandle) -> Option<&ClientRecord> {
        self.records.get(handle.index())
    }

    pub(crate) fn record_mut(&mut self, handle: ClientHandle) -> &mut ClientRecord {
        &mut self.records[handle.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{NetworkRegistry, NetworkRole};
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_scoped_by_network() {
        let mut nets = NetworkRegistry::new(None);
        let (n1, _) = nets.upsert(MacAddr::new([0, 1, 1, 1, 1, 1]), NetworkRole::Ap, ts(0));
        let station = MacAddr::new([0, 2, 2, 2, 2, 2]);

        let mut clients = ClientRegistry::new();
        let (a, created) = clients.upsert(n1, station, ts(0));
        assert!(created);
        let (b, created) = clients.upsert(n1, station, ts(1));
        assert!(!created);
        assert_eq!(a, b);

        let (c, created) = clients.upsert(NetworkRegistry::UNASSOCIATED, station, ts(2));
        assert!(created);
        assert_ne!(a, c);
        assert_eq!(clients.get(a).unwrap().network, n1);
        assert_eq!(clients.get(c).unwrap().network, NetworkRegistry::UNASSOCIATED);
        assert_eq!(clients.len(), 2);
    }

    #[test]
    fn test_type_transitions() {
        use ClientType::*;

        assert_eq!(Unknown.merge(FromDs), FromDs);
        assert_eq!(ToDs.merge(Unknown), ToDs);
        assert_eq!(FromDs.merge(FromDs), FromDs);
        assert_eq!(FromDs.merge(ToDs), Established);
        assert_eq!(ToDs.merge(FromDs), Established);
        assert_eq!(Established.merge(FromDs), Established);
        assert_eq!(Established.merge(InterDs), Established);
        assert_eq!(ToDs.merge(InterDs), InterDs);
        assert_eq!(InterDs.merge(ToDs), InterDs);
    }

    #[test]
    fn test_from_ds_flags() {
        assert_eq!(ClientType::from_ds_flags(DsFlags::TO_DS), ClientType::ToDs);
        assert_eq!(ClientType::from_ds_flags(DsFlags::FROM_DS), ClientType::FromDs);
        assert_eq!(ClientType::from_ds_flags(DsFlags::WDS), ClientType::InterDs);
        assert_eq!(ClientType::from_ds_flags(DsFlags::NONE), ClientType::Unknown);
    }
}
