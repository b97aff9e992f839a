//! Data frame handling

use super::{FrameOutcome, Tracker};
use crate::frame::FrameRecord;
use crate::registry::{ClientType, NetworkRegistry, NetworkRole};

impl Tracker {
    pub(super) fn handle_data(&mut self, frame: &FrameRecord) -> FrameOutcome {
        if frame.source.is_none() && frame.destination.is_none() {
            return FrameOutcome::malformed();
        }

        let ts = frame.timestamp;
        let bssid = frame.network_addr();

        // Frames leaving the DS are addressed to the client; everything
        // else is sent by it.
        let client_addr = if frame.ds.from_ds && !frame.ds.to_ds {
            frame.destination
        } else {
            frame.source
        };
        let client_mac = client_addr.filter(|m| m.is_unicast_station() && Some(*m) != bssid);

        self.check_gps(frame);

        let mut outcome = FrameOutcome::default();
        let net_h = match bssid {
            Some(addr) => self.file_network(addr, NetworkRole::Data, ts, &mut outcome),
            None => {
                let handle = client_mac
                    .and_then(|mac| self.probes.association(&mac))
                    .unwrap_or(NetworkRegistry::UNASSOCIATED);
                self.networks.record_mut(handle).activity.touch(ts);
                outcome.network = Some(handle);
                handle
            }
        };

        let client_h = client_mac.map(|mac| self.file_client(net_h, mac, ts, &mut outcome));

        let from_network = frame.ds.from_ds || (bssid.is_some() && frame.source == bssid);
        {
            let net = self.networks.record_mut(net_h);
            let activity = &mut net.activity;
            activity.data_packets += 1;
            activity.bytes += frame.size as u64;

            if let Some(fix) = frame.gps.as_ref() {
                activity.apply_gps(fix);
            }
            if from_network {
                activity.apply_sender(frame);
            } else {
                activity.apply_phy(frame);
                if activity.channel.is_none() {
                    activity.channel = frame.channel;
                }
            }

            if net_h != NetworkRegistry::UNASSOCIATED {
                if let Some(obs) = frame.ip.as_ref() {
                    if activity.ip.merge(obs) {
                        self.ip_cache.insert(net.bssid, net.activity.ip);
                    }
                }
            }
        }

        if let (Some(handle), Some(mac)) = (client_h, client_mac) {
            let sent_by_client = frame.source == Some(mac);
            let client = self.clients.record_mut(handle);
            client.client_type = client.client_type.merge(ClientType::from_ds_flags(frame.ds));

            let activity = &mut client.activity;
            activity.data_packets += 1;
            activity.bytes += frame.size as u64;

            if let Some(fix) = frame.gps.as_ref() {
                activity.apply_gps(fix);
            }
            if sent_by_client {
                activity.apply_sender(frame);
                if let Some(obs) = frame.ip.as_ref() {
                    activity.ip.observe_host(obs);
                }
            } else if let Some(rate) = frame.data_rate {
                activity.signal.apply_rate(rate);
            }
        }

        self.apply_encryption(frame.crypt, frame.iv.as_deref(), net_h, client_h, &mut outcome);
        outcome
    }
}
