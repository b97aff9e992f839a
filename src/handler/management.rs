//! Management frame handling

use super::{FrameOutcome, Tracker};
use crate::crypto::effective_crypt;
use crate::frame::{FrameRecord, FrameSubtype};
use crate::registry::{NetworkRegistry, NetworkRole};

impl Tracker {
    pub(super) fn handle_management(&mut self, frame: &FrameRecord) -> FrameOutcome {
        let ts = frame.timestamp;
        let source = frame.source.filter(|m| m.is_unicast_station());
        let bssid = frame.network_addr();
        let advertisement = frame.subtype.is_advertisement();
        let undirected_probe = frame.subtype == FrameSubtype::ProbeRequest && bssid.is_none();

        // Undirected probes are filed under a probe network named after the
        // sender; everything else needs a BSSID (beacons can fall back to
        // their transmitter).
        let (net_addr, role) = if undirected_probe {
            match source {
                Some(addr) => (addr, NetworkRole::Probe),
                None => return FrameOutcome::malformed(),
            }
        } else {
            let addr = bssid.or(if advertisement { source } else { None });
            let role = if !advertisement {
                NetworkRole::Data
            } else if frame.is_ibss() {
                NetworkRole::AdHoc
            } else {
                NetworkRole::Ap
            };
            match addr {
                Some(addr) => (addr, role),
                None => return FrameOutcome::malformed(),
            }
        };

        self.check_gps(frame);

        let mut outcome = FrameOutcome::default();
        let net_h = self.file_network(net_addr, role, ts, &mut outcome);
        let from_network = advertisement || source == Some(net_addr);
        let decay = self.settings.disconnect_decay_per_sec;

        {
            let net = self.networks.record_mut(net_h);
            let activity = &mut net.activity;
            activity.management_packets += 1;

            if let Some(fix) = frame.gps.as_ref() {
                activity.apply_gps(fix);
            }

            if from_network {
                activity.apply_sender(frame);
            }

            if advertisement {
                if let Some(rate) = frame.advertised_rate {
                    activity.apply_advertised_rate(rate);
                }
                if frame.beacon_interval.is_some() {
                    net.beacon_interval = frame.beacon_interval;
                }
                if frame.bss_timestamp.is_some() {
                    net.bss_timestamp = frame.bss_timestamp;
                }
                if let Some(info) = frame.beacon_info.as_deref().filter(|s| !s.is_empty()) {
                    net.beacon_info = Some(info.to_string());
                }
            }

            if frame.subtype.is_disconnect() {
                net.disconnects.bump(ts, decay);
            } else {
                net.disconnects.decay(ts, decay);
            }
        }

        // Name handling: advertisements set or hide it, directed frames can
        // reveal a hidden one, undirected probes try to find their network.
        let name = frame.visible_ssid();
        if advertisement {
            let net = self.networks.record_mut(net_h);
            if frame.ssid_is_cloaked() {
                self.probes.note_cloaked(net);
            } else if let Some(name) = name.as_deref() {
                outcome.cloak_revealed = self.probes.note_advertised(net, name);
            }
        } else if undirected_probe {
            if let (Some(client), Some(name)) = (source, name.as_deref()) {
                if let Some(binding) = self.probes.resolve(client, name, &mut self.networks) {
                    outcome.probe_bound = Some(binding.network);
                    outcome.cloak_revealed = binding.revealed;
                }
            }
        } else if frame.subtype.is_probe_or_assoc() {
            if let Some(name) = name.as_deref() {
                let net = self.networks.record_mut(net_h);
                outcome.cloak_revealed = self.probes.note_directed(net, name);
            }
        }

        // The station on the other end of the exchange
        let client_mac = if undirected_probe {
            source
        } else {
            let peer = if source == Some(net_addr) {
                frame.destination
            } else {
                frame.source
            };
            peer.filter(|m| m.is_unicast_station() && *m != net_addr)
        };

        let client_h = client_mac.map(|mac| {
            let owner = if undirected_probe {
                outcome
                    .probe_bound
                    .or_else(|| self.probes.association(&mac))
                    .unwrap_or(NetworkRegistry::UNASSOCIATED)
            } else {
                net_h
            };

            let handle = self.file_client(owner, mac, ts, &mut outcome);
            let sent_by_client = source == Some(mac);

            let activity = &mut self.clients.record_mut(handle).activity;
            activity.management_packets += 1;
            if let Some(fix) = frame.gps.as_ref() {
                activity.apply_gps(fix);
            }
            if sent_by_client {
                activity.apply_sender(frame);
                if frame.subtype.is_client_request() {
                    if let Some(rate) = frame.advertised_rate {
                        activity.apply_advertised_rate(rate);
                    }
                }
            }
            handle
        });

        self.apply_encryption(
            effective_crypt(frame),
            frame.iv.as_deref(),
            net_h,
            client_h,
            &mut outcome,
        );

        // Keep the network handle of the frame's own network, even when
        // the client was filed elsewhere
        outcome.network = Some(net_h);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::Disposition;
    use crate::frame::{capability, FrameCategory};
    use crate::registry::{NetworkRegistry, NetworkRole};
    use crate::types::{CryptType, GpsFix, MacAddr, SignalSample};

    use super::*;

    fn directed(
        subtype: FrameSubtype,
        source: MacAddr,
        bssid: MacAddr,
        ssid: &[u8],
        secs: i64,
    ) -> FrameRecord {
        let mut f = FrameRecord::new(FrameCategory::Management, subtype, ts(secs));
        f.source = Some(source);
        f.destination = Some(bssid);
        f.bssid = Some(bssid);
        f.ssid = Some(ssid.to_vec());
        f
    }

    #[test]
    fn test_beacon_creates_access_point() {
        let mut t = tracker();
        let mut f = beacon(ap(1), b"HomeNet", 0);
        f.channel = Some(6);
        f.advertised_rate = Some(54.0);
        f.bss_timestamp = Some(123_456);
        f.beacon_info = Some("floor-2".to_string());
        f.signal = Some(SignalSample { signal_dbm: Some(-55), ..Default::default() });

        let out = t.handle_frame(&f);
        assert!(out.is_tracked());
        assert!(out.new_network);
        assert!(out.client.is_none());

        let net = t.network(&ap(1)).unwrap();
        assert_eq!(net.role, NetworkRole::Ap);
        assert_eq!(net.ssid, "HomeNet");
        assert_eq!(net.beacon_interval, Some(100));
        assert_eq!(net.bss_timestamp, Some(123_456));
        assert_eq!(net.beacon_info.as_deref(), Some("floor-2"));
        assert_eq!(net.activity.channel, Some(6));
        assert_eq!(net.activity.max_advertised_rate, 54.0);
        assert_eq!(net.activity.signal.max_signal, Some(-55));
        assert_eq!(net.activity.management_packets, 1);

        t.handle_frame(&beacon(ap(1), b"HomeNet", 1));
        assert_eq!(t.network(&ap(1)).unwrap().activity.management_packets, 2);
        assert_eq!(t.stats().networks, 1);
    }

    #[test]
    fn test_ibss_beacon_is_adhoc() {
        let mut t = tracker();
        let mut f = beacon(ap(2), b"party", 0);
        f.capability = Some(capability::IBSS);
        t.handle_frame(&f);
        assert_eq!(t.network(&ap(2)).unwrap().role, NetworkRole::AdHoc);
    }

    #[test]
    fn test_assoc_request_reveals_cloaked_network() {
        let mut t = tracker();
        t.handle_frame(&beacon(ap(1), b"", 0));
        let net = t.network(&ap(1)).unwrap();
        assert!(net.cloaked);
        assert!(net.ssid.is_empty());

        let frame = directed(FrameSubtype::AssocRequest, sta(1), ap(1), b"OfficeNet", 1);
        let out = t.handle_frame(&frame);
        assert!(out.cloak_revealed);

        let net = t.network(&ap(1)).unwrap();
        assert!(net.uncloaked);
        assert_eq!(net.ssid, "OfficeNet");
        assert_eq!(net.role, NetworkRole::Ap);
        assert!(t.client(&ap(1), &sta(1)).is_some());
        assert_eq!(t.stats().cloaks_revealed, 1);

        // Later hidden beacons keep the revealed name
        t.handle_frame(&beacon(ap(1), &[0, 0, 0, 0], 2));
        assert_eq!(t.network(&ap(1)).unwrap().ssid, "OfficeNet");
    }

    #[test]
    fn test_probe_response_reveals() {
        let mut t = tracker();
        t.handle_frame(&beacon(ap(1), b"", 0));
        let mut resp = directed(FrameSubtype::ProbeResponse, ap(1), ap(1), b"Hidden", 1);
        resp.destination = Some(sta(3));
        let out = t.handle_frame(&resp);
        assert!(out.cloak_revealed);
        assert_eq!(t.network(&ap(1)).unwrap().ssid, "Hidden");
        // Probe response goes to the client
        assert!(t.client(&ap(1), &sta(3)).is_some());
    }

    #[test]
    fn test_undirected_probe_binds_to_cloaked_network() {
        let mut t = tracker();
        t.handle_frame(&beacon(ap(1), b"Corp", 0));
        t.handle_frame(&beacon(ap(1), b"", 1));
        assert_eq!(t.cached_ssid(&ap(1)), Some("Corp"));

        let out = t.handle_frame(&probe_request(sta(7), b"Corp", 2));
        let bound = t.network(&ap(1)).unwrap().handle;
        assert_eq!(out.probe_bound, Some(bound));
        assert!(out.cloak_revealed);
        assert_eq!(t.probe_association(&sta(7)).unwrap().bssid, ap(1));

        // Client filed under the bound network; a probe network exists for
        // the sender
        assert!(t.client(&ap(1), &sta(7)).is_some());
        assert_eq!(t.network(&sta(7)).unwrap().role, NetworkRole::Probe);
    }

    #[test]
    fn test_broadcast_probe_goes_to_bucket() {
        let mut t = tracker();
        let out1 = t.handle_frame(&probe_request(sta(8), b"", 0));
        let out2 = t.handle_frame(&probe_request(sta(8), b"", 1));
        assert!(out1.probe_bound.is_none());
        assert_eq!(out1.client, out2.client);
        assert!(out1.new_client);
        assert!(!out2.new_client);

        let client = t.client_by_handle(out1.client.unwrap()).unwrap();
        assert_eq!(client.network, NetworkRegistry::UNASSOCIATED);
        assert_eq!(client.activity.management_packets, 2);
        assert_eq!(t.stats().unassociated_clients, 1);
        assert!(t.probe_association(&sta(8)).is_none());
    }

    #[test]
    fn test_probe_network_upgraded_by_beacon() {
        let mut t = tracker();
        t.handle_frame(&probe_request(ap(4), b"", 0));
        assert_eq!(t.network(&ap(4)).unwrap().role, NetworkRole::Probe);
        t.handle_frame(&beacon(ap(4), b"SoftAP", 1));
        assert_eq!(t.network(&ap(4)).unwrap().role, NetworkRole::Ap);
        t.handle_frame(&probe_request(ap(4), b"", 2));
        assert_eq!(t.network(&ap(4)).unwrap().role, NetworkRole::Ap);
    }

    #[test]
    fn test_deauth_bumps_disconnects() {
        let mut t = tracker();
        t.handle_frame(&beacon(ap(1), b"Home", 0));
        for _ in 0..3 {
            let mut f =
                FrameRecord::new(FrameCategory::Management, FrameSubtype::Deauthentication, ts(10));
            f.source = Some(ap(1));
            f.destination = Some(sta(1));
            f.bssid = Some(ap(1));
            t.handle_frame(&f);
        }
        assert_eq!(t.network(&ap(1)).unwrap().disconnects.value(), 3);
        assert!(t.client(&ap(1), &sta(1)).is_some());

        // Two seconds later two have bled off
        t.handle_frame(&beacon(ap(1), b"Home", 12));
        assert_eq!(t.network(&ap(1)).unwrap().disconnects.value(), 1);
    }

    #[test]
    fn test_privacy_beacon_counts_wep() {
        let mut t = tracker();
        let mut f = beacon(ap(1), b"Old", 0);
        f.capability = Some(capability::ESS | capability::PRIVACY);
        t.handle_frame(&f);
        let net = t.network(&ap(1)).unwrap();
        assert!(net.activity.crypt_set.has(CryptType::Wep));
        assert_eq!(net.activity.crypt_packets, 1);
    }

    #[test]
    fn test_malformed_management_ignored() {
        let mut t = tracker();
        let f = FrameRecord::new(FrameCategory::Management, FrameSubtype::Authentication, ts(0));
        let out = t.handle_frame(&f);
        assert_eq!(out.disposition, Disposition::Malformed);

        let mut probe = probe_request(sta(1), b"x", 0);
        probe.source = None;
        assert_eq!(t.handle_frame(&probe).disposition, Disposition::Malformed);

        let stats = t.stats();
        assert_eq!(stats.malformed_frames, 2);
        assert_eq!(stats.networks, 0);
        assert_eq!(stats.clients, 0);
    }

    #[test]
    fn test_missing_fields_leave_aggregates_alone() {
        let mut t = tracker();
        let mut f = beacon(ap(1), b"Home", 0);
        f.gps = Some(GpsFix::new(10.0, 20.0, 0.0, 0.0));
        f.signal = Some(SignalSample { signal_dbm: Some(-60), ..Default::default() });
        t.handle_frame(&f);

        let mut bad = beacon(ap(1), b"Home", 1);
        let mut fix = GpsFix::new(80.0, 80.0, 0.0, 0.0);
        fix.valid = false;
        bad.gps = Some(fix);
        t.handle_frame(&bad);

        let net = t.network(&ap(1)).unwrap();
        assert_eq!(net.activity.gps.max_lat, 10.0);
        assert_eq!(net.activity.gps.points, 1);
        assert_eq!(net.activity.signal.last_signal, Some(-60));
        assert_eq!(t.stats().invalid_gps, 1);
    }
}
