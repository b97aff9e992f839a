//! Decoded frame records
//!
//! The capture/decode stage upstream turns radio samples into
//! `FrameRecord`s; this crate only consumes them. Every optional field may
//! legitimately be missing on a given frame.

use chrono::{DateTime, Utc};

use crate::types::{
    CarrierType, CryptType, EncodingType, GpsFix, IpObservation, MacAddr, SignalSample,
};

/// Frame category (2-bit type field)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameCategory {
    Management,
    Control,
    Data,
    Other,
}

/// Frame subtype, only the ones the tracker distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSubtype {
    // Management subtypes
    AssocRequest,
    AssocResponse,
    ReassocRequest,
    ReassocResponse,
    ProbeRequest,
    ProbeResponse,
    Beacon,
    Atim,
    Disassociation,
    Authentication,
    Deauthentication,
    Action,

    // Data subtypes
    Data,
    Null,
    QosData,
    QosNull,

    Unknown,
}

impl FrameSubtype {
    /// Map the raw 4-bit subtype for a given category
    pub fn from_raw(category: FrameCategory, subtype: u8) -> Self {
        let sub = subtype & 0x0f;
        match category {
            FrameCategory::Management => match sub {
                0 => FrameSubtype::AssocRequest,
                1 => FrameSubtype::AssocResponse,
                2 => FrameSubtype::ReassocRequest,
                3 => FrameSubtype::ReassocResponse,
                4 => FrameSubtype::ProbeRequest,
                5 => FrameSubtype::ProbeResponse,
                8 => FrameSubtype::Beacon,
                9 => FrameSubtype::Atim,
                10 => FrameSubtype::Disassociation,
                11 => FrameSubtype::Authentication,
                12 => FrameSubtype::Deauthentication,
                13 | 14 => FrameSubtype::Action,
                _ => FrameSubtype::Unknown,
            },
            FrameCategory::Data => match sub {
                0..=3 => FrameSubtype::Data,
                4..=7 => FrameSubtype::Null,
                8..=11 => FrameSubtype::QosData,
                12..=15 => FrameSubtype::QosNull,
                _ => FrameSubtype::Unknown,
            },
            FrameCategory::Control | FrameCategory::Other => FrameSubtype::Unknown,
        }
    }

    /// Subtypes that carry an SSID a client is looking for
    pub fn is_probe_or_assoc(&self) -> bool {
        matches!(
            self,
            FrameSubtype::ProbeRequest
                | FrameSubtype::ProbeResponse
                | FrameSubtype::AssocRequest
                | FrameSubtype::ReassocRequest
        )
    }

    /// Subtypes an access point emits to advertise itself
    pub fn is_advertisement(&self) -> bool {
        matches!(self, FrameSubtype::Beacon | FrameSubtype::ProbeResponse)
    }

    /// Subtypes a client sends while looking for or joining a network
    pub fn is_client_request(&self) -> bool {
        matches!(
            self,
            FrameSubtype::ProbeRequest | FrameSubtype::AssocRequest | FrameSubtype::ReassocRequest
        )
    }

    pub fn is_disconnect(&self) -> bool {
        matches!(self, FrameSubtype::Deauthentication | FrameSubtype::Disassociation)
    }
}

/// To-DS / From-DS bits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DsFlags {
    pub to_ds: bool,
    pub from_ds: bool,
}

impl DsFlags {
    pub const NONE: DsFlags = DsFlags { to_ds: false, from_ds: false };
    pub const TO_DS: DsFlags = DsFlags { to_ds: true, from_ds: false };
    pub const FROM_DS: DsFlags = DsFlags { to_ds: false, from_ds: true };
    pub const WDS: DsFlags = DsFlags { to_ds: true, from_ds: true };
}

/// Capability information bits from beacons/probe responses
pub mod capability {
    pub const ESS: u16 = 0x0001;
    pub const IBSS: u16 = 0x0002;
    pub const PRIVACY: u16 = 0x0010;
}

/// One decoded frame as handed over by the capture stage
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub category: FrameCategory,
    pub subtype: FrameSubtype,
    pub ds: DsFlags,

    pub source: Option<MacAddr>,
    pub destination: Option<MacAddr>,
    pub bssid: Option<MacAddr>,

    /// 12-bit sequence number
    pub sequence: Option<u16>,
    pub timestamp: DateTime<Utc>,

    pub signal: Option<SignalSample>,
    pub gps: Option<GpsFix>,

    pub channel: Option<u8>,
    /// Highest rate the sender advertises (Mbps)
    pub advertised_rate: Option<f64>,
    /// Rate this frame was received at (Mbps)
    pub data_rate: Option<f64>,

    pub crypt: CryptType,
    /// Raw WEP IV bytes, present on WEP-protected frames only
    pub iv: Option<Vec<u8>>,

    pub carrier: Option<CarrierType>,
    pub encoding: Option<EncodingType>,

    /// Frame body length in bytes
    pub size: usize,

    // Management-frame fields
    pub ssid: Option<Vec<u8>>,
    pub beacon_interval: Option<u16>,
    pub capability: Option<u16>,
    pub bss_timestamp: Option<u64>,
    pub beacon_info: Option<String>,

    // Data-frame fields
    pub ip: Option<IpObservation>,
}

impl FrameRecord {
    /// An empty record of the given kind stamped at `timestamp`; callers
    /// fill in whatever the decoder produced.
    pub fn new(category: FrameCategory, subtype: FrameSubtype, timestamp: DateTime<Utc>) -> Self {
        Self {
            category,
            subtype,
            ds: DsFlags::NONE,
            source: None,
            destination: None,
            bssid: None,
            sequence: None,
            timestamp,
            signal: None,
            gps: None,
            channel: None,
            advertised_rate: None,
            data_rate: None,
            crypt: CryptType::None,
            iv: None,
            carrier: None,
            encoding: None,
            size: 0,
            ssid: None,
            beacon_interval: None,
            capability: None,
            bss_timestamp: None,
            beacon_info: None,
            ip: None,
        }
    }

    pub fn is_management(&self) -> bool {
        self.category == FrameCategory::Management
    }

    pub fn is_data(&self) -> bool {
        self.category == FrameCategory::Data
    }

    /// SSID as text, or `None` when hidden: missing, zero length, or all
    /// NUL bytes (the usual cloaking filler).
    pub fn visible_ssid(&self) -> Option<String> {
        let raw = self.ssid.as_deref()?;
        if raw.is_empty() || raw.iter().all(|&b| b == 0) {
            return None;
        }
        Some(String::from_utf8_lossy(raw).trim_end_matches('\0').to_string())
    }

    /// Management frame carried an SSID element that hides the name
    pub fn ssid_is_cloaked(&self) -> bool {
        matches!(self.ssid.as_deref(), Some(raw) if raw.is_empty() || raw.iter().all(|&b| b == 0))
    }

    pub fn is_ibss(&self) -> bool {
        self.capability.map_or(false, |c| c & capability::IBSS != 0)
    }

    pub fn is_privacy(&self) -> bool {
        self.capability.map_or(false, |c| c & capability::PRIVACY != 0)
    }

    /// BSSID when it names a real network (not broadcast/zero)
    pub fn network_addr(&self) -> Option<MacAddr> {
        self.bssid.filter(|b| b.is_unicast_station())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtype_from_raw() {
        assert_eq!(FrameSubtype::from_raw(FrameCategory::Management, 8), FrameSubtype::Beacon);
        assert_eq!(
            FrameSubtype::from_raw(FrameCategory::Management, 4),
            FrameSubtype::ProbeRequest
        );
        assert_eq!(FrameSubtype::from_raw(FrameCategory::Management, 7), FrameSubtype::Unknown);
        assert_eq!(FrameSubtype::from_raw(FrameCategory::Data, 8), FrameSubtype::QosData);
        assert_eq!(FrameSubtype::from_raw(FrameCategory::Data, 4), FrameSubtype::Null);
        assert_eq!(FrameSubtype::from_raw(FrameCategory::Control, 11), FrameSubtype::Unknown);
    }

    #[test]
    fn test_ssid_visibility() {
        let mut f = FrameRecord::new(FrameCategory::Management, FrameSubtype::Beacon, Utc::now());
        assert_eq!(f.visible_ssid(), None);
        assert!(!f.ssid_is_cloaked());

        f.ssid = Some(Vec::new());
        assert!(f.ssid_is_cloaked());

        f.ssid = Some(vec![0, 0, 0, 0]);
        assert!(f.ssid_is_cloaked());
        assert_eq!(f.visible_ssid(), None);

        f.ssid = Some(b"OfficeNet".to_vec());
        assert!(!f.ssid_is_cloaked());
        assert_eq!(f.visible_ssid().as_deref(), Some("OfficeNet"));
    }

    #[test]
    fn test_network_addr_filters_broadcast() {
        let mut f =
            FrameRecord::new(FrameCategory::Management, FrameSubtype::ProbeRequest, Utc::now());
        f.bssid = Some(MacAddr::BROADCAST);
        assert!(f.network_addr().is_none());
        f.bssid = Some(MacAddr::new([0, 1, 2, 3, 4, 5]));
        assert!(f.network_addr().is_some());
    }
}
