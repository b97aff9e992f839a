//! Network and client registries
//!
//! Records live in append-only arenas and are addressed by small copyable
//! handles. Nothing is ever deleted: removal is a tombstone role, so a
//! handle stays valid for the whole capture session.

pub mod client;
pub mod network;

pub use client::{ClientHandle, ClientRecord, ClientRegistry, ClientType};
pub use network::{NetworkHandle, NetworkRecord, NetworkRegistry, NetworkRole};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::frame::FrameRecord;
use crate::types::{
    CarrierSet, CryptSet, CryptType, EncodingSet, GpsAggregate, GpsFix, IpGuess, SignalAggregate,
    SignalSample,
};

/// Counters, aggregates and bookkeeping carried by both network and client
/// records.
#[derive(Debug, Clone, Serialize)]
pub struct Activity {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    pub management_packets: u64,
    pub data_packets: u64,
    pub crypt_packets: u64,
    pub weak_packets: u64,
    pub dupe_packets: u64,

    /// Every crypt type seen
    pub crypt_set: CryptSet,
    /// Crypt type of the most recent frame
    pub last_crypt: CryptType,
    pub carrier_set: CarrierSet,
    pub encoding_set: EncodingSet,

    pub channel: Option<u8>,
    /// Highest rate advertised in Mbps
    pub max_advertised_rate: f64,

    pub gps: GpsAggregate,
    pub signal: SignalAggregate,
    pub ip: IpGuess,

    pub last_sequence: Option<u16>,
    pub bytes: u64,

    /// Set once a frame has stamped the timestamps
    #[serde(skip)]
    stamped: bool,
}

impl Activity {
    pub fn new(first_seen: DateTime<Utc>) -> Self {
        let mut activity = Self::dormant();
        activity.first_seen = first_seen;
        activity.last_seen = first_seen;
        activity.stamped = true;
        activity
    }

    /// Activity for a record created before any frame named it; the first
    /// `touch` sets both timestamps.
    pub(crate) fn dormant() -> Self {
        Self {
            first_seen: DateTime::<Utc>::default(),
            last_seen: DateTime::<Utc>::default(),
            management_packets: 0,
            data_packets: 0,
            crypt_packets: 0,
            weak_packets: 0,
            dupe_packets: 0,
            crypt_set: CryptSet::default(),
            last_crypt: CryptType::None,
            carrier_set: CarrierSet::default(),
            encoding_set: EncodingSet::default(),
            channel: None,
            max_advertised_rate: 0.0,
            gps: GpsAggregate::new(),
            signal: SignalAggregate::new(),
            ip: IpGuess::default(),
            last_sequence: None,
            bytes: 0,
            stamped: false,
        }
    }

    /// Advance `last_seen`. Older timestamps never move it backwards.
    pub fn touch(&mut self, ts: DateTime<Utc>) {
        if !self.stamped {
            self.first_seen = ts;
            self.last_seen = ts;
            self.stamped = true;
        } else if ts > self.last_seen {
            self.last_seen = ts;
        }
    }

    pub fn total_packets(&self) -> u64 {
        self.management_packets + self.data_packets
    }

    /// Fold a GPS fix in; false when the fix was unusable
    pub fn apply_gps(&mut self, fix: &GpsFix) -> bool {
        self.gps.apply(fix)
    }

    pub fn apply_signal(&mut self, sample: &SignalSample, fix: Option<&GpsFix>) {
        self.signal.apply(sample, fix);
    }

    /// Radio properties any frame on the record's channel reveals
    pub fn apply_phy(&mut self, frame: &FrameRecord) {
        if let Some(carrier) = frame.carrier {
            self.carrier_set.add(carrier);
        }
        if let Some(encoding) = frame.encoding {
            self.encoding_set.add(encoding);
        }
        if let Some(rate) = frame.data_rate {
            self.signal.apply_rate(rate);
        }
    }

    /// Everything a frame transmitted by this record's owner tells us:
    /// signal, sequence number, channel and radio properties.
    pub fn apply_sender(&mut self, frame: &FrameRecord) {
        if let Some(sample) = frame.signal.as_ref() {
            self.apply_signal(sample, frame.gps.as_ref());
        }
        if let Some(seq) = frame.sequence {
            self.last_sequence = Some(seq);
        }
        if let Some(ch) = frame.channel {
            self.channel = Some(ch);
        }
        self.apply_phy(frame);
    }

    pub fn apply_advertised_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > self.max_advertised_rate {
            self.max_advertised_rate = rate;
        }
    }

    /// Reset the crypt state and weak-key counters on removal
    pub(crate) fn clear_crypt(&mut self) {
        self.crypt_set = CryptSet::default();
        self.last_crypt = CryptType::None;
        self.weak_packets = 0;
        self.dupe_packets = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_touch_never_rewinds() {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut a = Activity::new(t0);
        a.touch(t0 + Duration::seconds(5));
        a.touch(t0 - Duration::seconds(30));
        assert_eq!(a.first_seen, t0);
        assert_eq!(a.last_seen, t0 + Duration::seconds(5));
    }

    #[test]
    fn test_apply_sender_and_phy() {
        use crate::frame::{FrameCategory, FrameSubtype};
        use crate::types::{CarrierSet, CarrierType, EncodingSet, EncodingType};

        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut f = FrameRecord::new(FrameCategory::Data, FrameSubtype::Data, t0);
        f.channel = Some(11);
        f.sequence = Some(42);
        f.carrier = Some(CarrierType::Dot11g);
        f.encoding = Some(EncodingType::Ofdm);
        f.data_rate = Some(54.0);
        f.signal = Some(SignalSample {
            signal_dbm: Some(-40),
            ..Default::default()
        });

        let mut receiver = Activity::new(t0);
        receiver.apply_phy(&f);
        assert!(receiver.carrier_set.contains(CarrierSet::DOT11G));
        assert_eq!(receiver.signal.max_seen_rate, 54.0);
        assert_eq!(receiver.channel, None);
        assert_eq!(receiver.last_sequence, None);

        let mut sender = Activity::new(t0);
        sender.apply_sender(&f);
        assert_eq!(sender.channel, Some(11));
        assert_eq!(sender.last_sequence, Some(42));
        assert!(sender.encoding_set.contains(EncodingSet::OFDM));
        assert_eq!(sender.signal.max_signal, Some(-40));
        assert_eq!(sender.signal.max_seen_rate, 54.0);
    }

    #[test]
    fn test_dormant_stamped_by_first_touch() {
        let t0 = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut a = Activity::dormant();
        a.touch(t0);
        assert_eq!(a.first_seen, t0);
        assert_eq!(a.last_seen, t0);
    }
}
