//! Carrier and encoding tags for the physical layer

use serde::Serialize;

/// Radiotap channel flag bits relevant to encoding
pub mod channel_flags {
    pub const TURBO: u16 = 0x0010;
    pub const CCK: u16 = 0x0020;
    pub const OFDM: u16 = 0x0040;
    pub const SPECTRUM_2GHZ: u16 = 0x0080;
    pub const SPECTRUM_5GHZ: u16 = 0x0100;
    pub const DYN_CCK_OFDM: u16 = 0x0400;
    pub const GFSK: u16 = 0x0800;
}

/// 802.11 carrier a frame was received on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CarrierType {
    Dot11b,
    Dot11bPlus,
    Dot11a,
    Dot11g,
    Dot11Fhss,
    Dot11Dsss,
    Dot11n,
    Dot11ac,
    Dot11ax,
    Unknown,
}

bit_set! {
    CarrierSet {
        DOT11B = 1 << 0,
        DOT11B_PLUS = 1 << 1,
        DOT11A = 1 << 2,
        DOT11G = 1 << 3,
        DOT11_FHSS = 1 << 4,
        DOT11_DSSS = 1 << 5,
        DOT11N = 1 << 6,
        DOT11AC = 1 << 7,
        DOT11AX = 1 << 8,
        UNKNOWN = 1 << 31,
    }
}

impl CarrierSet {
    pub fn add(&mut self, carrier: CarrierType) {
        self.insert(match carrier {
            CarrierType::Dot11b => Self::DOT11B,
            CarrierType::Dot11bPlus => Self::DOT11B_PLUS,
            CarrierType::Dot11a => Self::DOT11A,
            CarrierType::Dot11g => Self::DOT11G,
            CarrierType::Dot11Fhss => Self::DOT11_FHSS,
            CarrierType::Dot11Dsss => Self::DOT11_DSSS,
            CarrierType::Dot11n => Self::DOT11N,
            CarrierType::Dot11ac => Self::DOT11AC,
            CarrierType::Dot11ax => Self::DOT11AX,
            CarrierType::Unknown => Self::UNKNOWN,
        });
    }
}

/// Modulation/encoding a frame was sent with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EncodingType {
    Cck,
    Pbcc,
    Ofdm,
    DynamicCck,
    Gfsk,
    Unknown,
}

bit_set! {
    EncodingSet {
        CCK = 1 << 0,
        PBCC = 1 << 1,
        OFDM = 1 << 2,
        DYNAMIC_CCK = 1 << 3,
        GFSK = 1 << 4,
        UNKNOWN = 1 << 31,
    }
}

impl EncodingSet {
    pub fn add(&mut self, encoding: EncodingType) {
        self.insert(match encoding {
            EncodingType::Cck => Self::CCK,
            EncodingType::Pbcc => Self::PBCC,
            EncodingType::Ofdm => Self::OFDM,
            EncodingType::DynamicCck => Self::DYNAMIC_CCK,
            EncodingType::Gfsk => Self::GFSK,
            EncodingType::Unknown => Self::UNKNOWN,
        });
    }
}

impl EncodingType {
    /// Classify from radiotap channel flags, most specific bit first
    pub fn from_channel_flags(flags: u16) -> Option<Self> {
        if flags & channel_flags::DYN_CCK_OFDM != 0 {
            Some(EncodingType::DynamicCck)
        } else if flags & channel_flags::OFDM != 0 {
            Some(EncodingType::Ofdm)
        } else if flags & channel_flags::CCK != 0 {
            Some(EncodingType::Cck)
        } else if flags & channel_flags::GFSK != 0 {
            Some(EncodingType::Gfsk)
        } else {
            None
        }
    }
}

impl CarrierType {
    /// Best guess at the carrier from radiotap channel flags
    pub fn from_channel_flags(flags: u16) -> Option<Self> {
        use channel_flags::*;

        if flags & SPECTRUM_5GHZ != 0 && flags & OFDM != 0 {
            Some(CarrierType::Dot11a)
        } else if flags & SPECTRUM_2GHZ != 0 && flags & (OFDM | DYN_CCK_OFDM) != 0 {
            Some(CarrierType::Dot11g)
        } else if flags & SPECTRUM_2GHZ != 0 && flags & CCK != 0 {
            Some(CarrierType::Dot11b)
        } else if flags & GFSK != 0 {
            Some(CarrierType::Dot11Fhss)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_channel_flags() {
        use channel_flags::*;

        assert_eq!(
            CarrierType::from_channel_flags(SPECTRUM_2GHZ | CCK),
            Some(CarrierType::Dot11b)
        );
        assert_eq!(
            CarrierType::from_channel_flags(SPECTRUM_2GHZ | OFDM),
            Some(CarrierType::Dot11g)
        );
        assert_eq!(
            CarrierType::from_channel_flags(SPECTRUM_5GHZ | OFDM),
            Some(CarrierType::Dot11a)
        );
        assert_eq!(CarrierType::from_channel_flags(TURBO), None);

        assert_eq!(
            EncodingType::from_channel_flags(DYN_CCK_OFDM | OFDM),
            Some(EncodingType::DynamicCck)
        );
        assert_eq!(EncodingType::from_channel_flags(CCK), Some(EncodingType::Cck));
        assert_eq!(EncodingType::from_channel_flags(0), None);
    }

    #[test]
    fn test_sets_accumulate() {
        let mut carriers = CarrierSet::default();
        carriers.add(CarrierType::Dot11b);
        carriers.add(CarrierType::Dot11g);
        assert!(carriers.contains(CarrierSet::DOT11B.union(CarrierSet::DOT11G)));
        assert!(!carriers.contains(CarrierSet::DOT11A));

        let mut enc = EncodingSet::default();
        enc.add(EncodingType::Ofdm);
        assert_eq!(enc, EncodingSet::OFDM);
    }
}
