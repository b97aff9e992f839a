//! Encryption classification
//!
//! `CryptType` is what one frame showed; `CryptSet` is the union of every
//! type a record has ever shown.

use serde::Serialize;

/// Encryption observed on a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum CryptType {
    #[default]
    None,
    Wep,
    /// Encrypted above the link layer (VPN/IPsec style payloads)
    Layer3,
    /// WEP traffic the capture side already decrypted
    Decoded,
    Unknown,
}

impl CryptType {
    /// Bit this type contributes to a `CryptSet`
    pub fn bit(self) -> u32 {
        match self {
            CryptType::None => CryptSet::NONE.0,
            CryptType::Wep => CryptSet::WEP.0,
            CryptType::Layer3 => CryptSet::LAYER3.0,
            CryptType::Decoded => CryptSet::DECODED.0,
            CryptType::Unknown => CryptSet::UNKNOWN.0,
        }
    }

    pub fn is_encrypted(self) -> bool {
        self != CryptType::None
    }
}

bit_set! {
    /// Every encryption type a record has been seen with
    CryptSet {
        NONE = 0,
        WEP = 1,
        LAYER3 = 64,
        DECODED = 128,
        UNKNOWN = 256,
    }
}

impl CryptSet {
    pub fn add(&mut self, crypt: CryptType) {
        self.0 |= crypt.bit();
    }

    pub fn has(&self, crypt: CryptType) -> bool {
        match crypt {
            CryptType::None => self.is_empty(),
            other => self.0 & other.bit() != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_accumulates() {
        let mut set = CryptSet::default();
        assert!(set.has(CryptType::None));

        set.add(CryptType::Wep);
        set.add(CryptType::None);
        set.add(CryptType::Layer3);

        assert!(set.has(CryptType::Wep));
        assert!(set.has(CryptType::Layer3));
        assert!(!set.has(CryptType::Decoded));
        assert!(!set.has(CryptType::None));
        assert_eq!(set.bits(), 65);
    }

    #[test]
    fn test_superset() {
        let mut before = CryptSet::default();
        before.add(CryptType::Wep);
        let mut after = before;
        after.add(CryptType::Unknown);
        assert!(after.contains(before));
        assert!(!before.contains(after));
    }
}
