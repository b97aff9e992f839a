//! Encryption and weak-key analysis
//!
//! Crypt bits are folded into a record's `CryptSet`. WEP initialization
//! vectors are checked against the FMS weak key-schedule class and recorded
//! in a bounded per-network history to spot key-stream reuse.

use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::trace;

use crate::frame::{FrameRecord, FrameSubtype};
use crate::types::{CryptSet, CryptType};

/// Lowest first IV byte in the weak class (B + 3 with B = 0)
pub const WEAK_IV_FIRST_MIN: u8 = 3;
/// Highest first IV byte in the weak class (B + 3 with B = 12, 104-bit keys)
pub const WEAK_IV_FIRST_MAX: u8 = 15;
/// Second IV byte of every weak IV
pub const WEAK_IV_SENTINEL: u8 = 0xFF;

/// Default bound on distinct IVs remembered per network
pub const DEFAULT_IV_HISTORY_CAPACITY: usize = 65_536;

/// Pack the first three IV bytes into a history key. Fewer than three
/// bytes can't be interpreted.
pub fn iv_key(bytes: &[u8]) -> Option<u32> {
    match bytes {
        [b0, b1, b2, ..] => Some((*b0 as u32) << 16 | (*b1 as u32) << 8 | *b2 as u32),
        _ => None,
    }
}

/// FMS weak IV check: `(B + 3, 0xFF, X)`
pub fn is_weak_iv(key: u32) -> bool {
    let b0 = (key >> 16) as u8;
    let b1 = (key >> 8) as u8;
    (WEAK_IV_FIRST_MIN..=WEAK_IV_FIRST_MAX).contains(&b0) && b1 == WEAK_IV_SENTINEL
}

/// Crypt type to credit for a frame.
///
/// Advertisements with the privacy capability bit and no explicit indicator
/// count as WEP.
pub fn effective_crypt(frame: &FrameRecord) -> CryptType {
    let advertises = matches!(frame.subtype, FrameSubtype::Beacon | FrameSubtype::ProbeResponse);
    if frame.crypt == CryptType::None && advertises && frame.is_privacy() {
        CryptType::Wep
    } else {
        frame.crypt
    }
}

/// Fold one frame's crypt type into a record. Returns true when the frame
/// was encrypted.
pub fn apply_crypt(set: &mut CryptSet, last: &mut CryptType, crypt: CryptType) -> bool {
    set.add(crypt);
    *last = crypt;
    crypt.is_encrypted()
}

/// Result of recording one IV
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IvRecord {
    /// Value was already in the history
    pub duplicate: bool,
    /// Oldest value pushed out to make room
    pub evicted: Option<u32>,
}

/// Bounded IV occurrence history for one network.
///
/// Holds at most `capacity` distinct values. When full, the value inserted
/// longest ago is dropped first; if it shows up again later it counts as new.
/// Repeats only bump the count (`peek_mut`), so recency order stays
/// insertion order.
#[derive(Debug)]
pub struct IvHistory {
    seen: LruCache<u32, u32>,
}

impl IvHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            seen: LruCache::new(capacity),
        }
    }

    pub fn record(&mut self, key: u32) -> IvRecord {
        if let Some(count) = self.seen.peek_mut(&key) {
            *count = count.saturating_add(1);
            return IvRecord {
                duplicate: true,
                evicted: None,
            };
        }

        let evicted = self.seen.push(key, 1).map(|(oldest, _)| oldest);
        IvRecord {
            duplicate: false,
            evicted,
        }
    }

    /// Times `key` has been seen while it stayed in the history
    pub fn count(&self, key: u32) -> u32 {
        self.seen.peek(&key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: u32) -> bool {
        self.seen.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.seen.cap().get()
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }
}

impl Clone for IvHistory {
    fn clone(&self) -> Self {
        let mut seen = LruCache::new(self.seen.cap());
        for (key, count) in self.seen.iter().rev() {
            seen.push(*key, *count);
        }
        Self { seen }
    }
}

/// What the analyzer concluded about one frame's IV
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IvVerdict {
    pub key: u32,
    pub weak: bool,
    pub duplicate: bool,
    pub evicted: bool,
}

/// Classify an IV and, when a history is kept, record it.
///
/// Returns `None` for IV bytes too short to parse.
pub fn analyze_iv(bytes: &[u8], history: Option<&mut IvHistory>) -> Option<IvVerdict> {
    let key = iv_key(bytes)?;
    let weak = is_weak_iv(key);

    let recorded = history.map(|h| h.record(key)).unwrap_or_default();

    if weak {
        trace!("Weak IV {:06x}", key);
    }
    if recorded.duplicate {
        trace!("Duplicate IV {:06x}", key);
    }

    Some(IvVerdict {
        key,
        weak,
        duplicate: recorded.duplicate,
        evicted: recorded.evicted.is_some(),
    })
}
