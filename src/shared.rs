//! Shared tracker handle
//!
//! For hosts that receive frames on more than one thread. Every call takes
//! the lock for the duration of one frame, which keeps the single-writer
//! ordering of the underlying tracker.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::TrackerSettings;
use crate::error::Result;
use crate::frame::FrameRecord;
use crate::handler::{FrameOutcome, Tracker, TrackerStats};
use crate::registry::NetworkHandle;
use crate::types::MacAddr;
use crate::vendor::VendorLookup;

/// Cloneable, mutex-guarded `Tracker`
#[derive(Clone, Debug)]
pub struct SharedTracker {
    inner: Arc<Mutex<Tracker>>,
}

impl SharedTracker {
    pub fn new(settings: TrackerSettings, vendor_lookup: Arc<dyn VendorLookup>) -> Result<Self> {
        Ok(Self::from_tracker(Tracker::new(settings, vendor_lookup)?))
    }

    pub fn from_tracker(tracker: Tracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    pub fn handle_frame(&self, frame: &FrameRecord) -> FrameOutcome {
        self.inner.lock().handle_frame(frame)
    }

    /// Feed a batch under one lock acquisition
    pub fn handle_frames<'a, I>(&self, frames: I) -> usize
    where
        I: IntoIterator<Item = &'a FrameRecord>,
    {
        let mut tracker = self.inner.lock();
        frames
            .into_iter()
            .map(|f| tracker.handle_frame(f))
            .filter(|o| o.is_tracked())
            .count()
    }

    pub fn mark_removed(&self, bssid: &MacAddr) -> Result<NetworkHandle> {
        self.inner.lock().mark_removed(bssid)
    }

    pub fn stats(&self) -> TrackerStats {
        self.inner.lock().stats()
    }

    /// Run a read-only query against the tracker
    pub fn with<R>(&self, f: impl FnOnce(&Tracker) -> R) -> R {
        f(&self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameCategory, FrameSubtype};
    use crate::vendor::NoVendorLookup;
    use chrono::Utc;
    use std::thread;

    fn beacon(last: u8) -> FrameRecord {
        let bssid = MacAddr::new([0x00, 0x40, 0x96, 0x00, 0x00, last]);
        let mut f = FrameRecord::new(FrameCategory::Management, FrameSubtype::Beacon, Utc::now());
        f.source = Some(bssid);
        f.bssid = Some(bssid);
        f.ssid = Some(b"shared".to_vec());
        f
    }

    #[test]
    fn test_concurrent_feeders_create_one_record_per_address() {
        let shared =
            SharedTracker::new(TrackerSettings::default(), Arc::new(NoVendorLookup)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for last in 0..16u8 {
                        shared.handle_frame(&beacon(last));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let stats = shared.stats();
        assert_eq!(stats.networks, 16);
        assert_eq!(stats.management_frames, 64);
        let total: u64 = shared.with(|t| t.networks().map(|n| n.activity.management_packets).sum());
        assert_eq!(total, 64);
    }

    #[test]
    fn test_batch_and_removal() {
        let shared =
            SharedTracker::new(TrackerSettings::default(), Arc::new(NoVendorLookup)).unwrap();
        let frames: Vec<_> = (0..3u8).map(beacon).collect();
        assert_eq!(shared.handle_frames(&frames), 3);

        let bssid = MacAddr::new([0x00, 0x40, 0x96, 0x00, 0x00, 1]);
        assert!(shared.mark_removed(&bssid).is_ok());
        assert!(shared.with(|t| t.network(&bssid).unwrap().is_removed()));
    }
}
