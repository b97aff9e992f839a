//! Signal quality aggregation

use serde::Serialize;

use super::gps::GpsFix;

/// Radio measurements attached to one frame. Every field is optional since
/// capture drivers report different subsets.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalSample {
    /// Link quality (driver specific scale)
    pub quality: Option<i32>,
    /// Signal strength in dBm
    pub signal_dbm: Option<i32>,
    /// Noise floor in dBm
    pub noise_dbm: Option<i32>,
}

impl SignalSample {
    pub fn is_empty(&self) -> bool {
        self.quality.is_none() && self.signal_dbm.is_none() && self.noise_dbm.is_none()
    }

    /// Signal-to-noise ratio if both sides are present
    pub fn snr(&self) -> Option<i32> {
        match (self.signal_dbm, self.noise_dbm) {
            (Some(sig), Some(noise)) => Some(sig - noise),
            _ => None,
        }
    }
}

/// Position where the strongest signal was observed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakLocation {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

/// Last/max signal values and the observed rate ceiling for one record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SignalAggregate {
    pub last_quality: Option<i32>,
    pub last_signal: Option<i32>,
    pub last_noise: Option<i32>,
    pub max_quality: Option<i32>,
    pub max_signal: Option<i32>,
    pub max_noise: Option<i32>,
    /// Where `max_signal` was recorded, if a usable fix accompanied it
    pub peak: Option<PeakLocation>,
    /// Highest observed data rate in Mbps
    pub max_seen_rate: f64,
}

impl SignalAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sample in. Absent fields leave the matching values alone.
    pub fn apply(&mut self, sample: &SignalSample, gps: Option<&GpsFix>) {
        if let Some(q) = sample.quality {
            self.last_quality = Some(q);
            self.max_quality = Some(self.max_quality.map_or(q, |m| m.max(q)));
        }

        if let Some(s) = sample.signal_dbm {
            self.last_signal = Some(s);
            let stronger = self.max_signal.map_or(true, |m| s > m);
            if stronger {
                self.max_signal = Some(s);
                if let Some(fix) = gps.filter(|f| f.is_usable()) {
                    self.peak = Some(PeakLocation {
                        lat: fix.lat,
                        lon: fix.lon,
                        alt: fix.alt,
                    });
                }
            }
        }

        if let Some(n) = sample.noise_dbm {
            self.last_noise = Some(n);
            self.max_noise = Some(self.max_noise.map_or(n, |m| m.max(n)));
        }
    }

    /// Record an observed data rate (Mbps)
    pub fn apply_rate(&mut self, rate_mbps: f64) {
        if rate_mbps.is_finite() && rate_mbps > self.max_seen_rate {
            self.max_seen_rate = rate_mbps;
        }
    }
}
