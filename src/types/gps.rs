//! Geographic bounding-box aggregation

use serde::Serialize;

/// A single position/velocity sample from the GPS provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    /// Provider reported a usable fix
    pub valid: bool,
    pub lat: f64,
    pub lon: f64,
    /// Altitude in meters
    pub alt: f64,
    /// Ground speed in km/h
    pub spd: f64,
}

impl GpsFix {
    pub fn new(lat: f64, lon: f64, alt: f64, spd: f64) -> Self {
        Self {
            valid: true,
            lat,
            lon,
            alt,
            spd,
        }
    }

    /// A fix is usable when flagged valid, finite, and inside the globe.
    pub fn is_usable(&self) -> bool {
        self.valid
            && self.lat.is_finite()
            && self.lon.is_finite()
            && self.alt.is_finite()
            && self.spd.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Running bounds and centroid over every fix applied to a record.
///
/// Bounds start at out-of-range sentinels so the first real sample always
/// replaces them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsAggregate {
    pub valid: bool,
    pub min_lat: f64,
    pub min_lon: f64,
    pub min_alt: f64,
    pub min_spd: f64,
    pub max_lat: f64,
    pub max_lon: f64,
    pub max_alt: f64,
    pub max_spd: f64,
    pub sum_lat: f64,
    pub sum_lon: f64,
    pub sum_alt: f64,
    pub points: u64,
}

impl GpsAggregate {
    const COORD_SENTINEL: f64 = 1024.0;
    const ALT_SPD_SENTINEL: f64 = 100_000.0;

    pub fn new() -> Self {
        Self {
            valid: false,
            min_lat: Self::COORD_SENTINEL,
            min_lon: Self::COORD_SENTINEL,
            min_alt: Self::ALT_SPD_SENTINEL,
            min_spd: Self::ALT_SPD_SENTINEL,
            max_lat: -Self::COORD_SENTINEL,
            max_lon: -Self::COORD_SENTINEL,
            max_alt: -Self::ALT_SPD_SENTINEL,
            max_spd: -Self::ALT_SPD_SENTINEL,
            sum_lat: 0.0,
            sum_lon: 0.0,
            sum_alt: 0.0,
            points: 0,
        }
    }

    /// Fold a fix into the aggregate. Unusable fixes leave it untouched and
    /// return false.
    pub fn apply(&mut self, fix: &GpsFix) -> bool {
        if !fix.is_usable() {
            return false;
        }

        self.valid = true;

        self.min_lat = self.min_lat.min(fix.lat);
        self.min_lon = self.min_lon.min(fix.lon);
        self.min_alt = self.min_alt.min(fix.alt);
        self.min_spd = self.min_spd.min(fix.spd);
        self.max_lat = self.max_lat.max(fix.lat);
        self.max_lon = self.max_lon.max(fix.lon);
        self.max_alt = self.max_alt.max(fix.alt);
        self.max_spd = self.max_spd.max(fix.spd);

        self.sum_lat += fix.lat;
        self.sum_lon += fix.lon;
        self.sum_alt += fix.alt;
        self.points += 1;

        true
    }

    /// Average position (lat, lon, alt) of every applied fix
    pub fn centroid(&self) -> Option<(f64, f64, f64)> {
        if self.points == 0 {
            return None;
        }
        let n = self.points as f64;
        Some((self.sum_lat / n, self.sum_lon / n, self.sum_alt / n))
    }
}

impl Default for GpsAggregate {
    fn default() -> Self {
        Self::new()
    }
}
