//! Decaying event counter

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Event counter that bleeds off a fixed amount per elapsed second of
/// capture time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecayingCounter {
    value: u32,
    #[serde(skip)]
    last_decay: Option<DateTime<Utc>>,
}

impl DecayingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Apply decay up to `now`. Timestamps older than the last decay point
    /// (replayed or reordered frames) are ignored.
    pub fn decay(&mut self, now: DateTime<Utc>, per_sec: u32) {
        let Some(last) = self.last_decay else {
            self.last_decay = Some(now);
            return;
        };

        let elapsed = (now - last).num_seconds();
        if elapsed <= 0 {
            return;
        }

        let drop = u32::try_from(elapsed)
            .unwrap_or(u32::MAX)
            .saturating_mul(per_sec);
        self.value = self.value.saturating_sub(drop);
        self.last_decay = Some(last + Duration::seconds(elapsed));
    }

    pub fn bump(&mut self, now: DateTime<Utc>, per_sec: u32) {
        self.decay(now, per_sec);
        self.value = self.value.saturating_add(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_bump_and_decay() {
        let mut c = DecayingCounter::new();
        c.bump(at(0), 1);
        c.bump(at(0), 1);
        c.bump(at(0), 1);
        assert_eq!(c.value(), 3);

        c.decay(at(2), 1);
        assert_eq!(c.value(), 1);

        c.decay(at(10), 1);
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn test_reordered_time_does_not_decay() {
        let mut c = DecayingCounter::new();
        c.bump(at(5), 1);
        c.bump(at(5), 1);
        c.decay(at(1), 1);
        assert_eq!(c.value(), 2);
    }

    #[test]
    fn test_partial_seconds_carry_over() {
        let mut c = DecayingCounter::new();
        c.bump(at(0), 1);
        c.bump(at(0), 1);
        c.decay(at(0) + Duration::milliseconds(1500), 1);
        assert_eq!(c.value(), 1);
        c.decay(at(2), 1);
        assert_eq!(c.value(), 0);
    }
}
