use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_DECAY_DAYS: f64 = 30.0;
pub const DEFAULT_FALLBACK_WEIGHT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecencyParams {
    /// `k` in `exp(-days / k)`.
    pub decay_days: f64,
    /// Weight for records whose date is missing or unreadable.
    pub fallback_weight: f64,
}

impl Default for RecencyParams {
    fn default() -> Self {
        Self {
            decay_days: DEFAULT_DECAY_DAYS,
            fallback_weight: DEFAULT_FALLBACK_WEIGHT,
        }
    }
}

/// Whole days between `timestamp` and `now`, floored. Future dates count as age 0.
pub fn age_days(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - timestamp).num_days().max(0)
}

pub fn weight_for_age(days: i64, decay_days: f64) -> f64 {
    (-(days.max(0) as f64) / decay_days).exp()
}

pub fn recency_weight(
    timestamp: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    params: &RecencyParams,
) -> f64 {
    match timestamp {
        Some(ts) => weight_for_age(age_days(ts, now), params.decay_days),
        None => params.fallback_weight,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fresh_match_has_full_weight() {
        let p = RecencyParams::default();
        assert_eq!(recency_weight(Some(now()), now(), &p), 1.0);
        assert_eq!(weight_for_age(0, 30.0), 1.0);
    }

    #[test]
    fn thirty_days_is_about_one_over_e() {
        let p = RecencyParams::default();
        let w = recency_weight(Some(now() - Duration::days(30)), now(), &p);
        assert!((w - 0.3679).abs() < 1e-3);
    }

    #[test]
    fn weight_strictly_decreases_with_age() {
        let mut prev = weight_for_age(0, DEFAULT_DECAY_DAYS);
        for d in 1..400 {
            let w = weight_for_age(d, DEFAULT_DECAY_DAYS);
            assert!(w < prev, "age {d}: {w} !< {prev}");
            assert!(w > 0.0);
            prev = w;
        }
    }

    #[test]
    fn partial_days_are_floored() {
        let ts = now() - Duration::hours(47);
        assert_eq!(age_days(ts, now()), 1);
    }

    #[test]
    fn future_dates_do_not_exceed_one() {
        let p = RecencyParams::default();
        let w = recency_weight(Some(now() + Duration::days(10)), now(), &p);
        assert_eq!(w, 1.0);
    }

    #[test]
    fn missing_timestamp_uses_fallback() {
        let p = RecencyParams::default();
        assert_eq!(recency_weight(None, now(), &p), 0.5);
    }
}
