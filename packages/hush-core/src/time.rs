//! Clock helpers.
//!
//! All timestamps in Hush Core are UTC. Functions that depend on "now" have
//! an `_at` variant taking the instant explicitly so they can be tested.

use chrono::{DateTime, Duration, Utc};

/// Seconds in one day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Returns the current instant.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// `from + days` whole days, `None` past the representable range.
pub fn add_days(from: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    from.checked_add_signed(Duration::days(i64::from(days)))
}

/// Whole days from `now` until `until`, rounded up, never negative.
pub fn days_until_ceil(now: DateTime<Utc>, until: DateTime<Utc>) -> u32 {
    let millis = (until - now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let day_millis = SECONDS_PER_DAY * 1000;
    let days = (millis + day_millis - 1) / day_millis;
    u32::try_from(days).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_reasonable() {
        let ts = now().timestamp();
        // Should be after 2024-01-01 (1704067200)
        assert!(ts > 1704067200, "Timestamp {} is too old", ts);
        // Should be before 2100-01-01 (4102444800)
        assert!(ts < 4102444800, "Timestamp {} is too far in future", ts);
    }

    #[test]
    fn test_days_until_ceil() {
        let t0 = now();
        assert_eq!(days_until_ceil(t0, t0), 0);
        assert_eq!(days_until_ceil(t0, t0 - Duration::days(1)), 0);
        assert_eq!(days_until_ceil(t0, t0 + Duration::seconds(1)), 1);
        assert_eq!(days_until_ceil(t0, t0 + Duration::days(2)), 2);
        assert_eq!(days_until_ceil(t0, t0 + Duration::days(2) + Duration::hours(1)), 3);
    }

    #[test]
    fn test_add_days() {
        let t0 = now();
        assert_eq!(add_days(t0, 30).unwrap() - t0, Duration::days(30));
    }

    #[test]
    fn test_add_days_out_of_range() {
        assert!(add_days(now(), u32::MAX).is_none());
    }
}
