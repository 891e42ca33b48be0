use time::{OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone, Tz};

/// Look up a timezone by its canonical name, e.g. "Pacific/Auckland".
pub fn get_timezone(canonical_timezone: &str) -> Option<&'static Tz> {
    time_tz::timezones::get_by_name(canonical_timezone)
}

/// Get the current UTC offset for a canonical timezone name, e.g. "Pacific/Auckland".
///
/// Returns `None` if `canonical_timezone` is not a known timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    get_timezone(canonical_timezone).map(|tz| to_local_time(OffsetDateTime::now_utc(), tz).offset())
}

/// Convert `timestamp` to the local time of `timezone`.
///
/// The offset is the one in effect at `timestamp`, so daylight saving is
/// applied per timestamp rather than per request.
pub fn to_local_time(timestamp: OffsetDateTime, timezone: &Tz) -> OffsetDateTime {
    timestamp.to_offset(timezone.get_offset_utc(&timestamp).to_utc())
}

#[cfg(test)]
mod tests {
    use time::{UtcOffset, macros::datetime};

    use super::{get_local_offset, get_timezone, to_local_time};

    #[test]
    fn utc_has_zero_offset() {
        assert_eq!(get_local_offset("Etc/UTC"), Some(UtcOffset::UTC));
    }

    #[test]
    fn unknown_timezone_returns_none() {
        assert_eq!(get_local_offset("Middle/Earth"), None);
        assert!(get_timezone("Middle/Earth").is_none());
    }

    #[test]
    fn local_time_uses_offset_at_timestamp() {
        let auckland = get_timezone("Pacific/Auckland").unwrap();

        let winter = to_local_time(datetime!(2025-07-09 11:30 UTC), auckland);
        let summer = to_local_time(datetime!(2025-01-09 11:30 UTC), auckland);

        assert_eq!(winter.offset(), UtcOffset::from_hms(12, 0, 0).unwrap());
        assert_eq!(winter.date(), time::macros::date!(2025 - 07 - 09));
        assert_eq!(summer.offset(), UtcOffset::from_hms(13, 0, 0).unwrap());
        assert_eq!(summer.date(), time::macros::date!(2025 - 01 - 10));
    }
}
