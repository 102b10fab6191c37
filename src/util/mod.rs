use chrono::{DateTime, FixedOffset, TimeZone, Utc};

pub mod geo;
pub mod logging;
pub mod time;

pub struct DateTimeUtils {}

impl DateTimeUtils {
    pub fn timestamp_to_str(timestamp: &DateTime<Utc>) -> String {
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Parses the `/Date(1508866320000-0700)/` form used by the WSF APIs.
    /// The offset only carries the local zone; the milliseconds are UTC.
    pub fn wsf_date_to_utc(wsf_date: &str) -> Option<DateTime<Utc>> {
        let inner = wsf_date
            .trim()
            .strip_prefix("/Date(")?
            .strip_suffix(")/")?;

        // Millis may be negative, so look for the offset sign after the first char.
        let split_at = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map(|(idx, _)| idx)
            .unwrap_or(inner.len());

        let (millis, offset) = inner.split_at(split_at);
        let millis: i64 = millis.parse().ok()?;

        if !offset.is_empty() {
            Self::parse_offset(offset)?;
        }

        Utc.timestamp_millis_opt(millis).single()
    }

    fn parse_offset(offset: &str) -> Option<FixedOffset> {
        if offset.len() != 5 || !offset.is_ascii() {
            return None;
        }

        let sign = if offset.starts_with('-') { -1 } else { 1 };
        let hours: i32 = offset.get(1..3)?.parse().ok()?;
        let minutes: i32 = offset.get(3..5)?.parse().ok()?;

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wsf_dates_with_offset() {
        let parsed = DateTimeUtils::wsf_date_to_utc("/Date(1508866320000-0700)/").unwrap();
        assert_eq!(parsed.timestamp(), 1_508_866_320);
        assert_eq!(DateTimeUtils::timestamp_to_str(&parsed), "2017-10-24 17:32:00");
    }

    #[test]
    fn parses_wsf_dates_without_offset() {
        let parsed = DateTimeUtils::wsf_date_to_utc("/Date(0)/").unwrap();
        assert_eq!(parsed.timestamp(), 0);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(DateTimeUtils::wsf_date_to_utc("2017-10-24").is_none());
        assert!(DateTimeUtils::wsf_date_to_utc("/Date(abc-0700)/").is_none());
        assert!(DateTimeUtils::wsf_date_to_utc("/Date(1000-07)/").is_none());
    }

    #[test]
    fn non_ascii_offsets_are_rejected() {
        assert!(DateTimeUtils::wsf_date_to_utc("/Date(1508866320000-0é0)/").is_none());
        assert!(DateTimeUtils::wsf_date_to_utc("/Date(1508866320000+é00)/").is_none());
    }
}
