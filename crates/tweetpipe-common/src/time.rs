//! Timestamp formats used by the pipeline
//!
//! The remote API emits timestamps like `Tue Jun 04 23:12:08 +0000 2019`.
//! Transformed records carry RFC 3339 strings, and raw documents are stored
//! under a sortable, URL-safe key timestamp (`20190604T231208Z`).

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::error::{Result, TweetpipeError};

/// Timestamp format of the remote API (e.g. "Tue Jun 04 23:12:08 +0000 2019")
pub const TWITTER_TIME_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Timestamp format used in raw storage keys
pub const KEY_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Parse a remote API timestamp
pub fn twitter_time_to_datetime(value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value, TWITTER_TIME_FORMAT)
        .map_err(|e| TweetpipeError::invalid_timestamp(value, e))
}

/// Format a timestamp the way the remote API does
pub fn datetime_to_twitter_format(value: &DateTime<Utc>) -> String {
    value.format(TWITTER_TIME_FORMAT).to_string()
}

/// Format a timestamp for use inside a raw storage key
pub fn datetime_to_key_format(value: &DateTime<Utc>) -> String {
    value.format(KEY_TIME_FORMAT).to_string()
}

/// Convert a remote API timestamp into an RFC 3339 string in UTC
pub fn twitter_time_to_rfc3339(value: &str) -> Result<String> {
    let parsed = twitter_time_to_datetime(value)?.with_timezone(&Utc);
    Ok(parsed.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_twitter_time() {
        let parsed = twitter_time_to_datetime("Tue Jun 04 23:12:08 +0000 2019").unwrap();
        assert_eq!(
            parsed.with_timezone(&Utc),
            Utc.with_ymd_and_hms(2019, 6, 4, 23, 12, 8).unwrap()
        );
    }

    #[test]
    fn test_parse_twitter_time_invalid() {
        let err = twitter_time_to_datetime("2019-06-04").unwrap_err();
        assert!(matches!(err, TweetpipeError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_twitter_format_roundtrip() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 1, 8, 5, 0).unwrap();
        let formatted = datetime_to_twitter_format(&ts);
        assert_eq!(formatted, "Mon Mar 01 08:05:00 +0000 2021");
        assert_eq!(twitter_time_to_datetime(&formatted).unwrap(), ts);
    }

    #[test]
    fn test_key_format_is_sortable_and_url_safe() {
        let earlier = Utc.with_ymd_and_hms(2021, 3, 1, 8, 5, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2021, 11, 30, 23, 0, 0).unwrap();

        let a = datetime_to_key_format(&earlier);
        let b = datetime_to_key_format(&later);

        assert_eq!(a, "20210301T080500Z");
        assert!(a < b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_twitter_time_to_rfc3339() {
        let converted = twitter_time_to_rfc3339("Tue Jun 04 23:12:08 +0000 2019").unwrap();
        assert_eq!(converted, "2019-06-04T23:12:08Z");
    }
}
