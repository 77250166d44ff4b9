use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Formate un timestamp ISO 8601 pour SQLite.
/// Fixed width (seconds, `Z`), so TEXT columns compare chronologically.
pub fn to_sqlite(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse un timestamp ISO 8601 depuis SQLite
pub fn from_sqlite(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    s.parse::<DateTime<Utc>>()
}

/// Human date used in message bodies and admin reports.
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M UTC").to_string()
}

const INTERVAL_UNITS: [(&str, &str, i64); 7] = [
    ("year", "years", 31_536_000),
    ("month", "months", 2_592_000),
    ("week", "weeks", 604_800),
    ("day", "days", 86_400),
    ("hour", "hours", 3_600),
    ("min", "min", 60),
    ("sec", "sec", 1),
];

/// Render a duration as its two largest units, e.g. `26 weeks 1 day`.
pub fn format_interval(period: Duration) -> String {
    let mut remaining = period.num_seconds().max(0);
    let mut parts = Vec::new();
    for (singular, plural, secs) in INTERVAL_UNITS {
        if parts.len() == 2 {
            break;
        }
        if remaining >= secs {
            let n = remaining / secs;
            remaining %= secs;
            parts.push(format!("{} {}", n, if n == 1 { singular } else { plural }));
        } else if !parts.is_empty() {
            // Never skip a level: "1 year 1 sec" is not produced.
            break;
        }
    }
    if parts.is_empty() {
        "0 sec".to_string()
    } else {
        parts.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let dt = Utc::now();
        let s = to_sqlite(&dt);
        let parsed = from_sqlite(&s).unwrap();
        assert_eq!(dt.timestamp(), parsed.timestamp());
    }

    #[test]
    fn test_sqlite_text_sorts_chronologically() {
        let early = from_sqlite("2024-03-01T09:00:00Z").unwrap();
        let late = early + Duration::milliseconds(1500);
        assert!(to_sqlite(&early) < to_sqlite(&late));
        assert_eq!(to_sqlite(&early).len(), to_sqlite(&late).len());
    }

    #[test]
    fn test_format_interval_two_units() {
        assert_eq!(format_interval(Duration::days(183)), "6 months");
        assert_eq!(format_interval(Duration::days(7)), "1 week");
        assert_eq!(format_interval(Duration::days(8)), "1 week 1 day");
    }

    #[test]
    fn test_format_interval_year() {
        assert_eq!(format_interval(Duration::days(365)), "1 year");
        assert_eq!(format_interval(Duration::days(730)), "2 years");
    }

    #[test]
    fn test_format_interval_skips_non_adjacent_units() {
        // 1 year + 1 day: weeks slot is empty, so days are dropped
        assert_eq!(format_interval(Duration::days(366)), "1 year");
    }

    #[test]
    fn test_format_interval_zero() {
        assert_eq!(format_interval(Duration::zero()), "0 sec");
    }
}
