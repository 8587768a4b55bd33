use chrono::{DateTime, NaiveDate, Utc};

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format an optional string, returning a default if None or empty
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn parse_timestamp(date: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.with_timezone(&Utc));
    }
    let day = date.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Relative age of a timestamp: "Today", "3 days ago", "2 weeks ago",
/// "in 2 days", or the date
pub fn format_relative_date(date: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(date) = date.filter(|d| !d.is_empty()) else {
        return "No date".to_string();
    };
    let Some(when) = parse_timestamp(date) else {
        return date.to_string();
    };

    let days = (now - when).num_days();
    match days {
        0 => "Today".to_string(),
        1 => "1 day ago".to_string(),
        2..=6 => format!("{} days ago", days),
        7..=29 => format!("{} weeks ago", (days + 6) / 7),
        -1 => "Tomorrow".to_string(),
        -6..=-2 => format!("in {} days", -days),
        _ => when.format("%b %d, %Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(None, "-"), "-");
        assert_eq!(format_optional(Some(""), "-"), "-");
        assert_eq!(format_optional(Some("x"), "-"), "x");
    }

    #[test]
    fn test_relative_date() {
        assert_eq!(format_relative_date(None, now()), "No date");
        assert_eq!(format_relative_date(Some("2024-06-30T08:00:00Z"), now()), "Today");
        assert_eq!(format_relative_date(Some("2024-06-29T08:00:00Z"), now()), "1 day ago");
        assert_eq!(format_relative_date(Some("2024-06-26"), now()), "4 days ago");
        assert_eq!(format_relative_date(Some("2024-06-16"), now()), "2 weeks ago");
        assert_eq!(format_relative_date(Some("2024-01-02"), now()), "Jan 02, 2024");
        assert_eq!(format_relative_date(Some("someday"), now()), "someday");
    }

    #[test]
    fn test_future_dates_are_not_reported_as_past() {
        assert_eq!(format_relative_date(Some("2024-07-01T13:00:00Z"), now()), "Tomorrow");
        assert_eq!(format_relative_date(Some("2024-07-04T13:00:00Z"), now()), "in 4 days");
        assert_eq!(format_relative_date(Some("2024-08-15"), now()), "Aug 15, 2024");
        // Later the same day still reads as today
        assert_eq!(format_relative_date(Some("2024-06-30T20:00:00Z"), now()), "Today");
    }
}
