const MONTH_ABBREVIATIONS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Case-insensitive substring test
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Short month name for a 1-based month number
pub fn month_abbrev(month: u32) -> Option<&'static str> {
    MONTH_ABBREVIATIONS.get(month.checked_sub(1)? as usize).copied()
}

/// Parse a month key as sent by the backend: either "1".."12" or "Jan".."Dec".
pub fn month_number(key: &str) -> Option<u32> {
    let key = key.trim();
    if let Ok(n) = key.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    MONTH_ABBREVIATIONS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(key))
        .map(|i| i as u32 + 1)
}

/// Format a number with thousands separators, rounded to an integer
pub fn format_thousands(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if rounded < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Format a dollar amount for display, e.g. `$1,250,000`
pub fn format_currency(value: f64) -> String {
    if value < 0.0 {
        format!("-${}", format_thousands(-value))
    } else {
        format!("${}", format_thousands(value))
    }
}

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

/// Format an optional string, returning a default if None
pub fn format_optional(value: &Option<String>, default: &str) -> String {
    value.as_deref().unwrap_or(default).to_string()
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(d) = chrono::NaiveDate::parse_from_str(date.get(..10).unwrap_or(date), "%Y-%m-%d") {
        d.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0.0), "0");
        assert_eq!(format_thousands(999.0), "999");
        assert_eq!(format_thousands(1000.0), "1,000");
        assert_eq!(format_thousands(1234567.4), "1,234,567");
        assert_eq!(format_thousands(-45210.0), "-45,210");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1250000.0), "$1,250,000");
        assert_eq!(format_currency(-12.0), "-$12");
    }

    #[test]
    fn test_month_helpers() {
        assert_eq!(month_abbrev(1), Some("Jan"));
        assert_eq!(month_abbrev(12), Some("Dec"));
        assert_eq!(month_abbrev(0), None);
        assert_eq!(month_abbrev(13), None);

        assert_eq!(month_number("3"), Some(3));
        assert_eq!(month_number("sep"), Some(9));
        assert_eq!(month_number("13"), None);
        assert_eq!(month_number("Week 1"), None);
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-03-05T10:00:00Z"), "Mar 05, 2024");
        assert_eq!(format_date("2024-03-05"), "Mar 05, 2024");
        assert_eq!(format_date("soon"), "soon");
    }
}
