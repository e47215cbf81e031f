use chrono::{DateTime, NaiveDateTime};

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
pub fn format_optional(value: Option<&str>, default: &str) -> String {
    value.unwrap_or(default).to_string()
}

fn parse_timestamp(date: &str) -> Option<NaiveDateTime> {
    // Server timestamps come both with and without an offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
        return Some(dt.naive_local());
    }
    NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Format a server timestamp as `YYYY-MM-DD`.
pub fn format_date(date: &str) -> String {
    if let Some(dt) = parse_timestamp(date) {
        dt.format("%Y-%m-%d").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Format a server timestamp as `YYYY-MM-DD HH:MM`.
pub fn format_datetime(date: &str) -> String {
    match parse_timestamp(date) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => format_date(date),
    }
}

/// Two decimals with thousands separators, e.g. `12,345.60`.
pub fn format_money(amount: f64) -> String {
    if !amount.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.2}", amount.abs());
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}
