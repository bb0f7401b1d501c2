//! Field encodings of the backup CSV files.
//!
//! | Kind     | Written as                  | Also accepted on read             |
//! |----------|-----------------------------|-----------------------------------|
//! | date     | `2026-05-04 09:30:00.250`   | RFC 3339, `2026-05-04` (midnight) |
//! | money    | `12.50`                     | `12`, `12.5`, `-0.05`             |
//! | bool     | `true` / `false`            | any case, `1` / `0`               |
//! | optional | empty field                 |                                   |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::str::FromStr;

use vetpos_core::{Money, MAX_AMOUNT_CENTS};

/// Pattern used to write dates (UTC, millisecond precision).
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_opt_date(date: Option<DateTime<Utc>>) -> String {
    date.map(format_date).unwrap_or_default()
}

pub fn parse_date(text: &str) -> Result<DateTime<Utc>, String> {
    let text = text.trim();

    for pattern in [DATE_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err("expected YYYY-MM-DD HH:MM:SS.mmm".to_string())
}

pub fn format_money(cents: i64) -> String {
    Money::from_cents(cents).to_decimal_string()
}

/// Amounts beyond [`MAX_AMOUNT_CENTS`] either way are refused.
pub fn parse_money(text: &str) -> Result<i64, String> {
    let cents = Money::from_str(text).map(|m| m.cents()).map_err(|e| e.reason.to_string())?;
    if cents.unsigned_abs() > MAX_AMOUNT_CENTS.unsigned_abs() {
        return Err(format!(
            "exceeds the largest amount the store accepts ({})",
            format_money(MAX_AMOUNT_CENTS)
        ));
    }
    Ok(cents)
}

pub fn format_bool(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

pub fn parse_bool(text: &str) -> Result<bool, String> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}

pub fn parse_int(text: &str) -> Result<i64, String> {
    text.trim()
        .parse::<i64>()
        .map_err(|_| "not a whole number".to_string())
}

pub fn format_opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Empty (or blank) means absent.
pub fn parse_opt(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_dates_keep_milliseconds() {
        let date = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let text = format_date(date);

        assert_eq!(text, "2026-05-04 09:30:00.250");
        assert_eq!(parse_date(&text).unwrap(), date);
    }

    #[test]
    fn test_alternative_date_forms() {
        let iso = parse_date("2026-05-04T09:30:00+02:00").unwrap();
        assert_eq!(iso.hour(), 7);

        let day = parse_date("2026-05-04").unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2026, 5, 4, 0, 0, 0).unwrap());

        assert_eq!(
            parse_date("2026-05-04 09:30:00").unwrap(),
            Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap()
        );
        assert!(parse_date("04/05/2026").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn test_money_and_bool_fields() {
        assert_eq!(format_money(1250), "12.50");
        assert_eq!(parse_money("12.5").unwrap(), 1250);
        assert_eq!(parse_money("7").unwrap(), 700);
        assert!(parse_money("1.234").is_err());
        assert!(parse_money("ten").is_err());
        assert_eq!(parse_money("10000000000.00").unwrap(), MAX_AMOUNT_CENTS);
        assert!(parse_money("10000000000.01").is_err());
        assert!(parse_money("-90000000000000000.00").is_err());

        assert_eq!(format_bool(true), "true");
        assert!(parse_bool("TRUE").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(parse_bool("yes").is_err());
    }

    #[test]
    fn test_optional_fields() {
        assert_eq!(parse_opt(""), None);
        assert_eq!(parse_opt("  "), None);
        assert_eq!(parse_opt("Golden"), Some("Golden".to_string()));
        assert_eq!(format_opt(&None), "");
        assert_eq!(format_opt_date(None), "");
    }
}
