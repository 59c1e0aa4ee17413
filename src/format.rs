//! Text conversions between user input, milliseconds and display strings.

use chrono::{Local, TimeZone};

use crate::error::{Error, Result};

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// `MM:SS.cc` with centiseconds. Minutes are not wrapped into hours.
pub fn format_time(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let centis = (ms % 1_000) / 10;
    format!("{:02}:{:02}.{:02}", minutes, seconds, centis)
}

pub fn format_timestamp(epoch_ms: i64) -> String {
    Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|dt| dt.format(TIMESTAMP_FMT).to_string())
        .unwrap_or_else(|| "Unknown".into())
}

/// Leading-integer parse: optional sign then digits, anything after is
/// ignored, and no digits at all counts as zero. Values too large for an
/// `i64` saturate.
pub fn parse_field(text: &str) -> i64 {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };

    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |n, b| n.saturating_mul(10).saturating_add(i64::from(b - b'0')));

    sign * magnitude
}

/// Duration in milliseconds from the minutes and seconds input fields.
/// May be zero or negative; callers decide what to do with that.
pub fn input_duration_ms(minutes: &str, seconds: &str) -> i64 {
    parse_field(minutes)
        .saturating_mul(60_000)
        .saturating_add(parse_field(seconds).saturating_mul(1_000))
}

/// Parses `1h`, `25m`, `1m30s`, `90s`, `2.5m`. A trailing bare number is
/// taken as minutes.
pub fn parse_duration(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let mut total_ms = 0.0;
    let mut num = String::new();

    let invalid = |what: &str| Error::InvalidInput(format!("invalid {what} in '{s}'"));

    for c in s.chars() {
        match c {
            '0'..='9' | '.' => num.push(c),
            'h' => { total_ms += num.parse::<f64>().map_err(|_| invalid("hours"))? * 3_600_000.0; num.clear(); }
            'm' => { total_ms += num.parse::<f64>().map_err(|_| invalid("minutes"))? * 60_000.0; num.clear(); }
            's' => { total_ms += num.parse::<f64>().map_err(|_| invalid("seconds"))? * 1_000.0; num.clear(); }
            _ => return Err(Error::InvalidInput(format!("unexpected '{c}' in '{s}'"))),
        }
    }

    if !num.is_empty() {
        total_ms += num.parse::<f64>().map_err(|_| invalid("minutes"))? * 60_000.0;
    }

    let ms = total_ms.round() as u64;
    if ms > 0 {
        Ok(ms)
    } else {
        Err(Error::InvalidInput("duration must be greater than zero".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_seconds_centis() {
        assert_eq!(format_time(0), "00:00.00");
        assert_eq!(format_time(1_000), "00:01.00");
        assert_eq!(format_time(61_239), "01:01.23");
        assert_eq!(format_time(125 * 60_000), "125:00.00");
    }

    #[test]
    fn parse_field_behaves_like_leading_integer() {
        assert_eq!(parse_field("12"), 12);
        assert_eq!(parse_field(" 7abc"), 7);
        assert_eq!(parse_field("abc"), 0);
        assert_eq!(parse_field(""), 0);
        assert_eq!(parse_field("-3"), -3);
        assert_eq!(parse_field("+4"), 4);
        assert_eq!(parse_field("1.9"), 1);
        assert_eq!(parse_field("99999999999999999999"), i64::MAX);
        assert_eq!(parse_field("-99999999999999999999x"), -i64::MAX);
    }

    #[test]
    fn input_duration_combines_fields() {
        assert_eq!(input_duration_ms("1", "30"), 90_000);
        assert_eq!(input_duration_ms("", ""), 0);
        assert_eq!(input_duration_ms("0", "-5"), -5_000);
        assert_eq!(input_duration_ms("99999999999999999999", "0"), i64::MAX);
    }

    #[test]
    fn parses_human_durations() {
        assert_eq!(parse_duration("1m30s").unwrap(), 90_000);
        assert_eq!(parse_duration("90s").unwrap(), 90_000);
        assert_eq!(parse_duration("1h").unwrap(), 3_600_000);
        assert_eq!(parse_duration("2.5m").unwrap(), 150_000);
        assert_eq!(parse_duration("5").unwrap(), 300_000);
        assert!(matches!(parse_duration("0s"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_duration("1x"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_duration("m"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn unknown_timestamp_is_reported() {
        assert_eq!(format_timestamp(i64::MAX), "Unknown");
        assert_eq!(format_timestamp(0).len(), 19);
    }
}
