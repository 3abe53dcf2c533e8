//! ISO-8601 text handling for temporal fields.

use std::fmt::Write;
use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc};
use regex::{Captures, Regex};

use crate::errors::FieldError;
use crate::types::TemporalValue;

const MICROS_PER_SECOND: i64 = 1_000_000;

static DATETIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<date>\d{4}-\d{2}-\d{2})",
        r"(?:[Tt ](?P<hour>\d{2}):(?P<minute>\d{2})",
        r"(?::(?P<second>\d{2})(?:[.,](?P<fraction>\d{1,9}))?)?",
        r"(?P<offset>[Zz]|[+-]\d{2}(?::?\d{2})?)?)?$",
    ))
    .expect("datetime pattern is valid")
});

static OFFSET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<sign>[+-])(?P<hours>\d{2})(?::?(?P<minutes>\d{2}))?$")
        .expect("offset pattern is valid")
});

static ISO_DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<sign>[+-])?P(?:(?P<weeks>\d+)W)?(?:(?P<days>\d+)D)?",
        r"(?:T(?:(?P<hours>\d+)H)?(?:(?P<minutes>\d+)M)?",
        r"(?:(?P<seconds>\d+)(?:[.,](?P<fraction>\d{1,6}))?S)?)?$",
    ))
    .expect("iso duration pattern is valid")
});

// The sign belongs to the day count only: `-1 day, 23:59:59` is one second before zero.
static CLOCK_DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?:(?P<days>-?\d+) days?, )?",
        r"(?P<hours>\d{1,2}):(?P<minutes>\d{2}):(?P<seconds>\d{2})(?:\.(?P<fraction>\d{1,6}))?$",
    ))
    .expect("clock duration pattern is valid")
});

/// Parses an ISO-8601 date or datetime.
///
/// A bare date is midnight. Text with an offset (`Z`, `+03:00`, `+0300`, `+03`)
/// yields [`TemporalValue::Aware`], otherwise [`TemporalValue::Naive`].
pub fn parse_datetime(text: &str) -> Result<TemporalValue, FieldError> {
    let trimmed = text.trim();
    let captures = DATETIME_PATTERN
        .captures(trimmed)
        .ok_or_else(|| FieldError::parse(text, "not an ISO-8601 date or datetime"))?;

    let date = NaiveDate::parse_from_str(&captures["date"], "%Y-%m-%d")
        .map_err(|err| FieldError::parse(text, err))?;

    let time = match captures.name("hour") {
        Some(hour) => {
            let hour = hour
                .as_str()
                .parse::<u32>()
                .map_err(|err| FieldError::parse(text, err))?;
            let minute =
                parse_component(&captures, "minute").map_err(|err| FieldError::parse(text, err))?;
            let second =
                parse_component(&captures, "second").map_err(|err| FieldError::parse(text, err))?;
            let nanos = captures
                .name("fraction")
                .map_or(0, |fraction| scale_fraction(fraction.as_str(), 9));
            NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)
                .ok_or_else(|| FieldError::parse(text, "time component out of range"))?
        }
        None => NaiveTime::MIN,
    };

    let naive = date.and_time(time);
    match captures.name("offset") {
        Some(offset) => {
            let offset = parse_offset(offset.as_str()).map_err(|err| FieldError::parse(text, err))?;
            let aware = naive
                .and_local_timezone(offset)
                .single()
                .ok_or_else(|| FieldError::parse(text, "datetime out of range for offset"))?;
            Ok(TemporalValue::Aware(aware))
        }
        None => Ok(TemporalValue::Naive(naive)),
    }
}

/// Parses a calendar date. Full datetime text is accepted and truncated to its date.
pub fn parse_date(text: &str) -> Result<NaiveDate, FieldError> {
    let trimmed = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    match parse_datetime(trimmed) {
        Ok(TemporalValue::Naive(value)) => Ok(value.date()),
        Ok(TemporalValue::Aware(value)) => Ok(value.date_naive()),
        _ => Err(FieldError::invalid(format!("Invalid isoformat string for date: '{text}'"))),
    }
}

/// Parses `Z`, `UTC`, `±HH:MM`, `±HHMM` or `±HH` into a fixed offset.
pub fn parse_offset(text: &str) -> Result<FixedOffset, FieldError> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let captures = OFFSET_PATTERN
        .captures(trimmed)
        .ok_or_else(|| FieldError::invalid(format!("invalid UTC offset '{text}'")))?;
    let hours =
        parse_component(&captures, "hours").map_err(|err| FieldError::invalid(err.to_string()))?;
    let minutes =
        parse_component(&captures, "minutes").map_err(|err| FieldError::invalid(err.to_string()))?;
    if minutes >= 60 {
        return Err(FieldError::invalid(format!("invalid UTC offset '{text}'")));
    }

    let seconds = (hours * 3600 + minutes * 60) as i32;
    let signed = if &captures["sign"] == "-" { -seconds } else { seconds };
    FixedOffset::east_opt(signed)
        .ok_or_else(|| FieldError::invalid(format!("UTC offset out of range '{text}'")))
}

/// Parses an ISO-8601 duration (`P35DT8.000001S`, `-PT1H`) or the clock form
/// (`35 days, 0:00:08.000001`, `-1 day, 23:59:59`).
///
/// An ISO sign negates the whole duration; in the clock form only the day count
/// is signed, so a signed bare clock (`-1:00:00`) is rejected.
pub fn parse_duration(text: &str) -> Result<TimeDelta, FieldError> {
    let trimmed = text.trim();
    let invalid = || FieldError::invalid(format!("Invalid duration string: '{text}'"));

    let (captures, days, negate) = if let Some(captures) = ISO_DURATION_PATTERN.captures(trimmed) {
        // `P` and `PT` match the pattern but carry no components.
        if trimmed.ends_with('P') || trimmed.ends_with('T') {
            return Err(invalid());
        }
        let weeks = optional_i64(&captures, "weeks").ok_or_else(invalid)?;
        let days = optional_i64(&captures, "days")
            .and_then(|days| weeks.checked_mul(7)?.checked_add(days))
            .ok_or_else(invalid)?;
        let negate = captures.name("sign").is_some_and(|sign| sign.as_str() == "-");
        (captures, days, negate)
    } else if let Some(captures) = CLOCK_DURATION_PATTERN.captures(trimmed) {
        let days = optional_i64(&captures, "days").ok_or_else(invalid)?;
        (captures, days, false)
    } else {
        return Err(invalid());
    };

    let hours = optional_i64(&captures, "hours").ok_or_else(invalid)?;
    let minutes = optional_i64(&captures, "minutes").ok_or_else(invalid)?;
    let seconds = optional_i64(&captures, "seconds").ok_or_else(invalid)?;
    let fraction = captures
        .name("fraction")
        .map_or(0, |fraction| i64::from(scale_fraction(fraction.as_str(), 6)));

    let total_seconds = days
        .checked_mul(24)
        .and_then(|h| h.checked_add(hours))
        .and_then(|h| h.checked_mul(60))
        .and_then(|m| m.checked_add(minutes))
        .and_then(|m| m.checked_mul(60))
        .and_then(|s| s.checked_add(seconds));
    let micros = total_seconds
        .and_then(|s| s.checked_mul(MICROS_PER_SECOND))
        .and_then(|us| us.checked_add(fraction))
        .ok_or_else(|| FieldError::invalid(format!("duration out of range: '{text}'")))?;

    Ok(TimeDelta::microseconds(if negate { -micros } else { micros }))
}

/// Formats a duration as ISO-8601, the inverse of [`parse_duration`].
pub fn format_duration(delta: TimeDelta) -> String {
    let Some(micros) = delta.num_microseconds() else {
        return format!("PT{}S", delta.num_seconds());
    };

    let sign = if micros < 0 { "-" } else { "" };
    let mut rest = micros.unsigned_abs();
    let fraction = rest % 1_000_000;
    rest /= 1_000_000;
    let seconds = rest % 60;
    rest /= 60;
    let minutes = rest % 60;
    rest /= 60;
    let hours = rest % 24;
    let days = rest / 24;

    let mut out = format!("{sign}P");
    if days > 0 {
        let _ = write!(out, "{days}D");
    }
    let has_time = hours > 0 || minutes > 0 || seconds > 0 || fraction > 0;
    if has_time || days == 0 {
        out.push('T');
        if hours > 0 {
            let _ = write!(out, "{hours}H");
        }
        if minutes > 0 {
            let _ = write!(out, "{minutes}M");
        }
        if seconds > 0 || fraction > 0 || !has_time {
            if fraction > 0 {
                let _ = write!(out, "{seconds}.{fraction:06}S");
            } else {
                let _ = write!(out, "{seconds}S");
            }
        }
    }
    out
}

fn parse_component(captures: &Captures<'_>, name: &str) -> Result<u32, std::num::ParseIntError> {
    captures.name(name).map_or(Ok(0), |value| value.as_str().parse::<u32>())
}

fn optional_i64(captures: &Captures<'_>, name: &str) -> Option<i64> {
    match captures.name(name) {
        Some(value) => value.as_str().parse::<i64>().ok(),
        None => Some(0),
    }
}

/// Right-pads a fractional-second digit string to `digits` places.
fn scale_fraction(fraction: &str, digits: usize) -> u32 {
    let mut padded: String = fraction.chars().take(digits).collect();
    while padded.len() < digits {
        padded.push('0');
    }
    padded.parse::<u32>().unwrap_or(0)
}
