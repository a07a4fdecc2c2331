use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use thiserror::Error;

/// Minute-precision civil timestamp, e.g. `2024-05-01T14:03+05:30`.
const CIVIL_FORMAT: &str = "%Y-%m-%dT%H:%M%:z";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid UTC offset {0:?}: expected +HH:MM, -HH:MM or Z")]
pub struct OffsetError(pub String);

pub fn parse_utc_offset(input: &str) -> Result<FixedOffset, OffsetError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| OffsetError(input.to_string()));
    }

    let invalid = || OffsetError(input.to_string());
    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(invalid)?;
    if hours.len() != 2 || minutes.len() != 2 {
        return Err(invalid());
    }
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 23 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

pub fn civil_timestamp<Tz: TimeZone>(instant: &DateTime<Tz>, offset: FixedOffset) -> String {
    instant
        .with_timezone(&offset)
        .format(CIVIL_FORMAT)
        .to_string()
}

pub fn now_civil(offset: FixedOffset) -> String {
    civil_timestamp(&Utc::now(), offset)
}
