//! Strings that the wire format packs into fixed-size bodies: lowercase
//! UUIDs and UTC timestamps with nanosecond precision.

use chrono::{DateTime, NaiveDateTime, Timelike};
use uuid::Uuid;

const UUID_LEN: usize = 36;
const TIME_LEN: usize = 30;
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

/// Splits a `8-4-4-4-12` lowercase hex UUID into its two 64-bit halves.
pub fn parse_uuid(text: &str) -> Option<(u64, u64)> {
    let bytes = text.as_bytes();
    if bytes.len() != UUID_LEN {
        return None;
    }
    let shaped = bytes.iter().enumerate().all(|(i, &b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => matches!(b, b'0'..=b'9' | b'a'..=b'f'),
    });
    if !shaped {
        return None;
    }
    Uuid::parse_str(text).ok().map(|uuid| uuid.as_u64_pair())
}

pub fn format_uuid(high: u64, low: u64) -> String {
    Uuid::from_u64_pair(high, low).hyphenated().to_string()
}

/// Nanoseconds since the Unix epoch for `YYYY-MM-DDTHH:MM:SS.nnnnnnnnnZ`.
/// `None` when the text is not exactly that form, names an impossible date
/// or time, or lies outside what an `i64` of nanoseconds can hold.
pub fn parse_time(text: &str) -> Option<i64> {
    let bytes = text.as_bytes();
    if bytes.len() != TIME_LEN {
        return None;
    }
    let shaped = bytes.iter().enumerate().all(|(i, &b)| match i {
        4 | 7 => b == b'-',
        10 => b == b'T',
        13 | 16 => b == b':',
        19 => b == b'.',
        29 => b == b'Z',
        _ => b.is_ascii_digit(),
    });
    if !shaped {
        return None;
    }
    let parsed = NaiveDateTime::parse_from_str(text, TIME_FORMAT).ok()?;
    // chrono accepts `:60` as a leap second; the wire form has no slot for one.
    if parsed.nanosecond() >= 1_000_000_000 {
        return None;
    }
    parsed.and_utc().timestamp_nanos_opt()
}

pub fn format_time(nanos: i64) -> String {
    DateTime::from_timestamp_nanos(nanos)
        .format(TIME_FORMAT)
        .to_string()
}
