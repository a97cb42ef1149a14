use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{FnlogError, Result};

/// Fixed-width UTC rendering shared by every stored timestamp, so string
/// order matches chronological order.
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn now_iso() -> String {
    to_iso(Utc::now())
}

/// Zero means "unset" in OTLP and maps to the current wall-clock time.
pub fn nanos_to_iso(nanos: u64) -> String {
    if nanos == 0 {
        return now_iso();
    }
    let secs = (nanos / 1_000_000_000) as i64;
    let subnanos = (nanos % 1_000_000_000) as u32;
    Utc.timestamp_opt(secs, subnanos)
        .single()
        .map(to_iso)
        .unwrap_or_else(now_iso)
}

pub fn parse_iso(input: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| FnlogError::Decode(format!("invalid timestamp {input}: {e}")))
}
