use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FnlogError, Result};

/// Identifier assigned to a log entry at ingestion. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogId(Uuid);

impl LogId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for LogId {
    type Err = FnlogError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| FnlogError::InvalidArgument(format!("invalid log id {s}: {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpanId(String);

impl TraceId {
    pub const BYTES: usize = 16;

    pub fn parse(input: &str) -> Result<Self> {
        parse_hex_id(input, Self::BYTES)
            .map(Self)
            .ok_or_else(|| FnlogError::Decode(format!("invalid trace id: {input}")))
    }

    /// Empty input means "no trace".
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes_to_hex(bytes).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl SpanId {
    pub const BYTES: usize = 8;

    pub fn parse(input: &str) -> Result<Self> {
        parse_hex_id(input, Self::BYTES)
            .map(Self)
            .ok_or_else(|| FnlogError::Decode(format!("invalid span id: {input}")))
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes_to_hex(bytes).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn parse_hex_id(input: &str, bytes: usize) -> Option<String> {
    if input.len() != bytes * 2 || !input.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(input.to_ascii_lowercase())
}

pub fn bytes_to_hex(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    Some(bytes.iter().map(|b| format!("{b:02x}")).collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ids() {
        let trace = TraceId::parse("4BF92F3577B34DA6A3CE929D0E0E4736").unwrap();
        let span = SpanId::parse("00f067aa0ba902b7").unwrap();
        assert_eq!(trace.as_str(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(span.as_str(), "00f067aa0ba902b7");
    }

    #[test]
    fn rejects_bad_ids() {
        assert!(TraceId::parse("abc").is_err());
        assert!(SpanId::parse("zzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn renders_bytes_as_lowercase_hex() {
        assert_eq!(
            TraceId::from_bytes(&[0xAB; 16]).unwrap().as_str(),
            "abababababababababababababababab"
        );
        assert!(SpanId::from_bytes(&[]).is_none());
    }

    #[test]
    fn log_ids_are_unique_and_parse_back() {
        let a = LogId::generate();
        let b = LogId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<LogId>().unwrap(), a);
        assert!("not-a-uuid".parse::<LogId>().is_err());
    }
}
