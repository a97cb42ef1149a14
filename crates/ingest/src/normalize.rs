//! Turns a decoded OTLP record into a [`LogEntry`].
//!
//! Field sources, first present wins:
//!
//! | field           | payload (`otel.log_data`) | record fallback           | default     |
//! |-----------------|---------------------------|---------------------------|-------------|
//! | `level`         | `level`                   | severity text             | `INFO`      |
//! | `function_name` | `function_name`           | scope name                | `unknown`   |
//! | `module`        | `module`                  | resource `service.name`   | `unknown`   |
//! | `duration_ms`   | `duration_ms`             |                           | `0.0`       |
//! | `status`        | `status`                  |                           | `unknown`   |
//! | `message`       |                           | body                      |             |
//!
//! After that, a body of five or more `|`-separated segments overrides
//! `level`, `function_name`, `duration_ms` and `message` (legacy line format).

use fnlog_core::error::FnlogError;
use fnlog_core::ids::LogId;
use fnlog_core::model::log::{LOG_DATA_KEY, LogEntry, RawLogRecord};
use fnlog_core::value::{AttrValue, attributes_to_json};
use serde_json::{Map, Value as Json};
use tracing::warn;

const LEGACY_MIN_SEGMENTS: usize = 5;

pub fn normalize_batch(records: Vec<RawLogRecord>) -> Vec<LogEntry> {
    records.into_iter().map(normalize).collect()
}

pub fn normalize(raw: RawLogRecord) -> LogEntry {
    let payload = structured_payload(&raw).unwrap_or_default();

    let mut level = payload_str(&payload, "level")
        .or_else(|| raw.severity_text.clone())
        .unwrap_or_else(|| "INFO".to_string());
    let mut function_name = payload_str(&payload, "function_name")
        .or_else(|| raw.scope_name.clone())
        .unwrap_or_else(|| "unknown".to_string());
    let module = payload_str(&payload, "module")
        .or_else(|| raw.service_name())
        .unwrap_or_else(|| "unknown".to_string());
    let mut duration_ms = payload_duration(&payload).unwrap_or(0.0);
    let status = payload_str(&payload, "status").unwrap_or_else(|| "unknown".to_string());
    let mut message = raw.body.clone();

    // Applied even when the payload already supplied these fields.
    if let Some(legacy) = LegacyLine::parse(&raw.body) {
        level = legacy.level.to_string();
        function_name = legacy.function_name.to_string();
        match legacy.duration_ms() {
            Some(ms) => duration_ms = ms,
            None => {
                let err = FnlogError::FieldParse(format!(
                    "legacy duration {:?} is not numeric",
                    legacy.duration
                ));
                warn!(error = %err, function_name = %function_name, "keeping previous duration");
            }
        }
        message = legacy.message.to_string();
    }

    let raw_data = serde_json::to_value(&raw).unwrap_or_default();

    LogEntry {
        id: LogId::generate(),
        timestamp: raw.timestamp,
        level,
        function_name,
        module,
        duration_ms,
        status,
        message,
        args: payload_str(&payload, "args"),
        kwargs: payload.get("kwargs").filter(|v| !v.is_null()).cloned(),
        result: payload_str(&payload, "result"),
        error: payload_str(&payload, "error"),
        error_type: payload_str(&payload, "error_type"),
        severity_number: raw.severity_number,
        severity_text: raw.severity_text,
        trace_id: raw.trace_id,
        span_id: raw.span_id,
        resource_attributes: (!raw.resource_attributes.is_empty()).then_some(raw.resource_attributes),
        log_attributes: (!raw.attributes.is_empty()).then_some(raw.attributes),
        scope_name: raw.scope_name,
        raw_data,
    }
}

/// Reads `otel.log_data` as a JSON object. Anything unusable is reported and
/// treated as absent so the rest of the batch is unaffected.
fn structured_payload(raw: &RawLogRecord) -> Option<Map<String, Json>> {
    let value = raw.log_data()?;
    let parsed = match value {
        AttrValue::String(text) | AttrValue::Bytes(text) => {
            match serde_json::from_str::<Json>(text) {
                Ok(Json::Object(map)) => Ok(map),
                Ok(other) => Err(FnlogError::FieldParse(format!(
                    "{LOG_DATA_KEY} is JSON {} rather than an object",
                    json_kind(&other)
                ))),
                Err(e) => Err(FnlogError::FieldParse(format!(
                    "{LOG_DATA_KEY} is not valid JSON: {e}"
                ))),
            }
        }
        AttrValue::KeyValueList(map) => match attributes_to_json(map) {
            Json::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        },
        other => Err(FnlogError::FieldParse(format!(
            "{LOG_DATA_KEY} has unsupported kind {}",
            other.kind()
        ))),
    };

    match parsed {
        Ok(map) => Some(map),
        Err(err) => {
            warn!(
                error = %err,
                scope = raw.scope_name.as_deref().unwrap_or_default(),
                "ignoring structured payload"
            );
            None
        }
    }
}

fn payload_str(payload: &Map<String, Json>, key: &str) -> Option<String> {
    match payload.get(key)? {
        Json::Null => None,
        Json::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn payload_duration(payload: &Map<String, Json>) -> Option<f64> {
    let raw = payload.get("duration_ms")?;
    let parsed = match raw {
        Json::Null => return None,
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed.filter(|ms| is_valid_duration(*ms)) {
        Some(ms) => Some(ms),
        None => {
            let err = FnlogError::FieldParse(format!("duration_ms {raw} is not a valid duration"));
            warn!(error = %err, "falling back to default duration");
            None
        }
    }
}

fn is_valid_duration(ms: f64) -> bool {
    ms.is_finite() && ms >= 0.0
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// `timestamp | level | function | 12.5ms | message` as written by the
/// producer's default body format.
#[derive(Debug, PartialEq)]
struct LegacyLine<'a> {
    level: &'a str,
    function_name: &'a str,
    duration: &'a str,
    message: &'a str,
}

impl<'a> LegacyLine<'a> {
    fn parse(body: &'a str) -> Option<Self> {
        let segments: Vec<&str> = body.split('|').map(str::trim).collect();
        if segments.len() < LEGACY_MIN_SEGMENTS {
            return None;
        }
        Some(Self {
            level: segments[1],
            function_name: segments[2],
            duration: segments[3],
            message: segments[4],
        })
    }

    fn duration_ms(&self) -> Option<f64> {
        let number = self.duration.strip_suffix("ms").unwrap_or(self.duration);
        number
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|ms| is_valid_duration(*ms))
    }
}

#[cfg(test)]
mod tests {
    use fnlog_core::value::Attributes;
    use serde_json::json;

    use super::*;

    fn raw(body: &str) -> RawLogRecord {
        RawLogRecord {
            timestamp: "2026-01-01T00:00:00.000000Z".to_string(),
            body: body.to_string(),
            severity_number: None,
            severity_text: None,
            trace_id: None,
            span_id: None,
            attributes: Attributes::new(),
            resource_attributes: Attributes::new(),
            scope_name: None,
        }
    }

    fn with_log_data(mut record: RawLogRecord, value: AttrValue) -> RawLogRecord {
        record.attributes.insert(LOG_DATA_KEY.to_string(), value);
        record
    }

    fn payload() -> String {
        json!({
            "function_name": "fetch_user",
            "module": "users",
            "timestamp": "2026-01-01T00:00:00",
            "level": "DEBUG",
            "status": "success",
            "message": "ok",
            "duration_ms": 3.25,
            "args": "(1,)",
            "kwargs": {"retry": true},
            "result": "User(1)"
        })
        .to_string()
    }

    #[test]
    fn defaults_without_payload() {
        let entry = normalize(raw("plain message"));
        assert_eq!(entry.level, "INFO");
        assert_eq!(entry.function_name, "unknown");
        assert_eq!(entry.module, "unknown");
        assert_eq!(entry.duration_ms, 0.0);
        assert_eq!(entry.status, "unknown");
        assert_eq!(entry.message, "plain message");
        assert!(entry.args.is_none());
        assert!(entry.kwargs.is_none());
        assert!(entry.log_attributes.is_none());
        assert!(entry.resource_attributes.is_none());
    }

    #[test]
    fn record_context_fills_fallbacks() {
        let mut record = raw("hello");
        record.severity_text = Some("WARN".to_string());
        record.scope_name = Some("billing.worker".to_string());
        record
            .resource_attributes
            .insert("service.name".into(), AttrValue::String("billing".into()));

        let entry = normalize(record);
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.function_name, "billing.worker");
        assert_eq!(entry.module, "billing");
        assert_eq!(entry.scope_name.as_deref(), Some("billing.worker"));
    }

    #[test]
    fn payload_takes_precedence() {
        let mut record = with_log_data(raw("hello"), AttrValue::String(payload()));
        record.severity_text = Some("WARN".to_string());
        record.scope_name = Some("scope".to_string());

        let entry = normalize(record);
        assert_eq!(entry.level, "DEBUG");
        assert_eq!(entry.function_name, "fetch_user");
        assert_eq!(entry.module, "users");
        assert_eq!(entry.duration_ms, 3.25);
        assert_eq!(entry.status, "success");
        assert_eq!(entry.message, "hello");
        assert_eq!(entry.args.as_deref(), Some("(1,)"));
        assert_eq!(entry.kwargs, Some(json!({"retry": true})));
        assert_eq!(entry.result.as_deref(), Some("User(1)"));
        assert!(entry.error.is_none());
        assert_eq!(entry.severity_text.as_deref(), Some("WARN"));
        assert!(entry.log_attributes.unwrap().contains_key(LOG_DATA_KEY));
    }

    #[test]
    fn kvlist_payload_is_used_directly() {
        let mut map = Attributes::new();
        map.insert("function_name".into(), AttrValue::String("from_map".into()));
        map.insert("duration_ms".into(), AttrValue::Double(8.0));
        map.insert("status".into(), AttrValue::String("error".into()));
        map.insert("error_type".into(), AttrValue::String("ValueError".into()));

        let entry = normalize(with_log_data(raw("x"), AttrValue::KeyValueList(map)));
        assert_eq!(entry.function_name, "from_map");
        assert_eq!(entry.duration_ms, 8.0);
        assert_eq!(entry.status, "error");
        assert_eq!(entry.error_type.as_deref(), Some("ValueError"));
    }

    #[test]
    fn malformed_payload_falls_back_to_defaults() {
        let mut record = with_log_data(raw("hello"), AttrValue::String("{not json".into()));
        record.scope_name = Some("scope".to_string());

        let entry = normalize(record);
        assert_eq!(entry.function_name, "scope");
        assert_eq!(entry.status, "unknown");
        assert_eq!(entry.duration_ms, 0.0);
    }

    #[test]
    fn non_object_payloads_are_ignored() {
        let entry = normalize(with_log_data(raw("a"), AttrValue::String("[1,2]".into())));
        assert_eq!(entry.status, "unknown");

        let entry = normalize(with_log_data(raw("a"), AttrValue::Int(3)));
        assert_eq!(entry.function_name, "unknown");
    }

    #[test]
    fn invalid_payload_duration_defaults_to_zero() {
        let text = json!({"function_name": "f", "duration_ms": -4}).to_string();
        let entry = normalize(with_log_data(raw("a"), AttrValue::String(text)));
        assert_eq!(entry.function_name, "f");
        assert_eq!(entry.duration_ms, 0.0);

        let text = json!({"duration_ms": "7.5"}).to_string();
        let entry = normalize(with_log_data(raw("a"), AttrValue::String(text)));
        assert_eq!(entry.duration_ms, 7.5);
    }

    #[test]
    fn legacy_line_overrides_fields() {
        let entry = normalize(raw("x|WARN|doThing|12.5ms|hello"));
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.function_name, "doThing");
        assert_eq!(entry.duration_ms, 12.5);
        assert_eq!(entry.message, "hello");
    }

    #[test]
    fn legacy_line_overrides_structured_payload() {
        let record = with_log_data(raw("x|WARN|doThing|12.5ms|hello"), AttrValue::String(payload()));
        let entry = normalize(record);
        assert_eq!(entry.level, "WARN");
        assert_eq!(entry.function_name, "doThing");
        assert_eq!(entry.duration_ms, 12.5);
        assert_eq!(entry.message, "hello");
        // Fields the legacy line does not carry still come from the payload.
        assert_eq!(entry.module, "users");
        assert_eq!(entry.status, "success");
    }

    #[test]
    fn legacy_line_trims_producer_spacing() {
        let entry = normalize(raw(
            "2026-01-01T00:00:00 | ERROR | divide | 0.42ms | Function failed with error: boom",
        ));
        assert_eq!(entry.level, "ERROR");
        assert_eq!(entry.function_name, "divide");
        assert_eq!(entry.duration_ms, 0.42);
        assert_eq!(entry.message, "Function failed with error: boom");
    }

    #[test]
    fn legacy_bad_duration_keeps_previous_value() {
        let text = json!({"duration_ms": 9.0}).to_string();
        let record = with_log_data(raw("t|INFO|f|fast|done"), AttrValue::String(text));
        let entry = normalize(record);
        assert_eq!(entry.duration_ms, 9.0);
        assert_eq!(entry.function_name, "f");
        assert_eq!(entry.message, "done");
    }

    #[test]
    fn four_segments_are_not_legacy() {
        let entry = normalize(raw("a|b|c|d"));
        assert_eq!(entry.message, "a|b|c|d");
        assert_eq!(entry.function_name, "unknown");
    }

    #[test]
    fn legacy_duration_without_suffix() {
        let line = LegacyLine::parse("t|L|f|3|m").unwrap();
        assert_eq!(line.duration_ms(), Some(3.0));
        let line = LegacyLine::parse("t|L|f|2.5 ms|m").unwrap();
        assert_eq!(line.duration_ms(), Some(2.5));
    }

    #[test]
    fn passes_record_context_through() {
        let mut record = raw("hello");
        record.severity_number = Some(9);
        record.trace_id = Some("ab".repeat(16));
        record.span_id = Some("cd".repeat(8));

        let entry = normalize(record.clone());
        assert_eq!(entry.timestamp, record.timestamp);
        assert_eq!(entry.severity_number, Some(9));
        assert_eq!(entry.trace_id, record.trace_id);
        assert_eq!(entry.span_id, record.span_id);
        assert_eq!(entry.raw_data["body"], "hello");
    }

    #[test]
    fn every_entry_gets_a_fresh_id() {
        let entries = normalize_batch(vec![raw("a"), raw("a")]);
        assert_ne!(entries[0].id, entries[1].id);
    }
}
