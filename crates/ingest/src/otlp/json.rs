//! OTLP/JSON wire form.
//!
//! The envelope (resource and scope groups) is parsed with serde and any
//! structural error fails the whole request. Each log record is then parsed
//! on its own so one malformed record is skipped without losing its siblings.
//! `AnyValue` nodes are single-key objects (`{"stringValue": "..."}`) and are
//! decoded by hand from [`serde_json::Value`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fnlog_core::error::{FnlogError, Result};
use fnlog_core::ids::{SpanId, TraceId};
use fnlog_core::model::log::RawLogRecord;
use fnlog_core::time::nanos_to_iso;
use fnlog_core::value::{AttrValue, Attributes};
use opentelemetry_proto::tonic::logs::v1::SeverityNumber;
use serde::Deserialize;
use serde_json::Value as Json;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportLogsRequest {
    #[serde(default)]
    resource_logs: Vec<ResourceLogs>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceLogs {
    #[serde(default)]
    resource: Option<Resource>,
    #[serde(default)]
    scope_logs: Vec<ScopeLogs>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    attributes: Vec<KeyValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopeLogs {
    #[serde(default)]
    scope: Option<Scope>,
    #[serde(default)]
    log_records: Vec<Json>,
}

#[derive(Debug, Deserialize)]
struct Scope {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: Json,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogRecord {
    #[serde(default)]
    time_unix_nano: Option<Json>,
    #[serde(default)]
    severity_number: Option<Json>,
    #[serde(default)]
    severity_text: Option<String>,
    #[serde(default)]
    body: Option<Json>,
    #[serde(default)]
    attributes: Vec<KeyValue>,
    #[serde(default)]
    trace_id: Option<String>,
    #[serde(default)]
    span_id: Option<String>,
}

pub fn records_from_json(body: &[u8]) -> Result<Vec<RawLogRecord>> {
    let req: ExportLogsRequest = serde_json::from_slice(body)
        .map_err(|e| FnlogError::Decode(format!("invalid OTLP/JSON envelope: {e}")))?;

    let mut records = Vec::new();
    for rl in req.resource_logs {
        let resource_attributes = rl
            .resource
            .map(|r| attributes_from_json(&r.attributes))
            .unwrap_or_default();
        for sl in rl.scope_logs {
            let scope_name = sl.scope.map(|s| s.name).filter(|name| !name.is_empty());
            for (index, raw) in sl.log_records.into_iter().enumerate() {
                match decode_log(raw, &resource_attributes, scope_name.as_deref()) {
                    Ok(record) => records.push(record),
                    Err(err) => {
                        tracing::warn!(error = %err, index, "skipping malformed OTLP/JSON log record");
                    }
                }
            }
        }
    }
    Ok(records)
}

fn decode_log(
    raw: Json,
    resource_attributes: &Attributes,
    scope_name: Option<&str>,
) -> Result<RawLogRecord> {
    let record: LogRecord = serde_json::from_value(raw)
        .map_err(|e| FnlogError::Decode(format!("invalid log record: {e}")))?;

    let time_unix_nano = match &record.time_unix_nano {
        Some(v) => json_u64(v)
            .ok_or_else(|| FnlogError::Decode(format!("invalid timeUnixNano: {v}")))?,
        None => 0,
    };

    Ok(RawLogRecord {
        timestamp: nanos_to_iso(time_unix_nano),
        body: record
            .body
            .as_ref()
            .map(|b| any_value_from_json(b).to_string())
            .unwrap_or_default(),
        severity_number: record
            .severity_number
            .as_ref()
            .map(severity_number)
            .transpose()?
            .filter(|n| *n != 0),
        severity_text: record.severity_text.filter(|s| !s.is_empty()),
        trace_id: record
            .trace_id
            .as_deref()
            .map(|id| decode_id(id, TraceId::BYTES))
            .transpose()?
            .flatten(),
        span_id: record
            .span_id
            .as_deref()
            .map(|id| decode_id(id, SpanId::BYTES))
            .transpose()?
            .flatten(),
        attributes: attributes_from_json(&record.attributes),
        resource_attributes: resource_attributes.clone(),
        scope_name: scope_name.map(str::to_string),
    })
}

fn attributes_from_json(attrs: &[KeyValue]) -> Attributes {
    attrs
        .iter()
        .map(|kv| (kv.key.clone(), any_value_from_json(&kv.value)))
        .collect()
}

/// Decodes a JSON `AnyValue` node. Unknown shapes fall back to their JSON
/// text rather than failing.
pub fn any_value_from_json(node: &Json) -> AttrValue {
    let Json::Object(map) = node else {
        return match node {
            Json::String(s) => AttrValue::String(s.clone()),
            other => AttrValue::String(other.to_string()),
        };
    };

    if let Some(v) = map.get("stringValue") {
        return match v {
            Json::String(s) => AttrValue::String(s.clone()),
            other => AttrValue::String(other.to_string()),
        };
    }
    if let Some(v) = map.get("intValue") {
        return json_i64(v)
            .map(AttrValue::Int)
            .unwrap_or_else(|| AttrValue::String(json_text(v)));
    }
    if let Some(v) = map.get("doubleValue") {
        return json_f64(v)
            .map(AttrValue::Double)
            .unwrap_or_else(|| AttrValue::String(json_text(v)));
    }
    if let Some(v) = map.get("boolValue") {
        return match v {
            Json::Bool(b) => AttrValue::Bool(*b),
            Json::String(s) if s == "true" || s == "false" => AttrValue::Bool(s == "true"),
            other => AttrValue::String(json_text(other)),
        };
    }
    if let Some(v) = map.get("bytesValue") {
        return AttrValue::Bytes(decode_bytes(v));
    }
    if let Some(v) = map.get("arrayValue") {
        return AttrValue::Array(
            values_of(v)
                .map(|values| values.iter().map(any_value_from_json).collect())
                .unwrap_or_default(),
        );
    }
    if let Some(v) = map.get("kvlistValue") {
        let entries = values_of(v)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|kv| {
                        let key = kv.get("key")?.as_str()?;
                        let value = kv.get("value").unwrap_or(&Json::Null);
                        Some((key.to_string(), any_value_from_json(value)))
                    })
                    .collect()
            })
            .unwrap_or_default();
        return AttrValue::KeyValueList(entries);
    }

    AttrValue::String(node.to_string())
}

fn values_of(node: &Json) -> Option<&Vec<Json>> {
    node.get("values").and_then(Json::as_array)
}

fn json_text(v: &Json) -> String {
    match v {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// proto3 JSON writes 64-bit integers as strings; accept both forms.
fn json_u64(v: &Json) -> Option<u64> {
    match v {
        Json::Number(n) => n.as_u64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_i64(v: &Json) -> Option<i64> {
    match v {
        Json::Number(n) => n.as_i64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn json_f64(v: &Json) -> Option<f64> {
    match v {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => match s.trim() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            other => other.parse().ok(),
        },
        _ => None,
    }
}

/// OTLP/JSON carries bytes as base64. Anything that isn't valid base64 is
/// kept as-is.
fn decode_bytes(v: &Json) -> String {
    let text = json_text(v);
    match STANDARD.decode(text.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => text,
    }
}

fn severity_number(v: &Json) -> Result<i32> {
    match v {
        Json::Number(n) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| FnlogError::Decode(format!("invalid severityNumber: {n}"))),
        Json::String(s) => SeverityNumber::from_str_name(s)
            .map(|sev| sev as i32)
            .or_else(|| s.trim().parse().ok())
            .ok_or_else(|| FnlogError::Decode(format!("invalid severityNumber: {s}"))),
        other => Err(FnlogError::Decode(format!("invalid severityNumber: {other}"))),
    }
}

/// Hex is the OTLP/JSON encoding for ids; base64 is accepted for exporters
/// that emit the generic proto3 mapping. Empty means absent.
fn decode_id(input: &str, bytes: usize) -> Result<Option<String>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let parsed = if bytes == TraceId::BYTES {
        TraceId::parse(input).map(TraceId::into_string)
    } else {
        SpanId::parse(input).map(SpanId::into_string)
    };
    if let Ok(hex) = parsed {
        return Ok(Some(hex));
    }

    match STANDARD.decode(input.as_bytes()) {
        Ok(raw) if raw.len() == bytes => Ok(fnlog_core::ids::bytes_to_hex(&raw)),
        _ => Err(FnlogError::Decode(format!("invalid id: {input}"))),
    }
}
