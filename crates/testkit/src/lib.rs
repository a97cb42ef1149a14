use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use fnlog_core::model::log::LOG_DATA_KEY;
use fnlog_core::producer::FunctionLog;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
use opentelemetry_proto::tonic::resource::v1::Resource;
use serde_json::{Value as Json, json};

pub const SERVICE_NAME: &str = "checkout";
pub const SCOPE_NAME: &str = "checkout.handlers";
pub const BASE_TIME_NANOS: u64 = 1_700_000_000_000_000_000;

/// One resource (`service.name = checkout`) with one scope holding `records`.
pub fn logs_request(records: Vec<LogRecord>) -> ExportLogsServiceRequest {
    ExportLogsServiceRequest {
        resource_logs: vec![ResourceLogs {
            resource: Some(Resource {
                attributes: vec![string_kv("service.name", SERVICE_NAME)],
                dropped_attributes_count: 0,
                entity_refs: vec![],
            }),
            scope_logs: vec![ScopeLogs {
                scope: Some(InstrumentationScope {
                    name: SCOPE_NAME.into(),
                    version: "0.1".into(),
                    attributes: vec![],
                    dropped_attributes_count: 0,
                }),
                log_records: records,
                schema_url: "".into(),
            }],
            schema_url: "".into(),
        }],
    }
}

pub fn log_record(body: &str, attributes: Vec<KeyValue>) -> LogRecord {
    LogRecord {
        time_unix_nano: BASE_TIME_NANOS,
        severity_number: 9,
        severity_text: "INFO".into(),
        body: Some(string_value(body)),
        attributes,
        ..Default::default()
    }
}

pub fn string_kv(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.into(),
        value: Some(string_value(value)),
    }
}

pub fn log_data_attr(log: &FunctionLog) -> KeyValue {
    string_kv(LOG_DATA_KEY, &log.to_attribute_json())
}

/// OTLP/JSON equivalent of [`logs_request`]: one record per `(body, payload)`.
pub fn json_logs_request(records: &[(&str, Option<&FunctionLog>)]) -> Json {
    let log_records: Vec<Json> = records
        .iter()
        .map(|(body, payload)| {
            let attributes: Vec<Json> = payload
                .map(|log| {
                    vec![json!({
                        "key": LOG_DATA_KEY,
                        "value": {"stringValue": log.to_attribute_json()}
                    })]
                })
                .unwrap_or_default();
            json!({
                "timeUnixNano": BASE_TIME_NANOS.to_string(),
                "severityNumber": 9,
                "severityText": "INFO",
                "body": {"stringValue": body},
                "attributes": attributes
            })
        })
        .collect();

    json!({
        "resourceLogs": [{
            "resource": {
                "attributes": [{"key": "service.name", "value": {"stringValue": SERVICE_NAME}}]
            },
            "scopeLogs": [{
                "scope": {"name": SCOPE_NAME},
                "logRecords": log_records
            }]
        }]
    })
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("write to in-memory gzip");
    encoder.finish().expect("finish in-memory gzip")
}

fn string_value(s: &str) -> AnyValue {
    AnyValue {
        value: Some(Value::StringValue(s.into())),
    }
}
