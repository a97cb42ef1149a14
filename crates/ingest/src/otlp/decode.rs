//! Protobuf wire form: `AnyValue` field presence and the
//! resource → scope → record hierarchy of `ExportLogsServiceRequest`.

use fnlog_core::ids::{SpanId, TraceId};
use fnlog_core::model::log::RawLogRecord;
use fnlog_core::time::nanos_to_iso;
use fnlog_core::value::{AttrValue, Attributes};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use opentelemetry_proto::tonic::logs::v1::LogRecord as OtlpLogRecord;
use opentelemetry_proto::tonic::resource::v1::Resource;

/// Flattens a decoded request into records, each carrying its own copy of the
/// enclosing resource attributes and scope name.
pub fn records_from_request(req: &ExportLogsServiceRequest) -> Vec<RawLogRecord> {
    let mut records = Vec::new();
    for rl in &req.resource_logs {
        let resource_attributes = resource_attributes(rl.resource.as_ref());
        for sl in &rl.scope_logs {
            let scope_name = scope_name(sl.scope.as_ref());
            for log in &sl.log_records {
                records.push(decode_log(&resource_attributes, scope_name.as_deref(), log));
            }
        }
    }
    records
}

pub fn decode_log(
    resource_attributes: &Attributes,
    scope_name: Option<&str>,
    record: &OtlpLogRecord,
) -> RawLogRecord {
    RawLogRecord {
        timestamp: nanos_to_iso(record.time_unix_nano),
        body: any_value_to_string(record.body.as_ref()),
        severity_number: (record.severity_number != 0).then_some(record.severity_number),
        severity_text: non_empty(&record.severity_text),
        trace_id: TraceId::from_bytes(&record.trace_id).map(TraceId::into_string),
        span_id: SpanId::from_bytes(&record.span_id).map(SpanId::into_string),
        attributes: attributes_from_proto(&record.attributes),
        resource_attributes: resource_attributes.clone(),
        scope_name: scope_name.map(str::to_string),
    }
}

fn resource_attributes(resource: Option<&Resource>) -> Attributes {
    resource
        .map(|r| attributes_from_proto(&r.attributes))
        .unwrap_or_default()
}

fn scope_name(scope: Option<&InstrumentationScope>) -> Option<String> {
    scope.and_then(|s| non_empty(&s.name))
}

pub fn attributes_from_proto(attrs: &[KeyValue]) -> Attributes {
    attrs
        .iter()
        .map(|kv| (kv.key.clone(), any_value_from_proto(kv.value.as_ref())))
        .collect()
}

/// An `AnyValue` with no field set decodes to the empty string.
#[allow(unreachable_patterns)]
pub fn any_value_from_proto(value: Option<&AnyValue>) -> AttrValue {
    let Some(inner) = value.and_then(|v| v.value.as_ref()) else {
        return AttrValue::String(String::new());
    };

    match inner {
        Value::StringValue(s) => AttrValue::String(s.clone()),
        Value::BoolValue(b) => AttrValue::Bool(*b),
        Value::IntValue(i) => AttrValue::Int(*i),
        Value::DoubleValue(d) => AttrValue::Double(*d),
        Value::BytesValue(b) => AttrValue::Bytes(String::from_utf8_lossy(b).into_owned()),
        Value::ArrayValue(array) => AttrValue::Array(
            array
                .values
                .iter()
                .map(|v| any_value_from_proto(Some(v)))
                .collect(),
        ),
        Value::KvlistValue(kvlist) => {
            AttrValue::KeyValueList(attributes_from_proto(&kvlist.values))
        }
        other => AttrValue::String(format!("{other:?}")),
    }
}

fn any_value_to_string(value: Option<&AnyValue>) -> String {
    any_value_from_proto(value).to_string()
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use opentelemetry_proto::tonic::common::v1::any_value::Value;
    use opentelemetry_proto::tonic::common::v1::{AnyValue, ArrayValue, KeyValue, KeyValueList};
    use opentelemetry_proto::tonic::logs::v1::LogRecord as OtlpLogRecord;

    use super::*;

    fn any(value: Value) -> AnyValue {
        AnyValue { value: Some(value) }
    }

    #[test]
    fn decodes_scalars() {
        assert_eq!(
            any_value_from_proto(Some(&any(Value::StringValue("s".into())))),
            AttrValue::String("s".into())
        );
        assert_eq!(
            any_value_from_proto(Some(&any(Value::IntValue(-7)))),
            AttrValue::Int(-7)
        );
        assert_eq!(
            any_value_from_proto(Some(&any(Value::DoubleValue(0.25)))),
            AttrValue::Double(0.25)
        );
        assert_eq!(
            any_value_from_proto(Some(&any(Value::BoolValue(true)))),
            AttrValue::Bool(true)
        );
    }

    #[test]
    fn bytes_decode_lossily() {
        let out = any_value_from_proto(Some(&any(Value::BytesValue(vec![b'o', b'k', 0xff]))));
        assert_eq!(out, AttrValue::Bytes("ok\u{fffd}".into()));
    }

    #[test]
    fn nested_values_decode_recursively() {
        let nested = any(Value::KvlistValue(KeyValueList {
            values: vec![KeyValue {
                key: "list".into(),
                value: Some(any(Value::ArrayValue(ArrayValue {
                    values: vec![any(Value::IntValue(1)), any(Value::StringValue("two".into()))],
                }))),
            }],
        }));

        let mut expected = Attributes::new();
        expected.insert(
            "list".into(),
            AttrValue::Array(vec![AttrValue::Int(1), AttrValue::String("two".into())]),
        );
        assert_eq!(
            any_value_from_proto(Some(&nested)),
            AttrValue::KeyValueList(expected)
        );
    }

    #[test]
    fn unset_value_is_empty_string() {
        assert_eq!(
            any_value_from_proto(Some(&AnyValue { value: None })),
            AttrValue::String(String::new())
        );
        assert_eq!(any_value_from_proto(None), AttrValue::String(String::new()));
    }

    #[test]
    fn decodes_record_fields() {
        let mut resource = Attributes::new();
        resource.insert("service.name".into(), AttrValue::String("api".into()));
        let log = OtlpLogRecord {
            time_unix_nano: 1_700_000_000_000_000_000,
            severity_number: 17,
            severity_text: "ERROR".into(),
            body: Some(any(Value::StringValue("boom".into()))),
            trace_id: vec![0xAB; 16],
            span_id: vec![2; 8],
            ..Default::default()
        };

        let out = decode_log(&resource, Some("scope"), &log);
        assert_eq!(out.timestamp, "2023-11-14T22:13:20.000000Z");
        assert_eq!(out.body, "boom");
        assert_eq!(out.severity_number, Some(17));
        assert_eq!(out.severity_text.as_deref(), Some("ERROR"));
        assert_eq!(
            out.trace_id.as_deref(),
            Some("abababababababababababababababab")
        );
        assert_eq!(out.span_id.as_deref(), Some("0202020202020202"));
        assert_eq!(out.scope_name.as_deref(), Some("scope"));
        assert_eq!(out.service_name().as_deref(), Some("api"));
    }

    #[test]
    fn unset_fields_are_absent() {
        let out = decode_log(&Attributes::new(), None, &OtlpLogRecord::default());
        assert!(out.severity_number.is_none());
        assert!(out.severity_text.is_none());
        assert!(out.trace_id.is_none());
        assert!(out.span_id.is_none());
        assert_eq!(out.body, "");
    }
}
