use serde::{Deserialize, Serialize};

use crate::ids::LogId;
use crate::value::{AttrValue, Attributes};

/// Attribute key carrying the producer's structured payload.
pub const LOG_DATA_KEY: &str = "otel.log_data";

/// One OTLP log record as decoded off the wire, with copies of its enclosing
/// resource attributes and scope name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawLogRecord {
    pub timestamp: String,
    pub body: String,
    pub severity_number: Option<i32>,
    pub severity_text: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub attributes: Attributes,
    pub resource_attributes: Attributes,
    pub scope_name: Option<String>,
}

impl RawLogRecord {
    pub fn log_data(&self) -> Option<&AttrValue> {
        self.attributes.get(LOG_DATA_KEY)
    }

    pub fn service_name(&self) -> Option<String> {
        self.resource_attributes
            .get("service.name")
            .map(|v| v.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: LogId,
    pub timestamp: String,
    pub level: String,
    pub function_name: String,
    pub module: String,
    pub duration_ms: f64,
    pub status: String,
    pub message: String,
    pub args: Option<String>,
    pub kwargs: Option<serde_json::Value>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub severity_number: Option<i32>,
    pub severity_text: Option<String>,
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub resource_attributes: Option<Attributes>,
    pub log_attributes: Option<Attributes>,
    pub scope_name: Option<String>,
    pub raw_data: serde_json::Value,
}

/// Dashboard projection of a [`LogEntry`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogPreview {
    pub timestamp: String,
    pub level: String,
    pub function_name: String,
    pub duration_ms: f64,
    pub status: String,
    pub message: String,
}

impl LogEntry {
    pub fn preview(&self) -> LogPreview {
        LogPreview {
            timestamp: self.timestamp.clone(),
            level: self.level.clone(),
            function_name: self.function_name.clone(),
            duration_ms: self.duration_ms,
            status: self.status.clone(),
            message: self.message.clone(),
        }
    }
}
