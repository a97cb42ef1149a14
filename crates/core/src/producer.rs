//! Producer side of the `otel.log_data` contract.
//!
//! [`timed`] runs a closure, measures it, and builds the [`FunctionLog`]
//! payload a producer attaches to its OTLP log record under
//! [`LOG_DATA_KEY`](crate::model::log::LOG_DATA_KEY). Shipping the record is
//! the caller's business; the closure's own `Result` is handed back untouched.
//! Arguments and the returned value are only recorded when
//! [`ProducerConfig`] opts in.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::time::now_iso;

pub const DEFAULT_LOG_FORMAT: &str =
    "{timestamp} | {level} | {function_name} | {duration_ms}ms | {message}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    /// Template for the human-readable body line.
    pub log_format: String,
    /// Level reported for successful calls. Failures always report `ERROR`.
    pub level: String,
    /// Copy [`CallArgs`] into the payload's `args`/`kwargs`.
    pub include_args: bool,
    /// Record the `Debug` rendering of an `Ok` value as `result`.
    pub include_result: bool,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            log_format: DEFAULT_LOG_FORMAT.to_string(),
            level: "INFO".to_string(),
            include_args: false,
            include_result: false,
        }
    }
}

impl ProducerConfig {
    pub fn format_body(&self, log: &FunctionLog, message: &str) -> String {
        self.log_format
            .replace("{timestamp}", &log.timestamp)
            .replace("{level}", &log.level)
            .replace("{function_name}", &log.function_name)
            .replace("{duration_ms}", &log.duration_ms.to_string())
            .replace("{message}", message)
    }
}

/// Structured payload consumed by the ingest normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionLog {
    pub function_name: String,
    pub module: String,
    pub timestamp: String,
    pub level: String,
    pub status: String,
    pub message: String,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl FunctionLog {
    pub fn success(function_name: &str, module: &str, level: &str, duration_ms: f64) -> Self {
        Self {
            function_name: function_name.to_string(),
            module: module.to_string(),
            timestamp: now_iso(),
            level: level.to_string(),
            status: "success".to_string(),
            message: format!("Function '{function_name}' executed successfully"),
            duration_ms,
            args: None,
            kwargs: None,
            result: None,
            error: None,
            error_type: None,
        }
    }

    pub fn failure(
        function_name: &str,
        module: &str,
        duration_ms: f64,
        error: String,
        error_type: String,
    ) -> Self {
        Self {
            function_name: function_name.to_string(),
            module: module.to_string(),
            timestamp: now_iso(),
            level: "ERROR".to_string(),
            status: "error".to_string(),
            message: format!("Function '{function_name}' failed: {error}"),
            duration_ms,
            args: None,
            kwargs: None,
            result: None,
            error: Some(error),
            error_type: Some(error_type),
        }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = Some(args.into());
        self
    }

    pub fn with_kwargs(mut self, kwargs: serde_json::Value) -> Self {
        self.kwargs = Some(kwargs);
        self
    }

    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = Some(result.into());
        self
    }

    /// JSON text for the `otel.log_data` attribute.
    pub fn to_attribute_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Arguments of one call, as the producer wants them reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub args: Option<String>,
    pub kwargs: Option<serde_json::Value>,
}

impl CallArgs {
    pub fn positional(args: &impl fmt::Debug) -> Self {
        Self {
            args: Some(format!("{args:?}")),
            kwargs: None,
        }
    }

    /// An empty object or `null` leaves `kwargs` unset.
    pub fn with_kwargs(mut self, kwargs: serde_json::Value) -> Self {
        let empty = match &kwargs {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            _ => false,
        };
        self.kwargs = (!empty).then_some(kwargs);
        self
    }
}

#[derive(Debug)]
pub struct Execution<T, E> {
    pub outcome: Result<T, E>,
    pub log: FunctionLog,
    /// Body line rendered with [`ProducerConfig::log_format`].
    pub body: String,
}

impl<T, E> Execution<T, E> {
    pub fn into_outcome(self) -> Result<T, E> {
        self.outcome
    }
}

pub fn timed<T, E, F>(
    cfg: &ProducerConfig,
    function_name: &str,
    module: &str,
    f: F,
) -> Execution<T, E>
where
    F: FnOnce() -> Result<T, E>,
    T: fmt::Debug,
    E: fmt::Display,
{
    timed_with_args(cfg, function_name, module, CallArgs::default(), f)
}

/// Like [`timed`], also reporting `call` when `cfg.include_args` is set.
pub fn timed_with_args<T, E, F>(
    cfg: &ProducerConfig,
    function_name: &str,
    module: &str,
    call: CallArgs,
    f: F,
) -> Execution<T, E>
where
    F: FnOnce() -> Result<T, E>,
    T: fmt::Debug,
    E: fmt::Display,
{
    let started = Instant::now();
    let outcome = f();
    let duration_ms = round_ms(started.elapsed().as_secs_f64() * 1000.0);

    let (mut log, message) = match &outcome {
        Ok(_) => (
            FunctionLog::success(function_name, module, &cfg.level, duration_ms),
            "Function executed successfully".to_string(),
        ),
        Err(err) => {
            let error = err.to_string();
            let message = format!("Function failed with error: {error}");
            (
                FunctionLog::failure(
                    function_name,
                    module,
                    duration_ms,
                    error,
                    short_type_name::<E>().to_string(),
                ),
                message,
            )
        }
    };

    if cfg.include_args {
        if let Some(args) = call.args {
            log = log.with_args(args);
        }
        if let Some(kwargs) = call.kwargs {
            log = log.with_kwargs(kwargs);
        }
    }
    if cfg.include_result {
        if let Ok(value) = &outcome {
            log = log.with_result(format!("{value:?}"));
        }
    }
    let body = cfg.format_body(&log, &message);

    Execution { outcome, log, body }
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
