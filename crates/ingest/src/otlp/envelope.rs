use std::borrow::Cow;
use std::io::Read;

use flate2::read::GzDecoder;
use fnlog_core::error::{FnlogError, Result};
use fnlog_core::model::log::RawLogRecord;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use prost::Message;

use crate::otlp::decode::records_from_request;
use crate::otlp::json::records_from_json;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Protobuf,
    Json,
    Unknown,
}

impl ContentKind {
    /// Parameters (`; charset=...`) and case are ignored.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let Some(raw) = content_type else {
            return Self::Unknown;
        };
        let mime = raw.split(';').next().unwrap_or_default().trim();
        if mime.eq_ignore_ascii_case("application/x-protobuf")
            || mime.eq_ignore_ascii_case("application/protobuf")
            || mime.eq_ignore_ascii_case("application/octet-stream")
        {
            Self::Protobuf
        } else if mime.eq_ignore_ascii_case("application/json") {
            Self::Json
        } else {
            Self::Unknown
        }
    }
}

/// Decodes an `ExportLogsServiceRequest` body into flattened raw records.
///
/// Any envelope-level failure fails the whole call; nothing is returned for a
/// partially decoded body. `max_bytes` bounds the body after decompression.
pub fn decode_logs_request(
    body: &[u8],
    content_type: Option<&str>,
    content_encoding: Option<&str>,
    max_bytes: usize,
) -> Result<Vec<RawLogRecord>> {
    let body = decompress(body, content_encoding, max_bytes)?;
    match ContentKind::from_content_type(content_type) {
        ContentKind::Protobuf => decode_protobuf(&body),
        ContentKind::Json => records_from_json(&body),
        ContentKind::Unknown => decode_protobuf(&body).map_err(|e| {
            FnlogError::Decode(format!(
                "unsupported content type {}; protobuf fallback failed: {e}",
                content_type.unwrap_or("<none>")
            ))
        }),
    }
}

fn decode_protobuf(body: &[u8]) -> Result<Vec<RawLogRecord>> {
    let req = ExportLogsServiceRequest::decode(body)
        .map_err(|e| FnlogError::Decode(format!("invalid OTLP protobuf: {e}")))?;
    Ok(records_from_request(&req))
}

/// A body labelled gzip that lacks the gzip magic bytes is passed through
/// as-is. Some clients set the header on uncompressed payloads.
fn decompress<'a>(
    body: &'a [u8],
    content_encoding: Option<&str>,
    max_bytes: usize,
) -> Result<Cow<'a, [u8]>> {
    if body.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    if !is_gzip(content_encoding) {
        return Ok(Cow::Borrowed(body));
    }
    if !body.starts_with(&GZIP_MAGIC) {
        tracing::debug!("content-encoding gzip without gzip magic; reading body as-is");
        return Ok(Cow::Borrowed(body));
    }

    // One byte past the limit is enough to tell an oversized body apart.
    let mut out = Vec::with_capacity(body.len().saturating_mul(4).min(max_bytes));
    GzDecoder::new(body)
        .take(max_bytes as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| FnlogError::Decode(format!("invalid gzip body: {e}")))?;
    if out.len() > max_bytes {
        return Err(too_large(max_bytes));
    }
    Ok(Cow::Owned(out))
}

fn too_large(max_bytes: usize) -> FnlogError {
    FnlogError::PayloadTooLarge(format!("decoded body exceeds {max_bytes} bytes"))
}

fn is_gzip(content_encoding: Option<&str>) -> bool {
    content_encoding
        .map(|enc| {
            enc.split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("gzip"))
        })
        .unwrap_or(false)
}
