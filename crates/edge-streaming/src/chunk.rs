//! Response chunks and the response head.

use edge_core::{RequestId, ResponseFormat, TransportMode};
use http::StatusCode;

/// A byte range handed to the transport.
///
/// Ordinals start at 0 and are contiguous; exactly one chunk per response
/// is final and it is the last one written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseChunk {
    pub ordinal: u32,
    pub payload: Vec<u8>,
    pub is_final: bool,
}

impl ResponseChunk {
    /// Create a chunk.
    pub fn new(ordinal: u32, payload: impl Into<Vec<u8>>, is_final: bool) -> Self {
        Self {
            ordinal,
            payload: payload.into(),
            is_final,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Header names set by the renderer.
pub mod header_names {
    pub const CONTENT_TYPE: &str = "content-type";
    /// Chosen transport mode (`stream` or `buffer`).
    pub const X_RENDER_MODE: &str = "x-render-mode";
    /// Request ID for tracing.
    pub const X_REQUEST_ID: &str = "x-request-id";
}

/// Status line and headers, committed before the first body byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Create a head with a status and no headers.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Head for a successful render.
    pub fn ok(format: ResponseFormat, mode: TransportMode, request_id: &RequestId) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header_names::CONTENT_TYPE, format.content_type())
            .with_header(header_names::X_RENDER_MODE, mode.as_str())
            .with_header(header_names::X_REQUEST_ID, request_id.to_string())
    }

    /// Head for an error document.
    pub fn error(status: StatusCode, request_id: &RequestId) -> Self {
        Self::new(status)
            .with_header(header_names::CONTENT_TYPE, ResponseFormat::Document.content_type())
            .with_header(header_names::X_REQUEST_ID, request_id.to_string())
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Get a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
