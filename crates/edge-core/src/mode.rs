//! Transport mode and response format.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How the response body reaches the client.
///
/// Decided once per request, before rendering starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Flush the shell, then one chunk per boundary resolution.
    #[default]
    Stream,
    /// Wait for every boundary, then write the whole document once.
    Buffer,
}

impl TransportMode {
    /// Whether every write is flushed to the transport immediately.
    pub fn flush_each_write(&self) -> bool {
        matches!(self, Self::Stream)
    }

    /// Whether push statements are shipped with the HTML.
    pub fn ships_side_channel(&self) -> bool {
        matches!(self, Self::Stream)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Buffer => "buffer",
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the response body contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// HTML document with embedded side channel.
    #[default]
    Document,
    /// Raw side-channel rows only.
    Flight,
}

impl ResponseFormat {
    /// Content-Type header value.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Document => "text/html; charset=utf-8",
            Self::Flight => "text/x-component; charset=utf-8",
        }
    }
}
