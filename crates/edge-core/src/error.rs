//! Render error taxonomy.

use thiserror::Error;

use crate::node::NodeId;

/// Errors that can occur while rendering one request.
///
/// Only `BoundaryRenderFailure` is recoverable; it is contained at the
/// boundary that produced it. A boundary without an error fallback turns it
/// into `UncontainedBoundaryFailure`, which ends the render like everything
/// else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Resolving an unknown or already-settled boundary.
    #[error("Invalid boundary state for {boundary}: {reason}")]
    InvalidBoundaryState { boundary: NodeId, reason: String },

    /// Write attempted after the writer was closed.
    #[error("Transport already closed")]
    TransportClosed,

    /// A chunk broke the writer's ordinal or single-write contract.
    #[error("Chunk order violated: {0}")]
    ChunkOrder(String),

    /// Head metadata finalized twice.
    #[error("Head metadata already finalized")]
    AlreadyFinalized,

    /// A boundary's async content failed.
    #[error("Boundary {boundary} failed: {message}")]
    BoundaryRenderFailure { boundary: NodeId, message: String },

    /// A boundary's async content failed and the boundary has no error fallback.
    #[error("Boundary {boundary} failed without an error fallback: {message}")]
    UncontainedBoundaryFailure { boundary: NodeId, message: String },

    /// Failure outside any boundary.
    #[error("Root render failed: {0}")]
    RootRenderFailure(String),

    /// The request failed validation.
    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    /// The transport rejected a write; the client is gone.
    #[error("Transport disconnected: {0}")]
    TransportDisconnected(String),

    /// External cancellation was observed.
    #[error("Render cancelled")]
    Cancelled,
}

impl RenderError {
    /// Whether this error terminates the render.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::BoundaryRenderFailure { .. })
    }

    /// Escalate a contained boundary failure. Other errors pass through.
    pub fn uncontained(self) -> Self {
        match self {
            Self::BoundaryRenderFailure { boundary, message } => {
                Self::UncontainedBoundaryFailure { boundary, message }
            }
            other => other,
        }
    }

    /// Whether this error means nothing more can be written.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::TransportDisconnected(_) | Self::Cancelled)
    }

    /// HTTP status for the error document.
    pub fn status(&self) -> http::StatusCode {
        match self {
            Self::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            _ => http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
