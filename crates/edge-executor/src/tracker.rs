//! Suspense boundary tracking.

use std::collections::HashMap;

use edge_core::{MountedNode, NodeId, RenderError};

/// State of a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryState {
    /// Waiting for its content.
    Pending,
    /// Content arrived.
    Resolved,
    /// Content failed; the replacement (if any) is shown instead.
    Errored,
}

/// Failed boundary content.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFailure {
    /// Error text.
    pub message: String,
    /// Evaluated error fallback. `None` renders nothing.
    pub replacement: Option<MountedNode>,
}

impl BoundaryFailure {
    pub fn new(message: impl Into<String>, replacement: Option<MountedNode>) -> Self {
        Self {
            message: message.into(),
            replacement,
        }
    }
}

/// An async sub-render tracked by id.
#[derive(Debug, Clone)]
pub struct SuspenseBoundary {
    /// Boundary id, equal to the id of its node in the evaluated tree.
    pub id: NodeId,
    /// Enclosing boundary whose resolved content contains this one.
    pub parent: Option<NodeId>,
    /// Current state.
    pub state: BoundaryState,
    /// Shown while pending.
    pub fallback: MountedNode,
    /// Resolved content, or the error replacement.
    pub content: Option<MountedNode>,
    /// Error text when errored.
    pub error: Option<String>,
}

impl SuspenseBoundary {
    /// Create a pending boundary.
    pub fn new(id: NodeId, fallback: MountedNode) -> Self {
        Self {
            id,
            parent: None,
            state: BoundaryState::Pending,
            fallback,
            content: None,
            error: None,
        }
    }

    /// Set the enclosing boundary.
    pub fn with_parent(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn is_pending(&self) -> bool {
        self.state == BoundaryState::Pending
    }
}

/// Tracks which boundaries of one request are still pending.
///
/// A boundary moves from `Pending` to `Resolved` or `Errored` exactly once.
/// Settlement order is recorded; it is the order in which stream mode emits
/// resolution chunks.
#[derive(Debug, Default)]
pub struct SuspenseBoundaryTracker {
    boundaries: HashMap<NodeId, SuspenseBoundary>,
    registered: Vec<NodeId>,
    settled: Vec<NodeId>,
}

impl SuspenseBoundaryTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pending boundary.
    pub fn register(&mut self, boundary: SuspenseBoundary) -> Result<(), RenderError> {
        if self.boundaries.contains_key(&boundary.id) {
            return Err(RenderError::InvalidBoundaryState {
                boundary: boundary.id,
                reason: "already registered".to_string(),
            });
        }
        self.registered.push(boundary.id);
        self.boundaries.insert(boundary.id, boundary);
        Ok(())
    }

    /// Settle a boundary with its content or failure.
    pub fn resolve(
        &mut self,
        id: NodeId,
        result: Result<MountedNode, BoundaryFailure>,
    ) -> Result<(), RenderError> {
        let boundary = self
            .boundaries
            .get_mut(&id)
            .ok_or_else(|| RenderError::InvalidBoundaryState {
                boundary: id,
                reason: "not registered".to_string(),
            })?;

        if !boundary.is_pending() {
            return Err(RenderError::InvalidBoundaryState {
                boundary: id,
                reason: format!("already {:?}", boundary.state).to_lowercase(),
            });
        }

        match result {
            Ok(node) => {
                boundary.state = BoundaryState::Resolved;
                boundary.content = Some(node);
            }
            Err(failure) => {
                boundary.state = BoundaryState::Errored;
                boundary.content = failure.replacement;
                boundary.error = Some(failure.message);
            }
        }
        self.settled.push(id);
        Ok(())
    }

    /// Number of boundaries still pending.
    pub fn pending_count(&self) -> usize {
        self.boundaries.values().filter(|b| b.is_pending()).count()
    }

    /// Whether every registered boundary has settled.
    pub fn is_all_resolved(&self) -> bool {
        self.boundaries.values().all(|b| !b.is_pending())
    }

    /// Get a boundary by id.
    pub fn get(&self, id: NodeId) -> Option<&SuspenseBoundary> {
        self.boundaries.get(&id)
    }

    /// State of a boundary.
    pub fn state(&self, id: NodeId) -> Option<BoundaryState> {
        self.boundaries.get(&id).map(|b| b.state)
    }

    /// Content to show for a settled boundary. `None` while pending, and for
    /// an errored boundary that renders nothing.
    pub fn content(&self, id: NodeId) -> Option<&MountedNode> {
        self.boundaries.get(&id).and_then(|b| b.content.as_ref())
    }

    /// Pending ids in registration order.
    pub fn pending_ids(&self) -> Vec<NodeId> {
        self.registered
            .iter()
            .copied()
            .filter(|id| self.state(*id) == Some(BoundaryState::Pending))
            .collect()
    }

    /// Ids in registration order.
    pub fn registered(&self) -> &[NodeId] {
        &self.registered
    }

    /// Ids in settlement order.
    pub fn settlement_order(&self) -> &[NodeId] {
        &self.settled
    }

    /// Number of boundaries that settled as errored.
    pub fn errored_count(&self) -> usize {
        self.boundaries
            .values()
            .filter(|b| b.state == BoundaryState::Errored)
            .count()
    }

    /// Total registered boundaries.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }
}
