//! Fallback strategies for boundary failures.

use edge_core::{ComponentNode, ErrorFallback};

/// What a failed boundary turns into.
#[derive(Debug)]
pub enum FallbackOutcome {
    /// Evaluate and show this tree in place of the content.
    Render(ComponentNode),
    /// Show nothing.
    Skip,
    /// No error fallback; the failure leaves the boundary.
    Escalate(String),
}

impl FallbackOutcome {
    /// Whether the failure was contained at the boundary.
    pub fn is_contained(&self) -> bool {
        !matches!(self, Self::Escalate(_))
    }
}

/// Apply a boundary's error fallback policy to a failure.
pub fn apply_fallback(policy: Option<ErrorFallback>, error: &str) -> FallbackOutcome {
    match policy {
        Some(ErrorFallback::Render(node)) => FallbackOutcome::Render(*node),
        Some(ErrorFallback::Skip) => FallbackOutcome::Skip,
        Some(ErrorFallback::ShowError) => FallbackOutcome::Render(error_message(error)),
        None => FallbackOutcome::Escalate(error.to_string()),
    }
}

/// Generic error markup. Text is escaped when the tree is written.
fn error_message(error: &str) -> ComponentNode {
    ComponentNode::element("div")
        .attr("class", "boundary-error")
        .child(format!("Failed to load: {}", error))
        .into()
}
