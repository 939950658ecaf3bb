//! Renderer lifecycle tracking.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// States of one render.
///
/// `Init -> Evaluating -> {StreamingOut | Buffering} -> Flushed -> Done`,
/// with `Errored` and `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderState {
    Init,
    Evaluating,
    StreamingOut,
    Buffering,
    Flushed,
    Done,
    Errored,
    Cancelled,
}

impl RenderState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Errored | Self::Cancelled)
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: RenderState) -> bool {
        use RenderState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Errored) | (_, Cancelled) => true,
            (Init, Evaluating) => true,
            (Evaluating, StreamingOut) | (Evaluating, Buffering) => true,
            (StreamingOut, Flushed) | (Buffering, Flushed) => true,
            (Flushed, Done) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RenderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Evaluating => "evaluating",
            Self::StreamingOut => "streaming_out",
            Self::Buffering => "buffering",
            Self::Flushed => "flushed",
            Self::Done => "done",
            Self::Errored => "errored",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Timing marks for one render.
#[derive(Debug, Clone)]
pub struct TimingContext {
    start: Instant,
    marks: HashMap<String, Instant>,
}

impl TimingContext {
    /// Create a new timing context.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            marks: HashMap::new(),
        }
    }

    /// Record a timing mark.
    pub fn mark(&mut self, name: &str) {
        self.marks.insert(name.to_string(), Instant::now());
    }

    /// Mark a boundary resolution.
    pub fn mark_boundary_resolved(&mut self, boundary: impl fmt::Display) {
        self.mark(&format!("boundary_{}_resolved", boundary));
    }

    /// Get elapsed time since start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Get time to shell flush.
    pub fn time_to_shell(&self) -> Option<Duration> {
        self.since_start("shell_sent")
    }

    /// Time from start to a boundary's resolution.
    pub fn boundary_timing(&self, boundary: impl fmt::Display) -> Option<Duration> {
        self.since_start(&format!("boundary_{}_resolved", boundary))
    }

    fn since_start(&self, mark: &str) -> Option<Duration> {
        self.marks.get(mark).map(|t| t.duration_since(self.start))
    }
}

impl Default for TimingContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        use RenderState::*;
        assert!(Init.can_transition_to(Evaluating));
        assert!(Evaluating.can_transition_to(StreamingOut));
        assert!(Evaluating.can_transition_to(Buffering));
        assert!(StreamingOut.can_transition_to(Flushed));
        assert!(Flushed.can_transition_to(Done));
    }

    #[test]
    fn test_illegal_transitions() {
        use RenderState::*;
        assert!(!Init.can_transition_to(StreamingOut));
        assert!(!StreamingOut.can_transition_to(Buffering));
        assert!(!Done.can_transition_to(Errored));
        assert!(!Errored.can_transition_to(Done));
    }

    #[test]
    fn test_errored_and_cancelled_reachable_from_non_terminal() {
        use RenderState::*;
        for state in [Init, Evaluating, StreamingOut, Buffering, Flushed] {
            assert!(state.can_transition_to(Errored));
            assert!(state.can_transition_to(Cancelled));
        }
    }

    #[test]
    fn test_timing_marks() {
        let mut timing = TimingContext::new();
        assert!(timing.time_to_shell().is_none());
        timing.mark("shell_sent");
        timing.mark_boundary_resolved(3);
        assert!(timing.time_to_shell().is_some());
        assert!(timing.boundary_timing(3).is_some());
        assert!(timing.boundary_timing(4).is_none());
    }
}
