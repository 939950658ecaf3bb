//! Per-render timing metrics.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use edge_core::{NodeId, RequestId};
use serde::{Deserialize, Serialize};

/// Metrics for a single render.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderMetrics {
    /// Request ID for correlation.
    pub request_id: String,
    /// Route path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    /// Transport mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Time to shell flush (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_shell_us: Option<u64>,
    /// Time to first boundary resolution chunk (microseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_first_boundary_us: Option<u64>,
    /// Boundaries in settlement order.
    pub boundaries: Vec<BoundaryMetrics>,
    /// Chunks written.
    pub chunks: u32,
    /// Body bytes written.
    pub bytes: usize,
    /// Total render duration (microseconds).
    pub total_duration_us: u64,
    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Metrics for one suspense boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryMetrics {
    /// Boundary id.
    pub id: u32,
    /// Time from request start to scheduling (microseconds).
    pub start_us: u64,
    /// Time from request start to settlement (microseconds).
    pub settled_us: u64,
    /// Time the content took (microseconds).
    pub duration_us: u64,
    /// Markup bytes produced for this boundary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Whether the boundary rendered its error fallback.
    pub used_fallback: bool,
}

/// Collector for render metrics.
#[derive(Debug)]
pub struct MetricsCollector {
    request_id: RequestId,
    route: Option<String>,
    mode: Option<String>,
    start: Instant,
    shell_sent: Option<Instant>,
    first_boundary_sent: Option<Instant>,
    scheduled: HashMap<NodeId, Instant>,
    boundaries: Vec<BoundaryMetrics>,
    chunks: u32,
    bytes: usize,
}

impl MetricsCollector {
    /// Create a new metrics collector.
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            route: None,
            mode: None,
            start: Instant::now(),
            shell_sent: None,
            first_boundary_sent: None,
            scheduled: HashMap::new(),
            boundaries: Vec::new(),
            chunks: 0,
            bytes: 0,
        }
    }

    /// Set route path.
    pub fn set_route(&mut self, route: impl Into<String>) {
        self.route = Some(route.into());
    }

    /// Set transport mode.
    pub fn set_mode(&mut self, mode: impl Into<String>) {
        self.mode = Some(mode.into());
    }

    /// Record shell sent.
    pub fn record_shell_sent(&mut self) {
        self.shell_sent = Some(Instant::now());
    }

    /// Record a boundary's content being scheduled.
    pub fn record_boundary_scheduled(&mut self, id: NodeId) {
        self.scheduled.insert(id, Instant::now());
    }

    /// Record a boundary settling.
    pub fn record_boundary_settled(&mut self, id: NodeId, bytes: Option<usize>, used_fallback: bool) {
        let now = Instant::now();
        let start = self.scheduled.remove(&id).unwrap_or(now);
        self.boundaries.push(BoundaryMetrics {
            id: id.0,
            start_us: start.duration_since(self.start).as_micros() as u64,
            settled_us: now.duration_since(self.start).as_micros() as u64,
            duration_us: now.duration_since(start).as_micros() as u64,
            bytes,
            used_fallback,
        });
    }

    /// Record a boundary's resolution chunk going out.
    pub fn record_boundary_sent(&mut self) {
        if self.first_boundary_sent.is_none() {
            self.first_boundary_sent = Some(Instant::now());
        }
    }

    /// Record a chunk written to the transport.
    pub fn record_chunk(&mut self, bytes: usize) {
        self.chunks += 1;
        self.bytes += bytes;
    }

    /// Finalize and return the metrics.
    pub fn finalize(self, status_code: Option<u16>) -> RenderMetrics {
        let start = self.start;
        let since = |t: Instant| t.duration_since(start).as_micros() as u64;

        RenderMetrics {
            request_id: self.request_id.to_string(),
            route: self.route,
            mode: self.mode,
            time_to_shell_us: self.shell_sent.map(since),
            time_to_first_boundary_us: self.first_boundary_sent.map(since),
            boundaries: self.boundaries,
            chunks: self.chunks,
            bytes: self.bytes,
            total_duration_us: start.elapsed().as_micros() as u64,
            status_code,
        }
    }

    /// Get time-to-shell so far.
    pub fn time_to_shell(&self) -> Option<Duration> {
        self.shell_sent.map(|t| t.duration_since(self.start))
    }

    /// Get total elapsed time.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl RenderMetrics {
    /// Format as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Format as JSON (pretty printed).
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Number of boundaries that used their error fallback.
    pub fn fallbacks_used(&self) -> usize {
        self.boundaries.iter().filter(|b| b.used_fallback).count()
    }

    /// Format as human-readable summary.
    pub fn to_summary(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Request: {}", self.request_id));

        if let Some(mode) = &self.mode {
            lines.push(format!("  Mode: {}", mode));
        }

        if let Some(tts) = self.time_to_shell_us {
            lines.push(format!("  Time to shell: {}us ({:.2}ms)", tts, tts as f64 / 1000.0));
        }

        if let Some(ttfb) = self.time_to_first_boundary_us {
            lines.push(format!(
                "  Time to first boundary: {}us ({:.2}ms)",
                ttfb,
                ttfb as f64 / 1000.0
            ));
        }

        lines.push(format!(
            "  Total: {}us ({:.2}ms), {} chunks, {} bytes",
            self.total_duration_us,
            self.total_duration_us as f64 / 1000.0,
            self.chunks,
            self.bytes
        ));

        if !self.boundaries.is_empty() {
            lines.push("  Boundaries:".to_string());
            for boundary in &self.boundaries {
                let fallback = if boundary.used_fallback { " [fallback]" } else { "" };
                lines.push(format!(
                    "    #{}: {}us ({:.2}ms){}",
                    boundary.id,
                    boundary.duration_us,
                    boundary.duration_us as f64 / 1000.0,
                    fallback
                ));
            }
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_records_boundaries_in_settlement_order() {
        let mut metrics = MetricsCollector::new(RequestId::from_string("req-1"));
        metrics.set_route("/stream");
        metrics.set_mode("stream");
        metrics.record_boundary_scheduled(NodeId(1));
        metrics.record_boundary_scheduled(NodeId(4));
        metrics.record_shell_sent();
        metrics.record_chunk(100);
        metrics.record_boundary_settled(NodeId(4), Some(20), false);
        metrics.record_boundary_sent();
        metrics.record_chunk(20);
        metrics.record_boundary_settled(NodeId(1), None, true);

        assert!(metrics.time_to_shell().is_some());
        let result = metrics.finalize(Some(200));

        let ids: Vec<u32> = result.boundaries.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![4, 1]);
        assert_eq!(result.chunks, 2);
        assert_eq!(result.bytes, 120);
        assert_eq!(result.fallbacks_used(), 1);
        assert_eq!(result.status_code, Some(200));
        assert!(result.time_to_shell_us.is_some());
        assert!(result.time_to_first_boundary_us.is_some());
    }

    #[test]
    fn test_json_skips_missing_fields() {
        let metrics = MetricsCollector::new(RequestId::from_string("r")).finalize(None);
        let json = metrics.to_json();
        assert!(!json.contains("time_to_shell_us"));
        assert!(!json.contains("status_code"));
        let parsed: RenderMetrics = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.request_id, "r");
    }

    #[test]
    fn test_summary_mentions_fallbacks() {
        let mut metrics = MetricsCollector::new(RequestId::from_string("r"));
        metrics.record_boundary_settled(NodeId(2), None, true);
        let summary = metrics.finalize(Some(200)).to_summary();
        assert!(summary.contains("#2"));
        assert!(summary.contains("[fallback]"));
    }
}
