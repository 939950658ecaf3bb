//! Render a demo route locally.

use std::time::{Duration, Instant};

use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use edge_core::{RenderError, ResponseFormat, TransportMode};
use edge_render::{cancel_pair, Renderer};
use edge_streaming::{ResponseHead, ResponseWriter, Transport};
use serde::Serialize;

use super::RenderArgs;
use crate::context::Context;
use crate::output::{format_bytes, state_badge, Output};

/// A flushed chunk as printed in JSON mode.
#[derive(Debug, Serialize)]
struct FlushedChunk {
    ordinal: usize,
    elapsed_ms: f64,
    body: String,
}

/// Transport that prints each chunk when it is flushed.
struct ConsoleTransport {
    output: Output,
    show_body: bool,
    started: Instant,
    head: Option<ResponseHead>,
    pending: Vec<u8>,
    chunks: Vec<FlushedChunk>,
}

impl ConsoleTransport {
    fn new(output: Output, show_body: bool) -> Self {
        Self {
            output,
            show_body,
            started: Instant::now(),
            head: None,
            pending: Vec::new(),
            chunks: Vec::new(),
        }
    }
}

#[async_trait(?Send)]
impl Transport for ConsoleTransport {
    async fn start(&mut self, head: &ResponseHead) -> Result<(), RenderError> {
        self.output.header(&format!("HTTP {}", head.status.as_u16()));
        for (name, value) in &head.headers {
            self.output.kv(name, value);
        }
        self.head = Some(head.clone());
        Ok(())
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), RenderError> {
        self.pending.extend(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), RenderError> {
        let body = String::from_utf8_lossy(&std::mem::take(&mut self.pending)).into_owned();
        let chunk = FlushedChunk {
            ordinal: self.chunks.len(),
            elapsed_ms: self.started.elapsed().as_secs_f64() * 1000.0,
            body,
        };
        self.output
            .chunk(chunk.ordinal, chunk.elapsed_ms, &chunk.body, self.show_body);
        self.chunks.push(chunk);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

/// Run the render command.
pub async fn run(args: RenderArgs, ctx: &Context) -> Result<()> {
    let mut path = args.path.clone();
    if args.bot {
        let separator = if path.contains('?') { '&' } else { '?' };
        path.push(separator);
        path.push_str(&ctx.config.bot.query_param);
    }

    let Some(mut request) = stream_demo::pages::route(&path) else {
        bail!(
            "No demo page for {}. Run `edge routes` to list them.",
            args.path
        );
    };

    if args.flight {
        request = request.with_format(ResponseFormat::Flight);
    }
    if let Some(ua) = &args.user_agent {
        request = request.with_header("user-agent", ua.as_str());
    }
    for header in &args.headers {
        let (name, value) = header
            .split_once('=')
            .with_context(|| format!("Header must be name=value: {}", header))?;
        request = request.with_header(name.trim(), value.trim());
    }

    ctx.output.debug(&format!("Rendering {:?}", request));

    let renderer = Renderer::new(ctx.config.clone());
    let transport = ConsoleTransport::new(ctx.output.clone(), !args.quiet);
    let mut writer = ResponseWriter::new(transport, TransportMode::Stream);
    let (handle, signal) = cancel_pair();

    let report = {
        let render = renderer.render(request, &mut writer, signal);
        tokio::pin!(render);
        match args.timeout_ms {
            Some(ms) => {
                tokio::select! {
                    report = &mut render => report,
                    _ = tokio::time::sleep(Duration::from_millis(ms)) => {
                        ctx.output.warn(&format!("Timed out after {}ms, cancelling", ms));
                        handle.cancel();
                        render.await
                    }
                }
            }
            None => render.await,
        }
    };
    let transport = writer.into_inner();

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({
            "report": &report,
            "chunks": &transport.chunks,
        }));
    } else {
        ctx.output.header("Render report");
        ctx.output.kv("request_id", &report.request_id);
        ctx.output.kv("mode", report.mode.as_str());
        ctx.output.kv("state", &state_badge(report.final_state));
        if let Some(status) = report.status {
            ctx.output.kv("status", &status.to_string());
        }
        ctx.output.kv("chunks", &report.chunks_written.to_string());
        ctx.output.kv("bytes", &format_bytes(report.bytes_written as u64));
        ctx.output.kv(
            "boundaries",
            &format!(
                "{} resolved, {} errored",
                report.boundaries_resolved, report.boundaries_errored
            ),
        );
        if report.late_seo_declarations > 0 {
            ctx.output.kv(
                "late_seo_declarations",
                &report.late_seo_declarations.to_string(),
            );
        }
        ctx.output.kv("metrics", &report.metrics.to_summary());
    }

    if let Some(error) = &report.error {
        if error.is_fatal() && !report.is_done() {
            bail!("Render ended in {}: {}", report.final_state, error);
        }
    }

    Ok(())
}
