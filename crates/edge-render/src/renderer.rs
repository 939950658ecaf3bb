//! The render state machine.

use std::collections::HashMap;

use edge_core::{
    header_lookup, ComponentNode, ErrorFallback, IdAllocator, MountedNode, NodeId, RenderConfig,
    RenderContext, RenderError, RenderRequest, RenderState, RequestId, ResponseFormat,
    TimingContext, TransportMode,
};
use edge_executor::{
    apply_fallback, resolution_markup, BoundaryFailure, FallbackOutcome, SuspenseBoundaryTracker,
};
use edge_flight::{push_statement, push_statements, row_lines, FlightSerializer};
use edge_observability::{MetricsCollector, RenderMetrics, StructuredLogger};
use edge_streaming::{header_names, DocumentShell, ResponseHead, ResponseWriter, SeoInjector, Transport};
use futures::future::{select, Either, LocalBoxFuture};
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use http::StatusCode;
use serde::Serialize;

use crate::bot::BotPolicyClassifier;
use crate::cancel::CancelSignal;
use crate::evaluate::{evaluate, evaluate_root, Evaluation};
use crate::html::HtmlWriter;

/// A boundary's content future tagged with its id.
type Completion = LocalBoxFuture<'static, (NodeId, anyhow::Result<ComponentNode>)>;

/// Outcome of one render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub request_id: String,
    pub mode: TransportMode,
    pub final_state: RenderState,
    /// Committed HTTP status. `None` if nothing was written.
    pub status: Option<u16>,
    pub chunks_written: u32,
    pub bytes_written: usize,
    pub boundaries_resolved: usize,
    pub boundaries_errored: usize,
    /// Head tags declared after the head was sent, and dropped.
    pub late_seo_declarations: usize,
    /// The error that ended the render, if any.
    #[serde(skip)]
    pub error: Option<RenderError>,
    pub metrics: RenderMetrics,
}

impl RenderReport {
    /// Whether the render ran to `Done`.
    pub fn is_done(&self) -> bool {
        self.final_state == RenderState::Done
    }
}

/// Renders component trees into chunked responses.
///
/// A `Renderer` holds only configuration and can serve any number of
/// requests, concurrently or not. All render state is created per call.
#[derive(Debug, Clone)]
pub struct Renderer {
    config: RenderConfig,
    classifier: BotPolicyClassifier,
    shell: DocumentShell,
}

impl Renderer {
    /// Create a renderer.
    pub fn new(config: RenderConfig) -> Self {
        let classifier = BotPolicyClassifier::new(&config.bot);
        let shell = DocumentShell::new(&config.document, &config.flight);
        Self {
            config,
            classifier,
            shell,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn classifier(&self) -> &BotPolicyClassifier {
        &self.classifier
    }

    /// Render one request into `writer`.
    ///
    /// The writer must be fresh; its mode is set from the classification.
    /// Failures are reported through `RenderReport::error`; the response is
    /// always finished as far as the transport allows.
    pub async fn render<T: Transport>(
        &self,
        request: RenderRequest,
        writer: &mut ResponseWriter<T>,
        cancel: CancelSignal,
    ) -> RenderReport {
        let task = RenderTask::new(self, writer, cancel, &request);
        task.run(request).await
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

/// What a settled boundary shows.
struct Settled {
    content: Option<MountedNode>,
    used_fallback: bool,
}

/// State of one render. Never shared between requests.
struct RenderTask<'a, T: Transport> {
    renderer: &'a Renderer,
    writer: &'a mut ResponseWriter<T>,
    cancel: CancelSignal,
    request_id: RequestId,
    mode: TransportMode,
    format: ResponseFormat,
    state: RenderState,
    ids: IdAllocator,
    tracker: SuspenseBoundaryTracker,
    flight: FlightSerializer,
    seo: SeoInjector,
    in_flight: FuturesUnordered<Completion>,
    policies: HashMap<NodeId, Option<ErrorFallback>>,
    splice_defined: bool,
    status: Option<StatusCode>,
    error: Option<RenderError>,
    logger: StructuredLogger,
    metrics: MetricsCollector,
    timing: TimingContext,
}

impl<'a, T: Transport> RenderTask<'a, T> {
    fn new(
        renderer: &'a Renderer,
        writer: &'a mut ResponseWriter<T>,
        cancel: CancelSignal,
        request: &RenderRequest,
    ) -> Self {
        let request_id = header_lookup(&request.headers, header_names::X_REQUEST_ID)
            .map(RequestId::from_string)
            .unwrap_or_else(RequestId::generate);
        let logger = StructuredLogger::from_config(request_id.clone(), &renderer.config.log)
            .with_route(&request.pathname);
        let mut metrics = MetricsCollector::new(request_id.clone());
        metrics.set_route(&request.pathname);

        Self {
            renderer,
            writer,
            cancel,
            request_id,
            mode: TransportMode::Stream,
            format: request.format,
            state: RenderState::Init,
            ids: IdAllocator::new(),
            tracker: SuspenseBoundaryTracker::new(),
            flight: FlightSerializer::new(),
            seo: SeoInjector::new(),
            in_flight: FuturesUnordered::new(),
            policies: HashMap::new(),
            splice_defined: false,
            status: None,
            error: None,
            logger,
            metrics,
            timing: TimingContext::new(),
        }
    }

    async fn run(mut self, request: RenderRequest) -> RenderReport {
        if let Err(err) = self.drive(request).await {
            if err.is_disconnect() {
                self.abort(err).await;
            } else {
                self.fail(err).await;
            }
        }
        self.report()
    }

    async fn drive(&mut self, request: RenderRequest) -> Result<(), RenderError> {
        // Init
        request.validate()?;
        let (mode, reason) = self
            .renderer
            .classifier
            .explain(&request.query, &request.headers);
        self.mode = mode;
        self.writer.set_mode(mode)?;
        self.logger = self.logger.clone().with_mode(mode);
        self.metrics.set_mode(mode.as_str());
        self.logger
            .info_builder("transport mode selected")
            .field("reason", format!("{:?}", reason))
            .emit();

        let ctx = RenderContext {
            request_id: self.request_id.clone(),
            pathname: request.pathname,
            query: request.query,
            headers: request.headers,
            mode,
            format: self.format,
        };
        if self.cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }

        // Evaluating
        self.transition(RenderState::Evaluating);
        let root = (request.root)(&ctx)
            .map_err(|e| RenderError::RootRenderFailure(format!("{:#}", e)))?;
        let evaluation = evaluate_root(root, &mut self.ids);
        let tree = self.accept(evaluation)?;

        match mode {
            TransportMode::Stream => self.stream(tree).await,
            TransportMode::Buffer => self.buffer(tree).await,
        }
    }

    async fn stream(&mut self, tree: MountedNode) -> Result<(), RenderError> {
        self.transition(RenderState::StreamingOut);
        let tags = self.seo.finalize()?;
        let done = self.in_flight.is_empty();

        let renderer = self.renderer;
        let shell = &renderer.shell;
        let root_records = self.flight.serialize_root(&tree, &mut self.ids)?;
        let payload = match self.format {
            ResponseFormat::Document => {
                let mut html = shell.render_opening(&tags);
                html.push_str(&HtmlWriter::pending().render(&tree));
                html.push_str(&push_statements(&shell.flight_global, &root_records));
                if done {
                    html.push_str(&shell.render_closing());
                }
                html
            }
            ResponseFormat::Flight => row_lines(&root_records),
        };

        self.commit(StatusCode::OK).await?;
        self.send(payload, done).await?;
        self.timing.mark("shell_sent");
        self.metrics.record_shell_sent();
        self.logger
            .debug_builder("shell flushed")
            .field_i64("pending_boundaries", self.tracker.pending_count() as i64)
            .emit();

        while let Some((id, result)) = self.next_completion().await? {
            let settled = self.settle(id, result)?;
            let records = self
                .flight
                .serialize_resolved(id, settled.content.as_ref(), &mut self.ids)?;
            let done = self.in_flight.is_empty();

            let payload = match self.format {
                ResponseFormat::Document => {
                    let html = settled
                        .content
                        .as_ref()
                        .map(|c| HtmlWriter::pending().render(c))
                        .unwrap_or_default();
                    let mut out = resolution_markup(id, &html, !self.splice_defined);
                    self.splice_defined = true;
                    out.push_str(&push_statements(&shell.flight_global, &records));
                    if done {
                        out.push_str(&shell.render_closing());
                    }
                    out
                }
                ResponseFormat::Flight => row_lines(&records),
            };

            self.metrics
                .record_boundary_settled(id, Some(payload.len()), settled.used_fallback);
            self.send(payload, done).await?;
            self.metrics.record_boundary_sent();
            self.timing.mark_boundary_resolved(id);
            self.logger
                .debug_builder("boundary resolved")
                .field_i64("boundary", id.0 as i64)
                .field_i64("seq", records.last().map(|r| r.seq as i64).unwrap_or(-1))
                .field_bool("fallback", settled.used_fallback)
                .emit();
        }

        self.complete().await
    }

    async fn buffer(&mut self, tree: MountedNode) -> Result<(), RenderError> {
        self.transition(RenderState::Buffering);

        while !self.tracker.is_all_resolved() {
            let Some((id, result)) = self.next_completion().await? else {
                let boundary = self.tracker.pending_ids().first().copied().unwrap_or(NodeId(0));
                return Err(RenderError::InvalidBoundaryState {
                    boundary,
                    reason: "pending with no scheduled work".to_string(),
                });
            };
            let settled = self.settle(id, result)?;
            self.metrics
                .record_boundary_settled(id, None, settled.used_fallback);
            self.timing.mark_boundary_resolved(id);
            self.logger
                .debug_builder("boundary resolved")
                .field_i64("boundary", id.0 as i64)
                .field_bool("fallback", settled.used_fallback)
                .emit();
        }

        let tags = self.seo.finalize()?;
        let renderer = self.renderer;
        let shell = &renderer.shell;
        let payload = match self.format {
            ResponseFormat::Document => {
                let mut html = shell.render_opening(&tags);
                html.push_str(&HtmlWriter::stitched(&self.tracker).render(&tree));
                html.push_str(&shell.render_closing());
                html
            }
            ResponseFormat::Flight => {
                let mut records = self.flight.serialize_root(&tree, &mut self.ids)?;
                for id in self.tracker.settlement_order().to_vec() {
                    records.extend(self.flight.serialize_resolved(
                        id,
                        self.tracker.content(id),
                        &mut self.ids,
                    )?);
                }
                row_lines(&records)
            }
        };

        self.commit(StatusCode::OK).await?;
        self.send(payload, true).await?;
        self.timing.mark("shell_sent");
        self.metrics.record_shell_sent();
        self.complete().await
    }

    /// Take ownership of an evaluated subtree: declare its head tags and
    /// schedule its boundaries.
    fn accept(&mut self, evaluation: Evaluation) -> Result<MountedNode, RenderError> {
        // Buffered documents never show a fallback, so its metadata is dropped.
        let fallback_head = match self.mode {
            TransportMode::Stream => evaluation.fallback_head,
            TransportMode::Buffer => {
                if !evaluation.fallback_head.is_empty() {
                    self.logger
                        .debug_builder("fallback head declarations dropped")
                        .field_i64("count", evaluation.fallback_head.len() as i64)
                        .emit();
                }
                Vec::new()
            }
        };
        for tag in fallback_head.into_iter().chain(evaluation.head) {
            let key = tag.key();
            if !self.seo.declare(tag) {
                self.logger
                    .debug_builder("late head declaration dropped")
                    .field("tag", key)
                    .emit();
            }
        }
        if evaluation.discarded > 0 {
            self.logger
                .debug_builder("boundaries inside fallbacks discarded")
                .field_i64("count", evaluation.discarded as i64)
                .emit();
        }

        for scheduled in evaluation.scheduled {
            let id = scheduled.boundary.id;
            self.tracker.register(scheduled.boundary)?;
            self.policies.insert(id, scheduled.on_error);
            self.metrics.record_boundary_scheduled(id);
            self.in_flight
                .push(scheduled.content.map(move |result| (id, result)).boxed_local());
        }

        Ok(evaluation.node)
    }

    /// Settle a boundary with the outcome of its content.
    fn settle(
        &mut self,
        id: NodeId,
        result: anyhow::Result<ComponentNode>,
    ) -> Result<Settled, RenderError> {
        let policy = self.policies.remove(&id).flatten();

        let err = match result {
            Ok(node) => {
                let evaluation = evaluate(node, &mut self.ids, id);
                let mounted = self.accept(evaluation)?;
                self.tracker.resolve(id, Ok(mounted.clone()))?;
                return Ok(Settled {
                    content: Some(mounted),
                    used_fallback: false,
                });
            }
            Err(err) => err,
        };

        let message = format!("{:#}", err);
        self.logger
            .warn_builder("boundary failed")
            .field_i64("boundary", id.0 as i64)
            .field("error", message.as_str())
            .emit();

        match apply_fallback(policy, &message) {
            FallbackOutcome::Render(node) => {
                let evaluation = evaluate(node, &mut self.ids, id);
                let mounted = self.accept(evaluation)?;
                let failure = BoundaryFailure::new(message, Some(mounted.clone()));
                self.tracker.resolve(id, Err(failure))?;
                Ok(Settled {
                    content: Some(mounted),
                    used_fallback: true,
                })
            }
            FallbackOutcome::Skip => {
                self.tracker.resolve(id, Err(BoundaryFailure::new(message, None)))?;
                Ok(Settled {
                    content: None,
                    used_fallback: true,
                })
            }
            FallbackOutcome::Escalate(message) => {
                self.tracker
                    .resolve(id, Err(BoundaryFailure::new(message.as_str(), None)))?;
                let failure = RenderError::BoundaryRenderFailure {
                    boundary: id,
                    message,
                };
                Err(failure.uncontained())
            }
        }
    }

    /// Wait for the next boundary to finish, or for cancellation.
    async fn next_completion(
        &mut self,
    ) -> Result<Option<(NodeId, anyhow::Result<ComponentNode>)>, RenderError> {
        if self.cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        if self.in_flight.is_empty() {
            return Ok(None);
        }

        let next = self.in_flight.next();
        let cancelled = self.cancel.cancelled();
        futures::pin_mut!(cancelled);

        match select(next, cancelled).await {
            Either::Left((completion, _)) => Ok(completion),
            Either::Right(_) => Err(RenderError::Cancelled),
        }
    }

    async fn commit(&mut self, status: StatusCode) -> Result<(), RenderError> {
        let head = if status.is_success() {
            ResponseHead::ok(self.format, self.mode, &self.request_id)
        } else {
            ResponseHead::error(status, &self.request_id)
        };
        self.writer.begin(&head).await?;
        self.status = Some(status);
        Ok(())
    }

    async fn send(&mut self, payload: String, is_final: bool) -> Result<(), RenderError> {
        let chunk = self.writer.chunk(payload, is_final);
        let len = chunk.len();
        self.writer.write(chunk).await?;
        self.metrics.record_chunk(len);
        Ok(())
    }

    async fn complete(&mut self) -> Result<(), RenderError> {
        self.transition(RenderState::Flushed);
        self.writer.close().await?;
        self.transition(RenderState::Done);
        let mut entry = self
            .logger
            .info_builder("render complete")
            .field_i64("chunks", self.writer.chunks_written() as i64)
            .field_i64("bytes", self.writer.bytes_written() as i64)
            .field_i64("boundaries", self.tracker.len() as i64);
        if let Some(time_to_shell) = self.timing.time_to_shell() {
            entry = entry.duration_ms("time_to_shell_ms", time_to_shell);
        }
        entry.emit();
        Ok(())
    }

    /// Terminate on a fatal error with the best response still possible.
    async fn fail(&mut self, err: RenderError) {
        self.in_flight = FuturesUnordered::new();
        self.transition(RenderState::Errored);
        self.logger
            .error_builder("render failed")
            .field("error", err.to_string())
            .field_bool("headers_sent", self.writer.is_started())
            .emit();

        let delivered = if !self.writer.is_started() {
            self.write_error_document(&err).await
        } else if !self.writer.is_closed() && !self.writer.final_written() {
            self.write_error_tail(&err).await
        } else {
            Ok(())
        };
        if let Err(e) = delivered {
            self.logger
                .warn_builder("error response not delivered")
                .field("error", e.to_string())
                .emit();
        }
        if let Err(e) = self.writer.close().await {
            self.logger
                .warn_builder("close failed")
                .field("error", e.to_string())
                .emit();
        }
        self.error = Some(err);
    }

    /// Stop after cancellation or disconnect. Pending work is dropped and
    /// nothing more is written.
    async fn abort(&mut self, err: RenderError) {
        self.in_flight = FuturesUnordered::new();
        self.transition(RenderState::Cancelled);
        self.logger
            .warn_builder("render cancelled")
            .field("reason", err.to_string())
            .field_i64("pending_boundaries", self.tracker.pending_count() as i64)
            .emit();

        match err {
            RenderError::TransportDisconnected(_) => self.writer.abandon(),
            _ => {
                if let Err(e) = self.writer.close().await {
                    self.logger
                        .warn_builder("close failed")
                        .field("error", e.to_string())
                        .emit();
                }
            }
        }
        self.error = Some(err);
    }

    /// Error page, when nothing has been committed yet.
    async fn write_error_document(&mut self, err: &RenderError) -> Result<(), RenderError> {
        let status = err.status();
        self.commit(status).await?;
        let message = match err {
            RenderError::InvalidRequest(message) => message.as_str(),
            _ => status.canonical_reason().unwrap_or("Internal Server Error"),
        };
        let html = self.renderer.shell.render_error(status.as_u16(), message);
        self.send(html, true).await
    }

    /// Final chunk after the shell went out: an error row and the document tail.
    async fn write_error_tail(&mut self, err: &RenderError) -> Result<(), RenderError> {
        let target = match err {
            RenderError::UncontainedBoundaryFailure { boundary, .. } => *boundary,
            _ => NodeId(0),
        };
        let record = self.flight.serialize_error(target, &err.to_string());
        let renderer = self.renderer;
        let shell = &renderer.shell;
        let payload = match self.format {
            ResponseFormat::Document => format!(
                "{}{}",
                push_statement(&shell.flight_global, &record),
                shell.render_closing()
            ),
            ResponseFormat::Flight => row_lines(std::slice::from_ref(&record)),
        };
        self.send(payload, true).await
    }

    fn transition(&mut self, next: RenderState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.timing.mark(&next.to_string());
        self.state = next;
    }

    fn report(self) -> RenderReport {
        let status = self.status.map(|s| s.as_u16());
        let errored = self.tracker.errored_count();
        let resolved = self.tracker.len() - errored - self.tracker.pending_count();
        RenderReport {
            request_id: self.request_id.to_string(),
            mode: self.mode,
            final_state: self.state,
            status,
            chunks_written: self.writer.chunks_written(),
            bytes_written: self.writer.bytes_written(),
            boundaries_resolved: resolved,
            boundaries_errored: errored,
            late_seo_declarations: self.seo.late_declarations(),
            error: self.error,
            metrics: self.metrics.finalize(status),
        }
    }
}
