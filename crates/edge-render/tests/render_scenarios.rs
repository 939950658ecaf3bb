//! End-to-end render scenarios over an in-memory transport.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use edge_core::{
    ClientModule, ComponentNode, ErrorFallback, LogLevel, RenderConfig, RenderContext,
    RenderError, RenderRequest, RenderState, ResponseFormat, SeoTag, TransportMode,
};
use edge_render::{cancel_pair, CancelSignal, RenderReport, Renderer};
use edge_streaming::{header_names, MemoryTransport, ResponseWriter};
use tokio::time::sleep;

const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

fn renderer() -> Renderer {
    let mut config = RenderConfig::default();
    config.log.level = LogLevel::Error;
    Renderer::new(config)
}

async fn run(request: RenderRequest) -> (RenderReport, MemoryTransport) {
    let mut writer = ResponseWriter::new(MemoryTransport::new(), TransportMode::Stream);
    let report = renderer()
        .render(request, &mut writer, CancelSignal::never())
        .await;
    (report, writer.into_inner())
}

async fn delayed(ms: u64, node: impl Into<ComponentNode>) -> anyhow::Result<ComponentNode> {
    sleep(Duration::from_millis(ms)).await;
    Ok(node.into())
}

async fn failing(ms: u64, message: &'static str) -> anyhow::Result<ComponentNode> {
    sleep(Duration::from_millis(ms)).await;
    Err(anyhow::anyhow!(message))
}

fn stream_page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
    let content = ComponentNode::element("div").attr("c", "5").child("done");
    Ok(ComponentNode::element("div")
        .child(ComponentNode::suspense("loading...", delayed(10, content)))
        .child(ComponentNode::element("footer").child("footer!"))
        .into())
}

fn seo_page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
    let late = ComponentNode::fragment(vec![
        ComponentNode::head(SeoTag::meta_property("type", "website")),
        ComponentNode::text("loaded"),
    ]);
    Ok(ComponentNode::fragment(vec![
        ComponentNode::head(SeoTag::html_attr("lang", "ja")),
        ComponentNode::head(SeoTag::body_attr("data-test", "true")),
        ComponentNode::head(SeoTag::meta_property("og:url", "example.com")),
        ComponentNode::suspense("...", delayed(10, late)).into(),
    ]))
}

fn race_page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
    Ok(ComponentNode::element("main")
        .child(ComponentNode::suspense("slow...", delayed(60, "slow")))
        .child(ComponentNode::suspense("fast...", delayed(5, "fast")))
        .into())
}

fn position(body: &str, needle: &str) -> usize {
    body.find(needle)
        .unwrap_or_else(|| panic!("{:?} not found in {}", needle, body))
}

// === Stream Mode Tests ===

#[tokio::test]
async fn test_stream_shell_then_resolution() {
    let (report, transport) = run(RenderRequest::new("/stream", stream_page)).await;

    assert!(report.is_done());
    assert_eq!(report.mode, TransportMode::Stream);
    assert_eq!(report.status, Some(200));
    assert!(report.chunks_written >= 2);
    assert_eq!(transport.flushed().len(), report.chunks_written as usize);
    assert!(transport.is_finished());

    let head = transport.head().unwrap();
    assert_eq!(head.header(header_names::X_RENDER_MODE), Some("stream"));

    let chunks = transport.flushed_strings();
    assert!(chunks[0].contains("<script>var __flight=[];</script>"));
    assert!(chunks[0].contains("loading..."));
    assert!(chunks[0].contains("<footer>footer!</footer>"));
    assert!(!chunks[0].contains("done"));

    let body = transport.body();
    let placeholder = position(&body, r#"<template id="B:2"></template>"#);
    let push = position(&body, "__flight.push(`J2:");
    assert!(placeholder < push);
    assert!(body.contains(r#""children":"done""#));
    assert!(body.contains(r#"<div hidden id="S:2"><div c="5">done</div></div>"#));
    assert!(body.contains(r#"$RC("B:2","S:2")"#));
    assert!(body.ends_with("</html>"));
}

#[tokio::test]
async fn test_resolution_order_is_completion_order() {
    let (report, transport) = run(RenderRequest::new("/race", race_page)).await;

    assert!(report.is_done());
    let chunks = transport.flushed_strings();
    assert_eq!(chunks.len(), 3);
    assert!(chunks[1].contains(">fast</div>"));
    assert!(chunks[2].contains(">slow</div>"));
    // The splice function is defined with the first resolution only.
    assert!(chunks[1].contains("function $RC("));
    assert!(!chunks[2].contains("function $RC("));

    let ids: Vec<u32> = report.metrics.boundaries.iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids[0] > ids[1], "fast boundary is declared second");
}

#[tokio::test]
async fn test_no_boundaries_is_single_final_chunk() {
    let request = RenderRequest::new("/static", |_: &RenderContext| {
        Ok(ComponentNode::element("p").child("static").into())
    });
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    assert_eq!(report.chunks_written, 1);
    let body = transport.body();
    assert!(body.contains("<p>static</p>"));
    assert!(body.ends_with("</html>"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["final_state"], "done");
    assert_eq!(json["status"], 200);
    assert_eq!(json["metrics"]["chunks"], 1);
}

#[tokio::test]
async fn test_nested_boundary_resolves_after_parent() {
    let request = RenderRequest::new("/nested", |_: &RenderContext| {
        let inner = ComponentNode::suspense("inner...", delayed(5, "inner"));
        let outer = ComponentNode::element("section")
            .child("outer")
            .child(inner);
        Ok(ComponentNode::suspense("outer...", delayed(5, outer)).into())
    });
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    assert_eq!(report.boundaries_resolved, 2);
    let chunks = transport.flushed_strings();
    assert_eq!(chunks.len(), 3);
    assert!(chunks[1].contains("outer"));
    assert!(chunks[1].contains("<!--$?--><template"));
    assert!(chunks[2].contains(">inner</div>"));
}

#[tokio::test]
async fn test_client_module_row_precedes_dependent_row() {
    let request = RenderRequest::new("/client", |_: &RenderContext| {
        let link = ComponentNode::client(ClientModule::new("./Link.client"))
            .prop("href", "/next")
            .child("next");
        Ok(ComponentNode::suspense("...", delayed(5, link)).into())
    });
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    let body = transport.body();
    let module = position(&body, r#"{"id":"./Link.client","name":"default"}"#);
    let dependent = position(&body, r#""href":"/next""#);
    assert!(module < dependent);
    assert!(body.contains(">next</div>"));
}

// === Buffer Mode Tests ===

#[tokio::test]
async fn test_override_flag_buffers() {
    let (report, transport) =
        run(RenderRequest::from_path_and_query("/stream?_bot", stream_page)).await;

    assert!(report.is_done());
    assert_eq!(report.mode, TransportMode::Buffer);
    assert_eq!(report.chunks_written, 1);
    assert_eq!(transport.flushed().len(), 1);

    let head = transport.head().unwrap();
    assert_eq!(head.header(header_names::X_RENDER_MODE), Some("buffer"));

    let body = transport.body();
    assert!(body.contains("<script>var __flight=[];</script>"));
    assert!(!body.contains(".push("));
    assert!(!body.contains("<template id=\"B:"));
    assert!(!body.contains("loading..."));
    assert!(body.contains(r#"<div><div c="5">done</div><footer>footer!</footer></div>"#));
}

#[tokio::test]
async fn test_bot_user_agent_buffers() {
    let request = RenderRequest::new("/stream", stream_page).with_header("User-Agent", GOOGLEBOT);
    let (report, transport) = run(request).await;

    assert_eq!(report.mode, TransportMode::Buffer);
    assert_eq!(transport.flushed().len(), 1);
}

#[tokio::test]
async fn test_buffer_keeps_document_order() {
    let request = RenderRequest::new("/race", race_page).with_query("_bot", "1");
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    let body = transport.body();
    assert!(position(&body, "slow") < position(&body, "fast"));
}

// === SEO Tests ===

#[tokio::test]
async fn test_buffer_head_has_deferred_metadata() {
    let (report, transport) =
        run(RenderRequest::from_path_and_query("/seo?_bot", seo_page)).await;

    assert_eq!(report.late_seo_declarations, 0);
    let body = transport.body();
    assert!(body.contains(r#"<html lang="ja">"#));
    assert!(body.contains(r#"<body data-test="true">"#));
    assert!(body.contains(r#"<meta property="og:url" content="example.com" />"#));
    assert!(body.contains(r#"<meta property="type" content="website" />"#));
    assert!(position(&body, "website") < position(&body, "</head>"));
    assert!(body.contains("loaded"));
}

#[tokio::test]
async fn test_stream_head_is_frozen_at_shell() {
    let (report, transport) = run(RenderRequest::new("/seo", seo_page)).await;

    assert!(report.is_done());
    assert_eq!(report.late_seo_declarations, 1);
    let chunks = transport.flushed_strings();
    assert!(chunks[0].contains(r#"<html lang="ja">"#));
    assert!(chunks[0].contains(r#"<meta property="og:url" content="example.com" />"#));
    assert!(!transport.body().contains(r#"property="type""#));
}

fn placeholder_title_page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
    let fallback = ComponentNode::fragment(vec![
        ComponentNode::head(SeoTag::title("Loading...")),
        ComponentNode::text("spinner"),
    ]);
    Ok(ComponentNode::suspense(fallback, delayed(5, "Real content")).into())
}

#[tokio::test]
async fn test_buffer_drops_fallback_metadata() {
    let (report, transport) =
        run(RenderRequest::from_path_and_query("/p?_bot", placeholder_title_page)).await;

    assert!(report.is_done());
    assert_eq!(report.mode, TransportMode::Buffer);
    let body = transport.body();
    assert!(!body.contains("Loading..."));
    assert!(!body.contains("spinner"));
    assert!(body.contains("Real content"));
}

#[tokio::test]
async fn test_stream_shell_carries_fallback_metadata() {
    let (report, transport) = run(RenderRequest::new("/p", placeholder_title_page)).await;

    assert!(report.is_done());
    let chunks = transport.flushed_strings();
    assert!(chunks[0].contains("<title>Loading...</title>"));
    assert!(chunks[0].contains("spinner"));
}

// === Error Tests ===

#[tokio::test]
async fn test_root_failure_is_single_error_document() {
    let request = RenderRequest::new("/broken", |_: &RenderContext| {
        Err(anyhow::anyhow!("database unavailable"))
    });
    let (report, transport) = run(request).await;

    assert_eq!(report.final_state, RenderState::Errored);
    assert_eq!(report.status, Some(500));
    assert_eq!(report.chunks_written, 1);
    assert!(matches!(report.error, Some(RenderError::RootRenderFailure(_))));

    let head = transport.head().unwrap();
    assert_eq!(head.status.as_u16(), 500);
    let body = transport.body();
    assert!(body.contains("Error 500"));
    assert!(!body.contains("database unavailable"));
    assert!(!body.contains("__flight"));
}

#[tokio::test]
async fn test_invalid_request_is_400() {
    let (report, transport) = run(RenderRequest::new("relative", stream_page)).await;

    assert_eq!(report.status, Some(400));
    assert_eq!(transport.head().unwrap().status.as_u16(), 400);
    assert_eq!(transport.flushed().len(), 1);
}

#[tokio::test]
async fn test_boundary_failure_uses_error_fallback() {
    let request = RenderRequest::new("/partial", |_: &RenderContext| {
        Ok(ComponentNode::element("main")
            .child(ComponentNode::suspense("...", failing(5, "timeout")).error_fallback("sorry"))
            .child(ComponentNode::suspense("...", delayed(10, "fine")))
            .into())
    });
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    assert_eq!(report.status, Some(200));
    assert_eq!(report.boundaries_errored, 1);
    assert_eq!(report.boundaries_resolved, 1);
    assert_eq!(report.metrics.fallbacks_used(), 1);
    let body = transport.body();
    assert!(body.contains(">sorry</div>"));
    assert!(body.contains(">fine</div>"));
}

#[tokio::test]
async fn test_show_error_fallback_in_buffer_mode() {
    let request = RenderRequest::new("/partial", |_: &RenderContext| {
        Ok(ComponentNode::suspense("...", failing(5, "<timeout>"))
            .on_error(ErrorFallback::ShowError)
            .into())
    })
    .with_query("_bot", "");
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    assert_eq!(report.status, Some(200));
    let body = transport.body();
    assert!(body.contains(r#"<div class="boundary-error">Failed to load: &lt;timeout&gt;</div>"#));
}

#[tokio::test]
async fn test_unhandled_boundary_failure_after_shell() {
    let request = RenderRequest::new("/escalate", |_: &RenderContext| {
        Ok(ComponentNode::suspense("...", failing(5, "boom")).into())
    });
    let (report, transport) = run(request).await;

    assert_eq!(report.final_state, RenderState::Errored);
    assert_eq!(report.status, Some(200));
    assert!(matches!(
        report.error,
        Some(RenderError::UncontainedBoundaryFailure { .. })
    ));
    assert!(report.error.as_ref().is_some_and(RenderError::is_fatal));
    assert!(transport.is_finished());
    let chunks = transport.flushed_strings();
    assert_eq!(chunks.len(), 2);
    assert!(chunks[1].contains("__flight.push(`E1:"));
    assert!(chunks[1].ends_with("</html>"));
}

#[tokio::test]
async fn test_unhandled_boundary_failure_in_buffer_mode() {
    let request = RenderRequest::new("/escalate", |_: &RenderContext| {
        Ok(ComponentNode::suspense("...", failing(5, "boom")).into())
    })
    .with_query("_bot", "true");
    let (report, transport) = run(request).await;

    assert_eq!(report.final_state, RenderState::Errored);
    assert_eq!(report.status, Some(500));
    assert!(report.error.as_ref().is_some_and(RenderError::is_fatal));
    assert_eq!(transport.flushed().len(), 1);
}

// === Cancellation Tests ===

#[tokio::test]
async fn test_cancel_drops_pending_work() {
    let completed = Rc::new(Cell::new(false));
    let flag = completed.clone();
    let request = RenderRequest::new("/slow", move |_: &RenderContext| {
        let content = async move {
            sleep(Duration::from_millis(100)).await;
            flag.set(true);
            Ok::<_, anyhow::Error>(ComponentNode::text("late-content-xyz"))
        };
        Ok(ComponentNode::suspense("...", content).into())
    });

    let (handle, signal) = cancel_pair();
    let mut writer = ResponseWriter::new(MemoryTransport::new(), TransportMode::Stream);
    let renderer = renderer();
    let (report, ()) = tokio::join!(renderer.render(request, &mut writer, signal), async {
        sleep(Duration::from_millis(10)).await;
        handle.cancel();
    });

    assert_eq!(report.final_state, RenderState::Cancelled);
    assert_eq!(report.error, Some(RenderError::Cancelled));
    assert_eq!(report.chunks_written, 1);

    sleep(Duration::from_millis(150)).await;
    assert!(!completed.get());
    let transport = writer.into_inner();
    assert_eq!(transport.flushed().len(), 1);
    assert!(!transport.body().contains("late-content-xyz"));
}

#[tokio::test]
async fn test_cancel_before_start_writes_nothing() {
    let (handle, signal) = cancel_pair();
    handle.cancel();
    let mut writer = ResponseWriter::new(MemoryTransport::new(), TransportMode::Stream);
    let report = renderer()
        .render(RenderRequest::new("/stream", stream_page), &mut writer, signal)
        .await;

    assert_eq!(report.final_state, RenderState::Cancelled);
    assert_eq!(report.status, None);
    assert!(writer.transport().head().is_none());
}

#[tokio::test]
async fn test_disconnect_stops_render() {
    let mut writer = ResponseWriter::new(
        MemoryTransport::new().disconnect_after(1),
        TransportMode::Stream,
    );
    let report = renderer()
        .render(
            RenderRequest::new("/race", race_page),
            &mut writer,
            CancelSignal::never(),
        )
        .await;

    assert_eq!(report.final_state, RenderState::Cancelled);
    assert!(matches!(
        report.error,
        Some(RenderError::TransportDisconnected(_))
    ));
    assert_eq!(writer.transport().flushed().len(), 1);
    assert!(!writer.transport().is_finished());
}

// === Isolation Tests ===

#[tokio::test]
async fn test_concurrent_requests_are_isolated() {
    let renderer = renderer();
    let mut first = ResponseWriter::new(MemoryTransport::new(), TransportMode::Stream);
    let mut second = ResponseWriter::new(MemoryTransport::new(), TransportMode::Stream);

    let a = RenderRequest::new("/a", |_: &RenderContext| {
        Ok(ComponentNode::suspense("...", delayed(20, "alpha")).into())
    });
    let b = RenderRequest::new("/b", |_: &RenderContext| {
        Ok(ComponentNode::suspense("...", delayed(5, "beta")).into())
    })
    .with_query("_bot", "");

    let (ra, rb) = tokio::join!(
        renderer.render(a, &mut first, CancelSignal::never()),
        renderer.render(b, &mut second, CancelSignal::never()),
    );

    assert!(ra.is_done());
    assert!(rb.is_done());
    assert_ne!(ra.request_id, rb.request_id);
    assert_eq!(ra.mode, TransportMode::Stream);
    assert_eq!(rb.mode, TransportMode::Buffer);

    let body_a = first.into_inner().body();
    let body_b = second.into_inner().body();
    assert!(body_a.contains("alpha") && !body_a.contains("beta"));
    assert!(body_b.contains("beta") && !body_b.contains("alpha"));
    assert!(body_a.contains("__flight.push(`J0:"));
}

// === Flight Format Tests ===

#[tokio::test]
async fn test_flight_format_streams_rows() {
    let request =
        RenderRequest::new("/stream", stream_page).with_format(ResponseFormat::Flight);
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    let head = transport.head().unwrap();
    assert_eq!(
        head.header(header_names::CONTENT_TYPE),
        Some("text/x-component; charset=utf-8")
    );

    let chunks = transport.flushed_strings();
    assert_eq!(chunks.len(), 2);
    assert!(!chunks[0].contains("<html"));
    assert!(chunks[0].contains("\"react.suspense\"\n"));
    assert!(chunks[0].contains("\"$L2\""));
    assert!(chunks[1].starts_with("J2:"));
    assert!(chunks[1].ends_with("\n"));
}

#[tokio::test]
async fn test_flight_format_buffered_is_one_chunk() {
    let request = RenderRequest::new("/stream", stream_page)
        .with_format(ResponseFormat::Flight)
        .with_query("_bot", "");
    let (report, transport) = run(request).await;

    assert!(report.is_done());
    let chunks = transport.flushed_strings();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].contains("J0:"));
    assert!(chunks[0].contains("J2:"));
    assert!(position(&chunks[0], "J0:") < position(&chunks[0], "J2:"));
}
