//! Spin HTTP entry point.

use spin_sdk::http::{IncomingRequest, Method, ResponseOutparam};
use spin_sdk::http_component;

use edge_sdk::edge_core::{Headers, TransportMode};
use edge_sdk::edge_render::{CancelSignal, Renderer};
use edge_sdk::edge_streaming::ResponseWriter;

use crate::pages;
use crate::transport::{respond_empty, SpinTransport};

/// Demo page handler.
#[http_component]
async fn handle(req: IncomingRequest, response_out: ResponseOutparam) {
    // Only handle GET requests
    if req.method() != Method::Get {
        respond_empty(response_out, 405);
        return;
    }

    let path_with_query = req.path_with_query().unwrap_or_default();
    let Some(request) = pages::route(&path_with_query) else {
        respond_empty(response_out, 404);
        return;
    };

    let headers: Headers = req
        .headers()
        .entries()
        .into_iter()
        .map(|(name, value)| (name, String::from_utf8_lossy(&value).into_owned()))
        .collect();

    let config = match crate::render_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            respond_empty(response_out, 500);
            return;
        }
    };
    let renderer = Renderer::new(config);
    let mut writer = ResponseWriter::new(SpinTransport::new(response_out), TransportMode::Stream);
    let report = renderer
        .render(request.with_headers(headers), &mut writer, CancelSignal::never())
        .await;

    if report.status.is_none() {
        writer.into_inner().respond_if_unstarted(500);
    }
}
