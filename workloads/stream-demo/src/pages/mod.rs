//! Demo pages and the route table.

mod index;
mod seo;
mod stream;

pub use index::*;
pub use seo::*;
pub use stream::*;

use std::future::Future;
use std::task::Poll;

use edge_sdk::edge_core::{
    split_path_and_query, ComponentNode, RenderContext, RenderRequest, ResponseFormat,
};
use futures::future::poll_fn;
use serde::Deserialize;

/// A page factory.
pub type Page = fn(&RenderContext) -> anyhow::Result<ComponentNode>;

/// Route that serves the raw side channel for another page.
pub const FLIGHT_ROUTE: &str = "/react";

/// Query parameter of `FLIGHT_ROUTE` carrying `{"pathname": ...}`.
pub const FLIGHT_STATE_PARAM: &str = "state";

/// Look up the page for a pathname.
pub fn page_for(pathname: &str) -> Option<Page> {
    match pathname {
        "/" => Some(index_page),
        "/stream" => Some(stream_page),
        "/seo" => Some(seo_page),
        _ => None,
    }
}

/// Pathnames served as documents.
pub fn routes() -> &'static [&'static str] {
    &["/", "/stream", "/seo"]
}

#[derive(Debug, Deserialize)]
struct FlightState {
    pathname: String,
}

/// Build a render request for `"/path?query"`.
///
/// `/react?state={"pathname":"/stream"}` renders `/stream` as a flight
/// response. Returns `None` for unknown routes.
pub fn route(path_with_query: &str) -> Option<RenderRequest> {
    let (pathname, mut query) = split_path_and_query(path_with_query);

    if pathname == FLIGHT_ROUTE {
        let raw = query.remove(FLIGHT_STATE_PARAM)?;
        let state: FlightState = serde_json::from_str(&raw).ok()?;
        let page = page_for(&state.pathname)?;
        let mut request = RenderRequest::new(state.pathname, page).with_format(ResponseFormat::Flight);
        request.query = query;
        return Some(request);
    }

    let page = page_for(&pathname)?;
    let mut request = RenderRequest::new(pathname, page);
    request.query = query;
    Some(request)
}

/// Yield to the executor `ticks` times before completing.
///
/// Stands in for I/O so boundary completion order is deterministic under
/// any executor.
pub fn settle_after(ticks: u32) -> impl Future<Output = ()> {
    let mut remaining = ticks;
    poll_fn(move |cx| {
        if remaining == 0 {
            return Poll::Ready(());
        }
        remaining -= 1;
        cx.waker().wake_by_ref();
        Poll::Pending
    })
}

/// Resolve to `node` after `ticks` yields.
pub async fn deferred(ticks: u32, node: impl Into<ComponentNode>) -> anyhow::Result<ComponentNode> {
    settle_after(ticks).await;
    Ok(node.into())
}
