//! Spin response transport.

use std::pin::Pin;

use async_trait::async_trait;
use edge_sdk::edge_core::RenderError;
use edge_sdk::edge_streaming::{ResponseHead, SinkTransport, Transport};
use futures::{Sink, SinkExt};
use spin_sdk::http::{Fields, OutgoingResponse, ResponseOutparam};

type BodySink = Pin<Box<dyn Sink<Vec<u8>, Error = String>>>;

/// Delivers a render through Spin's outgoing response.
///
/// The response is created on `start`, so the status and headers are those
/// the renderer commits; the body is then streamed through a `SinkTransport`.
pub struct SpinTransport {
    outparam: Option<ResponseOutparam>,
    body: Option<SinkTransport<BodySink, String>>,
}

impl SpinTransport {
    pub fn new(outparam: ResponseOutparam) -> Self {
        Self {
            outparam: Some(outparam),
            body: None,
        }
    }

    /// Answer with an empty body if the renderer never committed a head.
    pub fn respond_if_unstarted(mut self, status: u16) {
        if let Some(outparam) = self.outparam.take() {
            respond_empty(outparam, status);
        }
    }

    fn body(&mut self) -> Result<&mut SinkTransport<BodySink, String>, RenderError> {
        self.body
            .as_mut()
            .ok_or_else(|| RenderError::TransportDisconnected("response not started".into()))
    }
}

/// Send a bodyless response.
pub fn respond_empty(outparam: ResponseOutparam, status: u16) {
    let response = OutgoingResponse::new(Fields::new());
    if response.set_status_code(status).is_err() {
        eprintln!("Invalid status code: {}", status);
    }
    outparam.set(response);
}

#[async_trait(?Send)]
impl Transport for SpinTransport {
    async fn start(&mut self, head: &ResponseHead) -> Result<(), RenderError> {
        let outparam = self
            .outparam
            .take()
            .ok_or_else(|| RenderError::TransportDisconnected("response already started".into()))?;

        let header_list: Vec<(String, Vec<u8>)> = head
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone().into_bytes()))
            .collect();
        let headers = Fields::from_list(&header_list)
            .map_err(|e| RenderError::TransportDisconnected(format!("invalid headers: {:?}", e)))?;

        let response = OutgoingResponse::new(headers);
        response
            .set_status_code(head.status.as_u16())
            .map_err(|_| RenderError::TransportDisconnected("invalid status code".into()))?;

        let body: BodySink = Box::pin(response.take_body().sink_map_err(|e| e.to_string()));
        outparam.set(response);

        let mut transport = SinkTransport::new(body);
        transport.start(head).await?;
        self.body = Some(transport);
        Ok(())
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), RenderError> {
        self.body()?.send(bytes).await
    }

    async fn flush(&mut self) -> Result<(), RenderError> {
        self.body()?.flush().await
    }

    async fn finish(&mut self) -> Result<(), RenderError> {
        self.body()?.finish().await
    }
}
