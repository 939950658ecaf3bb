//! Response writer and transports.

use std::fmt::Display;

use async_trait::async_trait;
use edge_core::{RenderError, TransportMode};
use futures::{Sink, SinkExt};

use crate::chunk::{ResponseChunk, ResponseHead};

/// The byte sink a response is delivered through.
///
/// Any send failure is reported as `TransportDisconnected`.
#[async_trait(?Send)]
pub trait Transport {
    /// Commit status and headers. Called once, before the first send.
    async fn start(&mut self, head: &ResponseHead) -> Result<(), RenderError>;

    /// Queue bytes for delivery.
    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), RenderError>;

    /// Push queued bytes to the client.
    async fn flush(&mut self) -> Result<(), RenderError>;

    /// End the response body.
    async fn finish(&mut self) -> Result<(), RenderError>;
}

/// State of the response writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Head not yet committed.
    Initial,
    /// Head committed, chunks may be written.
    Open,
    /// Final chunk written or writer closed.
    Closed,
}

/// Enforces the chunk contract on top of a `Transport`.
///
/// In stream mode every write is flushed immediately. In buffer mode the
/// single write must be the final chunk.
pub struct ResponseWriter<T: Transport> {
    inner: T,
    mode: TransportMode,
    state: WriterState,
    next_ordinal: u32,
    bytes_written: usize,
    final_written: bool,
}

impl<T: Transport> ResponseWriter<T> {
    /// Create a writer over a transport.
    pub fn new(transport: T, mode: TransportMode) -> Self {
        Self {
            inner: transport,
            mode,
            state: WriterState::Initial,
            next_ordinal: 0,
            bytes_written: 0,
            final_written: false,
        }
    }

    /// Change the delivery mode. Only allowed before the head is committed.
    pub fn set_mode(&mut self, mode: TransportMode) -> Result<(), RenderError> {
        if self.state != WriterState::Initial {
            return Err(RenderError::ChunkOrder(
                "mode cannot change after the head is committed".to_string(),
            ));
        }
        self.mode = mode;
        Ok(())
    }

    /// Commit the response head. Later calls are ignored.
    pub async fn begin(&mut self, head: &ResponseHead) -> Result<(), RenderError> {
        match self.state {
            WriterState::Initial => {
                let result = self.inner.start(head).await;
                self.track(result)?;
                self.state = WriterState::Open;
                Ok(())
            }
            WriterState::Open => Ok(()),
            WriterState::Closed => Err(RenderError::TransportClosed),
        }
    }

    /// Build the next chunk in sequence.
    pub fn chunk(&self, payload: impl Into<Vec<u8>>, is_final: bool) -> ResponseChunk {
        ResponseChunk::new(self.next_ordinal, payload, is_final)
    }

    /// Write a chunk.
    pub async fn write(&mut self, chunk: ResponseChunk) -> Result<(), RenderError> {
        match self.state {
            WriterState::Closed => return Err(RenderError::TransportClosed),
            WriterState::Initial => {
                return Err(RenderError::ChunkOrder(
                    "write before the response head was committed".to_string(),
                ))
            }
            WriterState::Open => {}
        }
        if self.final_written {
            return Err(RenderError::ChunkOrder(
                "final chunk already written".to_string(),
            ));
        }
        if chunk.ordinal != self.next_ordinal {
            return Err(RenderError::ChunkOrder(format!(
                "expected ordinal {}, got {}",
                self.next_ordinal, chunk.ordinal
            )));
        }
        if self.mode == TransportMode::Buffer && !chunk.is_final {
            return Err(RenderError::ChunkOrder(
                "buffered responses are written as one final chunk".to_string(),
            ));
        }

        let len = chunk.payload.len();
        let result = self.inner.send(chunk.payload).await;
        self.track(result)?;
        if self.mode.flush_each_write() || chunk.is_final {
            let result = self.inner.flush().await;
            self.track(result)?;
        }

        self.next_ordinal += 1;
        self.bytes_written += len;
        if chunk.is_final {
            self.final_written = true;
        }
        Ok(())
    }

    /// Close the transport. Closing twice is a no-op.
    pub async fn close(&mut self) -> Result<(), RenderError> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        let was_open = self.state == WriterState::Open;
        self.state = WriterState::Closed;
        if was_open {
            self.inner.finish().await?;
        }
        Ok(())
    }

    /// Mark the writer closed without touching the transport.
    pub fn abandon(&mut self) {
        self.state = WriterState::Closed;
    }

    // A failed transport call leaves the writer closed.
    fn track(&mut self, result: Result<(), RenderError>) -> Result<(), RenderError> {
        if result.is_err() {
            self.state = WriterState::Closed;
        }
        result
    }

    /// Whether the head has been committed.
    pub fn is_started(&self) -> bool {
        self.state != WriterState::Initial
    }

    /// Whether the writer is closed.
    pub fn is_closed(&self) -> bool {
        self.state == WriterState::Closed
    }

    /// Whether the final chunk has been written.
    pub fn final_written(&self) -> bool {
        self.final_written
    }

    /// Number of chunks written.
    pub fn chunks_written(&self) -> u32 {
        self.next_ordinal
    }

    /// Total payload bytes written.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Delivery mode.
    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    /// Get the transport.
    pub fn transport(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

/// Transport over any `Sink<Vec<u8>>`, such as an HTTP body stream.
///
/// The head is recorded but not sent; the caller commits it to whatever
/// owns the status line.
pub struct SinkTransport<S, E>
where
    S: Sink<Vec<u8>, Error = E> + Unpin,
    E: Display,
{
    inner: S,
    head: Option<ResponseHead>,
}

impl<S, E> SinkTransport<S, E>
where
    S: Sink<Vec<u8>, Error = E> + Unpin,
    E: Display,
{
    /// Wrap a sink.
    pub fn new(sink: S) -> Self {
        Self {
            inner: sink,
            head: None,
        }
    }

    /// The committed head, if any.
    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    /// Consume and return the sink.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[async_trait(?Send)]
impl<S, E> Transport for SinkTransport<S, E>
where
    S: Sink<Vec<u8>, Error = E> + Unpin,
    E: Display,
{
    async fn start(&mut self, head: &ResponseHead) -> Result<(), RenderError> {
        self.head = Some(head.clone());
        Ok(())
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), RenderError> {
        self.inner
            .feed(bytes)
            .await
            .map_err(|e| RenderError::TransportDisconnected(e.to_string()))
    }

    async fn flush(&mut self) -> Result<(), RenderError> {
        self.inner
            .flush()
            .await
            .map_err(|e| RenderError::TransportDisconnected(e.to_string()))
    }

    async fn finish(&mut self) -> Result<(), RenderError> {
        self.inner
            .close()
            .await
            .map_err(|e| RenderError::TransportDisconnected(e.to_string()))
    }
}

/// In-memory transport that records every flushed chunk.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    head: Option<ResponseHead>,
    pending: Vec<u8>,
    flushed: Vec<Vec<u8>>,
    finished: bool,
    fail_after: Option<usize>,
    sends: usize,
}

impl MemoryTransport {
    /// Create an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a client disconnect: sends after the first `n` fail.
    pub fn disconnect_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// The committed head.
    pub fn head(&self) -> Option<&ResponseHead> {
        self.head.as_ref()
    }

    /// Bytes of each flush, in order.
    pub fn flushed(&self) -> &[Vec<u8>] {
        &self.flushed
    }

    /// Flushed chunks as strings.
    pub fn flushed_strings(&self) -> Vec<String> {
        self.flushed
            .iter()
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .collect()
    }

    /// Concatenated body.
    pub fn body(&self) -> String {
        self.flushed_strings().concat()
    }

    /// Whether `finish` was called.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[async_trait(?Send)]
impl Transport for MemoryTransport {
    async fn start(&mut self, head: &ResponseHead) -> Result<(), RenderError> {
        self.head = Some(head.clone());
        Ok(())
    }

    async fn send(&mut self, bytes: Vec<u8>) -> Result<(), RenderError> {
        if let Some(limit) = self.fail_after {
            if self.sends >= limit {
                return Err(RenderError::TransportDisconnected(
                    "client went away".to_string(),
                ));
            }
        }
        self.sends += 1;
        self.pending.extend(bytes);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), RenderError> {
        if !self.pending.is_empty() {
            self.flushed.push(std::mem::take(&mut self.pending));
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), RenderError> {
        self.flush().await?;
        self.finished = true;
        Ok(())
    }
}
