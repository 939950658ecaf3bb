//! Public SDK for the streaming server-component renderer.
//!
//! This crate re-exports all renderer functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! fn page(_: &RenderContext) -> anyhow::Result<ComponentNode> {
//!     Ok(ComponentNode::element("main")
//!         .child(ComponentNode::suspense("loading...", load_reviews()))
//!         .into())
//! }
//!
//! let renderer = Renderer::new(RenderConfig::default());
//! let mut writer = ResponseWriter::new(transport, TransportMode::Stream);
//! let report = renderer
//!     .render(RenderRequest::new("/", page), &mut writer, CancelSignal::never())
//!     .await;
//! ```

pub use edge_core;
pub use edge_executor;
pub use edge_flight;
pub use edge_observability;
pub use edge_render;
pub use edge_streaming;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_core::*;
    pub use edge_executor::*;
    pub use edge_flight::*;
    pub use edge_observability::*;
    pub use edge_render::*;
    pub use edge_streaming::*;
}
